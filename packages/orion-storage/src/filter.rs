//! Storage-level force filter shared by every backend.
//!
//! The Postgres backend renders it into `WHERE` conditions; the in-memory backend evaluates
//! [`ForceFilter::matches`] directly. Both must agree row for row.

use std::cmp::Ordering;

use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use orion_domain::query::TextQuery;

use crate::models::Force;

#[derive(Debug, Clone)]
pub struct ForceFilter {
	pub project_id: Uuid,
	/// Visibility restriction applied before any caller-supplied condition.
	pub exclude_types: Vec<String>,
	pub types: Vec<String>,
	pub steep_categories: Vec<String>,
	pub sentiments: Vec<String>,
	pub horizons: Vec<String>,
	/// Matches when the force carries at least one of these tags.
	pub tags: Vec<String>,
	/// Case-insensitive substring of the force source.
	pub source_contains: Option<String>,
	pub impact_min: Option<f64>,
	pub impact_max: Option<f64>,
	pub created_after: Option<OffsetDateTime>,
	pub created_before: Option<OffsetDateTime>,
	pub ids: Vec<Uuid>,
	pub text: TextQuery,
}
impl ForceFilter {
	pub fn for_project(project_id: Uuid) -> Self {
		Self {
			project_id,
			exclude_types: Vec::new(),
			types: Vec::new(),
			steep_categories: Vec::new(),
			sentiments: Vec::new(),
			horizons: Vec::new(),
			tags: Vec::new(),
			source_contains: None,
			impact_min: None,
			impact_max: None,
			created_after: None,
			created_before: None,
			ids: Vec::new(),
			text: TextQuery::MatchAll,
		}
	}

	pub fn matches(&self, force: &Force) -> bool {
		if force.project_id != Some(self.project_id) {
			return false;
		}
		if self.exclude_types.iter().any(|ty| ty == &force.force_type) {
			return false;
		}
		if !self.types.is_empty() && !self.types.iter().any(|ty| ty == &force.force_type) {
			return false;
		}
		if !in_set(&self.steep_categories, force.steep_category.as_deref()) {
			return false;
		}
		if !in_set(&self.sentiments, force.sentiment.as_deref()) {
			return false;
		}
		if !in_set(&self.horizons, force.horizon.as_deref()) {
			return false;
		}
		if !self.tags.is_empty() && !force.tags.iter().any(|tag| self.tags.contains(tag)) {
			return false;
		}
		if let Some(needle) = self.source_contains.as_deref() {
			let needle = needle.to_lowercase();
			let found = force
				.source
				.as_deref()
				.map(|source| source.to_lowercase().contains(needle.as_str()))
				.unwrap_or(false);

			if !found {
				return false;
			}
		}
		if self.impact_min.is_some() || self.impact_max.is_some() {
			let Some(impact) = force.impact else {
				return false;
			};

			if self.impact_min.map(|min| impact < min).unwrap_or(false) {
				return false;
			}
			if self.impact_max.map(|max| impact > max).unwrap_or(false) {
				return false;
			}
		}
		if self.created_after.map(|after| force.created_at < after).unwrap_or(false) {
			return false;
		}
		if self.created_before.map(|before| force.created_at > before).unwrap_or(false) {
			return false;
		}
		if !self.ids.is_empty() && !self.ids.contains(&force.force_id) {
			return false;
		}

		self.text.matches(&force.title, &force.body)
	}

	/// Appends ` AND ...` conditions for everything except the project scope, which the caller
	/// already pushed.
	pub(crate) fn push_conditions(&self, builder: &mut QueryBuilder<'_, Postgres>) {
		if !self.exclude_types.is_empty() {
			builder.push(" AND NOT (force_type = ANY(");
			builder.push_bind(self.exclude_types.clone());
			builder.push("))");
		}
		if !self.types.is_empty() {
			builder.push(" AND force_type = ANY(");
			builder.push_bind(self.types.clone());
			builder.push(")");
		}
		if !self.steep_categories.is_empty() {
			builder.push(" AND steep_category = ANY(");
			builder.push_bind(self.steep_categories.clone());
			builder.push(")");
		}
		if !self.sentiments.is_empty() {
			builder.push(" AND sentiment = ANY(");
			builder.push_bind(self.sentiments.clone());
			builder.push(")");
		}
		if !self.horizons.is_empty() {
			builder.push(" AND horizon = ANY(");
			builder.push_bind(self.horizons.clone());
			builder.push(")");
		}
		if !self.tags.is_empty() {
			builder.push(" AND tags && ");
			builder.push_bind(self.tags.clone());
		}
		if let Some(needle) = self.source_contains.as_deref() {
			builder.push(" AND source ILIKE ");
			builder.push_bind(like_pattern(needle));
			builder.push(" ESCAPE '\\'");
		}
		if let Some(min) = self.impact_min {
			builder.push(" AND impact >= ");
			builder.push_bind(min);
		}
		if let Some(max) = self.impact_max {
			builder.push(" AND impact <= ");
			builder.push_bind(max);
		}
		if let Some(after) = self.created_after {
			builder.push(" AND created_at >= ");
			builder.push_bind(after);
		}
		if let Some(before) = self.created_before {
			builder.push(" AND created_at <= ");
			builder.push_bind(before);
		}
		if !self.ids.is_empty() {
			builder.push(" AND force_id = ANY(");
			builder.push_bind(self.ids.clone());
			builder.push(")");
		}

		let (terms, joiner) = match &self.text {
			TextQuery::MatchAll => return,
			TextQuery::Any(terms) => (terms, " OR "),
			TextQuery::All(terms) => (terms, " AND "),
		};

		builder.push(" AND (");

		for (idx, term) in terms.iter().enumerate() {
			let pattern = like_pattern(term);

			if idx > 0 {
				builder.push(joiner);
			}

			builder.push("(title ILIKE ");
			builder.push_bind(pattern.clone());
			builder.push(" ESCAPE '\\' OR body ILIKE ");
			builder.push_bind(pattern);
			builder.push(" ESCAPE '\\')");
		}

		builder.push(")");
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
	Impact,
	CreatedAt,
	UpdatedAt,
	Title,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
	Asc,
	Desc,
}

/// Row order for a force fetch. Ties always fall back to `force_id` ascending so pages are
/// stable.
///
/// Titles compare lowercased by code point on both backends (`COLLATE "C"` in Postgres). Case
/// folding itself can still differ for characters outside the database's lowercase mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForceOrder {
	pub field: SortField,
	pub direction: SortDirection,
}
impl ForceOrder {
	pub fn new(field: SortField, direction: SortDirection) -> Self {
		Self { field, direction }
	}

	pub fn compare(&self, a: &Force, b: &Force) -> Ordering {
		let primary = match self.field {
			SortField::Impact => {
				// Missing impact sorts last in both directions.
				match (a.impact, b.impact) {
					(Some(x), Some(y)) => self.directed(x.total_cmp(&y)),
					(Some(_), None) => Ordering::Less,
					(None, Some(_)) => Ordering::Greater,
					(None, None) => Ordering::Equal,
				}
			},
			SortField::CreatedAt => self.directed(a.created_at.cmp(&b.created_at)),
			SortField::UpdatedAt => self.directed(a.updated_at.cmp(&b.updated_at)),
			SortField::Title =>
				self.directed(a.title.to_lowercase().cmp(&b.title.to_lowercase())),
		};

		primary.then_with(|| a.force_id.cmp(&b.force_id))
	}

	pub(crate) fn order_by_sql(&self) -> &'static str {
		match (self.field, self.direction) {
			(SortField::Impact, SortDirection::Asc) => " ORDER BY impact ASC NULLS LAST, force_id ASC",
			(SortField::Impact, SortDirection::Desc) =>
				" ORDER BY impact DESC NULLS LAST, force_id ASC",
			(SortField::CreatedAt, SortDirection::Asc) => " ORDER BY created_at ASC, force_id ASC",
			(SortField::CreatedAt, SortDirection::Desc) =>
				" ORDER BY created_at DESC, force_id ASC",
			(SortField::UpdatedAt, SortDirection::Asc) => " ORDER BY updated_at ASC, force_id ASC",
			(SortField::UpdatedAt, SortDirection::Desc) =>
				" ORDER BY updated_at DESC, force_id ASC",
			(SortField::Title, SortDirection::Asc) =>
				" ORDER BY lower(title) COLLATE \"C\" ASC, force_id ASC",
			(SortField::Title, SortDirection::Desc) =>
				" ORDER BY lower(title) COLLATE \"C\" DESC, force_id ASC",
		}
	}

	fn directed(&self, ordering: Ordering) -> Ordering {
		match self.direction {
			SortDirection::Asc => ordering,
			SortDirection::Desc => ordering.reverse(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
	pub offset: u64,
	pub limit: u64,
}

fn in_set(allowed: &[String], value: Option<&str>) -> bool {
	if allowed.is_empty() {
		return true;
	}

	value.map(|value| allowed.iter().any(|candidate| candidate == value)).unwrap_or(false)
}

/// Wraps `raw` in `%` wildcards with LIKE metacharacters escaped by backslash.
pub fn like_pattern(raw: &str) -> String {
	let mut escaped = String::with_capacity(raw.len() + 2);

	escaped.push('%');

	for ch in raw.chars() {
		if matches!(ch, '%' | '_' | '\\') {
			escaped.push('\\');
		}

		escaped.push(ch);
	}

	escaped.push('%');

	escaped
}
