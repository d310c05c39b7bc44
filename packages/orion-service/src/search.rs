use std::{collections::HashMap, time::Instant};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, OrionService, Result, store_failure};
use orion_domain::{
	Feature,
	facets::{self, FacetCounts},
	force::{self, ForceType, SIGNAL_TYPE},
	query::TextQuery,
};
use orion_storage::{
	ForceFilter, ForceOrder, SortDirection, SortField, Window,
	models::{Cluster, Force},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
	#[default]
	Relevance,
	Impact,
	CreatedAt,
	UpdatedAt,
	Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
	Asc,
	#[default]
	Desc,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SearchQuery {
	pub q: Option<String>,
	pub project_id: Option<Uuid>,
	pub types: Vec<String>,
	/// STEEP categories.
	pub category: Vec<String>,
	pub sentiments: Vec<String>,
	pub impact_min: Option<f64>,
	pub impact_max: Option<f64>,
	pub horizons: Vec<String>,
	pub tags: Vec<String>,
	pub source: Option<String>,
	#[serde(with = "crate::time_serde::option")]
	pub created_after: Option<OffsetDateTime>,
	#[serde(with = "crate::time_serde::option")]
	pub created_before: Option<OffsetDateTime>,
	pub ids: Vec<Uuid>,
	pub sort: SortKey,
	pub sort_order: SortOrder,
	pub page: u32,
	/// Falls back to `search.default_page_size`.
	pub page_size: Option<u32>,
	pub include_facets: bool,
}
impl Default for SearchQuery {
	fn default() -> Self {
		Self {
			q: None,
			project_id: None,
			types: Vec::new(),
			category: Vec::new(),
			sentiments: Vec::new(),
			impact_min: None,
			impact_max: None,
			horizons: Vec::new(),
			tags: Vec::new(),
			source: None,
			created_after: None,
			created_before: None,
			ids: Vec::new(),
			sort: SortKey::Relevance,
			sort_order: SortOrder::Desc,
			page: 1,
			page_size: None,
			include_facets: true,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterRef {
	pub cluster_id: Uuid,
	pub label: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceItem {
	pub force_id: Uuid,
	pub project_id: Option<Uuid>,
	pub title: String,
	pub body: String,
	pub force_type: String,
	pub steep_category: Option<String>,
	pub impact: Option<f64>,
	pub magnitude: Option<f64>,
	pub distance: Option<f64>,
	pub feasibility: Option<f64>,
	pub urgency: Option<f64>,
	pub tags: Vec<String>,
	pub source: Option<String>,
	pub sentiment: Option<String>,
	pub horizon: Option<String>,
	pub cluster: Option<ClusterRef>,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}
impl ForceItem {
	fn new(force: Force, cluster: Option<ClusterRef>) -> Self {
		Self {
			force_id: force.force_id,
			project_id: force.project_id,
			title: force.title,
			body: force.body,
			force_type: force.force_type,
			steep_category: force.steep_category,
			impact: force.impact,
			magnitude: force.magnitude,
			distance: force.distance,
			feasibility: force.feasibility,
			urgency: force.urgency,
			tags: force.tags,
			source: force.source,
			sentiment: force.sentiment,
			horizon: force.horizon,
			cluster,
			created_at: force.created_at,
			updated_at: force.updated_at,
		}
	}
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
	pub forces: Vec<ForceItem>,
	pub total: u64,
	pub page: u32,
	pub page_size: u32,
	pub total_pages: u64,
	pub has_more: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub facets: Option<FacetCounts>,
	pub elapsed_ms: u64,
	/// May differ from the requested project after the empty-project fallback.
	pub effective_project_id: Uuid,
}

impl OrionService {
	pub async fn search(&self, query: SearchQuery, caller_id: Uuid) -> Result<SearchResponse> {
		let started = Instant::now();
		let page_size = self.validate_search(&query)?;
		let caller = self.load_active_caller(caller_id).await?;
		let project_id = self.resolve_effective_project(query.project_id, caller_id).await?;
		let signal_access = self.capabilities_for(caller.tier).grants(Feature::SignalAccess);
		let filter = build_filter(project_id, &query, signal_access)?;
		let order = resolve_order(query.sort, query.sort_order, !filter.text.is_match_all());
		let window = Window {
			offset: u64::from(query.page - 1) * u64::from(page_size),
			limit: u64::from(page_size),
		};
		let total = self
			.store
			.count_matching_forces(&filter)
			.await
			.map_err(store_failure("search", Some(project_id), caller_id))?;
		let rows = self
			.store
			.fetch_matching_forces(&filter, order, Some(window))
			.await
			.map_err(store_failure("search", Some(project_id), caller_id))?;
		let clusters = self
			.store
			.list_clusters(project_id)
			.await
			.map_err(store_failure("search", Some(project_id), caller_id))?;
		let membership = cluster_membership(&clusters);
		let forces = rows
			.into_iter()
			.map(|force| {
				let cluster = membership.get(&force.force_id).cloned();

				ForceItem::new(force, cluster)
			})
			.collect();
		let facets = if query.include_facets {
			let candidates = self
				.store
				.fetch_matching_forces(&filter, order, None)
				.await
				.map_err(store_failure("search", Some(project_id), caller_id))?;

			Some(facets::aggregate(&candidates, self.facet_limits()))
		} else {
			None
		};
		let total = u64::try_from(total).unwrap_or(0);
		let total_pages = total.div_ceil(u64::from(page_size));
		let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

		tracing::debug!(
			effective_project_id = %project_id,
			caller_id = %caller_id,
			total,
			page = query.page,
			page_size,
			elapsed_ms,
			"Search completed."
		);

		Ok(SearchResponse {
			forces,
			total,
			page: query.page,
			page_size,
			total_pages,
			has_more: u64::from(query.page) < total_pages,
			facets,
			elapsed_ms,
			effective_project_id: project_id,
		})
	}

	/// Returns the effective page size.
	fn validate_search(&self, query: &SearchQuery) -> Result<u32> {
		if query.page == 0 {
			return Err(Error::InvalidRequest { message: "page must be 1 or greater.".to_string() });
		}

		let page_size = query.page_size.unwrap_or(self.cfg.search.default_page_size);

		if page_size == 0 {
			return Err(Error::InvalidRequest {
				message: "pageSize must be 1 or greater.".to_string(),
			});
		}

		for (field, value) in [("impactMin", query.impact_min), ("impactMax", query.impact_max)] {
			if let Some(value) = value
				&& !force::attribute_in_range(value)
			{
				return Err(Error::InvalidRequest {
					message: format!(
						"{field} must be between {} and {}.",
						force::ATTRIBUTE_MIN,
						force::ATTRIBUTE_MAX
					),
				});
			}
		}

		if let (Some(min), Some(max)) = (query.impact_min, query.impact_max)
			&& min > max
		{
			return Err(Error::InvalidRequest {
				message: "impactMin must not exceed impactMax.".to_string(),
			});
		}
		if let (Some(after), Some(before)) = (query.created_after, query.created_before)
			&& after > before
		{
			return Err(Error::InvalidRequest {
				message: "createdAfter must not be later than createdBefore.".to_string(),
			});
		}

		Ok(page_size.min(self.cfg.search.max_page_size))
	}
}

fn build_filter(project_id: Uuid, query: &SearchQuery, signal_access: bool) -> Result<ForceFilter> {
	let mut filter = ForceFilter::for_project(project_id);

	for raw in non_blank(&query.types) {
		let Some(force_type) = ForceType::parse(raw) else {
			return Err(Error::InvalidRequest { message: format!("Unknown force type {raw:?}.") });
		};
		let code = force_type.code().to_string();

		if !filter.types.contains(&code) {
			filter.types.push(code);
		}
	}

	// Visibility restriction: callers cannot lift it through the types filter.
	if !signal_access || filter.types.is_empty() {
		filter.exclude_types.push(SIGNAL_TYPE.to_string());
	}

	for raw in non_blank(&query.category) {
		let Some(category) = force::normalize_steep_category(raw) else {
			return Err(Error::InvalidRequest {
				message: format!("Unknown STEEP category {raw:?}."),
			});
		};

		filter.steep_categories.push(category.to_string());
	}

	filter.sentiments = non_blank(&query.sentiments).map(str::to_string).collect();
	filter.horizons = non_blank(&query.horizons).map(str::to_string).collect();
	filter.tags = non_blank(&query.tags).map(str::to_string).collect();
	filter.source_contains = query
		.source
		.as_deref()
		.map(str::trim)
		.filter(|source| !source.is_empty())
		.map(str::to_string);
	filter.impact_min = query.impact_min;
	filter.impact_max = query.impact_max;
	filter.created_after = query.created_after;
	filter.created_before = query.created_before;
	filter.ids = query.ids.clone();
	filter.text = TextQuery::parse(query.q.as_deref().unwrap_or_default());

	Ok(filter)
}

fn resolve_order(sort: SortKey, order: SortOrder, has_text: bool) -> ForceOrder {
	let direction = match order {
		SortOrder::Asc => SortDirection::Asc,
		SortOrder::Desc => SortDirection::Desc,
	};

	match sort {
		SortKey::Relevance if has_text => ForceOrder::new(SortField::UpdatedAt, SortDirection::Desc),
		SortKey::Relevance => ForceOrder::new(SortField::CreatedAt, SortDirection::Desc),
		SortKey::Impact => ForceOrder::new(SortField::Impact, direction),
		SortKey::CreatedAt => ForceOrder::new(SortField::CreatedAt, direction),
		SortKey::UpdatedAt => ForceOrder::new(SortField::UpdatedAt, direction),
		SortKey::Title => ForceOrder::new(SortField::Title, direction),
	}
}

/// Scans member lists in cluster order; a force listed twice keeps its first cluster.
fn cluster_membership(clusters: &[Cluster]) -> HashMap<Uuid, ClusterRef> {
	let mut membership = HashMap::new();

	for cluster in clusters {
		for force_id in &cluster.member_ids {
			membership.entry(*force_id).or_insert_with(|| ClusterRef {
				cluster_id: cluster.cluster_id,
				label: cluster.label.clone(),
			});
		}
	}

	membership
}

fn non_blank(values: &[String]) -> impl Iterator<Item = &str> {
	values.iter().map(|value| value.trim()).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn relevance_depends_on_text_presence() {
		assert_eq!(
			resolve_order(SortKey::Relevance, SortOrder::Asc, true),
			ForceOrder::new(SortField::UpdatedAt, SortDirection::Desc)
		);
		assert_eq!(
			resolve_order(SortKey::Relevance, SortOrder::Asc, false),
			ForceOrder::new(SortField::CreatedAt, SortDirection::Desc)
		);
		assert_eq!(
			resolve_order(SortKey::Title, SortOrder::Asc, true),
			ForceOrder::new(SortField::Title, SortDirection::Asc)
		);
	}

	#[test]
	fn signals_stay_hidden_without_signal_access() {
		let query = SearchQuery { types: vec!["S".to_string()], ..SearchQuery::default() };
		let filter = build_filter(Uuid::nil(), &query, false).unwrap();

		assert_eq!(filter.types, vec!["S".to_string()]);
		assert_eq!(filter.exclude_types, vec!["S".to_string()]);
	}

	#[test]
	fn signals_are_opt_in_with_signal_access() {
		let default_query = SearchQuery::default();
		let hidden = build_filter(Uuid::nil(), &default_query, true).unwrap();

		assert_eq!(hidden.exclude_types, vec!["S".to_string()]);

		let query = SearchQuery { types: vec!["signals".to_string()], ..SearchQuery::default() };
		let visible = build_filter(Uuid::nil(), &query, true).unwrap();

		assert!(visible.exclude_types.is_empty());
		assert_eq!(visible.types, vec!["S".to_string()]);
	}

	#[test]
	fn unknown_categories_are_rejected() {
		let query = SearchQuery { category: vec!["Legal".to_string()], ..SearchQuery::default() };
		let err = build_filter(Uuid::nil(), &query, true).unwrap_err();

		assert_eq!(err.code(), "INVALID_REQUEST");
	}

	#[test]
	fn first_cluster_wins_membership() {
		let force_id = Uuid::new_v4();
		let cluster = |label: &str| Cluster {
			cluster_id: Uuid::new_v4(),
			project_id: Uuid::nil(),
			label: label.to_string(),
			method: "manual".to_string(),
			member_ids: vec![force_id],
			quality: serde_json::Value::Null,
			created_at: OffsetDateTime::UNIX_EPOCH,
		};
		let clusters = vec![cluster("Energy"), cluster("Mobility")];
		let membership = cluster_membership(&clusters);

		assert_eq!(membership.get(&force_id).map(|item| item.label.as_str()), Some("Energy"));
	}

	#[test]
	fn query_defaults_follow_the_wire_contract() {
		let query: SearchQuery = serde_json::from_str(r#"{"q":"energy","sortOrder":"asc"}"#).unwrap();

		assert_eq!(query.page, 1);
		assert!(query.include_facets);
		assert_eq!(query.sort, SortKey::Relevance);
		assert_eq!(query.sort_order, SortOrder::Asc);
		assert_eq!(query.page_size, None);
	}

	#[test]
	fn created_bounds_accept_offsets_and_blanks() {
		let query: SearchQuery = serde_json::from_str(
			r#"{"createdAfter":"2026-03-01T02:00:00+02:00","createdBefore":"  "}"#,
		)
		.unwrap();

		assert_eq!(query.created_after, Some(time::macros::datetime!(2026-03-01 00:00 UTC)));
		assert_eq!(query.created_before, None);

		let err = serde_json::from_str::<SearchQuery>(r#"{"createdAfter":"yesterday"}"#)
			.unwrap_err()
			.to_string();

		assert!(err.contains("RFC 3339"), "{err}");
	}
}
