use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

use orion_domain::facets::FacetSource;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Project {
	pub project_id: Uuid,
	/// `None` for the shared default catalog.
	pub owner_id: Option<Uuid>,
	pub name: String,
	pub is_default: bool,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Force {
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
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
impl FacetSource for Force {
	fn force_type(&self) -> &str {
		self.force_type.as_str()
	}

	fn steep_category(&self) -> Option<&str> {
		self.steep_category.as_deref()
	}

	fn sentiment(&self) -> Option<&str> {
		self.sentiment.as_deref()
	}

	fn impact(&self) -> Option<f64> {
		self.impact
	}

	fn horizon(&self) -> Option<&str> {
		self.horizon.as_deref()
	}

	fn source(&self) -> Option<&str> {
		self.source.as_deref()
	}

	fn tags(&self) -> &[String] {
		self.tags.as_slice()
	}
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Cluster {
	pub cluster_id: Uuid,
	pub project_id: Uuid,
	pub label: String,
	pub method: String,
	/// Ordered member force ids. Membership is joined at read time by scanning these lists.
	pub member_ids: Vec<Uuid>,
	pub quality: Value,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserAccount {
	pub user_id: Uuid,
	pub subscription_tier: String,
	pub subscription_status: String,
	pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UsageCounter {
	pub user_id: Uuid,
	/// Calendar month in UTC, formatted `YYYY-MM`.
	pub period: String,
	pub count: i64,
	pub reset_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}
