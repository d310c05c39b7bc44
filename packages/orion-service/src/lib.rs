pub mod policy;
pub mod project;
pub mod search;
pub mod time_serde;

mod error;

pub use error::{Error, Result};
pub use policy::{AiUsage, AiUsageStatus, UserCapabilities};
pub use project::{InvariantReport, NewForce, ProjectSummary};
pub use search::{ClusterRef, ForceItem, SearchQuery, SearchResponse, SortKey, SortOrder};

use std::sync::Arc;

use uuid::Uuid;

use orion_config::Config;
use orion_domain::{facets::FacetLimits, tier::TierTable};
use orion_storage::{EntityStore, db::Db};

pub struct OrionService {
	pub cfg: Config,
	pub tiers: TierTable,
	pub store: Arc<dyn EntityStore>,
}
impl OrionService {
	pub fn new(cfg: Config, store: Arc<dyn EntityStore>) -> Self {
		let tiers = TierTable::from_config(&cfg.tiers);

		Self { cfg, tiers, store }
	}

	/// Connects to Postgres and bootstraps the schema.
	pub async fn connect(cfg: Config) -> Result<Self> {
		let db = Db::connect(&cfg.storage.postgres).await?;

		db.ensure_schema().await?;

		Ok(Self::new(cfg, Arc::new(db)))
	}

	/// Runs the default-project repair when `projects.repair_on_startup` is set.
	pub async fn startup(&self) -> Result<Option<InvariantReport>> {
		if !self.cfg.projects.repair_on_startup {
			return Ok(None);
		}

		self.ensure_default_project_invariant().await.map(Some)
	}

	pub(crate) fn facet_limits(&self) -> FacetLimits {
		FacetLimits {
			top_sources: self.cfg.search.top_sources,
			top_tags: self.cfg.search.top_tags,
		}
	}
}

/// Logs a store failure with its request context and converts it.
pub(crate) fn store_failure(
	operation: &'static str,
	project_id: Option<Uuid>,
	caller_id: Uuid,
) -> impl FnOnce(orion_storage::Error) -> Error {
	move |err| {
		tracing::error!(
			operation,
			project_id = ?project_id,
			caller_id = %caller_id,
			error = %err,
			"Entity store call failed."
		);

		Error::from(err)
	}
}
