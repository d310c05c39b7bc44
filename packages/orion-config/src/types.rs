use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	#[serde(default)]
	pub projects: Projects,
	#[serde(default)]
	pub search: Search,
	#[serde(default)]
	pub tiers: Tiers,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Projects {
	/// Name given to the shared default project when the repair pass has to create one.
	#[serde(default = "default_project_name")]
	pub default_project_name: String,
	#[serde(default = "default_true")]
	pub repair_on_startup: bool,
}
impl Default for Projects {
	fn default() -> Self {
		Self { default_project_name: default_project_name(), repair_on_startup: true }
	}
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_page_size")]
	pub default_page_size: u32,
	#[serde(default = "default_max_page_size")]
	pub max_page_size: u32,
	#[serde(default = "default_top_sources")]
	pub top_sources: usize,
	#[serde(default = "default_top_tags")]
	pub top_tags: usize,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			default_page_size: default_page_size(),
			max_page_size: default_max_page_size(),
			top_sources: default_top_sources(),
			top_tags: default_top_tags(),
		}
	}
}

/// Static capability sets, one per subscription tier in ascending order.
#[derive(Debug, Deserialize)]
pub struct Tiers {
	#[serde(default = "TierCapabilities::basic")]
	pub basic: TierCapabilities,
	#[serde(default = "TierCapabilities::pro")]
	pub pro: TierCapabilities,
	#[serde(default = "TierCapabilities::enterprise")]
	pub enterprise: TierCapabilities,
}
impl Default for Tiers {
	fn default() -> Self {
		Self {
			basic: TierCapabilities::basic(),
			pro: TierCapabilities::pro(),
			enterprise: TierCapabilities::enterprise(),
		}
	}
}

/// Ceilings use `-1` for unlimited.
#[derive(Debug, Clone, Deserialize)]
pub struct TierCapabilities {
	#[serde(default)]
	pub features: Vec<Feature>,
	pub max_projects: i64,
	pub max_forces: i64,
	pub max_ai_queries_per_month: i64,
}
impl TierCapabilities {
	pub fn basic() -> Self {
		Self {
			features: Vec::new(),
			max_projects: 3,
			max_forces: 6_000,
			max_ai_queries_per_month: 50,
		}
	}

	pub fn pro() -> Self {
		Self {
			features: vec![Feature::AdvancedAnalytics, Feature::SignalAccess, Feature::ReportExport],
			max_projects: 10,
			max_forces: 25_000,
			max_ai_queries_per_month: 500,
		}
	}

	pub fn enterprise() -> Self {
		Self {
			features: Feature::ALL.to_vec(),
			max_projects: -1,
			max_forces: -1,
			max_ai_queries_per_month: -1,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
	AdvancedAnalytics,
	ScanningAssistant,
	SignalAccess,
	ReportExport,
	CustomClustering,
}
impl Feature {
	pub const ALL: [Self; 5] = [
		Self::AdvancedAnalytics,
		Self::ScanningAssistant,
		Self::SignalAccess,
		Self::ReportExport,
		Self::CustomClustering,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::AdvancedAnalytics => "advanced_analytics",
			Self::ScanningAssistant => "scanning_assistant",
			Self::SignalAccess => "signal_access",
			Self::ReportExport => "report_export",
			Self::CustomClustering => "custom_clustering",
		}
	}
}
impl fmt::Display for Feature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

fn default_project_name() -> String {
	"Shared Catalog".to_string()
}

fn default_true() -> bool {
	true
}

fn default_page_size() -> u32 {
	50
}

fn default_max_page_size() -> u32 {
	1_000
}

fn default_top_sources() -> usize {
	10
}

fn default_top_tags() -> usize {
	20
}
