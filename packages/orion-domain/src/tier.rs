use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use orion_config::{Feature, TierCapabilities, Tiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
	Basic,
	Pro,
	Enterprise,
}
impl Tier {
	/// Ascending order; minimum-tier lookups scan in this order.
	pub const ALL: [Self; 3] = [Self::Basic, Self::Pro, Self::Enterprise];

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Basic => "basic",
			Self::Pro => "pro",
			Self::Enterprise => "enterprise",
		}
	}

	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|tier| tier.as_str().eq_ignore_ascii_case(raw))
	}
}
impl fmt::Display for Tier {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
	Projects,
	Forces,
	AiQueries,
}
impl Resource {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Projects => "projects",
			Self::Forces => "forces",
			Self::AiQueries => "ai_queries",
		}
	}
}
impl fmt::Display for Resource {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ceiling {
	Unlimited,
	Limited(u64),
}
impl Ceiling {
	/// `-1` (or any negative value) is the unlimited marker.
	pub fn from_raw(raw: i64) -> Self {
		u64::try_from(raw).map(Self::Limited).unwrap_or(Self::Unlimited)
	}

	pub fn as_raw(&self) -> i64 {
		match self {
			Self::Unlimited => -1,
			Self::Limited(limit) => i64::try_from(*limit).unwrap_or(i64::MAX),
		}
	}

	/// Whether a usage level of `needed` fits under this ceiling.
	pub fn accommodates(&self, needed: u64) -> bool {
		match self {
			Self::Unlimited => true,
			Self::Limited(limit) => needed <= *limit,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CapabilitySet {
	pub features: BTreeSet<Feature>,
	pub max_projects: i64,
	pub max_forces: i64,
	pub max_ai_queries_per_month: i64,
}
impl CapabilitySet {
	pub fn grants(&self, feature: Feature) -> bool {
		self.features.contains(&feature)
	}

	pub fn ceiling(&self, resource: Resource) -> Ceiling {
		Ceiling::from_raw(match resource {
			Resource::Projects => self.max_projects,
			Resource::Forces => self.max_forces,
			Resource::AiQueries => self.max_ai_queries_per_month,
		})
	}
}
impl From<&TierCapabilities> for CapabilitySet {
	fn from(caps: &TierCapabilities) -> Self {
		Self {
			features: caps.features.iter().copied().collect(),
			max_projects: caps.max_projects,
			max_forces: caps.max_forces,
			max_ai_queries_per_month: caps.max_ai_queries_per_month,
		}
	}
}

/// Tier to capability mapping built once from static configuration.
#[derive(Debug, Clone)]
pub struct TierTable {
	basic: CapabilitySet,
	pro: CapabilitySet,
	enterprise: CapabilitySet,
}
impl TierTable {
	pub fn from_config(tiers: &Tiers) -> Self {
		Self {
			basic: CapabilitySet::from(&tiers.basic),
			pro: CapabilitySet::from(&tiers.pro),
			enterprise: CapabilitySet::from(&tiers.enterprise),
		}
	}

	pub fn capabilities(&self, tier: Tier) -> &CapabilitySet {
		match tier {
			Tier::Basic => &self.basic,
			Tier::Pro => &self.pro,
			Tier::Enterprise => &self.enterprise,
		}
	}

	pub fn min_tier_with_feature(&self, feature: Feature) -> Option<Tier> {
		Tier::ALL.into_iter().find(|tier| self.capabilities(*tier).grants(feature))
	}

	pub fn min_tier_accommodating(&self, resource: Resource, needed: u64) -> Option<Tier> {
		Tier::ALL
			.into_iter()
			.find(|tier| self.capabilities(*tier).ceiling(resource).accommodates(needed))
	}
}

pub fn is_active_subscription(status: &str) -> bool {
	matches!(status.trim().to_ascii_lowercase().as_str(), "active" | "trialing")
}
