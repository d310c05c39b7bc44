use serde::{Deserialize, Serialize};

pub const SIGNAL_TYPE: &str = "S";

pub const STEEP_CATEGORIES: [&str; 6] =
	["Social", "Technological", "Economic", "Environmental", "Political", "Values"];

pub const ATTRIBUTE_MIN: f64 = 1.0;
pub const ATTRIBUTE_MAX: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForceType {
	#[serde(rename = "M")]
	Megatrend,
	#[serde(rename = "T")]
	Trend,
	#[serde(rename = "WS")]
	WeakSignal,
	#[serde(rename = "WC")]
	Wildcard,
	#[serde(rename = "S")]
	Signal,
}
impl ForceType {
	pub const ALL: [Self; 5] =
		[Self::Megatrend, Self::Trend, Self::WeakSignal, Self::Wildcard, Self::Signal];

	pub fn code(&self) -> &'static str {
		match self {
			Self::Megatrend => "M",
			Self::Trend => "T",
			Self::WeakSignal => "WS",
			Self::Wildcard => "WC",
			Self::Signal => SIGNAL_TYPE,
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			Self::Megatrend => "Megatrends",
			Self::Trend => "Trends",
			Self::WeakSignal => "Weak Signals",
			Self::Wildcard => "Wildcards",
			Self::Signal => "Signals",
		}
	}

	/// Accepts either the short code or the display label, ignoring case.
	pub fn parse(raw: &str) -> Option<Self> {
		let raw = raw.trim();

		Self::ALL.into_iter().find(|ty| {
			ty.code().eq_ignore_ascii_case(raw) || ty.label().eq_ignore_ascii_case(raw)
		})
	}

	pub fn is_curated(&self) -> bool {
		!matches!(self, Self::Signal)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactRange {
	Low,
	Medium,
	High,
	Critical,
}
impl ImpactRange {
	pub const ALL: [Self; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

	pub fn label(&self) -> &'static str {
		match self {
			Self::Low => "1-3",
			Self::Medium => "4-6",
			Self::High => "7-8",
			Self::Critical => "9-10",
		}
	}

	pub fn from_impact(impact: f64) -> Self {
		if impact < 4.0 {
			Self::Low
		} else if impact < 7.0 {
			Self::Medium
		} else if impact < 9.0 {
			Self::High
		} else {
			Self::Critical
		}
	}
}

pub fn attribute_in_range(value: f64) -> bool {
	value.is_finite() && (ATTRIBUTE_MIN..=ATTRIBUTE_MAX).contains(&value)
}

pub fn normalize_steep_category(raw: &str) -> Option<&'static str> {
	let raw = raw.trim();

	STEEP_CATEGORIES.into_iter().find(|category| category.eq_ignore_ascii_case(raw))
}
