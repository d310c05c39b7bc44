//! Facet counts over an already-filtered candidate set.
//!
//! Facets are self-referential: they describe exactly the rows the current filter selects, so a
//! selected value narrows every other facet as well.

use std::collections::{HashMap, HashSet};

use serde::{Serialize, Serializer};

use crate::force::ImpactRange;

pub trait FacetSource {
	fn force_type(&self) -> &str;

	fn steep_category(&self) -> Option<&str>;

	fn sentiment(&self) -> Option<&str>;

	fn impact(&self) -> Option<f64>;

	fn horizon(&self) -> Option<&str>;

	fn source(&self) -> Option<&str>;

	fn tags(&self) -> &[String];
}

#[derive(Debug, Clone, Copy)]
pub struct FacetLimits {
	pub top_sources: usize,
	pub top_tags: usize,
}
impl Default for FacetLimits {
	fn default() -> Self {
		Self { top_sources: 10, top_tags: 20 }
	}
}

/// Ordered label counts. Serializes as a JSON object whose keys keep this order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetMap(Vec<(String, u64)>);
impl FacetMap {
	pub fn get(&self, label: &str) -> Option<u64> {
		self.0.iter().find(|(key, _)| key == label).map(|(_, count)| *count)
	}

	pub fn labels(&self) -> Vec<&str> {
		self.0.iter().map(|(label, _)| label.as_str()).collect()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
		self.0.iter().map(|(label, count)| (label.as_str(), *count))
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn total(&self) -> u64 {
		self.0.iter().map(|(_, count)| count).sum()
	}
}
impl Serialize for FacetMap {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_map(self.0.iter().map(|(label, count)| (label, count)))
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetCounts {
	pub types: FacetMap,
	pub steep_categories: FacetMap,
	pub sentiments: FacetMap,
	pub impact_ranges: FacetMap,
	pub horizons: FacetMap,
	pub sources: FacetMap,
	pub tags: FacetMap,
}

/// Counts in first-seen order; sorting is stable so ties keep that order.
#[derive(Default)]
struct Tally {
	entries: Vec<(String, u64)>,
	index: HashMap<String, usize>,
}
impl Tally {
	fn add(&mut self, label: &str) {
		let label = label.trim();

		if label.is_empty() {
			return;
		}

		match self.index.get(label) {
			Some(&slot) => self.entries[slot].1 += 1,
			None => {
				self.index.insert(label.to_string(), self.entries.len());
				self.entries.push((label.to_string(), 1));
			},
		}
	}

	fn ranked(mut self, limit: Option<usize>) -> FacetMap {
		self.entries.sort_by(|a, b| b.1.cmp(&a.1));

		if let Some(limit) = limit {
			self.entries.truncate(limit);
		}

		FacetMap(self.entries)
	}
}

pub fn aggregate<F>(rows: &[F], limits: FacetLimits) -> FacetCounts
where
	F: FacetSource,
{
	let mut types = Tally::default();
	let mut steep_categories = Tally::default();
	let mut sentiments = Tally::default();
	let mut horizons = Tally::default();
	let mut sources = Tally::default();
	let mut tags = Tally::default();
	let mut impact_ranges = [0_u64; 4];

	for row in rows {
		types.add(row.force_type());

		if let Some(category) = row.steep_category() {
			steep_categories.add(category);
		}
		if let Some(sentiment) = row.sentiment() {
			sentiments.add(sentiment);
		}
		if let Some(horizon) = row.horizon() {
			horizons.add(horizon);
		}
		if let Some(source) = row.source() {
			sources.add(source);
		}
		if let Some(impact) = row.impact() {
			let bucket = ImpactRange::from_impact(impact);

			if let Some(slot) = ImpactRange::ALL.iter().position(|range| *range == bucket) {
				impact_ranges[slot] += 1;
			}
		}

		let mut seen = HashSet::new();

		for tag in row.tags() {
			if seen.insert(tag.trim()) {
				tags.add(tag);
			}
		}
	}

	FacetCounts {
		types: types.ranked(None),
		steep_categories: steep_categories.ranked(None),
		sentiments: sentiments.ranked(None),
		impact_ranges: FacetMap(
			ImpactRange::ALL
				.iter()
				.zip(impact_ranges)
				.map(|(range, count)| (range.label().to_string(), count))
				.collect(),
		),
		horizons: horizons.ranked(None),
		sources: sources.ranked(Some(limits.top_sources)),
		tags: tags.ranked(Some(limits.top_tags)),
	}
}
