//! Free-text query grammar for force titles and bodies.
//!
//! The grammar is intentionally flat. Exactly one branch applies per query, checked in this
//! order:
//!
//! 1. `*` or blank: match everything.
//! 2. ` OR ` outside quotes: any term matches.
//! 3. ` AND ` outside quotes: every term matches.
//! 4. Double-quoted phrases: any phrase matches.
//! 5. Otherwise the whole query is one substring.
//!
//! Queries that combine operators take the first applicable branch only; there is no expression
//! tree. Matching is case-insensitive and unanchored, without tokenization or stemming.

use regex::Regex;
use serde::Serialize;

const OR_TOKEN: &str = " OR ";
const AND_TOKEN: &str = " AND ";
const PHRASE_PATTERN: &str = r#""([^"]+)""#;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "terms", rename_all = "snake_case")]
pub enum TextQuery {
	MatchAll,
	/// At least one term occurs in the title or body.
	Any(Vec<String>),
	/// Every term occurs in the title or body, each independently.
	All(Vec<String>),
}
impl TextQuery {
	pub fn parse(raw: &str) -> Self {
		let trimmed = raw.trim();

		if trimmed.is_empty() || trimmed == "*" {
			return Self::MatchAll;
		}
		if let Some(parts) = split_outside_quotes(trimmed, OR_TOKEN) {
			return Self::from_terms(parts, Self::Any);
		}
		if let Some(parts) = split_outside_quotes(trimmed, AND_TOKEN) {
			return Self::from_terms(parts, Self::All);
		}
		if trimmed.contains('"') {
			let phrases = extract_phrases(trimmed);

			if !phrases.is_empty() {
				return Self::from_terms(phrases, Self::Any);
			}

			return Self::from_terms(vec![trimmed.replace('"', "")], Self::Any);
		}

		Self::from_terms(vec![trimmed.to_string()], Self::Any)
	}

	pub fn is_match_all(&self) -> bool {
		matches!(self, Self::MatchAll)
	}

	/// Lowercased terms; empty for [`TextQuery::MatchAll`].
	pub fn terms(&self) -> &[String] {
		match self {
			Self::MatchAll => &[],
			Self::Any(terms) | Self::All(terms) => terms.as_slice(),
		}
	}

	pub fn matches(&self, title: &str, body: &str) -> bool {
		let terms = match self {
			Self::MatchAll => return true,
			Self::Any(terms) | Self::All(terms) => terms,
		};
		let title = title.to_lowercase();
		let body = body.to_lowercase();
		let hit = |term: &String| title.contains(term.as_str()) || body.contains(term.as_str());

		match self {
			Self::All(_) => terms.iter().all(hit),
			_ => terms.iter().any(hit),
		}
	}

	fn from_terms<S>(parts: Vec<S>, build: fn(Vec<String>) -> Self) -> Self
	where
		S: AsRef<str>,
	{
		let terms: Vec<String> =
			parts.iter().filter_map(|part| normalize_term(part.as_ref())).collect();

		if terms.is_empty() { Self::MatchAll } else { build(terms) }
	}
}

/// Splits on `token` wherever it appears outside double quotes. Returns `None` when the token
/// never occurs outside quotes.
fn split_outside_quotes<'a>(raw: &'a str, token: &str) -> Option<Vec<&'a str>> {
	let mut parts = Vec::new();
	let mut in_quotes = false;
	let mut start = 0;
	let mut skip_until = 0;

	for (idx, ch) in raw.char_indices() {
		if idx < skip_until {
			continue;
		}
		if ch == '"' {
			in_quotes = !in_quotes;

			continue;
		}
		if !in_quotes && raw[idx..].starts_with(token) {
			parts.push(&raw[start..idx]);

			start = idx + token.len();
			skip_until = start;
		}
	}

	if parts.is_empty() {
		return None;
	}

	parts.push(&raw[start..]);

	Some(parts)
}

fn extract_phrases(raw: &str) -> Vec<String> {
	Regex::new(PHRASE_PATTERN)
		.map(|re| re.captures_iter(raw).map(|caps| caps[1].to_string()).collect())
		.unwrap_or_default()
}

fn normalize_term(raw: &str) -> Option<String> {
	let term = raw.trim().trim_matches('"').trim();

	if term.is_empty() { None } else { Some(term.to_lowercase()) }
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_only_outside_quotes() {
		assert_eq!(
			split_outside_quotes(r#""war OR peace" OR famine"#, OR_TOKEN),
			Some(vec![r#""war OR peace""#, "famine"])
		);
		assert_eq!(split_outside_quotes(r#""war OR peace""#, OR_TOKEN), None);
	}

	#[test]
	fn trailing_operator_drops_empty_terms() {
		assert_eq!(
			TextQuery::parse(r#"energy OR """#),
			TextQuery::Any(vec!["energy".to_string()])
		);
		assert_eq!(TextQuery::parse(r#""" OR """#), TextQuery::MatchAll);
	}

	#[test]
	fn unbalanced_quote_falls_back_to_plain_substring() {
		assert_eq!(
			TextQuery::parse(r#""open source"#),
			TextQuery::Any(vec!["open source".to_string()])
		);
	}
}
