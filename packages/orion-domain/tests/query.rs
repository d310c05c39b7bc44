use orion_domain::query::TextQuery;

#[test]
fn blank_and_star_match_everything() {
	assert!(TextQuery::parse("").is_match_all());
	assert!(TextQuery::parse("   ").is_match_all());
	assert!(TextQuery::parse("*").is_match_all());
	assert!(TextQuery::parse("*").matches("anything", ""));
}

#[test]
fn quoted_phrase_requires_contiguous_text() {
	let query = TextQuery::parse(r#""artificial intelligence""#);

	assert!(query.matches("The Rise of Artificial Intelligence", ""));
	assert!(!query.matches("Artificial or Intelligence Separately", ""));
}

#[test]
fn multiple_phrases_are_disjunctive() {
	let query = TextQuery::parse(r#""quantum computing" "gene editing""#);

	assert_eq!(
		query,
		TextQuery::Any(vec!["quantum computing".to_string(), "gene editing".to_string()])
	);
	assert!(query.matches("", "Advances in gene editing"));
	assert!(query.matches("Quantum computing at scale", ""));
	assert!(!query.matches("Quantum editing", "gene computing"));
}

#[test]
fn or_matches_either_term() {
	let query = TextQuery::parse("AI OR blockchain");

	assert!(query.matches("AI in healthcare", ""));
	assert!(query.matches("", "Blockchain supply chains"));
	assert!(!query.matches("Ocean acidification", "coral reefs"));
}

#[test]
fn and_requires_every_term() {
	let query = TextQuery::parse("AI AND blockchain");

	assert!(query.matches("AI meets blockchain", ""));
	assert!(query.matches("AI governance", "on the blockchain"));
	assert!(!query.matches("AI governance", "regulation"));
}

#[test]
fn or_takes_precedence_over_and() {
	let query = TextQuery::parse("water AND energy OR food");

	assert_eq!(query, TextQuery::Any(vec!["water and energy".to_string(), "food".to_string()]));
	assert!(query.matches("Food security", ""));
	assert!(!query.matches("Water", "energy"));
}

#[test]
fn operators_inside_quotes_are_literal() {
	let query = TextQuery::parse(r#""research AND development""#);

	assert_eq!(query, TextQuery::Any(vec!["research and development".to_string()]));
	assert!(query.matches("Corporate Research and Development spend", ""));
	assert!(!query.matches("Research", "development"));
}

#[test]
fn lowercase_operators_are_plain_text() {
	let query = TextQuery::parse("ai or blockchain");

	assert_eq!(query, TextQuery::Any(vec!["ai or blockchain".to_string()]));
}

#[test]
fn plain_text_is_one_case_insensitive_substring() {
	let query = TextQuery::parse("  Urban MOBILITY ");

	assert_eq!(query.terms(), ["urban mobility".to_string()]);
	assert!(query.matches("Future of urban mobility", ""));
	assert!(query.matches("", "suburban mobility patterns"));
	assert!(!query.matches("Urban farming", "mobility"));
}
