//! RFC 3339 timestamps on the wire. Values are always emitted in UTC; inputs may carry any
//! offset and surrounding whitespace.

pub mod option;

use serde::{Deserialize, Deserializer, Serializer, de, ser};
use time::{OffsetDateTime, UtcOffset, format_description::well_known::Rfc3339};

pub fn serialize<S>(value: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	let formatted = format_timestamp(*value).map_err(ser::Error::custom)?;

	serializer.serialize_str(&formatted)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
	D: Deserializer<'de>,
{
	let raw = String::deserialize(deserializer)?;

	parse_timestamp(&raw).map_err(de::Error::custom)
}

pub(crate) fn format_timestamp(value: OffsetDateTime) -> Result<String, String> {
	value
		.to_offset(UtcOffset::UTC)
		.format(&Rfc3339)
		.map_err(|err| format!("Timestamp {value} cannot be rendered as RFC 3339: {err}."))
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, String> {
	let trimmed = raw.trim();

	OffsetDateTime::parse(trimmed, &Rfc3339).map_err(|err| {
		format!("Expected an RFC 3339 timestamp such as 2026-01-31T09:30:00Z, got {trimmed:?}: {err}.")
	})
}

#[cfg(test)]
mod tests {
	use time::macros::datetime;

	use super::*;

	#[test]
	fn timestamps_render_in_utc() {
		assert_eq!(
			format_timestamp(datetime!(2026-03-01 02:30 +02:00)).unwrap(),
			"2026-03-01T00:30:00Z"
		);
	}

	#[test]
	fn parse_errors_name_the_expected_format() {
		assert_eq!(parse_timestamp(" 2026-03-01T00:30:00Z ").unwrap(), datetime!(2026-03-01 00:30 UTC));

		let err = parse_timestamp("March 1st").unwrap_err();

		assert!(err.contains("RFC 3339"), "{err}");
		assert!(err.contains("\"March 1st\""), "{err}");
	}
}
