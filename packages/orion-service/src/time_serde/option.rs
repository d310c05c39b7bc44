//! Optional timestamps. `null`, a missing field, and a blank string all read as `None`.

use serde::{Deserialize as _, Deserializer, Serializer, de};
use time::OffsetDateTime;

pub fn serialize<S>(value: &Option<OffsetDateTime>, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	match value {
		Some(value) => super::serialize(value, serializer),
		None => serializer.serialize_none(),
	}
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
	D: Deserializer<'de>,
{
	match Option::<String>::deserialize(deserializer)? {
		Some(raw) if !raw.trim().is_empty() =>
			super::parse_timestamp(&raw).map(Some).map_err(de::Error::custom),
		_ => Ok(None),
	}
}
