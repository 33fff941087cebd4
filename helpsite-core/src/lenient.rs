//! Deserializers for upstream identifiers.
//!
//! The KM API is not consistent about numeric fields: the same id may arrive
//! as `42` or `"42"` depending on the endpoint.

use serde::{de, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Str(String),
}

impl RawId {
    fn into_i64<E: de::Error>(self) -> Result<i64, E> {
        match self {
            RawId::Int(value) => Ok(value),
            RawId::Str(value) => value
                .trim()
                .parse()
                .map_err(|_| E::custom(format!("invalid numeric id: {:?}", value))),
        }
    }
}

/// Deserialize an id given either as a number or a numeric string.
pub fn id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    RawId::deserialize(deserializer)?.into_i64()
}

/// Deserialize a list of ids, each given either as a number or a numeric string.
pub fn ids<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<RawId>::deserialize(deserializer)?
        .into_iter()
        .map(RawId::into_i64)
        .collect()
}
