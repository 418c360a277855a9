//! Shared JSON decoding helpers for request bodies.

use serde::{Deserialize, Deserializer};

/// Deserialize a field, reading an explicit `null` as the type's default.
///
/// Pair with `#[serde(default)]` so that missing and `null` fields behave
/// the same.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Form {
        #[serde(deserialize_with = "null_as_default")]
        name: String,
        #[serde(deserialize_with = "null_as_default")]
        tags: BTreeMap<String, String>,
        #[serde(deserialize_with = "null_as_default")]
        count: i64,
    }

    #[test]
    fn test_null_reads_as_default() {
        let form: Form = serde_json::from_str(r#"{"name":null,"tags":null,"count":null}"#).unwrap();
        assert_eq!(form.name, "");
        assert!(form.tags.is_empty());
        assert_eq!(form.count, 0);
    }

    #[test]
    fn test_values_and_missing_fields() {
        let form: Form = serde_json::from_str(r#"{"name":"a","tags":{"k":"v"}}"#).unwrap();
        assert_eq!(form.name, "a");
        assert_eq!(form.tags["k"], "v");
        assert_eq!(form.count, 0);
    }

    #[test]
    fn test_wrong_type_is_still_an_error() {
        assert!(serde_json::from_str::<Form>(r#"{"tags":"nope"}"#).is_err());
    }
}
