//! Serde helpers shared by our resource types.

use serde::{Deserialize, Deserializer};
use std::result;

/// Deserialize a field which Jaqpot may send as `null`, treating `null`
/// like a missing value. Use with `#[serde(default)]` so absent fields
/// work too.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[test]
fn null_becomes_default() {
    #[derive(Deserialize)]
    struct Example {
        #[serde(default, deserialize_with = "null_as_default")]
        count: u32,
        #[serde(default, deserialize_with = "null_as_default")]
        names: Vec<String>,
    }

    let example: Example = serde_json::from_str(r#"{"count": null, "names": null}"#).unwrap();
    assert_eq!(example.count, 0);
    assert!(example.names.is_empty());

    let example: Example = serde_json::from_str(r#"{"count": 3}"#).unwrap();
    assert_eq!(example.count, 3);
    assert!(example.names.is_empty());
}
