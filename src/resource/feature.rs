//! Jaqpot feature support.

use serde::{Deserialize, Serialize};

use super::id::*;
use super::{MetaInfo, Resource};
use crate::serde_types::null_as_default;

/// A feature: a named variable which models consume or predict.
#[derive(Clone, Debug, Default, Deserialize, Resource, Serialize)]
#[api_name = "feature"]
#[serde(default, rename_all = "camelCase")]
pub struct Feature {
    /// Descriptive metadata.
    #[serde(deserialize_with = "null_as_default")]
    pub meta: MetaInfo,

    /// Ontological classes of this feature.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub ontological_classes: Vec<String>,

    /// Is this feature visible to other users?
    #[serde(deserialize_with = "null_as_default")]
    pub visible: bool,

    /// Is this feature temporary?
    #[serde(deserialize_with = "null_as_default")]
    pub temporary: bool,

    /// Is this feature featured?
    #[serde(deserialize_with = "null_as_default")]
    pub featured: bool,

    /// The units in which values of this feature are measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    /// The model this feature is a prediction of, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub predictor_for: Option<String>,

    /// For nominal features, the permitted values.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub admissible_values: Vec<String>,

    /// The full identifier of this feature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The short ID of this feature.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub slash_id: Option<Id<Feature>>,
}

#[test]
fn parses_feature() {
    let json = r#"{
        "_id": "f1",
        "meta": { "titles": ["temperature"] },
        "units": "K",
        "admissibleValues": [],
        "someFutureField": 3
    }"#;
    let feature: Feature = serde_json::from_str(json).unwrap();
    assert_eq!(feature.slash_id.as_ref().unwrap().as_str(), "f1");
    assert_eq!(feature.meta().titles, vec!["temperature".to_owned()]);
    assert_eq!(feature.units.as_deref(), Some("K"));
    assert_eq!(Feature::api_name(), "feature");
}

#[test]
fn null_fields_decode_as_empty() {
    let json = r#"{
        "_id": "f1",
        "meta": null,
        "visible": null,
        "ontologicalClasses": null,
        "admissibleValues": null
    }"#;
    let feature: Feature = serde_json::from_str(json).unwrap();
    assert!(feature.meta.is_empty());
    assert!(!feature.visible);
    assert!(feature.admissible_values.is_empty());
}
