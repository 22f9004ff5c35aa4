//! Domain-of-applicability support.

use serde::{Deserialize, Serialize};

use super::{MetaInfo, Resource};
use crate::serde_types::null_as_default;

/// A model's domain of applicability: a precomputed matrix describing the
/// input space over which the model's predictions can be trusted.
#[derive(Clone, Debug, Default, Deserialize, Resource, Serialize)]
#[api_name = "doa"]
#[serde(default, rename_all = "camelCase")]
pub struct Doa {
    /// Descriptive metadata. `meta.has_sources` names the model.
    #[serde(deserialize_with = "null_as_default")]
    pub meta: MetaInfo,

    /// The model this DOA belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,

    /// The DOA matrix itself.
    #[serde(deserialize_with = "null_as_default")]
    pub doa_matrix: Vec<Vec<f32>>,

    /// The leverage threshold above which inputs fall outside the domain.
    #[serde(deserialize_with = "null_as_default")]
    pub a_value: f32,
}

#[test]
fn parses_doa() {
    let json = r#"{
        "meta": { "hasSources": ["model/m1"] },
        "modelId": "m1",
        "doaMatrix": [[1.0, 0.5], [0.5, 2.0]],
        "aValue": 0.75
    }"#;
    let doa: Doa = serde_json::from_str(json).unwrap();
    assert_eq!(doa.model_id.as_deref(), Some("m1"));
    assert_eq!(doa.doa_matrix.len(), 2);
    assert_eq!(doa.meta.has_sources, vec!["model/m1".to_owned()]);
    assert!((doa.a_value - 0.75).abs() < f32::EPSILON);
}

#[test]
fn null_fields_decode_as_empty() {
    let json = r#"{ "meta": null, "doaMatrix": null, "aValue": null }"#;
    let doa: Doa = serde_json::from_str(json).unwrap();
    assert!(doa.doa_matrix.is_empty());
    assert_eq!(doa.a_value, 0.0);
}
