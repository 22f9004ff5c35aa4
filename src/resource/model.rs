//! Jaqpot model support.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::id::*;
use super::{MetaInfo, Resource};
use crate::errors::*;
use crate::serde_types::null_as_default;

/// A model hosted by Jaqpot. Read-only from our point of view.
#[derive(Clone, Debug, Default, Deserialize, Resource, Serialize)]
#[api_name = "model"]
#[serde(default, rename_all = "camelCase")]
pub struct Model {
    /// Descriptive metadata.
    #[serde(deserialize_with = "null_as_default")]
    pub meta: MetaInfo,

    /// Ontological classes of this model.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub ontological_classes: Vec<String>,

    /// Is this model visible to other users?
    #[serde(deserialize_with = "null_as_default")]
    pub visible: bool,

    /// Is this model temporary?
    #[serde(deserialize_with = "null_as_default")]
    pub temporary: bool,

    /// Is this model featured?
    #[serde(deserialize_with = "null_as_default")]
    pub featured: bool,

    /// Features the model was trained to predict.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub dependent_features: Vec<String>,

    /// Feature URIs the model takes as input.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub independent_features: Vec<String>,

    /// Feature URIs the model produces.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub predicted_features: Vec<String>,

    /// A reliability score.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reliability: Option<f32>,

    /// The dataset used to train this model.
    #[serde(rename = "datasetUri", skip_serializing_if = "Option::is_none")]
    pub dataset_uri: Option<String>,

    /// Training parameters.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Value>,

    /// The algorithm used to train this model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algorithm: Option<Algorithm>,

    /// A bibliographic reference for this model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bibtex: Option<BibTex>,

    /// The serialized model. Opaque to us.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub actual_model: Value,

    /// A PMML representation of the model. Opaque to us.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub pmml_model: Value,

    /// Extra information. We only look at `independentFeatures`.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub additional_info: Value,

    /// PMML transformations applied before prediction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pmml_transformations: Option<String>,

    /// The DOA model attached to this model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doa_model: Option<String>,

    /// Transformation models applied before this one.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub transformation_models: Vec<String>,

    /// Models linked to this one.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub linked_models: Vec<String>,

    /// The full identifier of this model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// The short ID of this model.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub slash_id: Option<Id<Model>>,

    /// Has this model been moved to the trash?
    #[serde(deserialize_with = "null_as_default")]
    pub on_trash: bool,
}

impl Model {
    /// The model's declared input schema: a map from feature URI to display
    /// name, taken from `additionalInfo.independentFeatures`.
    ///
    /// The map is sorted by feature URI. Dataset columns are numbered in
    /// this order, so it must stay stable from call to call.
    pub fn independent_feature_names(&self) -> Result<BTreeMap<String, String>> {
        let features = self
            .additional_info
            .get("independentFeatures")
            .and_then(Value::as_object)
            .filter(|features| !features.is_empty())
            .ok_or_else(|| Error::NoIndependentFeatures {
                model: self.display_id(),
            })?;
        Ok(features
            .iter()
            .map(|(uri, name)| {
                let name = match name {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (uri.clone(), name)
            })
            .collect())
    }

    /// A name we can use for this model in error messages.
    pub(crate) fn display_id(&self) -> String {
        match (&self.slash_id, &self.id) {
            (Some(id), _) => id.to_string(),
            (None, Some(id)) => id.clone(),
            (None, None) => "(unknown)".to_owned(),
        }
    }
}

/// A page of models, along with the total number available.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct Models {
    /// The total number of models matching the query, from the `Total`
    /// response header.
    pub total: u64,

    /// The models on this page.
    pub models: Vec<Model>,
}

/// A training algorithm.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Algorithm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub meta: MetaInfo,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub ontological_classes: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub visible: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub temporary: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub featured: bool,
    /// The algorithm's parameters. Jaqpot keys these by position.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking: Option<i64>,
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub slash_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub training_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_service: Option<String>,
}

/// A parameter of a training algorithm.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Parameter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub allowed_values: Vec<Value>,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub min_value: Value,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub max_value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_array_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_array_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A bibliographic reference. All fields are free text.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BibTex {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bib_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub school: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crossref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(rename = "abstract", skip_serializing_if = "Option::is_none")]
    pub abstract_: Option<String>,
}

#[test]
fn independent_features_are_sorted_by_uri() {
    let json = r#"{
        "_id": "m1",
        "additionalInfo": {
            "independentFeatures": { "uri:b": "ph", "uri:a": "temp", "uri:c": 3 }
        }
    }"#;
    let model: Model = serde_json::from_str(json).unwrap();
    let features = model.independent_feature_names().unwrap();
    let pairs = features
        .iter()
        .map(|(uri, name)| (uri.as_str(), name.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(pairs, vec![("uri:a", "temp"), ("uri:b", "ph"), ("uri:c", "3")]);
}

#[test]
fn missing_independent_features_is_an_error() {
    for json in &[
        r#"{"_id": "m1"}"#,
        r#"{"_id": "m1", "additionalInfo": {}}"#,
        r#"{"_id": "m1", "additionalInfo": {"independentFeatures": {}}}"#,
        r#"{"_id": "m1", "additionalInfo": {"independentFeatures": ["uri:a"]}}"#,
    ] {
        let model: Model = serde_json::from_str(json).unwrap();
        match model.independent_feature_names() {
            Err(Error::NoIndependentFeatures { model }) => assert_eq!(model, "m1"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

#[test]
fn null_fields_decode_as_empty() {
    let json = r#"{
        "_id": "m1",
        "parameters": null,
        "visible": null,
        "onTrash": null,
        "independentFeatures": null,
        "algorithm": { "parameters": null, "meta": { "titles": null } },
        "additionalInfo": {
            "independentFeatures": { "uri:a": "temp" }
        }
    }"#;
    let model: Model = serde_json::from_str(json).unwrap();
    assert!(model.parameters.is_empty());
    assert!(model.independent_features.is_empty());
    let algorithm = model.algorithm.as_ref().unwrap();
    assert!(algorithm.parameters.is_empty());
    assert!(algorithm.meta.titles.is_empty());
    assert_eq!(model.independent_feature_names().unwrap().len(), 1);
}
