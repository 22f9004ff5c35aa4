//! Jaqpot dataset support.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::id::*;
use super::{MetaInfo, Resource};
use crate::serde_types::null_as_default;

/// The values of a single row, keyed by column. In a dataset on the wire,
/// the keys are feature keys (`"0"`, `"1"`, ...); in the rows our callers
/// see, they are feature names.
pub type Values = BTreeMap<String, Value>;

/// A Jaqpot dataset. Basically a table of data with indexed columns.
#[derive(Clone, Debug, Default, Deserialize, Resource, Serialize)]
#[api_name = "dataset"]
#[serde(default, rename_all = "camelCase")]
pub struct Dataset {
    /// Descriptive metadata.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "MetaInfo::is_empty")]
    pub meta: MetaInfo,

    /// Ontological classes of this dataset.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub ontological_classes: Vec<String>,

    /// Is this dataset visible to other users?
    #[serde(deserialize_with = "null_as_default")]
    pub visible: bool,

    /// Is this dataset temporary?
    #[serde(deserialize_with = "null_as_default")]
    pub temporary: bool,

    /// Is this dataset featured?
    #[serde(deserialize_with = "null_as_default")]
    pub featured: bool,

    /// The URI of this dataset.
    #[serde(rename = "datasetURI", skip_serializing_if = "Option::is_none")]
    pub dataset_uri: Option<String>,

    /// The model which produced this dataset, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_model: Option<String>,

    /// The rows of this dataset. Only returned when requested.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub data_entry: Vec<DataEntry>,

    /// The columns of this dataset.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<FeatureInfo>,

    /// The number of rows in this dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,

    /// The number of columns in this dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_columns: Option<u64>,

    /// The short ID of this dataset.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub slash_id: Option<Id<Dataset>>,

    /// Has this dataset been moved to the trash?
    #[serde(deserialize_with = "null_as_default")]
    pub on_trash: bool,
}

impl Dataset {
    /// A name we can use for this dataset in error messages.
    pub(crate) fn display_id(&self) -> String {
        match self.slash_id {
            Some(ref id) => id.to_string(),
            None => "(unsaved)".to_owned(),
        }
    }
}

/// Describes one column of a dataset.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct FeatureInfo {
    /// The column index, as a string: `"0"`, `"1"`, ...
    #[serde(deserialize_with = "null_as_default")]
    pub key: String,

    /// The display name of this column.
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,

    /// The units in which this column is measured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,

    /// Experimental conditions attached to this column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conditions: Option<BTreeMap<String, Value>>,

    /// What role this column plays.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<FeatureCategory>,

    /// The URI of the underlying feature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl FeatureInfo {
    /// Does this column hold the values predicted by a model?
    pub fn is_predicted(&self) -> bool {
        self.category == Some(FeatureCategory::Predicted)
    }
}

/// The role of a column in a dataset. We only care about `PREDICTED`, but
/// we preserve other values so that datasets round-trip.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(from = "String", into = "String")]
pub enum FeatureCategory {
    /// This column holds a model's predictions.
    Predicted,
    /// Any other category.
    Other(String),
}

impl From<String> for FeatureCategory {
    fn from(s: String) -> Self {
        if s == "PREDICTED" {
            FeatureCategory::Predicted
        } else {
            FeatureCategory::Other(s)
        }
    }
}

impl From<FeatureCategory> for String {
    fn from(category: FeatureCategory) -> Self {
        match category {
            FeatureCategory::Predicted => "PREDICTED".to_owned(),
            FeatureCategory::Other(s) => s,
        }
    }
}

/// One row of a dataset.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DataEntry {
    /// Identifies the row.
    #[serde(deserialize_with = "null_as_default")]
    pub entry_id: EntryId,

    /// Values keyed by feature key.
    #[serde(deserialize_with = "null_as_default")]
    pub values: Values,
}

/// Identifies a row of a dataset.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct EntryId {
    /// The name of this row. We use the row index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The owner of the substance described by this row.
    #[serde(rename = "ownerUUID", skip_serializing_if = "Option::is_none")]
    pub owner_uuid: Option<String>,

    /// The URI of the substance described by this row. Jaqpot expects this
    /// field to be present, even if empty.
    #[serde(deserialize_with = "null_as_default", rename = "URI")]
    pub uri: String,

    /// The type of the substance described by this row.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

#[test]
fn parses_prediction_dataset() {
    let json = r#"{
        "_id": "d2",
        "features": [
            { "key": "0", "name": "temp", "uri": "uri:a" },
            { "key": "1", "name": "solubility", "category": "PREDICTED" },
            { "key": "2", "name": "other", "category": "TRANSFORMED" }
        ],
        "dataEntry": [
            { "entryId": { "name": "0", "URI": "" }, "values": { "0": 20, "1": 5.5 } }
        ],
        "totalRows": 1
    }"#;
    let dataset: Dataset = serde_json::from_str(json).unwrap();
    assert_eq!(dataset.display_id(), "d2");
    assert!(!dataset.features[0].is_predicted());
    assert!(dataset.features[1].is_predicted());
    assert_eq!(
        dataset.features[2].category,
        Some(FeatureCategory::Other("TRANSFORMED".to_owned())),
    );
    assert_eq!(dataset.data_entry[0].values["1"], serde_json::json!(5.5));
}

#[test]
fn serializes_new_dataset_compactly() {
    let mut values = Values::new();
    values.insert("0".to_owned(), serde_json::json!(20));
    let dataset = Dataset {
        features: vec![FeatureInfo {
            key: "0".to_owned(),
            name: "temp".to_owned(),
            uri: Some("uri:a".to_owned()),
            ..FeatureInfo::default()
        }],
        data_entry: vec![DataEntry {
            entry_id: EntryId {
                name: Some("0".to_owned()),
                ..EntryId::default()
            },
            values,
        }],
        ..Dataset::default()
    };
    assert_eq!(
        serde_json::to_value(&dataset).unwrap(),
        serde_json::json!({
            "visible": false,
            "temporary": false,
            "featured": false,
            "onTrash": false,
            "dataEntry": [
                { "entryId": { "name": "0", "URI": "" }, "values": { "0": 20 } }
            ],
            "features": [ { "key": "0", "name": "temp", "uri": "uri:a" } ]
        }),
    );
}

#[test]
fn null_fields_decode_as_empty() {
    let json = r#"{
        "_id": "d2",
        "features": [ { "key": "0", "name": null } ],
        "dataEntry": [ { "entryId": { "name": "0", "URI": null }, "values": null } ],
        "ontologicalClasses": null,
        "onTrash": null
    }"#;
    let dataset: Dataset = serde_json::from_str(json).unwrap();
    assert_eq!(dataset.features[0].name, "");
    assert_eq!(dataset.data_entry[0].entry_id.uri, "");
    assert!(dataset.data_entry[0].values.is_empty());

    let dataset: Dataset = serde_json::from_str(r#"{"features": null, "dataEntry": null}"#).unwrap();
    assert!(dataset.features.is_empty());
    assert!(dataset.data_entry.is_empty());
}
