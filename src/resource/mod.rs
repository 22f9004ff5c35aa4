//! Resource types manipulated by the Jaqpot API.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::serde_types::null_as_default;

pub use self::id::*;

// We only re-export the main names from our resource submodules.  For any
// other types, use a fully-qualified name.
pub use self::dataset::{DataEntry, Dataset, FeatureCategory, FeatureInfo};
pub use self::doa::Doa;
pub use self::error_report::ErrorReport;
pub use self::feature::Feature;
pub use self::model::{Model, Models};
pub use self::task::{Task, TaskState, TaskStatus};

/// A shared interface to all Jaqpot resource types.
pub trait Resource: fmt::Debug + DeserializeOwned + Serialize + Send + Sync + 'static {
    /// The name of this resource in the Jaqpot API, e.g. `"model"`.
    fn api_name() -> &'static str;

    /// Descriptive metadata common to all resources.
    fn meta(&self) -> &MetaInfo;
}

/// Metadata which Jaqpot attaches to every resource. All of these fields
/// are optional on the wire.
#[allow(missing_docs)]
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MetaInfo {
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub descriptions: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub titles: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub subjects: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub publishers: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub creators: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub audiences: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub rights: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub same_as: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub see_also: Vec<String>,
    /// The resources this one was derived from. For a DOA, this is the model.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub has_sources: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub doi: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub read: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub write: Vec<String>,
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub execute: Vec<String>,
}

impl MetaInfo {
    /// Is this metadata completely empty?
    pub fn is_empty(&self) -> bool {
        *self == MetaInfo::default()
    }
}

// Support modules defining general types.
mod id;

// Individual resource types.
pub mod dataset;
pub mod doa;
pub mod error_report;
pub mod feature;
pub mod model;
pub mod task;

#[test]
fn null_meta_fields_decode_as_empty() {
    let meta: MetaInfo =
        serde_json::from_str(r#"{"titles": null, "creators": ["me"], "date": null}"#).unwrap();
    assert!(meta.titles.is_empty());
    assert_eq!(meta.creators, vec!["me".to_owned()]);
    assert!(meta.date.is_none());
}
