//! Turning named input rows into a Jaqpot dataset.

use std::collections::HashMap;
use tracing::warn;

use crate::errors::*;
use crate::resource::dataset::{DataEntry, EntryId, Values};
use crate::resource::{Dataset, FeatureInfo, Model};

/// Build a dataset from `rows` which `model` can predict from.
///
/// Columns are the model's independent features, keyed `"0"`, `"1"`, ...
/// in order of feature URI. Each row's values are re-keyed from feature
/// name to column key. A row which names a feature the model does not
/// declare is an error. A row which omits a feature is sent as-is.
pub fn build_dataset(model: &Model, rows: &[Values]) -> Result<Dataset> {
    let schema = model.independent_feature_names()?;

    let mut features = Vec::with_capacity(schema.len());
    let mut keys_by_name = HashMap::with_capacity(schema.len());
    for (index, (uri, name)) in schema.iter().enumerate() {
        let key = index.to_string();
        if keys_by_name.insert(name.as_str(), key.clone()).is_some() {
            return Err(Error::DuplicateFeatureName {
                model: model.display_id(),
                name: name.clone(),
            });
        }
        features.push(FeatureInfo {
            key,
            name: name.clone(),
            uri: Some(uri.clone()),
            ..FeatureInfo::default()
        });
    }

    let mut data_entry = Vec::with_capacity(rows.len());
    for (row_index, row) in rows.iter().enumerate() {
        let mut values = Values::new();
        for (name, value) in row {
            let key = keys_by_name.get(name.as_str()).ok_or_else(|| {
                Error::UnknownFeature {
                    model: model.display_id(),
                    name: name.clone(),
                }
            })?;
            values.insert(key.clone(), value.clone());
        }
        if values.len() < features.len() {
            warn!(
                "row {} supplies {} of {} features",
                row_index,
                values.len(),
                features.len(),
            );
        }
        data_entry.push(DataEntry {
            entry_id: EntryId {
                name: Some(row_index.to_string()),
                ..EntryId::default()
            },
            values,
        });
    }

    Ok(Dataset {
        total_rows: Some(data_entry.len() as u64),
        total_columns: Some(features.len() as u64),
        features,
        data_entry,
        ..Dataset::default()
    })
}

#[cfg(test)]
fn model_with_features(features: serde_json::Value) -> Model {
    serde_json::from_value(serde_json::json!({
        "_id": "m1",
        "additionalInfo": { "independentFeatures": features },
    }))
    .expect("could not build model")
}

#[cfg(test)]
fn row(pairs: &[(&str, serde_json::Value)]) -> Values {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_owned(), value.clone()))
        .collect()
}

#[test]
fn builds_keyed_dataset() {
    use serde_json::json;

    let model = model_with_features(json!({ "uri:a": "temp", "uri:b": "ph" }));
    let rows = vec![
        row(&[("temp", json!(20)), ("ph", json!(7))]),
        row(&[("ph", json!(6.5)), ("temp", json!(25))]),
    ];
    let dataset = build_dataset(&model, &rows).unwrap();

    let columns = dataset
        .features
        .iter()
        .map(|f| (f.key.as_str(), f.name.as_str(), f.uri.as_deref()))
        .collect::<Vec<_>>();
    assert_eq!(
        columns,
        vec![("0", "temp", Some("uri:a")), ("1", "ph", Some("uri:b"))],
    );
    assert_eq!(dataset.data_entry.len(), 2);
    assert_eq!(dataset.data_entry[0].entry_id.name.as_deref(), Some("0"));
    assert_eq!(dataset.data_entry[0].values, row(&[("0", json!(20)), ("1", json!(7))]));
    assert_eq!(dataset.data_entry[1].entry_id.name.as_deref(), Some("1"));
    assert_eq!(dataset.data_entry[1].values, row(&[("0", json!(25)), ("1", json!(6.5))]));
    assert_eq!(dataset.total_rows, Some(2));
    assert_eq!(dataset.total_columns, Some(2));
}

#[test]
fn key_assignment_is_reproducible() {
    use serde_json::json;

    // Same schema, declared in a different order.
    let a = model_with_features(json!({ "uri:z": "z", "uri:m": "m", "uri:a": "a" }));
    let b = model_with_features(json!({ "uri:a": "a", "uri:z": "z", "uri:m": "m" }));
    let rows = vec![row(&[("a", json!(1)), ("m", json!(2)), ("z", json!(3))])];
    let a = build_dataset(&a, &rows).unwrap();
    let b = build_dataset(&b, &rows).unwrap();
    assert_eq!(a.features, b.features);
    assert_eq!(a.data_entry, b.data_entry);
}

#[test]
fn unknown_feature_names_are_rejected() {
    use serde_json::json;

    let model = model_with_features(json!({ "uri:a": "temp" }));
    let rows = vec![row(&[("temp", json!(20)), ("pressure", json!(1))])];
    match build_dataset(&model, &rows) {
        Err(Error::UnknownFeature { model, name }) => {
            assert_eq!(model, "m1");
            assert_eq!(name, "pressure");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn duplicate_feature_names_are_rejected() {
    use serde_json::json;

    let model = model_with_features(json!({ "uri:a": "temp", "uri:b": "temp" }));
    assert!(matches!(
        build_dataset(&model, &[]),
        Err(Error::DuplicateFeatureName { .. })
    ));
}

#[test]
fn no_rows_builds_empty_dataset() {
    use serde_json::json;

    let model = model_with_features(json!({ "uri:a": "temp" }));
    let dataset = build_dataset(&model, &[]).unwrap();
    assert_eq!(dataset.features.len(), 1);
    assert!(dataset.data_entry.is_empty());
}
