//! Splitting a prediction dataset into inputs and outputs.

use crate::errors::*;
use crate::resource::dataset::Values;
use crate::resource::Dataset;

/// Split each row of a prediction dataset into its input values and its
/// predicted value, both keyed by feature name.
///
/// The dataset's feature keys must be exactly `"0"` to `"N-1"`, and exactly
/// one feature must be `PREDICTED`. Every row must contain a value for the
/// predicted feature, so the two outputs line up row for row.
pub fn reshape(dataset: &Dataset) -> Result<(Vec<Values>, Vec<Values>)> {
    let feature_count = dataset.features.len();

    // Column index -> feature name. Every key must land in its own slot.
    let mut names: Vec<Option<&str>> = vec![None; feature_count];
    let mut predicted = vec![];
    for feature in &dataset.features {
        let index = column_index(&feature.key, feature_count)?;
        if names[index].replace(&feature.name).is_some() {
            return Err(bad_key(&feature.key, feature_count));
        }
        if feature.is_predicted() {
            predicted.push(index);
        }
    }
    let predicted = match predicted.as_slice() {
        [index] => *index,
        _ => {
            return Err(Error::PredictedFeatureCount {
                dataset: dataset.display_id(),
                count: predicted.len(),
            })
        }
    };
    // `feature_count` unique keys in `0..feature_count` fill every slot.
    let names = names.into_iter().flatten().collect::<Vec<&str>>();
    let predicted_name = names[predicted];

    let mut data = Vec::with_capacity(dataset.data_entry.len());
    let mut predictions = Vec::with_capacity(dataset.data_entry.len());
    for (row, entry) in dataset.data_entry.iter().enumerate() {
        let mut inputs = Values::new();
        let mut prediction = None;
        for (key, value) in &entry.values {
            let index = column_index(key, feature_count)?;
            if index == predicted {
                prediction = Some(value.clone());
            } else {
                inputs.insert(names[index].to_owned(), value.clone());
            }
        }
        let prediction = prediction.ok_or_else(|| Error::MissingPrediction {
            dataset: dataset.display_id(),
            row,
            feature: predicted_name.to_owned(),
        })?;
        let mut output = Values::new();
        output.insert(predicted_name.to_owned(), prediction);
        data.push(inputs);
        predictions.push(output);
    }
    Ok((data, predictions))
}

fn column_index(key: &str, feature_count: usize) -> Result<usize> {
    key.parse::<usize>()
        .ok()
        .filter(|&index| index < feature_count)
        .ok_or_else(|| bad_key(key, feature_count))
}

fn bad_key(key: &str, feature_count: usize) -> Error {
    Error::BadFeatureKey {
        key: key.to_owned(),
        feature_count,
    }
}

#[cfg(test)]
fn dataset_from_json(json: serde_json::Value) -> Dataset {
    serde_json::from_value(json).expect("could not parse dataset")
}

#[test]
fn splits_inputs_from_predictions() {
    use serde_json::json;

    let dataset = dataset_from_json(json!({
        "_id": "out1",
        "features": [
            { "key": "0", "name": "temp" },
            { "key": "1", "name": "ph" },
            { "key": "2", "name": "solubility", "category": "PREDICTED" }
        ],
        "dataEntry": [
            { "entryId": { "URI": "" }, "values": { "0": 20, "1": 7, "2": 5.5 } },
            { "entryId": { "URI": "" }, "values": { "0": 25, "1": 6, "2": 4.0 } }
        ]
    }));
    let (data, predictions) = reshape(&dataset).unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(predictions.len(), 2);
    assert_eq!(json!(data), json!([{ "temp": 20, "ph": 7 }, { "temp": 25, "ph": 6 }]));
    assert_eq!(json!(predictions), json!([{ "solubility": 5.5 }, { "solubility": 4.0 }]));
}

#[test]
fn features_may_be_listed_out_of_order() {
    use serde_json::json;

    let dataset = dataset_from_json(json!({
        "features": [
            { "key": "1", "name": "y", "category": "PREDICTED" },
            { "key": "0", "name": "x" }
        ],
        "dataEntry": [ { "values": { "0": "a", "1": "b" } } ]
    }));
    let (data, predictions) = reshape(&dataset).unwrap();
    assert_eq!(json!(data), json!([{ "x": "a" }]));
    assert_eq!(json!(predictions), json!([{ "y": "b" }]));
}

#[test]
fn sparse_keys_are_rejected() {
    use serde_json::json;

    let dataset = dataset_from_json(json!({
        "features": [
            { "key": "0", "name": "x" },
            { "key": "5", "name": "y", "category": "PREDICTED" }
        ]
    }));
    match reshape(&dataset) {
        Err(Error::BadFeatureKey { key, feature_count }) => {
            assert_eq!(key, "5");
            assert_eq!(feature_count, 2);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn duplicate_and_non_numeric_keys_are_rejected() {
    use serde_json::json;

    for features in &[
        json!([{ "key": "0", "name": "x" }, { "key": "0", "name": "y" }]),
        json!([{ "key": "zero", "name": "x" }]),
        json!([{ "key": "-1", "name": "x" }]),
    ] {
        let dataset = dataset_from_json(json!({ "features": features }));
        assert!(matches!(reshape(&dataset), Err(Error::BadFeatureKey { .. })));
    }
}

#[test]
fn row_keys_outside_the_feature_range_are_rejected() {
    use serde_json::json;

    let dataset = dataset_from_json(json!({
        "features": [ { "key": "0", "name": "y", "category": "PREDICTED" } ],
        "dataEntry": [ { "values": { "0": 1, "3": 2 } } ]
    }));
    assert!(matches!(reshape(&dataset), Err(Error::BadFeatureKey { .. })));
}

#[test]
fn requires_exactly_one_predicted_feature() {
    use serde_json::json;

    let none = dataset_from_json(json!({
        "features": [ { "key": "0", "name": "x" } ]
    }));
    let two = dataset_from_json(json!({
        "features": [
            { "key": "0", "name": "x", "category": "PREDICTED" },
            { "key": "1", "name": "y", "category": "PREDICTED" }
        ]
    }));
    for (dataset, expected) in &[(none, 0), (two, 2)] {
        match reshape(dataset) {
            Err(Error::PredictedFeatureCount { count, .. }) => assert_eq!(count, *expected),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}

#[test]
fn rows_without_a_prediction_are_rejected() {
    use serde_json::json;

    let dataset = dataset_from_json(json!({
        "_id": "out1",
        "features": [
            { "key": "0", "name": "x" },
            { "key": "1", "name": "y", "category": "PREDICTED" }
        ],
        "dataEntry": [
            { "values": { "0": 1, "1": 2 } },
            { "values": { "0": 3 } }
        ]
    }));
    match reshape(&dataset) {
        Err(Error::MissingPrediction { dataset, row, feature }) => {
            assert_eq!(dataset, "out1");
            assert_eq!(row, 1);
            assert_eq!(feature, "y");
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn empty_dataset_reshapes_to_nothing() {
    use serde_json::json;

    let dataset = dataset_from_json(json!({
        "features": [ { "key": "0", "name": "y", "category": "PREDICTED" } ]
    }));
    let (data, predictions) = reshape(&dataset).unwrap();
    assert!(data.is_empty());
    assert!(predictions.is_empty());
}
