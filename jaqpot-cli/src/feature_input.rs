//! Feature values passed on the command line.

use anyhow::{format_err, Error, Result};
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

/// One `name=value` pair from `-i`.
#[derive(Debug)]
pub struct FeatureInput {
    /// The feature name, as the model's independent features spell it.
    pub name: String,

    /// The JSON value of this feature.
    pub value: Value,
}

/// Lets `structopt` parse `-i` arguments directly.
impl FromStr for FeatureInput {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let split = s.splitn(2, '=').collect::<Vec<&str>>();
        if split.len() != 2 || split[0].is_empty() {
            return Err(format_err!("input {:?} must have form \"name=value\"", s));
        }
        let name = split[0].to_owned();
        let value = match serde_json::from_str(split[1]) {
            Ok(value) => value,
            Err(err) => {
                warn!(
                    "could not parse input {:?} as JSON (treating as string): {}",
                    s, err,
                );
                Value::String(split[1].to_owned())
            }
        };
        Ok(FeatureInput { name, value })
    }
}

#[test]
fn parses_json_values() {
    let examples = &[
        ("x=null", Value::Null),
        ("x=true", Value::Bool(true)),
        ("x=20", Value::Number(20.into())),
        ("x=[1]", Value::Array(vec![Value::Number(1.into())])),
        ("x=\"hi\"", Value::String("hi".to_owned())),
    ];
    for (input, expected) in examples {
        let parsed = input.parse::<FeatureInput>().unwrap();
        assert_eq!(parsed.name, "x");
        assert_eq!(&parsed.value, expected);
    }
}

#[test]
fn defaults_to_string_values() {
    let parsed = "color=red".parse::<FeatureInput>().unwrap();
    assert_eq!(parsed.value, Value::String("red".to_owned()));
}

#[test]
fn value_may_contain_equals_signs() {
    let parsed = "formula=a=b".parse::<FeatureInput>().unwrap();
    assert_eq!(parsed.name, "formula");
    assert_eq!(parsed.value, Value::String("a=b".to_owned()));
}

#[test]
fn rejects_missing_names_and_values() {
    assert!("temp".parse::<FeatureInput>().is_err());
    assert!("=20".parse::<FeatureInput>().is_err());
}
