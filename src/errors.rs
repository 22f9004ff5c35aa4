//! Our error types.

// Variant fields are self-describing.
#![allow(missing_docs)]

use reqwest::StatusCode;
use std::error::Error as StdError;
use std::result;
use thiserror::Error;
use url::Url;

use crate::resource::ErrorReport;

/// A custom `Result`, for convenience.
pub type Result<T, E = Error> = result::Result<T, E>;

/// A Jaqpot-related error.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// We could not access the specified URL, either because of a transport
    /// problem or because we could not decode the response.
    #[non_exhaustive]
    #[error("error accessing '{url}': {source}")]
    CouldNotAccessUrl { url: Url, source: Box<Error> },

    /// We could not parse the specified URL.
    #[non_exhaustive]
    #[error("could not parse URL {url:?}: {source}")]
    CouldNotParseUrl {
        url: String,
        source: Box<url::ParseError>,
    },

    /// A feature key in a dataset was not a valid column index.
    #[non_exhaustive]
    #[error("invalid feature key {key:?} in a dataset with {feature_count} features")]
    BadFeatureKey { key: String, feature_count: usize },

    /// Two independent features of a model share the same display name, so
    /// we can't map input rows onto them.
    #[non_exhaustive]
    #[error("model {model} declares the feature name {name:?} more than once")]
    DuplicateFeatureName { model: String, name: String },

    /// A successful response was missing a header we rely on.
    #[non_exhaustive]
    #[error("response from '{url}' has no {header} header")]
    MissingHeader { url: Url, header: &'static str },

    /// The user must specify the environment variable `var`.
    #[non_exhaustive]
    #[error("must specify {var}")]
    MissingEnvVar { var: String },

    /// A row of a prediction dataset had no value for the predicted feature.
    #[non_exhaustive]
    #[error("row {row} of dataset {dataset} has no value for {feature:?}")]
    MissingPrediction {
        dataset: String,
        row: usize,
        feature: String,
    },

    /// We could not extract an ID from a resource reference.
    #[non_exhaustive]
    #[error("could not extract a resource ID from {reference:?}")]
    MalformedReference { reference: String },

    /// The model does not declare any independent features.
    #[non_exhaustive]
    #[error("model {model} declares no independent features")]
    NoIndependentFeatures { model: String },

    /// A prediction dataset must have exactly one `PREDICTED` feature.
    #[non_exhaustive]
    #[error("expected exactly one PREDICTED feature in dataset {dataset}, found {count}")]
    PredictedFeatureCount { dataset: String, count: usize },

    /// The Jaqpot service returned an error report. We display the
    /// service's own message.
    #[non_exhaustive]
    #[error("{}", service_message(.url, .status, .report))]
    Service {
        url: Url,
        status: StatusCode,
        report: Box<ErrorReport>,
    },

    /// The caller cancelled the operation.
    #[non_exhaustive]
    #[error("the operation was cancelled")]
    Cancelled {},

    /// A prediction task failed on the server.
    #[non_exhaustive]
    #[error("task {id} failed ({message})")]
    TaskFailed {
        /// The ID of the task that we were waiting on.
        id: String,
        /// The message that was returned.
        message: String,
    },

    /// A request timed out.
    #[non_exhaustive]
    #[error("The operation timed out")]
    Timeout {},

    /// We received an unexpected HTTP status code, and the body was not an
    /// error report.
    #[non_exhaustive]
    #[error("{status} for {url} ({body})")]
    UnexpectedHttpStatus {
        url: Url,
        status: StatusCode,
        body: String,
    },

    /// An input row named a feature which the model does not declare.
    #[non_exhaustive]
    #[error("model {model} has no independent feature named {name:?}")]
    UnknownFeature { model: String, name: String },

    /// Another kind of error occurred.
    #[non_exhaustive]
    #[error("{source}")]
    Other {
        /// The original error.
        #[from]
        source: Box<dyn StdError + Send + Sync + 'static>,
    },
}

impl Error {
    /// Construct an `Error::CouldNotAccessUrl` value.
    pub(crate) fn could_not_access_url<E>(url: &Url, error: E) -> Error
    where
        E: Into<Error>,
    {
        Error::CouldNotAccessUrl {
            url: url.to_owned(),
            source: Box::new(error.into()),
        }
    }

    /// Construct an `Error::CouldNotParseUrl` value.
    pub(crate) fn could_not_parse_url<S>(url: S, error: url::ParseError) -> Error
    where
        S: Into<String>,
    {
        Error::CouldNotParseUrl {
            url: url.into(),
            source: Box::new(error),
        }
    }

    /// Construct an `Error::Service` value from an error report returned by
    /// the service. Useful for alternative `Api` implementations.
    pub fn from_report(url: Url, status: StatusCode, report: ErrorReport) -> Error {
        Error::Service {
            url,
            status,
            report: Box::new(report),
        }
    }

    /// Construct a `MissingEnvVar` value.
    pub(crate) fn missing_env_var<S: Into<String>>(var: S) -> Self {
        Error::MissingEnvVar { var: var.into() }
    }

    /// Construct a `MalformedReference` value.
    pub(crate) fn malformed_reference<S: Into<String>>(reference: S) -> Self {
        Error::MalformedReference {
            reference: reference.into(),
        }
    }

    /// Return the original `jaqpot::Error` that caused this error, without
    /// any wrapper errors.
    pub fn original_jaqpot_error(&self) -> &Error {
        match self {
            Error::CouldNotAccessUrl { source, .. } => source.original_jaqpot_error(),
            _ => self,
        }
    }

    /// The error report sent by the Jaqpot service, if this error came from
    /// one.
    pub fn service_report(&self) -> Option<&ErrorReport> {
        match self.original_jaqpot_error() {
            Error::Service { report, .. } => Some(report.as_ref()),
            _ => None,
        }
    }
}

/// Prefer the service's own message, since that's what users will search
/// for in the Jaqpot UI and logs.
fn service_message(url: &Url, status: &StatusCode, report: &ErrorReport) -> String {
    match report.message.as_deref() {
        Some(message) if !message.is_empty() => message.to_owned(),
        _ => format!("{} for {}", status, url),
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Error {
        Error::Other {
            source: error.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Other {
            source: error.into(),
        }
    }
}

#[test]
fn service_error_displays_report_message() {
    let url = Url::parse("https://api.jaqpot.org/jaqpot/services/task/t1")
        .expect("could not parse URL");
    let report = ErrorReport {
        message: Some("Task not found".to_owned()),
        ..ErrorReport::default()
    };
    let err = Error::Service {
        url,
        status: StatusCode::NOT_FOUND,
        report: Box::new(report),
    };
    assert_eq!(err.to_string(), "Task not found");
    assert_eq!(
        err.service_report().and_then(|r| r.message.as_deref()),
        Some("Task not found"),
    );
}

#[test]
fn service_error_without_message_falls_back_to_status() {
    let url = Url::parse("https://api.jaqpot.org/jaqpot/services/model/m1")
        .expect("could not parse URL");
    let err = Error::Service {
        url,
        status: StatusCode::BAD_GATEWAY,
        report: Box::new(ErrorReport::default()),
    };
    assert_eq!(
        err.to_string(),
        "502 Bad Gateway for https://api.jaqpot.org/jaqpot/services/model/m1",
    );
}

#[test]
fn original_error_unwraps_url_context() {
    let url = Url::parse("https://api.jaqpot.org/").expect("could not parse URL");
    let err = Error::could_not_access_url(&url, Error::Timeout {});
    match err.original_jaqpot_error() {
        Error::Timeout {} => {}
        other => panic!("unexpected error: {:?}", other),
    }
}
