//! The error envelope returned by Jaqpot.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The uniform error envelope which Jaqpot returns with a non-success HTTP
/// status, and which it attaches to failed tasks.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ErrorReport {
    /// The ID of this report.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// A short machine-readable error code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// The service component which reported the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,

    /// A human-readable message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Additional details, often a server-side stack trace.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    /// The HTTP status associated with this error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,

    /// The report which caused this one, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace: Option<Box<ErrorReport>>,
}

impl ErrorReport {
    /// Does this report actually describe an error? Jaqpot sometimes sends
    /// an empty object in place of a missing report.
    pub fn is_populated(&self) -> bool {
        let non_empty = |s: &Option<String>| s.as_deref().map_or(false, |s| !s.is_empty());
        non_empty(&self.message) || non_empty(&self.code)
    }

    /// The `message` for this report, plus the `code` and the messages of any
    /// nested reports.
    pub fn full_message(&self) -> String {
        let mut out = self.message.clone().unwrap_or_default();
        if let Some(ref code) = self.code {
            if out.is_empty() {
                out = code.clone();
            } else {
                out = format!("{} ({})", out, code);
            }
        }
        if let Some(ref trace) = self.trace {
            let nested = trace.full_message();
            if !nested.is_empty() {
                out = format!("{}: {}", out, nested);
            }
        }
        out
    }
}

impl fmt::Display for ErrorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_message())
    }
}

#[test]
fn parses_nested_reports() {
    let json = r#"{
        "code": "NotFound",
        "message": "Dataset not found",
        "httpStatus": 404,
        "trace": { "message": "no such document" }
    }"#;
    let report: ErrorReport = serde_json::from_str(json).unwrap();
    assert!(report.is_populated());
    assert_eq!(report.http_status, Some(404));
    assert_eq!(
        report.full_message(),
        "Dataset not found (NotFound): no such document",
    );
}

#[test]
fn empty_reports_are_not_populated() {
    let report: ErrorReport = serde_json::from_str("{}").unwrap();
    assert!(!report.is_populated());
    let report: ErrorReport = serde_json::from_str(r#"{"message": ""}"#).unwrap();
    assert!(!report.is_populated());
}
