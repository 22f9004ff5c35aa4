//! Asynchronous Jaqpot tasks.

use serde::{Deserialize, Serialize};

use super::id::*;
use super::{ErrorReport, MetaInfo, Resource};
use crate::serde_types::null_as_default;

/// A server-side job. Submitting a prediction returns one of these, and we
/// poll it until it finishes.
#[derive(Clone, Debug, Default, Deserialize, Resource, Serialize)]
#[api_name = "task"]
#[serde(default, rename_all = "camelCase")]
pub struct Task {
    /// The full identifier of this task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Descriptive metadata.
    #[serde(deserialize_with = "null_as_default")]
    pub meta: MetaInfo,

    /// Ontological classes of this task.
    #[serde(deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub ontological_classes: Vec<String>,

    /// Is this task visible to other users?
    #[serde(deserialize_with = "null_as_default")]
    pub visible: bool,

    /// Is this task temporary?
    #[serde(deserialize_with = "null_as_default")]
    pub temporary: bool,

    /// Is this task featured?
    #[serde(deserialize_with = "null_as_default")]
    pub featured: bool,

    /// The short ID of this task. This is what we poll.
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub slash_id: Option<Id<Task>>,

    /// The full URI of the task's output.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_uri: Option<String>,

    /// A reference to the task's output, like `dataset/abc`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// The state reported by Jaqpot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_status: Option<TaskStatus>,

    /// Progress, from 0 to 100.
    #[serde(deserialize_with = "null_as_default")]
    pub percentage_completed: f32,

    /// Why the task failed, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_report: Option<ErrorReport>,

    /// The HTTP status associated with the task's outcome.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,

    /// How long the task ran, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// What kind of task this is, e.g. `PREDICTION`.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// The status string which Jaqpot reports for a task.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// Waiting to run.
    Queued,
    /// Running now.
    Running,
    /// Finished successfully.
    Completed,
    /// Cancelled by a user.
    Cancelled,
    /// Failed.
    Error,
    /// Refused by the server.
    Rejected,
    /// Something we don't recognize.
    #[serde(other)]
    Unknown,
}

impl TaskStatus {
    /// Will this task never make further progress?
    pub fn is_err(self) -> bool {
        matches!(
            self,
            TaskStatus::Cancelled | TaskStatus::Error | TaskStatus::Rejected
        )
    }
}

/// What a task observation means for somebody waiting on it.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskState {
    /// The task is still running.
    Running {
        /// Progress, from 0 to 100.
        percentage: f32,
    },
    /// The task finished. Contains a reference to its result.
    Succeeded(String),
    /// The task failed.
    Failed(ErrorReport),
}

impl Task {
    /// The ID we should use to poll this task. Prefers the short ID.
    pub fn task_id(&self) -> Option<Id<Task>> {
        self.slash_id.clone().or_else(|| {
            self.id
                .as_deref()
                .and_then(|id| Id::from_reference(id).ok())
        })
    }

    /// Classify this observation of the task.
    ///
    /// A populated error report or an error status is always a failure,
    /// even if the task also claims to be complete.
    pub fn state(&self) -> TaskState {
        if let Some(report) = self.error_report.as_ref().filter(|r| r.is_populated()) {
            return TaskState::Failed(report.clone());
        }
        if let Some(status) = self.has_status.filter(|s| s.is_err()) {
            return TaskState::Failed(ErrorReport {
                message: Some(format!("task status is {:?}", status)),
                http_status: self.http_status,
                ..ErrorReport::default()
            });
        }
        let complete = self.percentage_completed >= 100.0
            || self.has_status == Some(TaskStatus::Completed);
        if !complete {
            return TaskState::Running {
                percentage: self.percentage_completed,
            };
        }
        match self.result.as_deref().or_else(|| self.result_uri.as_deref()) {
            Some(result) if !result.is_empty() => TaskState::Succeeded(result.to_owned()),
            _ => TaskState::Failed(ErrorReport {
                message: Some("task completed without a result".to_owned()),
                ..ErrorReport::default()
            }),
        }
    }
}

#[cfg(test)]
fn task_from_json(json: &str) -> Task {
    serde_json::from_str(json).expect("could not parse task")
}

#[test]
fn running_task() {
    let task = task_from_json(
        r#"{"_id": "t1", "hasStatus": "RUNNING", "percentageCompleted": 40}"#,
    );
    assert_eq!(task.state(), TaskState::Running { percentage: 40.0 });
    assert_eq!(task.task_id().unwrap().as_str(), "t1");
}

#[test]
fn completed_task() {
    let task = task_from_json(
        r#"{"_id": "t1", "hasStatus": "COMPLETED", "percentageCompleted": 100,
            "result": "dataset/d2"}"#,
    );
    assert_eq!(task.state(), TaskState::Succeeded("dataset/d2".to_owned()));
}

#[test]
fn complete_percentage_is_enough() {
    let task = task_from_json(r#"{"percentageCompleted": 100, "result": "dataset/d2"}"#);
    assert_eq!(task.state(), TaskState::Succeeded("dataset/d2".to_owned()));
}

#[test]
fn error_report_fails_an_incomplete_task() {
    let task = task_from_json(
        r#"{"_id": "t1", "percentageCompleted": 20,
            "errorReport": {"message": "model crashed", "code": "500"}}"#,
    );
    match task.state() {
        TaskState::Failed(report) => {
            assert_eq!(report.message.as_deref(), Some("model crashed"))
        }
        other => panic!("unexpected state: {:?}", other),
    }
}

#[test]
fn empty_error_report_is_ignored() {
    let task = task_from_json(r#"{"percentageCompleted": 10, "errorReport": {}}"#);
    assert_eq!(task.state(), TaskState::Running { percentage: 10.0 });
}

#[test]
fn error_status_fails_a_task() {
    let task = task_from_json(r#"{"hasStatus": "REJECTED", "percentageCompleted": 0}"#);
    assert!(matches!(task.state(), TaskState::Failed(_)));
}

#[test]
fn unknown_status_is_not_fatal() {
    let task = task_from_json(r#"{"hasStatus": "PAUSED", "percentageCompleted": 50}"#);
    assert_eq!(task.has_status, Some(TaskStatus::Unknown));
    assert_eq!(task.state(), TaskState::Running { percentage: 50.0 });
}

#[test]
fn complete_task_without_result_fails() {
    let task = task_from_json(r#"{"percentageCompleted": 100}"#);
    assert!(matches!(task.state(), TaskState::Failed(_)));
}

#[test]
fn task_id_falls_back_to_full_id() {
    let task = task_from_json(r#"{"id": "https://api.jaqpot.org/jaqpot/services/task/t9"}"#);
    assert_eq!(task.task_id().unwrap().as_str(), "t9");
}

#[test]
fn null_fields_decode_as_empty() {
    let task = task_from_json(
        r#"{"_id": "t1", "hasStatus": "QUEUED", "percentageCompleted": null,
            "visible": null, "meta": null, "errorReport": null}"#,
    );
    assert_eq!(task.percentage_completed, 0.0);
    assert_eq!(task.state(), TaskState::Running { percentage: 0.0 });
}
