//! Tests for the prediction workflow, run against an in-memory server.

use async_trait::async_trait;
use jaqpot::{
    prediction::{predict, Values},
    resource::{Dataset, ErrorReport, Id, Model, Task},
    Api, CancellationToken, Error, Result, WaitOptions,
};
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::{
    collections::VecDeque,
    str::FromStr,
    sync::Mutex,
    time::{Duration, Instant},
};
use tracing_subscriber::EnvFilter;
use url::Url;

/// A step of the workflow, used to record calls and inject failures.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Step {
    GetModel,
    PostDataset,
    SubmitPrediction,
    GetTask,
    GetDataset,
}

/// Pretends to be a Jaqpot server.
struct FakeApi {
    model: Model,
    /// Task observations, returned in order. The last one repeats forever.
    tasks: Mutex<VecDeque<Task>>,
    result: Dataset,
    fail_at: Option<Step>,
    /// A step which never answers.
    hang_at: Option<Step>,
    calls: Mutex<Vec<Step>>,
    posted: Mutex<Vec<Dataset>>,
}

impl FakeApi {
    fn new(tasks: Vec<Value>) -> FakeApi {
        FakeApi {
            model: serde_json::from_value(json!({
                "_id": "m1",
                "additionalInfo": {
                    "independentFeatures": { "uri:a": "temp", "uri:b": "ph" }
                }
            }))
            .unwrap(),
            tasks: Mutex::new(
                tasks
                    .into_iter()
                    .map(|t| serde_json::from_value(t).unwrap())
                    .collect(),
            ),
            result: serde_json::from_value(json!({
                "_id": "out1",
                "features": [
                    { "key": "0", "name": "temp" },
                    { "key": "1", "name": "ph" },
                    { "key": "2", "name": "solubility", "category": "PREDICTED" }
                ],
                "dataEntry": [
                    { "entryId": { "name": "0", "URI": "" },
                      "values": { "0": 20, "1": 7, "2": 5.5 } }
                ]
            }))
            .unwrap(),
            fail_at: None,
            hang_at: None,
            calls: Mutex::new(vec![]),
            posted: Mutex::new(vec![]),
        }
    }

    fn failing_at(mut self, step: Step) -> FakeApi {
        self.fail_at = Some(step);
        self
    }

    fn hanging_at(mut self, step: Step) -> FakeApi {
        self.hang_at = Some(step);
        self
    }

    fn calls(&self) -> Vec<Step> {
        self.calls.lock().unwrap().clone()
    }

    /// Record a call, and fail it the way Jaqpot would if asked to.
    fn enter(&self, step: Step) -> Result<()> {
        self.calls.lock().unwrap().push(step);
        if self.fail_at == Some(step) {
            let report = ErrorReport {
                message: Some(format!("boom at {:?}", step)),
                http_status: Some(500),
                ..ErrorReport::default()
            };
            let url = Url::parse("https://jaqpot.test/jaqpot/services/").unwrap();
            Err(Error::from_report(url, StatusCode::INTERNAL_SERVER_ERROR, report))
        } else {
            Ok(())
        }
    }

    /// Stall forever if this is the step we were told to hang at.
    async fn stall(&self, step: Step) {
        if self.hang_at == Some(step) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

#[async_trait]
impl Api for FakeApi {
    async fn get_model(&self, model: &Id<Model>, _token: &str) -> Result<Model> {
        self.enter(Step::GetModel)?;
        self.stall(Step::GetModel).await;
        assert_eq!(model.as_str(), "m1");
        Ok(self.model.clone())
    }

    async fn post_dataset(&self, dataset: &Dataset, _token: &str) -> Result<Id<Dataset>> {
        self.enter(Step::PostDataset)?;
        self.stall(Step::PostDataset).await;
        self.posted.lock().unwrap().push(dataset.clone());
        Id::from_str("in1")
    }

    async fn submit_prediction(
        &self,
        model: &Id<Model>,
        dataset: &Id<Dataset>,
        _token: &str,
    ) -> Result<Task> {
        self.enter(Step::SubmitPrediction)?;
        self.stall(Step::SubmitPrediction).await;
        assert_eq!(model.as_str(), "m1");
        assert_eq!(dataset.as_str(), "in1");
        Ok(serde_json::from_value(json!({ "_id": "t1", "hasStatus": "QUEUED" })).unwrap())
    }

    async fn get_task(&self, task: &Id<Task>, _token: &str) -> Result<Task> {
        self.enter(Step::GetTask)?;
        self.stall(Step::GetTask).await;
        assert_eq!(task.as_str(), "t1");
        let mut tasks = self.tasks.lock().unwrap();
        if tasks.len() > 1 {
            Ok(tasks.pop_front().unwrap())
        } else {
            Ok(tasks.front().cloned().unwrap())
        }
    }

    async fn get_dataset(&self, dataset: &Id<Dataset>, _token: &str) -> Result<Dataset> {
        self.enter(Step::GetDataset)?;
        self.stall(Step::GetDataset).await;
        assert_eq!(dataset.as_str(), "out1");
        Ok(self.result.clone())
    }
}

fn running(percentage: u32) -> Value {
    json!({ "_id": "t1", "hasStatus": "RUNNING", "percentageCompleted": percentage })
}

fn completed() -> Value {
    json!({
        "_id": "t1",
        "hasStatus": "COMPLETED",
        "percentageCompleted": 100,
        "result": "dataset/out1"
    })
}

fn input_rows() -> Vec<Values> {
    let row = json!({ "temp": 20, "ph": 7 });
    vec![serde_json::from_value(row).unwrap()]
}

fn fast_polling() -> WaitOptions {
    WaitOptions::default().retry_interval(Duration::from_millis(1))
}

fn model_id() -> Id<Model> {
    Id::from_str("m1").unwrap()
}

/// Show library logs when running with `RUST_LOG`.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn predicts_end_to_end() {
    init_tracing();
    let api = FakeApi::new(vec![running(0), running(50), completed()]);
    let prediction = predict(&api, &model_id(), &input_rows(), "token", &fast_polling())
        .await
        .unwrap();

    assert_eq!(prediction.model_id.as_str(), "m1");
    assert_eq!(prediction.dataset_id.as_str(), "out1");
    assert_eq!(json!(prediction.data), json!([{ "temp": 20, "ph": 7 }]));
    assert_eq!(json!(prediction.predictions), json!([{ "solubility": 5.5 }]));

    assert_eq!(
        api.calls(),
        vec![
            Step::GetModel,
            Step::PostDataset,
            Step::SubmitPrediction,
            Step::GetTask,
            Step::GetTask,
            Step::GetTask,
            Step::GetDataset,
        ],
    );

    let posted = api.posted.lock().unwrap();
    assert_eq!(posted.len(), 1);
    let keys = posted[0]
        .features
        .iter()
        .map(|f| (f.key.as_str(), f.name.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(keys, vec![("0", "temp"), ("1", "ph")]);
    assert_eq!(json!(posted[0].data_entry[0].values), json!({ "0": 20, "1": 7 }));
}

#[tokio::test]
async fn completed_task_ends_polling_immediately() {
    let api = FakeApi::new(vec![completed()]);
    predict(&api, &model_id(), &input_rows(), "token", &fast_polling())
        .await
        .unwrap();
    let polls = api.calls().into_iter().filter(|&s| s == Step::GetTask).count();
    assert_eq!(polls, 1);
}

#[tokio::test]
async fn failed_task_is_terminal() {
    let failed = json!({
        "_id": "t1",
        "hasStatus": "RUNNING",
        "percentageCompleted": 30,
        "errorReport": { "message": "model crashed", "code": "ModelError" }
    });
    let api = FakeApi::new(vec![running(10), failed]);
    let options = fast_polling().timeout(None);
    let err = predict(&api, &model_id(), &input_rows(), "token", &options)
        .await
        .unwrap_err();
    match err {
        Error::TaskFailed { id, message, .. } => {
            assert_eq!(id, "t1");
            assert!(message.contains("model crashed"), "message: {}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(api.calls().last(), Some(&Step::GetTask));
    assert!(!api.calls().contains(&Step::GetDataset));
}

#[tokio::test]
async fn service_errors_stop_the_workflow() {
    let steps = [
        Step::GetModel,
        Step::PostDataset,
        Step::SubmitPrediction,
        Step::GetTask,
        Step::GetDataset,
    ];
    for &step in &steps {
        let api = FakeApi::new(vec![completed()]).failing_at(step);
        let err = predict(&api, &model_id(), &input_rows(), "token", &fast_polling())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("boom at {:?}", step));
        assert_eq!(
            err.service_report().and_then(|r| r.http_status),
            Some(500),
        );
        assert_eq!(api.calls().last(), Some(&step));
    }
}

#[tokio::test]
async fn unknown_features_fail_before_upload() {
    let api = FakeApi::new(vec![completed()]);
    let rows = vec![serde_json::from_value(json!({ "temp": 20, "color": "red" })).unwrap()];
    let err = predict(&api, &model_id(), &rows, "token", &fast_polling())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UnknownFeature { .. }), "{:?}", err);
    assert_eq!(api.calls(), vec![Step::GetModel]);
}

#[tokio::test]
async fn slow_tasks_time_out() {
    let api = FakeApi::new(vec![running(5)]);
    let options = WaitOptions::default()
        .retry_interval(Duration::from_millis(10))
        .timeout(Duration::from_millis(35));
    let err = predict(&api, &model_id(), &input_rows(), "token", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "{:?}", err);
}

#[tokio::test]
async fn cancelled_predictions_stop_polling() {
    let api = FakeApi::new(vec![running(5)]);
    let token = CancellationToken::new();
    let options = WaitOptions::default()
        .timeout(None)
        .retry_interval(Duration::from_secs(3600))
        .cancel_token(token.clone());
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    });
    let err = predict(&api, &model_id(), &input_rows(), "token", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }), "{:?}", err);
    assert_eq!(api.calls().last(), Some(&Step::GetTask));
    canceller.await.unwrap();
}

#[tokio::test]
async fn cancelled_token_makes_no_requests() {
    let api = FakeApi::new(vec![completed()]);
    let token = CancellationToken::new();
    token.cancel();
    let options = fast_polling().cancel_token(token);
    let err = predict(&api, &model_id(), &input_rows(), "token", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }), "{:?}", err);
    assert_eq!(api.calls(), vec![]);
    assert!(api.posted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn deadline_covers_slow_uploads() {
    let api = FakeApi::new(vec![completed()]).hanging_at(Step::PostDataset);
    let options = fast_polling().timeout(Duration::from_millis(100));
    let started = Instant::now();
    let err = predict(&api, &model_id(), &input_rows(), "token", &options)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "{:?}", err);
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(api.calls(), vec![Step::GetModel, Step::PostDataset]);
}

#[tokio::test]
async fn cancellation_interrupts_requests_in_flight() {
    for &step in &[Step::PostDataset, Step::SubmitPrediction, Step::GetTask, Step::GetDataset] {
        let api = FakeApi::new(vec![completed()]).hanging_at(step);
        let token = CancellationToken::new();
        let options = fast_polling().timeout(None).cancel_token(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });
        let err = predict(&api, &model_id(), &input_rows(), "token", &options)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled { .. }), "{:?} at {:?}", err, step);
        assert_eq!(api.calls().last(), Some(&step));
        canceller.await.unwrap();
    }
}
