//! Running a model over local data.
//!
//! A prediction takes several round trips:
//!
//! 1. Fetch the model and build a dataset from its independent features
//!    and the caller's rows.
//! 2. Upload the dataset.
//! 3. Submit a prediction job, which gives us a task.
//! 4. Poll the task until it finishes or fails.
//! 5. Fetch the dataset the task produced.
//! 6. Reshape that dataset into echoed inputs and predictions.
//!
//! Any failure ends the whole prediction. The `WaitOptions` deadline and
//! cancellation token cover every step, not just the polling.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, debug_span};
use tracing_futures::Instrument;

use crate::api::Api;
use crate::errors::*;
use crate::resource::{Dataset, Id, Model, Task, TaskState};
use crate::wait::{guard, wait_until, WaitOptions, WaitStatus};

pub use self::builder::build_dataset;
pub use self::reshape::reshape;
pub use crate::resource::dataset::Values;

mod builder;
mod reshape;

/// The result of running a model over some rows.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    /// The model we ran.
    pub model_id: Id<Model>,

    /// The dataset containing the model's output.
    pub dataset_id: Id<Dataset>,

    /// The input values of each row, keyed by feature name, as echoed back
    /// by the model.
    pub data: Vec<Values>,

    /// The prediction for each row, as a single-entry map from predicted
    /// feature name to value. Aligned with `data`.
    pub predictions: Vec<Values>,
}

/// Run `model` over `rows` using `api`, and wait for the result.
///
/// Each row maps feature names to values. Every name must be one of the
/// model's independent features.
pub async fn predict<A>(
    api: &A,
    model: &Id<Model>,
    rows: &[Values],
    token: &str,
    options: &WaitOptions,
) -> Result<Prediction>
where
    A: Api + ?Sized,
{
    let span = debug_span!("predict", model = %model, rows = rows.len());
    async move {
        let deadline = options.deadline();
        let model_info = guard(options, deadline, api.get_model(model, token)).await?;
        let dataset = build_dataset(&model_info, rows)?;
        let input_id = guard(options, deadline, api.post_dataset(&dataset, token)).await?;
        debug!("uploaded input dataset {}", input_id);

        let task = guard(
            options,
            deadline,
            api.submit_prediction(model, &input_id, token),
        )
        .await?;
        let task_id = task
            .task_id()
            .ok_or_else(|| Error::malformed_reference(task.id.unwrap_or_default()))?;
        debug!("prediction running as task {}", task_id);

        let result = poll_task(api, &task_id, token, options, deadline).await?;
        let dataset_id = Id::<Dataset>::from_reference(&result)?;
        debug!("prediction finished with dataset {}", dataset_id);

        let output = guard(options, deadline, api.get_dataset(&dataset_id, token)).await?;
        let (data, predictions) = reshape(&output)?;
        Ok(Prediction {
            model_id: model.clone(),
            dataset_id,
            data,
            predictions,
        })
    }
    .instrument(span)
    .await
}

/// Poll a task until it succeeds, returning the reference to its result.
///
/// A task which reports an error fails immediately, whatever its progress.
pub async fn wait_for_task<A>(
    api: &A,
    task: &Id<Task>,
    token: &str,
    options: &WaitOptions,
) -> Result<String>
where
    A: Api + ?Sized,
{
    poll_task(api, task, token, options, options.deadline()).await
}

async fn poll_task<A>(
    api: &A,
    task: &Id<Task>,
    token: &str,
    options: &WaitOptions,
    deadline: Option<Instant>,
) -> Result<String>
where
    A: Api + ?Sized,
{
    wait_until(options, deadline, || async move {
        let observed = try_wait!(api.get_task(task, token).await);
        match observed.state() {
            TaskState::Succeeded(result) => WaitStatus::Finished(result),
            TaskState::Running { percentage } => {
                debug!("task {} is {}% complete", task, percentage);
                WaitStatus::Waiting
            }
            TaskState::Failed(report) => WaitStatus::Failed(Error::TaskFailed {
                id: task.to_string(),
                message: report.full_message(),
            }),
        }
    })
    .await
}
