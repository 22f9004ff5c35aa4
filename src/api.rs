//! The operations our prediction workflow needs from a Jaqpot server.

use async_trait::async_trait;

use crate::errors::*;
use crate::resource::{Dataset, Id, Model, Task};

/// The subset of the Jaqpot API used by [`predict`](crate::prediction::predict).
///
/// [`Client`](crate::Client) implements this over HTTP. Other
/// implementations can wrap a client with extra behavior, or stand in for a
/// server entirely.
#[async_trait]
pub trait Api: Send + Sync {
    /// Fetch a model.
    async fn get_model(&self, model: &Id<Model>, token: &str) -> Result<Model>;

    /// Upload a dataset, returning its new ID.
    async fn post_dataset(&self, dataset: &Dataset, token: &str) -> Result<Id<Dataset>>;

    /// Start a prediction of `model` over `dataset`.
    async fn submit_prediction(
        &self,
        model: &Id<Model>,
        dataset: &Id<Dataset>,
        token: &str,
    ) -> Result<Task>;

    /// Fetch a task.
    async fn get_task(&self, task: &Id<Task>, token: &str) -> Result<Task>;

    /// Fetch a dataset, including its rows.
    async fn get_dataset(&self, dataset: &Id<Dataset>, token: &str) -> Result<Dataset>;
}
