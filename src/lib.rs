//! An unofficial Rust client for the Jaqpot REST API.
//!
//! Jaqpot hosts machine-learning models. This library lets you fetch
//! models, features, datasets, domains of applicability and tasks, and run
//! predictions from Rust.
//!
//! Predictions are asynchronous on the server: we upload a dataset, start a
//! prediction task, poll it, and then download and reshape the result.
//! [`Client::predict`] does all of that for you.
//!
//! ```no_run
//! use jaqpot::{prediction::Values, resource::Id, Client};
//! use serde_json::json;
//! use std::str::FromStr;
//!
//! # #[tokio::main]
//! # async fn main() -> jaqpot::Result<()> {
//! #
//! let token = "my bearer token";
//!
//! // Create a Jaqpot client.
//! let client = Client::new("https://api.jaqpot.org/")?;
//!
//! // Describe the rows we want predictions for.
//! let mut row = Values::new();
//! row.insert("temp".to_owned(), json!(20));
//! row.insert("ph".to_owned(), json!(7));
//!
//! // Run the model and wait for the result.
//! let model = Id::from_str("model123")?;
//! let prediction = client.predict(&model, &[row], token).await?;
//! println!("{:?}", prediction.predictions);
//! #
//! #   Ok(())
//! # }
//! ```

#![warn(missing_docs)]

#[macro_use]
extern crate jaqpot_derive;

pub use api::Api;
pub use client::{Client, DEFAULT_JAQPOT_URL, DEFAULT_REQUEST_TIMEOUT};
pub use errors::*;
pub use prediction::Prediction;
pub use wait::WaitOptions;

/// Cancellation token accepted by [`WaitOptions::cancel_token`].
pub use tokio_util::sync::CancellationToken;

#[macro_use]
pub mod wait;
mod api;
mod client;
mod errors;
pub mod prediction;
pub mod resource;
mod serde_types;
