//! A client connection to Jaqpot.

use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::de::DeserializeOwned;
use std::env;
use std::time::Duration;
use tracing::{debug, trace, warn};
use url::Url;

use crate::api::Api;
use crate::errors::*;
use crate::prediction::{self, Prediction, Values};
use crate::resource::{Dataset, Doa, ErrorReport, Feature, Id, Model, Models, Resource, Task};
use crate::wait::WaitOptions;

/// The default Jaqpot server.
pub const DEFAULT_JAQPOT_URL: &str = "https://api.jaqpot.org/";

/// Where the REST services live, relative to the base URL.
const SERVICES_PATH: &str = "jaqpot/services/";

/// How long any single HTTP request may take.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// A client connection to Jaqpot.
///
/// The client holds no credentials. Every call takes the caller's bearer
/// token, and the client may be shared freely between tasks.
#[derive(Clone, Debug)]
pub struct Client {
    /// The base URL, always with a trailing slash.
    base_url: Url,
    /// `base_url` joined with `SERVICES_PATH`.
    services_url: Url,
    /// Our connection pool, configured with the per-request timeout.
    http: reqwest::Client,
}

impl Client {
    /// Create a new `Client` talking to the server at `base_url`.
    pub fn new(base_url: &str) -> Result<Client> {
        Self::with_request_timeout(base_url, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Create a new `Client` whose individual HTTP requests give up after
    /// `timeout`.
    pub fn with_request_timeout(base_url: &str, timeout: Duration) -> Result<Client> {
        let mut base = base_url.to_owned();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url =
            Url::parse(&base).map_err(|e| Error::could_not_parse_url(&base, e))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::could_not_parse_url(
                base,
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        let services_url = base_url
            .join(SERVICES_PATH)
            .map_err(|e| Error::could_not_parse_url(&base, e))?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("jaqpot-rs/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Client {
            base_url,
            services_url,
            http,
        })
    }

    /// Create a new `Client` using the `JAQPOT_URL` environment variable,
    /// falling back to `DEFAULT_JAQPOT_URL`.
    pub fn new_from_env() -> Result<Client> {
        match env::var("JAQPOT_URL") {
            Ok(url) if !url.is_empty() => Self::new(&url),
            Ok(_) | Err(env::VarError::NotPresent) => Self::new(DEFAULT_JAQPOT_URL),
            Err(env::VarError::NotUnicode(_)) => Err(Error::missing_env_var("JAQPOT_URL")),
        }
    }

    /// The base URL of the server we talk to.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Generate a URL below the services root from path segments. Segments
    /// are escaped, so IDs can't break out of their path position.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.services_url.clone();
        // We checked at construction that this URL can be a base.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// The URL of a specific resource.
    fn resource_url<R: Resource>(&self, id: &Id<R>) -> Url {
        self.url(&[R::api_name(), id.as_str()])
    }

    /// The URL of a collection of resources, with a trailing slash.
    fn collection_url<R: Resource>(&self) -> Url {
        self.url(&[R::api_name(), ""])
    }

    /// Fetch an existing resource.
    pub async fn fetch<R: Resource>(&self, id: &Id<R>, token: &str) -> Result<R> {
        self.get(self.resource_url(id), token).await
    }

    /// Fetch a feature.
    pub async fn get_feature(&self, id: &Id<Feature>, token: &str) -> Result<Feature> {
        self.fetch(id, token).await
    }

    /// Fetch a dataset, including all of its rows.
    pub async fn get_dataset(&self, id: &Id<Dataset>, token: &str) -> Result<Dataset> {
        let mut url = self.resource_url(id);
        url.query_pairs_mut().append_pair("dataEntries", "true");
        self.get(url, token).await
    }

    /// Fetch the domain of applicability of a model.
    pub async fn get_doa(&self, model: &Id<Model>, token: &str) -> Result<Doa> {
        let mut url = self.collection_url::<Doa>();
        url.query_pairs_mut().append_pair("hasSources", model.as_str());
        self.get(url, token).await
    }

    /// Fetch a task.
    pub async fn get_task(&self, id: &Id<Task>, token: &str) -> Result<Task> {
        self.fetch(id, token).await
    }

    /// Fetch a model.
    pub async fn get_model(&self, id: &Id<Model>, token: &str) -> Result<Model> {
        self.fetch(id, token).await
    }

    /// List the caller's own models, from index `min` to `max`.
    pub async fn get_my_models(&self, min: u64, max: u64, token: &str) -> Result<Models> {
        self.list_models(&[], min, max, token).await
    }

    /// List the models of an organization.
    pub async fn get_orgs_models(
        &self,
        organization: &str,
        min: u64,
        max: u64,
        token: &str,
    ) -> Result<Models> {
        self.list_models(&[("organization", organization)], min, max, token)
            .await
    }

    /// List the models of an organization which carry `tag`.
    pub async fn get_orgs_models_by_tag(
        &self,
        organization: &str,
        tag: &str,
        min: u64,
        max: u64,
        token: &str,
    ) -> Result<Models> {
        self.list_models(
            &[("organization", organization), ("tag", tag)],
            min,
            max,
            token,
        )
        .await
    }

    async fn list_models(
        &self,
        filters: &[(&str, &str)],
        min: u64,
        max: u64,
        token: &str,
    ) -> Result<Models> {
        let mut url = self.collection_url::<Model>();
        url.query_pairs_mut()
            .extend_pairs(filters)
            .append_pair("min", &min.to_string())
            .append_pair("max", &max.to_string());
        debug!("GET {}", url);
        let res = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::could_not_access_url(&url, e))?;
        let total = res
            .headers()
            .get("total")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let models: Vec<Model> = self.handle_response_and_deserialize(&url, res).await?;
        let total = total.unwrap_or_else(|| {
            warn!("no usable Total header from {}, counting this page", url);
            models.len() as u64
        });
        Ok(Models { total, models })
    }

    /// Upload a dataset, returning the ID Jaqpot assigned to it.
    pub async fn post_dataset(&self, dataset: &Dataset, token: &str) -> Result<Id<Dataset>> {
        let url = self.collection_url::<Dataset>();
        debug!(
            "POST {} ({} features, {} rows)",
            url,
            dataset.features.len(),
            dataset.data_entry.len(),
        );
        let res = self
            .http
            .post(url.clone())
            .bearer_auth(token)
            .json(dataset)
            .send()
            .await
            .map_err(|e| Error::could_not_access_url(&url, e))?;
        if !res.status().is_success() {
            return self.response_to_err(&url, res).await;
        }
        let location = res
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| Error::MissingHeader {
                url: url.clone(),
                header: "Location",
            })?;
        let id = Id::from_reference(location)?;
        debug!("created dataset {}", id);
        Ok(id)
    }

    /// Ask Jaqpot to run `model` over `dataset`. This returns immediately
    /// with a `Task` which we can poll.
    pub async fn submit_prediction(
        &self,
        model: &Id<Model>,
        dataset: &Id<Dataset>,
        token: &str,
    ) -> Result<Task> {
        let url = self.resource_url(model);
        let dataset_uri = self.resource_url(dataset);
        debug!("POST {} dataset_uri={}", url, dataset_uri);
        let res = self
            .http
            .post(url.clone())
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .form(&[("dataset_uri", dataset_uri.as_str()), ("visible", "true")])
            .send()
            .await
            .map_err(|e| Error::could_not_access_url(&url, e))?;
        self.handle_response_and_deserialize(&url, res).await
    }

    /// Run `model` over `rows`, waiting for the result with the default
    /// `WaitOptions`.
    pub async fn predict(
        &self,
        model: &Id<Model>,
        rows: &[Values],
        token: &str,
    ) -> Result<Prediction> {
        self.predict_opt(model, rows, token, &WaitOptions::default())
            .await
    }

    /// Run `model` over `rows`, honoring `options` while waiting for the
    /// prediction task.
    pub async fn predict_opt(
        &self,
        model: &Id<Model>,
        rows: &[Values],
        token: &str,
        options: &WaitOptions,
    ) -> Result<Prediction> {
        prediction::predict(self, model, rows, token, options).await
    }

    /// Send an authenticated GET request and deserialize the response.
    async fn get<T>(&self, url: Url, token: &str) -> Result<T>
    where
        T: DeserializeOwned,
    {
        debug!("GET {}", url);
        let res = self
            .http
            .get(url.clone())
            .bearer_auth(token)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| Error::could_not_access_url(&url, e))?;
        self.handle_response_and_deserialize(&url, res).await
    }

    /// Handle a response from the server, deserializing it as the
    /// appropriate type.
    async fn handle_response_and_deserialize<T>(
        &self,
        url: &Url,
        res: reqwest::Response,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        if res.status().is_success() {
            let body = res
                .text()
                .await
                .map_err(|e| Error::could_not_access_url(url, e))?;
            trace!("Success body: {}", &body);
            let properties = serde_json::from_str(&body)
                .map_err(|e| Error::could_not_access_url(url, e))?;
            Ok(properties)
        } else {
            self.response_to_err(url, res).await
        }
    }

    async fn response_to_err<T>(&self, url: &Url, res: reqwest::Response) -> Result<T> {
        let url = url.to_owned();
        let status: StatusCode = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| Error::could_not_access_url(&url, e))?;
        debug!("Error status: {} body: {}", status, body);
        match serde_json::from_str::<ErrorReport>(&body) {
            Ok(report) if report.is_populated() => {
                Err(Error::from_report(url, status, report))
            }
            _ => Err(Error::UnexpectedHttpStatus { url, status, body }),
        }
    }
}

#[async_trait]
impl Api for Client {
    async fn get_model(&self, model: &Id<Model>, token: &str) -> Result<Model> {
        Client::get_model(self, model, token).await
    }

    async fn post_dataset(&self, dataset: &Dataset, token: &str) -> Result<Id<Dataset>> {
        Client::post_dataset(self, dataset, token).await
    }

    async fn submit_prediction(
        &self,
        model: &Id<Model>,
        dataset: &Id<Dataset>,
        token: &str,
    ) -> Result<Task> {
        Client::submit_prediction(self, model, dataset, token).await
    }

    async fn get_task(&self, task: &Id<Task>, token: &str) -> Result<Task> {
        Client::get_task(self, task, token).await
    }

    async fn get_dataset(&self, dataset: &Id<Dataset>, token: &str) -> Result<Dataset> {
        Client::get_dataset(self, dataset, token).await
    }
}

#[test]
fn base_url_gets_trailing_slash() {
    let client = Client::new("https://example.com/api").unwrap();
    assert_eq!(client.base_url().as_str(), "https://example.com/api/");
    let model: Id<Model> = "m1".parse().unwrap();
    assert_eq!(
        client.resource_url(&model).as_str(),
        "https://example.com/api/jaqpot/services/model/m1",
    );
}

#[test]
fn collection_urls_end_with_slash() {
    let client = Client::new("https://example.com/").unwrap();
    assert_eq!(
        client.collection_url::<Dataset>().as_str(),
        "https://example.com/jaqpot/services/dataset/",
    );
}

#[test]
fn ids_are_escaped_in_urls() {
    let client = Client::new("https://example.com/").unwrap();
    let task: Id<Task> = "a b".parse().unwrap();
    assert_eq!(
        client.resource_url(&task).as_str(),
        "https://example.com/jaqpot/services/task/a%20b",
    );
}

#[test]
fn rejects_unparseable_base_url() {
    assert!(matches!(
        Client::new("not a url"),
        Err(Error::CouldNotParseUrl { .. })
    ));
    assert!(matches!(
        Client::new("mailto:someone@example.com"),
        Err(Error::CouldNotParseUrl { .. })
    ));
}
