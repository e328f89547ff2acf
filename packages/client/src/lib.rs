#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Client for the aviation occurrence API.
//!
//! [`OccurrenceApi`] is the seam the dashboard depends on; [`ApiClient`]
//! implements it over HTTP with bearer-token authentication and retry on
//! transient failures.

pub mod config;
pub mod retry;

use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use dataplane_server_models::{
    ApiHealth, FilterOptionsResponse, OccurrencesResponse, PredictionRequest, PredictionResponse,
};

pub use config::ClientConfig;

/// Errors that can occur while talking to the API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server rejected the credentials (HTTP 401).
    #[error("Not authorized: the API rejected the token")]
    Unauthorized,

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Status {
        /// Status code.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// The call needs a token and none is configured.
    #[error("No API token configured (set {})", config::API_TOKEN_ENV)]
    TokenMissing,
}

impl ClientError {
    /// Whether this is an authentication failure rather than a fetch
    /// failure.
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::TokenMissing)
    }
}

/// The remote operations the dashboard consumes.
#[async_trait]
pub trait OccurrenceApi: Send + Sync {
    /// Fetches occurrence records. With `complete` set, records without
    /// coordinates are included.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn occurrences(&self, complete: bool) -> Result<OccurrencesResponse, ClientError>;

    /// Fetches the selectable values per filter category.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn filter_options(&self) -> Result<FilterOptionsResponse, ClientError>;

    /// Requests a prediction.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse, ClientError>;

    /// Fetches the values accepted by each prediction input.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn form_options(&self) -> Result<BTreeMap<String, Vec<String>>, ClientError>;

    /// Calls the health endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    async fn health(&self) -> Result<ApiHealth, ClientError>;

    /// Whether credentials are configured at all.
    fn has_credentials(&self) -> bool {
        true
    }
}

/// HTTP implementation of [`OccurrenceApi`].
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl ApiClient {
    /// Builds a client with the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        log::debug!("API client for {}", config.base_url);
        Ok(Self { http, config })
    }

    /// The settings this client was built with.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.get(self.config.endpoint(path)))
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.authorize(self.http.post(self.config.endpoint(path)))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.token.as_deref() {
            Some(token) if !token.trim().is_empty() => builder.bearer_auth(token.trim()),
            _ => builder,
        }
    }
}

#[async_trait]
impl OccurrenceApi for ApiClient {
    async fn occurrences(&self, complete: bool) -> Result<OccurrencesResponse, ClientError> {
        let response: OccurrencesResponse = retry::send_json(
            || {
                self.get("occurrences/coordinates")
                    .query(&[("complete", complete)])
            },
            self.config.max_retries,
        )
        .await?;
        log::info!(
            "Fetched {} of {} occurrences",
            response.ocurrences.len(),
            response.total
        );
        Ok(response)
    }

    async fn filter_options(&self) -> Result<FilterOptionsResponse, ClientError> {
        retry::send_json(
            || self.get("occurrences/filter-options"),
            self.config.max_retries,
        )
        .await
    }

    async fn predict(
        &self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, ClientError> {
        if !self.config.has_token() {
            return Err(ClientError::TokenMissing);
        }
        retry::send_json(|| self.post("predict").json(request), self.config.max_retries).await
    }

    async fn form_options(&self) -> Result<BTreeMap<String, Vec<String>>, ClientError> {
        retry::send_json(|| self.get("predict/form-options"), self.config.max_retries).await
    }

    async fn health(&self) -> Result<ApiHealth, ClientError> {
        retry::send_json(|| self.get("health"), self.config.max_retries).await
    }

    fn has_credentials(&self) -> bool {
        self.config.has_token()
    }
}
