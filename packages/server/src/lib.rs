#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web development server for the occurrence API.
//!
//! Loads an occurrence CSV once at start-up and serves the read-only
//! endpoints the dashboard consumes under `/api/v1`. When a token is
//! configured every route requires `Authorization: Bearer <token>`.

pub mod dataset;
mod handlers;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use thiserror::Error;

pub use dataset::Dataset;

/// Version reported by the health endpoint.
pub const API_VERSION: &str = "1.0.0";

/// Default cap on `limit` for the coordinates endpoint.
pub const DEFAULT_MAX_LIMIT: usize = 20_000;

/// Errors from loading the dataset or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The dataset CSV is malformed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A dataset row could not be decoded.
    #[error("Record decoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Server settings, normally read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Address to bind.
    pub bind_addr: String,
    /// Port to bind.
    pub port: u16,
    /// Occurrence CSV. The server starts empty when unset.
    pub dataset: Option<PathBuf>,
    /// Required bearer token, if any.
    pub token: Option<String>,
    /// Cap on `limit` for the coordinates endpoint.
    pub max_limit: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8000,
            dataset: None,
            token: None,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

impl ServerSettings {
    /// Reads `BIND_ADDR`, `PORT`, `DATAPLANE_DATASET`,
    /// `DATAPLANE_API_TOKEN` and `DATAPLANE_MAX_LIMIT`. Unset or
    /// unparseable values keep their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| {
            std::env::var(name)
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        Self {
            bind_addr: var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: var("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            dataset: var("DATAPLANE_DATASET").map(PathBuf::from),
            token: var("DATAPLANE_API_TOKEN"),
            max_limit: var("DATAPLANE_MAX_LIMIT")
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(defaults.max_limit),
        }
    }
}

/// Shared application state.
pub struct AppState {
    /// The loaded occurrences.
    pub dataset: Arc<Dataset>,
    /// Required bearer token, if any.
    pub token: Option<String>,
    /// Cap on `limit` for the coordinates endpoint.
    pub max_limit: usize,
}

impl AppState {
    /// Creates the state for `dataset` with the given settings.
    #[must_use]
    pub fn new(dataset: Dataset, settings: &ServerSettings) -> Self {
        Self {
            dataset: Arc::new(dataset),
            token: settings.token.clone(),
            max_limit: settings.max_limit.max(1),
        }
    }
}

/// Registers the API routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health))
            .route(
                "/occurrences/coordinates",
                web::get().to(handlers::occurrences),
            )
            .route(
                "/occurrences/filter-options",
                web::get().to(handlers::filter_options),
            ),
    );
}

/// Loads the dataset named by `path`, or an empty one when unset.
///
/// # Errors
///
/// Returns [`ServerError`] if the file cannot be read or decoded.
pub fn load_dataset(path: Option<&Path>) -> Result<Dataset, ServerError> {
    path.map_or_else(
        || {
            log::warn!("DATAPLANE_DATASET not set, serving an empty dataset");
            Ok(Dataset::default())
        },
        Dataset::load,
    )
}

/// Starts the API server.
///
/// Logging must already be initialised. This is a regular async function;
/// the caller provides the runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns [`ServerError`] if the dataset cannot be loaded or the HTTP
/// server fails to bind or run.
#[allow(clippy::future_not_send)]
pub async fn run_server(settings: ServerSettings) -> Result<(), ServerError> {
    let dataset = load_dataset(settings.dataset.as_deref())?;
    if settings.token.is_none() {
        log::warn!("DATAPLANE_API_TOKEN not set, API is unauthenticated");
    }
    let state = web::Data::new(AppState::new(dataset, &settings));

    log::info!(
        "Starting server on {}:{}",
        settings.bind_addr,
        settings.port
    );

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((settings.bind_addr.as_str(), settings.port))?
    .run()
    .await?;

    Ok(())
}
