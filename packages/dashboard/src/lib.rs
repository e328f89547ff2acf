#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Filter-driven dashboard state.
//!
//! [`Dashboard`] owns the fetched records, the filter store and the
//! derived views. Every filter mutation goes through its setters; the
//! filter store notifies its listeners (which mark the views dirty and
//! persist the session), and the dashboard then rebuilds the map, chart
//! and table views and pushes them to every registered [`ViewRenderer`]
//! before the setter returns.
//!
//! Fetches follow a last-writer-wins rule: each fetch takes a
//! [`FetchTicket`], and a response is only applied if its ticket is the
//! most recent one issued.

pub mod config;
pub mod export;
pub mod record_store;
pub mod session;
pub mod views;

use std::{
    collections::BTreeMap,
    io::Write,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use dataplane_client::{ClientError, OccurrenceApi};
use dataplane_filter::{
    FilterChange, FilterKey, FilterState, FilterStore, FilterValue, FilterVocabulary, predicate,
};
use dataplane_occurrence_models::{OccurrenceRecord, RecordField};
use dataplane_server_models::{OccurrencesResponse, PredictionRequest, PredictionResponse};
use strum_macros::{AsRefStr, Display};
use thiserror::Error;

pub use config::DashboardConfig;
pub use record_store::RecordStore;
pub use session::{SessionState, SessionStore, View};
pub use views::{DashboardView, ViewRenderer};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors from dashboard operations.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The configuration file is invalid.
    #[error("Config error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CSV writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An API call failed.
    #[error(transparent)]
    Client(#[from] ClientError),
}

// ---------------------------------------------------------------------------
// Status types
// ---------------------------------------------------------------------------

/// Result of the last authentication check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum AuthStatus {
    /// The API answered the health check with the configured token.
    Connected,
    /// No token is configured or the API is unreachable.
    Disconnected,
    /// The API rejected the token. Call [`Dashboard::check_auth`] to retry.
    Unauthorized,
}

/// Severity of a transient user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NotificationLevel {
    /// Informational
    Info,
    /// Something failed but the session continues
    Error,
}

/// A transient message for the user (a toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Message text.
    pub message: String,
}

/// Identifies one issued fetch. Only the most recent ticket's response
/// is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// The dashboard state owner.
pub struct Dashboard {
    api: Arc<dyn OccurrenceApi>,
    config: DashboardConfig,
    records: RecordStore,
    filters: FilterStore,
    vocabulary: FilterVocabulary,
    session: Arc<SessionStore>,
    dirty: Arc<AtomicBool>,
    renderers: Vec<Arc<dyn ViewRenderer>>,
    view: DashboardView,
    page: usize,
    loading: bool,
    error: Option<String>,
    notifications: Vec<Notification>,
    auth: AuthStatus,
    issued: u64,
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("records", &self.records.fetched())
            .field("filters", &self.filters)
            .field("page", &self.page)
            .field("loading", &self.loading)
            .field("error", &self.error)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

impl Dashboard {
    /// Creates a dashboard, restoring the saved session described by
    /// `config.session`.
    #[must_use]
    pub fn new(api: Arc<dyn OccurrenceApi>, config: DashboardConfig) -> Self {
        let session = Arc::new(SessionStore::open(&config.session));
        Self::with_session(api, config, session)
    }

    /// Creates a dashboard around an existing session store.
    #[must_use]
    pub fn with_session(
        api: Arc<dyn OccurrenceApi>,
        config: DashboardConfig,
        session: Arc<SessionStore>,
    ) -> Self {
        let saved = session.snapshot();
        let mut filters = saved
            .filters
            .map_or_else(FilterStore::new, FilterStore::with_filters);

        let dirty = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&dirty);
        filters.subscribe(Arc::new(
            move |_: &FilterChange, _: &FilterState, _: Option<RecordField>| {
                flag.store(true, Ordering::Release);
            },
        ));
        let persistence: Arc<SessionStore> = Arc::clone(&session);
        filters.subscribe(persistence);

        let auth = if saved.is_authenticated {
            AuthStatus::Connected
        } else {
            AuthStatus::Disconnected
        };

        let mut dashboard = Self {
            api,
            config,
            records: RecordStore::new(),
            filters,
            vocabulary: FilterVocabulary::default(),
            session,
            dirty,
            renderers: Vec::new(),
            view: DashboardView::default(),
            page: 1,
            loading: false,
            error: None,
            notifications: Vec::new(),
            auth,
            issued: 0,
        };
        dashboard.sync();
        dashboard
    }

    // -- read access --------------------------------------------------------

    /// The current derived views.
    #[must_use]
    pub const fn view(&self) -> &DashboardView {
        &self.view
    }

    /// The settings this dashboard runs with.
    #[must_use]
    pub const fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// The active filters.
    #[must_use]
    pub const fn filters(&self) -> &FilterState {
        self.filters.filters()
    }

    /// The chart segmentation field.
    #[must_use]
    pub const fn segment_by(&self) -> Option<RecordField> {
        self.filters.segment_by()
    }

    /// The fetched records.
    #[must_use]
    pub const fn records(&self) -> &RecordStore {
        &self.records
    }

    /// Records passing the active filters, in fetch order.
    #[must_use]
    pub fn filtered_records(&self) -> Vec<&OccurrenceRecord> {
        predicate::filter_records(self.records.records(), self.filters.filters())
    }

    /// Whether a record fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    /// Message of the last failed record fetch, cleared by the next
    /// successful one.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Result of the last authentication check.
    #[must_use]
    pub const fn auth_status(&self) -> AuthStatus {
        self.auth
    }

    /// Drains pending notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// The persisted session state.
    #[must_use]
    pub fn session(&self) -> SessionState {
        self.session.snapshot()
    }

    /// The screen currently shown.
    #[must_use]
    pub fn current_view(&self) -> View {
        self.session.snapshot().current_view
    }

    /// Switches screens. The choice is persisted.
    pub fn set_view(&mut self, view: View) {
        if let Err(e) = self.session.set_view(view) {
            log::warn!("Failed to persist current view: {e}");
        }
    }

    /// Registers a renderer and immediately renders the current view to it.
    pub fn subscribe(&mut self, renderer: Arc<dyn ViewRenderer>) {
        renderer.render(&self.view);
        self.renderers.push(renderer);
    }

    // -- filters ------------------------------------------------------------

    /// Assigns a filter. Assigning the state filter clears the city.
    pub fn set_filter(&mut self, key: FilterKey, value: impl Into<FilterValue>) {
        self.filters.set_filter(key, value);
        self.page = 1;
        self.sync();
    }

    /// Clears one filter.
    pub fn clear_filter(&mut self, key: FilterKey) {
        self.filters.clear_filter(key);
        self.page = 1;
        self.sync();
    }

    /// Clears every filter; the segmentation field is kept.
    pub fn clear_all(&mut self) {
        self.filters.clear_all();
        self.page = 1;
        self.sync();
    }

    /// Toggles a value of a multi-select filter. Returns whether it is
    /// selected afterwards.
    pub fn toggle(&mut self, key: FilterKey, value: &str) -> bool {
        let selected = self.filters.toggle(key, value);
        self.page = 1;
        self.sync();
        selected
    }

    /// Map click on a state: toggles it in the state filter.
    pub fn toggle_state(&mut self, code: &str) -> bool {
        self.toggle(FilterKey::State, code)
    }

    /// Replaces every filter at once.
    pub fn replace_filters(&mut self, filters: FilterState) {
        self.filters.replace(filters);
        self.page = 1;
        self.sync();
    }

    /// Sets or unsets the chart segmentation field.
    pub fn set_segment_by(&mut self, field: Option<RecordField>) {
        self.filters.set_segment_by(field);
        self.sync();
    }

    /// Moves the record table to `page` (1-based, clamped).
    pub fn set_page(&mut self, page: usize) {
        self.page = page;
        self.mark_dirty();
        self.sync();
        self.page = self.view.table.page;
    }

    /// Whether the selector for `key` is usable. The city selector needs
    /// a selected state.
    #[must_use]
    pub fn is_filter_enabled(&self, key: FilterKey) -> bool {
        FilterVocabulary::is_enabled(key, self.filters.filters())
    }

    /// Selectable options for `key`. City options are scoped to the
    /// selected states and fall back to cities seen in the fetched records
    /// when the vocabulary has none for those states.
    #[must_use]
    pub fn options_for(&self, key: FilterKey) -> Vec<String> {
        let filters = self.filters.filters();
        let options = self.vocabulary.options_for(key, filters);
        if key == FilterKey::City && options.is_empty() {
            return self.records.observed_cities(filters);
        }
        options
    }

    /// The filter vocabulary last loaded.
    #[must_use]
    pub const fn vocabulary(&self) -> &FilterVocabulary {
        &self.vocabulary
    }

    // -- fetches ------------------------------------------------------------

    /// Starts a record fetch. Any fetch issued earlier becomes stale.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        self.loading = true;
        log::debug!("Issued occurrence fetch #{}", self.issued);
        FetchTicket(self.issued)
    }

    /// Applies the outcome of the fetch identified by `ticket`. Returns
    /// `false`, changing nothing, if a newer fetch has been issued since.
    ///
    /// On failure the previous records are kept, the error is recorded and
    /// a notification is queued. A 401 also marks the session unauthorized.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<OccurrencesResponse, ClientError>,
    ) -> bool {
        if ticket.0 != self.issued {
            log::debug!(
                "Ignoring stale occurrence response #{} (latest is #{})",
                ticket.0,
                self.issued
            );
            return false;
        }
        self.loading = false;

        match result {
            Ok(response) => {
                log::info!(
                    "Loaded {} occurrences (server total {})",
                    response.ocurrences.len(),
                    response.total
                );
                self.records.replace(response);
                self.error = None;
                self.page = 1;
                self.mark_dirty();
                self.sync();
            }
            Err(e) => {
                log::warn!("Occurrence fetch failed: {e}");
                if matches!(e, ClientError::Unauthorized) {
                    self.set_auth(AuthStatus::Unauthorized);
                }
                let message = format!("Failed to load occurrences: {e}");
                self.notify(NotificationLevel::Error, &message);
                self.error = Some(message);
            }
        }
        true
    }

    /// Fetches every record, including those without coordinates.
    pub async fn load_occurrences(&mut self) -> bool {
        let ticket = self.begin_fetch();
        let api = Arc::clone(&self.api);
        let result = api.occurrences(true).await;
        self.complete_fetch(ticket, result)
    }

    /// Fetches the filter vocabulary. On failure the previous vocabulary
    /// is kept and a notification is queued.
    pub async fn load_filter_options(&mut self) -> bool {
        let api = Arc::clone(&self.api);
        match api.filter_options().await {
            Ok(response) => {
                log::info!(
                    "Loaded {} filter options in {} categories",
                    response.metadata.total_unique_options,
                    response.filter_options.len()
                );
                self.vocabulary = FilterVocabulary::new(response.filter_options);
                true
            }
            Err(e) => {
                log::warn!("Filter options fetch failed: {e}");
                if matches!(e, ClientError::Unauthorized) {
                    self.set_auth(AuthStatus::Unauthorized);
                }
                self.notify(
                    NotificationLevel::Error,
                    &format!("Failed to load filter options: {e}"),
                );
                false
            }
        }
    }

    /// Checks the health endpoint with the configured credentials.
    ///
    /// Without a token no request is made and the status is
    /// [`AuthStatus::Disconnected`].
    pub async fn check_auth(&mut self) -> AuthStatus {
        if !self.api.has_credentials() {
            log::warn!("API token not configured");
            self.set_auth(AuthStatus::Disconnected);
            return self.auth;
        }

        let api = Arc::clone(&self.api);
        let status = match api.health().await {
            Ok(health) if health.is_healthy() => AuthStatus::Connected,
            Ok(health) => {
                log::warn!("API reported status '{}'", health.status);
                AuthStatus::Disconnected
            }
            Err(ClientError::Unauthorized) => {
                self.notify(
                    NotificationLevel::Error,
                    "The API rejected the configured token",
                );
                AuthStatus::Unauthorized
            }
            Err(e) => {
                log::warn!("Health check failed: {e}");
                AuthStatus::Disconnected
            }
        };
        self.set_auth(status);
        status
    }

    /// Requests a prediction. Authentication failures update
    /// [`Dashboard::auth_status`].
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn predict(
        &mut self,
        request: &PredictionRequest,
    ) -> Result<PredictionResponse, ClientError> {
        let api = Arc::clone(&self.api);
        match api.predict(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                if matches!(e, ClientError::Unauthorized) {
                    self.set_auth(AuthStatus::Unauthorized);
                }
                self.notify(NotificationLevel::Error, &format!("Prediction failed: {e}"));
                Err(e)
            }
        }
    }

    /// Values accepted by each prediction input.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the request fails.
    pub async fn form_options(&self) -> Result<BTreeMap<String, Vec<String>>, ClientError> {
        self.api.form_options().await
    }

    // -- export -------------------------------------------------------------

    /// Writes the filtered records as CSV. Returns the number of rows.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError`] if writing fails.
    pub fn export_csv<W: Write>(&self, writer: W) -> Result<usize, DashboardError> {
        let rows = export::write_csv(self.filtered_records(), writer)?;
        log::info!("Exported {rows} occurrences");
        Ok(rows)
    }

    // -- internals ----------------------------------------------------------

    fn set_auth(&mut self, status: AuthStatus) {
        if self.auth != status {
            log::info!("API connection status: {status}");
        }
        self.auth = status;
        if let Err(e) = self
            .session
            .set_authenticated(status == AuthStatus::Connected)
        {
            log::warn!("Failed to persist authentication flag: {e}");
        }
    }

    fn notify(&mut self, level: NotificationLevel, message: &str) {
        self.notifications.push(Notification {
            level,
            message: message.to_string(),
        });
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Rebuilds and pushes the views if anything changed since the last
    /// rebuild.
    fn sync(&mut self) {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return;
        }
        self.view = DashboardView::build(
            &self.records,
            self.filters.filters(),
            self.filters.segment_by(),
            &self.config,
            self.page,
        );
        for renderer in &self.renderers {
            renderer.render(&self.view);
        }
    }
}
