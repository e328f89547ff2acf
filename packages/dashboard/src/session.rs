//! Session persistence.
//!
//! Only small UI state survives a restart: the current view, the
//! authentication flag and, when enabled, the active filters. Record
//! arrays are never written; they are re-fetched on start-up.
//!
//! A session file that cannot be parsed is discarded with a warning and
//! the defaults are used.

use std::{
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use dataplane_filter::{FilterChange, FilterListener, FilterState};
use dataplane_occurrence_models::RecordField;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{DashboardError, config::SessionConfig};

/// Top-level screens of the dashboard.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum View {
    /// Prediction form
    Prediction,
    /// Map and headline numbers
    #[default]
    Dashboard,
    /// Temporal and categorical charts
    Charts,
    /// Paginated record table
    Incidents,
}

impl View {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Prediction, Self::Dashboard, Self::Charts, Self::Incidents]
    }
}

/// What is persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionState {
    /// Screen shown on start-up.
    pub current_view: View,
    /// Whether the last authentication check succeeded.
    pub is_authenticated: bool,
    /// Active filters, when filter persistence is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterState>,
}

/// Reads a session file. A missing file yields the defaults; an
/// unreadable or corrupt one is deleted and yields the defaults.
#[must_use]
pub fn read_session(path: &Path) -> SessionState {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SessionState::default(),
        Err(e) => {
            log::warn!("Could not read session file {}: {e}", path.display());
            return SessionState::default();
        }
    };

    match serde_json::from_str(&text) {
        Ok(state) => state,
        Err(e) => {
            log::warn!(
                "Discarding corrupt session file {}: {e}",
                path.display()
            );
            if let Err(e) = std::fs::remove_file(path) {
                log::warn!("Could not remove {}: {e}", path.display());
            }
            SessionState::default()
        }
    }
}

/// Writes a session file, creating its parent directory.
///
/// # Errors
///
/// Returns [`DashboardError`] if the file cannot be written.
pub fn write_session(path: &Path, state: &SessionState) -> Result<(), DashboardError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, serde_json::to_string_pretty(state)?)?;
    Ok(())
}

/// Shared session state, written through to disk on every change.
///
/// Registered as a [`FilterListener`] so that filter changes are persisted
/// without the dashboard having to remember to do it.
#[derive(Debug, Default)]
pub struct SessionStore {
    path: Option<PathBuf>,
    persist_filters: bool,
    state: Mutex<SessionState>,
}

impl SessionStore {
    /// Opens the session described by `config`, loading any saved state.
    /// Saved filters are dropped when filter persistence is disabled.
    #[must_use]
    pub fn open(config: &SessionConfig) -> Self {
        let mut state = config
            .path
            .as_deref()
            .map(read_session)
            .unwrap_or_default();
        if !config.persist_filters {
            state.filters = None;
        }
        Self {
            path: config.path.clone(),
            persist_filters: config.persist_filters,
            state: Mutex::new(state),
        }
    }

    /// A session that is never written to disk.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Loads the session described by `config` like [`Self::open`], but
    /// keeps later changes in memory. The saved file is left untouched.
    #[must_use]
    pub fn read_only(config: &SessionConfig) -> Self {
        Self {
            path: None,
            ..Self::open(config)
        }
    }

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.lock().clone()
    }

    /// Records the current view.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError`] if the session cannot be written.
    pub fn set_view(&self, view: View) -> Result<(), DashboardError> {
        self.update(|state| state.current_view = view)
    }

    /// Records the authentication flag.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError`] if the session cannot be written.
    pub fn set_authenticated(&self, authenticated: bool) -> Result<(), DashboardError> {
        self.update(|state| state.is_authenticated = authenticated)
    }

    fn update(&self, apply: impl FnOnce(&mut SessionState)) -> Result<(), DashboardError> {
        let mut state = self.lock();
        let before = state.clone();
        apply(&mut *state);
        if *state == before {
            return Ok(());
        }
        match &self.path {
            Some(path) => write_session(path, &state),
            None => Ok(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl FilterListener for SessionStore {
    fn on_change(
        &self,
        _change: &FilterChange,
        filters: &FilterState,
        _segment_by: Option<RecordField>,
    ) {
        if !self.persist_filters {
            return;
        }
        let filters = Some(filters.clone()).filter(|f| !f.is_unconstrained());
        if let Err(e) = self.update(|state| state.filters = filters) {
            log::warn!("Failed to persist filters: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use dataplane_filter::FilterKey;

    use super::*;

    fn config(dir: &tempfile::TempDir, persist_filters: bool) -> SessionConfig {
        SessionConfig {
            path: Some(dir.path().join("state").join("session.json")),
            persist_filters,
        }
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionStore::open(&config(&dir, false));
        assert_eq!(session.snapshot(), SessionState::default());
        assert_eq!(session.snapshot().current_view, View::Dashboard);
    }

    #[test]
    fn view_and_auth_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let session = SessionStore::open(&config(&dir, false));
        session.set_view(View::Incidents).unwrap();
        session.set_authenticated(true).unwrap();

        let reopened = SessionStore::open(&config(&dir, false));
        assert_eq!(reopened.snapshot().current_view, View::Incidents);
        assert!(reopened.snapshot().is_authenticated);
    }

    #[test]
    fn corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir, true);
        let path = cfg.path.clone().unwrap();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();

        let session = SessionStore::open(&cfg);
        assert_eq!(session.snapshot(), SessionState::default());
        assert!(!path.exists());
    }

    #[test]
    fn filters_persist_only_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut filters = FilterState::new();
        filters.insert(FilterKey::State, vec!["SP"].into());

        let session = SessionStore::open(&config(&dir, true));
        session.on_change(&FilterChange::Set(FilterKey::State), &filters, None);
        let reopened = SessionStore::open(&config(&dir, true));
        assert_eq!(reopened.snapshot().filters, Some(filters.clone()));

        let without = SessionStore::open(&config(&dir, false));
        assert_eq!(without.snapshot().filters, None);
    }

    #[test]
    fn read_only_session_loads_but_never_writes() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(&dir, true);
        let mut saved = FilterState::new();
        saved.insert(FilterKey::State, vec!["SP"].into());
        SessionStore::open(&cfg).on_change(&FilterChange::Set(FilterKey::State), &saved, None);
        let before = std::fs::read_to_string(cfg.path.as_ref().unwrap()).unwrap();

        let session = SessionStore::read_only(&cfg);
        assert_eq!(session.snapshot().filters, Some(saved.clone()));

        let mut other = FilterState::new();
        other.insert(FilterKey::Classification, vec!["ACIDENTE"].into());
        session.on_change(&FilterChange::Replaced, &other, None);
        session.set_view(View::Charts).unwrap();
        assert_eq!(session.snapshot().filters, Some(other));
        assert_eq!(session.snapshot().current_view, View::Charts);

        let after = std::fs::read_to_string(cfg.path.as_ref().unwrap()).unwrap();
        assert_eq!(after, before);
        assert_eq!(SessionStore::open(&cfg).snapshot().filters, Some(saved));
    }

    #[test]
    fn records_are_never_part_of_the_session() {
        let json = serde_json::to_value(SessionState::default()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["currentView", "isAuthenticated"]);
    }
}
