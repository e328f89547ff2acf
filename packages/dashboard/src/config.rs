//! Dashboard settings, read from an optional TOML file.
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000/api/v1"
//!
//! [charts]
//! by_state = 10
//! segmented = 6
//!
//! [table]
//! page_size = 20
//!
//! [session]
//! path = "data/session.json"
//! persist_filters = true
//! ```
//!
//! Every key is optional. `DATAPLANE_API_URL` and `DATAPLANE_API_TOKEN`
//! override the `[api]` section.

use std::path::{Path, PathBuf};

use dataplane_client::ClientConfig;
use serde::{Deserialize, Serialize};

use crate::DashboardError;

/// Top-N per chart. Each chart has its own limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartLimits {
    /// Occurrences by state.
    pub by_state: usize,
    /// Occurrences by classification.
    pub by_classification: usize,
    /// Occurrences by damage level.
    pub by_damage: usize,
    /// Occurrences by aircraft type.
    pub by_aircraft_type: usize,
    /// Series in the segmented chart, excluding "Other".
    pub segmented: usize,
}

impl Default for ChartLimits {
    fn default() -> Self {
        Self {
            by_state: 10,
            by_classification: 10,
            by_damage: 5,
            by_aircraft_type: 5,
            segmented: 6,
        }
    }
}

/// Record table settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Rows per page.
    pub page_size: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

/// Where and what to persist between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session file. Nothing is persisted when unset.
    pub path: Option<PathBuf>,
    /// Also persist the active filters.
    pub persist_filters: bool,
}

/// All dashboard settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// API connection.
    pub api: ClientConfig,
    /// Per-chart top-N.
    pub charts: ChartLimits,
    /// Record table.
    pub table: TableConfig,
    /// Session persistence.
    pub session: SessionConfig,
}

impl DashboardConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Toml`] if the document is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self, DashboardError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Loads `path` if given, otherwise the defaults, then applies the
    /// API environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError`] if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, DashboardError> {
        let mut config = match path {
            Some(path) => {
                log::debug!("Loading dashboard config from {}", path.display());
                Self::from_toml(&std::fs::read_to_string(path)?)?
            }
            None => Self::default(),
        };
        config.api = config.api.with_env();
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(DashboardConfig::from_toml("").unwrap(), DashboardConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = DashboardConfig::from_toml(
            r#"
            [api]
            base_url = "https://dataplane.example/api/v1"

            [charts]
            by_state = 5

            [session]
            path = "session.json"
            persist_filters = true
            "#,
        )
        .unwrap();
        assert_eq!(config.api.base_url, "https://dataplane.example/api/v1");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.charts.by_state, 5);
        assert_eq!(config.charts.segmented, 6);
        assert_eq!(config.table.page_size, 20);
        assert_eq!(config.session.path, Some(PathBuf::from("session.json")));
        assert!(config.session.persist_filters);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(matches!(
            DashboardConfig::from_toml("[charts]\nby_state = \"ten\""),
            Err(DashboardError::Toml(_))
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.toml");
        std::fs::write(&path, "[table]\npage_size = 50\n").unwrap();
        let config = DashboardConfig::load(Some(&path)).unwrap();
        assert_eq!(config.table.page_size, 50);
    }
}
