#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Request and response types of the occurrence API.
//!
//! Field names follow the wire contract exactly, including the
//! `ocurrences` spelling of the record array and the Portuguese column
//! names of the prediction payload.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dataplane_occurrence_models::OccurrenceRecord;
use serde::{Deserialize, Serialize};

/// Response of `GET /occurrences/coordinates`.
///
/// `total` is what the server reports and may exceed
/// `ocurrences.len()` when the server caps the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OccurrencesResponse {
    /// Total number of matching records on the server.
    #[serde(default)]
    pub total: u64,
    /// The records actually returned.
    #[serde(default)]
    pub ocurrences: Vec<OccurrenceRecord>,
}

/// Query parameters of `GET /occurrences/coordinates`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccurrenceQueryParams {
    /// Include records without coordinates.
    pub complete: Option<bool>,
    /// Maximum number of records to return.
    pub limit: Option<usize>,
    /// Number of records to skip.
    pub skip: Option<usize>,
}

/// Summary attached to the filter vocabulary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptionsMetadata {
    /// Number of options across all categories.
    #[serde(default)]
    pub total_unique_options: usize,
    /// Number of categories.
    #[serde(default)]
    pub fields_available: usize,
    /// Name of the collection the options were read from.
    #[serde(default)]
    pub data_source: String,
    /// Free-form note.
    #[serde(default)]
    pub note: String,
}

/// Response of `GET /occurrences/filter-options`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptionsResponse {
    /// Category name → known values.
    #[serde(default)]
    pub filter_options: BTreeMap<String, Vec<String>>,
    /// Counts.
    #[serde(default)]
    pub metadata: FilterOptionsMetadata,
}

impl FilterOptionsResponse {
    /// Builds a response, deriving the metadata counts from `filter_options`.
    #[must_use]
    pub fn new(filter_options: BTreeMap<String, Vec<String>>, data_source: &str) -> Self {
        let metadata = FilterOptionsMetadata {
            total_unique_options: filter_options.values().map(Vec::len).sum(),
            fields_available: filter_options.len(),
            data_source: data_source.to_string(),
            note: "Values trimmed, de-duplicated and sorted alphabetically".to_string(),
        };
        Self {
            filter_options,
            metadata,
        }
    }
}

/// Body of `POST /predict`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Operation type.
    #[serde(rename = "aeronave_tipo_operacao")]
    pub operation_type: String,
    /// Contributing factor area.
    #[serde(rename = "fator_area")]
    pub factor_area: String,
    /// Vehicle type.
    #[serde(rename = "aeronave_tipo_veiculo")]
    pub vehicle_type: String,
    /// Two-letter state code.
    #[serde(rename = "ocorrencia_uf")]
    pub state: String,
    /// Aircraft manufacture year.
    #[serde(rename = "aeronave_ano_fabricacao")]
    pub manufacture_year: u32,
    /// Fatality count.
    #[serde(rename = "aeronave_fatalidades_total")]
    pub fatalities: u32,
}

/// Response of `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Predicted class label.
    pub prediction: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

impl PredictionResponse {
    /// Confidence clamped to `[0, 1]`; `NaN` becomes zero.
    #[must_use]
    pub fn clamped_confidence(&self) -> f64 {
        if self.confidence.is_nan() {
            0.0
        } else {
            self.confidence.clamp(0.0, 1.0)
        }
    }
}

/// Response of `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiHealth {
    /// `"healthy"` when the service is up.
    pub status: String,
    /// Server time of the check.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Service version.
    #[serde(default)]
    pub version: Option<String>,
}

impl ApiHealth {
    /// A healthy response stamped with the current time.
    #[must_use]
    pub fn healthy(version: &str) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: Some(Utc::now()),
            version: Some(version.to_string()),
        }
    }

    /// Whether the reported status is healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// JSON error body returned by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// Human-readable message.
    #[serde(alias = "detail")]
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occurrences_total_is_independent_of_page() {
        let json = r#"{"total": 23000, "ocurrences": [{"ocorrencia_uf": "SP"}, {"ocorrencia_uf": "RJ"}]}"#;
        let response: OccurrencesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.total, 23000);
        assert_eq!(response.ocurrences.len(), 2);
        assert_eq!(response.ocurrences[1].state.as_deref(), Some("RJ"));
    }

    #[test]
    fn prediction_request_uses_column_names() {
        let request = PredictionRequest {
            operation_type: "PRIVADA".to_string(),
            factor_area: "FATOR HUMANO".to_string(),
            vehicle_type: "AVIÃO".to_string(),
            state: "SP".to_string(),
            manufacture_year: 2005,
            fatalities: 0,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["aeronave_tipo_operacao"], "PRIVADA");
        assert_eq!(value["ocorrencia_uf"], "SP");
        assert_eq!(value["aeronave_ano_fabricacao"], 2005);
        assert_eq!(value.as_object().unwrap().len(), 6);
    }

    #[test]
    fn filter_options_metadata_counts() {
        let mut options = BTreeMap::new();
        options.insert("states".to_string(), vec!["RJ".to_string(), "SP".to_string()]);
        options.insert("classifications".to_string(), vec!["ACIDENTE".to_string()]);
        let response = FilterOptionsResponse::new(options, "occurrences");
        assert_eq!(response.metadata.total_unique_options, 3);
        assert_eq!(response.metadata.fields_available, 2);
    }

    #[test]
    fn confidence_is_clamped() {
        let response = PredictionResponse {
            prediction: "ACIDENTE".to_string(),
            confidence: 1.7,
        };
        assert!((response.clamped_confidence() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn error_body_accepts_detail() {
        let body: ApiErrorBody =
            serde_json::from_str(r#"{"detail": "Not authenticated"}"#).unwrap();
        assert_eq!(body.error, "Not authenticated");
    }
}
