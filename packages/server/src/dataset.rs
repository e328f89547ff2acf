//! The in-memory occurrence dataset served by the API.
//!
//! Loaded once at start-up from a CSV export whose header carries the
//! source column names (`codigo_ocorrencia`, `ocorrencia_uf`, ...). The
//! export is a single file with the occurrence, aircraft, occurrence type
//! and contributing factor tables already joined on `codigo_ocorrencia`.
//! Both `;` and `,` delimited files are accepted, in UTF-8 or Latin-1.
//! Each row goes through the
//! same lenient decoding as API payloads, so decimal-comma coordinates
//! and textual counts are understood.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::Path,
};

use dataplane_occurrence_models::{OccurrenceRecord, RecordField};
use serde_json::{Map, Value};

use crate::ServerError;

/// Values that mean "no value" in the source data.
const JUNK_VALUES: &[&str] = &["nan", "null", "***", "none", "-", "n/a"];

/// Default number of options kept per category.
const DEFAULT_OPTION_CAP: usize = 1000;

/// Filter-option categories: name, source field and per-category cap.
const OPTION_CATEGORIES: &[(&str, RecordField, usize)] = &[
    ("states", RecordField::State, DEFAULT_OPTION_CAP),
    ("cities", RecordField::City, 500),
    ("classifications", RecordField::Classification, DEFAULT_OPTION_CAP),
    ("countries", RecordField::Country, DEFAULT_OPTION_CAP),
    ("aerodromes", RecordField::Aerodrome, 300),
    ("aircraft_manufacturers", RecordField::AircraftManufacturer, DEFAULT_OPTION_CAP),
    ("aircraft_types", RecordField::AircraftType, DEFAULT_OPTION_CAP),
    ("aircraft_models", RecordField::AircraftModel, 200),
    ("damage_levels", RecordField::DamageLevel, DEFAULT_OPTION_CAP),
    ("aircraft_operators", RecordField::AircraftOperator, DEFAULT_OPTION_CAP),
    ("operation_phases", RecordField::OperationPhase, DEFAULT_OPTION_CAP),
    ("operation_types", RecordField::OperationType, DEFAULT_OPTION_CAP),
    ("investigation_status", RecordField::InvestigationStatus, DEFAULT_OPTION_CAP),
    ("aircraft_released", RecordField::AircraftReleased, DEFAULT_OPTION_CAP),
    ("occurrence_types", RecordField::OccurrenceType, DEFAULT_OPTION_CAP),
    (
        "occurrence_type_categories",
        RecordField::OccurrenceTypeCategory,
        DEFAULT_OPTION_CAP,
    ),
    ("factor_names", RecordField::FactorName, 200),
    ("factor_aspects", RecordField::FactorAspect, DEFAULT_OPTION_CAP),
    ("factor_areas", RecordField::FactorArea, DEFAULT_OPTION_CAP),
];

/// Occurrence records plus the filter vocabulary derived from them.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    records: Vec<OccurrenceRecord>,
    with_coordinates: usize,
    options: BTreeMap<String, Vec<String>>,
}

impl Dataset {
    /// Builds a dataset from already decoded records.
    #[must_use]
    pub fn new(records: Vec<OccurrenceRecord>) -> Self {
        let with_coordinates = records.iter().filter(|r| r.has_coordinates()).count();
        let options = OPTION_CATEGORIES
            .iter()
            .map(|(name, field, cap)| {
                ((*name).to_string(), distinct_values(&records, *field, *cap))
            })
            .collect();
        Self {
            records,
            with_coordinates,
            options,
        }
    }

    /// Reads a CSV file. Files that are not valid UTF-8 are decoded as
    /// Latin-1.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the file cannot be read or a row cannot
    /// be decoded.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        log::info!("Loading occurrence dataset from {}", path.display());
        let text = decode_text(std::fs::read(path)?);
        let dataset = Self::from_csv(&text)?;
        log::info!(
            "Loaded {} occurrences ({} with coordinates)",
            dataset.len(),
            dataset.with_coordinates
        );
        Ok(dataset)
    }

    /// Parses CSV text. The delimiter is `;` if the header line contains
    /// more semicolons than commas, `,` otherwise. Empty cells are absent.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] if the CSV is malformed or a row cannot be
    /// decoded.
    pub fn from_csv(text: &str) -> Result<Self, ServerError> {
        let header = text.lines().next().unwrap_or_default();
        let delimiter = if header.matches(';').count() > header.matches(',').count() {
            b';'
        } else {
            b','
        };

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());
        let headers = reader.headers()?.clone();

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let fields: Map<String, Value> = headers
                .iter()
                .zip(row.iter())
                .filter(|(_, value)| !value.is_empty())
                .map(|(column, value)| (column.to_string(), Value::String(value.to_string())))
                .collect();
            records.push(serde_json::from_value(Value::Object(fields))?);
        }
        Ok(Self::new(records))
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// One page of records.
    ///
    /// With `complete` every record is eligible and the total is the
    /// dataset size; otherwise only records with coordinates are, and the
    /// total is their count.
    #[must_use]
    pub fn page(&self, complete: bool, skip: usize, limit: usize) -> (u64, Vec<OccurrenceRecord>) {
        let total = if complete {
            self.records.len()
        } else {
            self.with_coordinates
        };
        let page = self
            .records
            .iter()
            .filter(|r| complete || r.has_coordinates())
            .skip(skip)
            .take(limit)
            .cloned()
            .collect();
        (total as u64, page)
    }

    /// Filter vocabulary: category name → distinct values.
    #[must_use]
    pub const fn filter_options(&self) -> &BTreeMap<String, Vec<String>> {
        &self.options
    }
}

/// UTF-8 if valid, Latin-1 otherwise. Every byte is a Latin-1 code point,
/// so the fallback cannot fail.
fn decode_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).unwrap_or_else(|e| {
        log::warn!(
            "Dataset is not valid UTF-8 ({}), decoding as Latin-1",
            e.utf8_error()
        );
        e.into_bytes().into_iter().map(char::from).collect()
    })
}

fn is_junk(value: &str) -> bool {
    JUNK_VALUES.iter().any(|junk| value.eq_ignore_ascii_case(junk))
}

/// Distinct trimmed values of `field`, junk removed, sorted, at most `cap`.
fn distinct_values(records: &[OccurrenceRecord], field: RecordField, cap: usize) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.text(field))
        .map(str::trim)
        .filter(|v| !v.is_empty() && !is_junk(v))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
codigo_ocorrencia;ocorrencia_uf;ocorrencia_cidade;ocorrencia_latitude;ocorrencia_longitude;aeronave_fatalidades_total;ocorrencia_classificacao
1;SP;SANTOS;-23,96;-46,33;2;ACIDENTE
2;RJ;NITERÓI;;;0;INCIDENTE
3;SP;CAMPINAS;-22.9;-47.06;0;***
4; SP ;SANTOS;-23.9;-46.3;;NULL
";

    #[test]
    fn reads_semicolon_csv_with_decimal_commas() {
        let dataset = Dataset::from_csv(CSV).unwrap();
        assert_eq!(dataset.len(), 4);
        let (_, page) = dataset.page(true, 0, 10);
        assert_eq!(page[0].coordinates(), Some((-23.96, -46.33)));
        assert_eq!(page[0].fatalities, 2);
        assert_eq!(page[1].latitude, None);
        assert_eq!(page[3].fatalities, 0);
    }

    #[test]
    fn loads_latin1_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocorrencias.csv");
        let latin1: &[u8] = b"codigo_ocorrencia;ocorrencia_uf;ocorrencia_cidade\n\
            1;RJ;NITER\xD3I\n\
            2;SP;S\xC3O PAULO\n";
        std::fs::write(&path, latin1).unwrap();
        let dataset = Dataset::load(&path).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.filter_options()["cities"], vec!["NITERÓI", "SÃO PAULO"]);
    }

    #[test]
    fn loads_utf8_file_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ocorrencias.csv");
        std::fs::write(&path, CSV).unwrap();
        let dataset = Dataset::load(&path).unwrap();
        assert_eq!(dataset.len(), 4);
        assert!(dataset.filter_options()["cities"].contains(&"NITERÓI".to_string()));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Dataset::load(&dir.path().join("absent.csv")).is_err());
    }

    #[test]
    fn reads_comma_csv() {
        let dataset =
            Dataset::from_csv("codigo_ocorrencia,ocorrencia_uf\n10,MG\n11,BA\n").unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.filter_options()["states"], vec!["BA", "MG"]);
    }

    #[test]
    fn total_depends_on_completeness() {
        let dataset = Dataset::from_csv(CSV).unwrap();
        let (total, page) = dataset.page(false, 0, 10);
        assert_eq!(total, 3);
        assert_eq!(page.len(), 3);

        let (total, page) = dataset.page(true, 0, 2);
        assert_eq!(total, 4);
        assert_eq!(page.len(), 2);

        let (_, page) = dataset.page(true, 3, 10);
        assert_eq!(page[0].code.as_deref(), Some("4"));
    }

    #[test]
    fn options_are_cleaned_and_sorted() {
        let dataset = Dataset::from_csv(CSV).unwrap();
        let options = dataset.filter_options();
        assert_eq!(options.len(), OPTION_CATEGORIES.len());
        assert_eq!(options["states"], vec!["RJ", "SP"]);
        assert_eq!(options["cities"], vec!["CAMPINAS", "NITERÓI", "SANTOS"]);
        assert_eq!(options["classifications"], vec!["ACIDENTE", "INCIDENTE"]);
        assert!(options["factor_areas"].is_empty());
    }

    #[test]
    fn options_respect_cap() {
        let records: Vec<OccurrenceRecord> = (0..600)
            .map(|i| OccurrenceRecord {
                city: Some(format!("CITY {i:03}")),
                ..OccurrenceRecord::default()
            })
            .collect();
        let dataset = Dataset::new(records);
        assert_eq!(dataset.filter_options()["cities"].len(), 500);
        assert_eq!(dataset.filter_options()["cities"][0], "CITY 000");
    }
}
