#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aviation occurrence record types and the canonical field table.
//!
//! An [`OccurrenceRecord`] is one historical incident as delivered by the
//! occurrence API. The wire format uses the original Portuguese column
//! names (`ocorrencia_uf`, `aeronave_nivel_dano`, ...); every other crate
//! in the workspace addresses fields through the closed [`RecordField`]
//! enumeration instead of by column name.

pub mod date;
pub mod decode;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Two-letter codes and names of the 27 Brazilian federative units, in
/// the order the map renders them.
pub const BRAZIL_STATES: &[(&str, &str)] = &[
    ("AC", "Acre"),
    ("AL", "Alagoas"),
    ("AP", "Amapá"),
    ("AM", "Amazonas"),
    ("BA", "Bahia"),
    ("CE", "Ceará"),
    ("DF", "Distrito Federal"),
    ("ES", "Espírito Santo"),
    ("GO", "Goiás"),
    ("MA", "Maranhão"),
    ("MT", "Mato Grosso"),
    ("MS", "Mato Grosso do Sul"),
    ("MG", "Minas Gerais"),
    ("PA", "Pará"),
    ("PB", "Paraíba"),
    ("PR", "Paraná"),
    ("PE", "Pernambuco"),
    ("PI", "Piauí"),
    ("RJ", "Rio de Janeiro"),
    ("RN", "Rio Grande do Norte"),
    ("RS", "Rio Grande do Sul"),
    ("RO", "Rondônia"),
    ("RR", "Roraima"),
    ("SC", "Santa Catarina"),
    ("SP", "São Paulo"),
    ("SE", "Sergipe"),
    ("TO", "Tocantins"),
];

/// Returns the full name of a Brazilian state given its two-letter code
/// (case-insensitive).
#[must_use]
pub fn state_name(code: &str) -> Option<&'static str> {
    let code = code.trim();
    BRAZIL_STATES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(code))
        .map(|(_, name)| *name)
}

/// Damage level of the aircraft involved in an occurrence.
///
/// Source data encodes this as free text (`"NENHUM"`, `"LEVE"`,
/// `"SUBSTANCIAL"`, `"DESTRUÍDA"`, ...); [`DamageLevel::from_raw`]
/// normalizes it.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DamageLevel {
    /// No damage to the aircraft
    None,
    /// Light damage
    Light,
    /// Substantial damage
    Substantial,
    /// Aircraft destroyed
    Destroyed,
    /// Undetermined or not informed
    Unknown,
}

impl DamageLevel {
    /// Maps a raw damage string from the source data to a [`DamageLevel`].
    ///
    /// Matching is case-insensitive and tolerates the accented and
    /// unaccented spellings found in the data.
    #[must_use]
    pub fn from_raw(raw: &str) -> Self {
        let upper = raw.trim().to_uppercase();
        if upper.is_empty() {
            return Self::Unknown;
        }
        if upper.starts_with("DESTRU") {
            return Self::Destroyed;
        }
        if upper.contains("SUBSTANCIAL") || upper.contains("DANIFICADA") {
            return Self::Substantial;
        }
        if upper.contains("LEVE") {
            return Self::Light;
        }
        if upper.contains("NENHUM") {
            return Self::None;
        }
        Self::Unknown
    }

    /// Returns the table/export severity for this damage level.
    #[must_use]
    pub const fn severity(self) -> Severity {
        match self {
            Self::Destroyed => Severity::Fatal,
            Self::Substantial => Severity::Major,
            Self::None | Self::Light | Self::Unknown => Severity::Minor,
        }
    }
}

/// Coarse severity shown in the record table and CSV export.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    /// Little or no damage
    Minor,
    /// Substantial damage
    Major,
    /// Aircraft destroyed
    Fatal,
}

impl Severity {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Minor, Self::Major, Self::Fatal]
    }
}

/// Every textual field of an [`OccurrenceRecord`] that can be filtered,
/// grouped or segmented on.
///
/// This is the single key→field table of the workspace: record access
/// goes through [`OccurrenceRecord::text`], which matches exhaustively on
/// this enum.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RecordField {
    Code,
    Date,
    State,
    City,
    Country,
    Aerodrome,
    AircraftManufacturer,
    AircraftModel,
    AircraftType,
    AircraftOperator,
    Registration,
    OperationPhase,
    OperationType,
    Classification,
    OccurrenceType,
    OccurrenceTypeCategory,
    DamageLevel,
    InvestigationStatus,
    AircraftReleased,
    FactorName,
    FactorAspect,
    FactorArea,
}

impl RecordField {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Code,
            Self::Date,
            Self::State,
            Self::City,
            Self::Country,
            Self::Aerodrome,
            Self::AircraftManufacturer,
            Self::AircraftModel,
            Self::AircraftType,
            Self::AircraftOperator,
            Self::Registration,
            Self::OperationPhase,
            Self::OperationType,
            Self::Classification,
            Self::OccurrenceType,
            Self::OccurrenceTypeCategory,
            Self::DamageLevel,
            Self::InvestigationStatus,
            Self::AircraftReleased,
            Self::FactorName,
            Self::FactorAspect,
            Self::FactorArea,
        ]
    }

    /// Returns the source column name used on the wire.
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Code => "codigo_ocorrencia",
            Self::Date => "ocorrencia_dia",
            Self::State => "ocorrencia_uf",
            Self::City => "ocorrencia_cidade",
            Self::Country => "ocorrencia_pais",
            Self::Aerodrome => "ocorrencia_aerodromo",
            Self::AircraftManufacturer => "aeronave_fabricante",
            Self::AircraftModel => "aeronave_modelo",
            Self::AircraftType => "aeronave_tipo_veiculo",
            Self::AircraftOperator => "aeronave_operador_categoria",
            Self::Registration => "aeronave_matricula",
            Self::OperationPhase => "aeronave_fase_operacao",
            Self::OperationType => "aeronave_tipo_operacao",
            Self::Classification => "ocorrencia_classificacao",
            Self::OccurrenceType => "ocorrencia_tipo",
            Self::OccurrenceTypeCategory => "ocorrencia_tipo_categoria",
            Self::DamageLevel => "aeronave_nivel_dano",
            Self::InvestigationStatus => "investigacao_status",
            Self::AircraftReleased => "investigacao_aeronave_liberada",
            Self::FactorName => "fator_nome",
            Self::FactorAspect => "fator_aspecto",
            Self::FactorArea => "fator_area",
        }
    }

    /// Resolves a field from either its snake-case name (`"classification"`)
    /// or its source column name (`"ocorrencia_classificacao"`).
    #[must_use]
    pub fn parse_any(s: &str) -> Option<Self> {
        let s = s.trim();
        s.parse().ok().or_else(|| {
            Self::all()
                .iter()
                .copied()
                .find(|field| field.column().eq_ignore_ascii_case(s))
        })
    }

    /// Human-readable label for chart titles and table headers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Code => "Code",
            Self::Date => "Date",
            Self::State => "State",
            Self::City => "City",
            Self::Country => "Country",
            Self::Aerodrome => "Aerodrome",
            Self::AircraftManufacturer => "Manufacturer",
            Self::AircraftModel => "Model",
            Self::AircraftType => "Aircraft type",
            Self::AircraftOperator => "Operator",
            Self::Registration => "Registration",
            Self::OperationPhase => "Operation phase",
            Self::OperationType => "Operation type",
            Self::Classification => "Classification",
            Self::OccurrenceType => "Occurrence type",
            Self::OccurrenceTypeCategory => "Occurrence type category",
            Self::DamageLevel => "Damage level",
            Self::InvestigationStatus => "Investigation status",
            Self::AircraftReleased => "Aircraft released",
            Self::FactorName => "Contributing factor",
            Self::FactorAspect => "Factor aspect",
            Self::FactorArea => "Factor area",
        }
    }
}

/// One historical aviation occurrence.
///
/// Every field is optional on the wire. Text fields that arrive with a
/// non-textual JSON type, unparseable coordinates and malformed counts
/// all decode to "absent" instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OccurrenceRecord {
    /// Unique occurrence code.
    #[serde(rename = "codigo_ocorrencia", default, deserialize_with = "decode::text")]
    pub code: Option<String>,
    /// Occurrence date as `DD/MM/YYYY` text.
    #[serde(rename = "ocorrencia_dia", default, deserialize_with = "decode::text")]
    pub date: Option<String>,
    /// Two-letter state code.
    #[serde(rename = "ocorrencia_uf", default, deserialize_with = "decode::text")]
    pub state: Option<String>,
    /// City name.
    #[serde(rename = "ocorrencia_cidade", default, deserialize_with = "decode::text")]
    pub city: Option<String>,
    /// Country name.
    #[serde(rename = "ocorrencia_pais", default, deserialize_with = "decode::text")]
    pub country: Option<String>,
    /// Aerodrome ICAO code, if any.
    #[serde(rename = "ocorrencia_aerodromo", default, deserialize_with = "decode::text")]
    pub aerodrome: Option<String>,
    /// Latitude in decimal degrees.
    #[serde(rename = "ocorrencia_latitude", default, deserialize_with = "decode::coordinate")]
    pub latitude: Option<f64>,
    /// Longitude in decimal degrees.
    #[serde(rename = "ocorrencia_longitude", default, deserialize_with = "decode::coordinate")]
    pub longitude: Option<f64>,
    /// Aircraft manufacturer.
    #[serde(rename = "aeronave_fabricante", default, deserialize_with = "decode::text")]
    pub manufacturer: Option<String>,
    /// Aircraft model.
    #[serde(rename = "aeronave_modelo", default, deserialize_with = "decode::text")]
    pub model: Option<String>,
    /// Vehicle type (airplane, helicopter, ...).
    #[serde(rename = "aeronave_tipo_veiculo", default, deserialize_with = "decode::text")]
    pub vehicle_type: Option<String>,
    /// Operator category.
    #[serde(
        rename = "aeronave_operador_categoria",
        default,
        deserialize_with = "decode::text"
    )]
    pub operator_category: Option<String>,
    /// Aircraft registration mark.
    #[serde(rename = "aeronave_matricula", default, deserialize_with = "decode::text")]
    pub registration: Option<String>,
    /// Operation phase at the time of the occurrence.
    #[serde(rename = "aeronave_fase_operacao", default, deserialize_with = "decode::text")]
    pub operation_phase: Option<String>,
    /// Operation type (private, regular, instruction, ...).
    #[serde(rename = "aeronave_tipo_operacao", default, deserialize_with = "decode::text")]
    pub operation_type: Option<String>,
    /// Occurrence classification (accident, serious incident, incident).
    #[serde(
        rename = "ocorrencia_classificacao",
        default,
        deserialize_with = "decode::text"
    )]
    pub classification: Option<String>,
    /// Occurrence type.
    #[serde(rename = "ocorrencia_tipo", default, deserialize_with = "decode::text")]
    pub occurrence_type: Option<String>,
    /// Occurrence type category.
    #[serde(
        rename = "ocorrencia_tipo_categoria",
        default,
        deserialize_with = "decode::text"
    )]
    pub occurrence_type_category: Option<String>,
    /// Damage level as free text; see [`OccurrenceRecord::damage`].
    #[serde(rename = "aeronave_nivel_dano", default, deserialize_with = "decode::text")]
    pub damage_level: Option<String>,
    /// Total fatalities.
    #[serde(
        rename = "aeronave_fatalidades_total",
        default,
        deserialize_with = "decode::count"
    )]
    pub fatalities: u32,
    /// Year the aircraft was manufactured.
    #[serde(
        rename = "aeronave_ano_fabricacao",
        default,
        deserialize_with = "decode::year"
    )]
    pub manufacture_year: Option<u32>,
    /// Investigation status.
    #[serde(rename = "investigacao_status", default, deserialize_with = "decode::text")]
    pub investigation_status: Option<String>,
    /// Whether the aircraft was released by the investigation.
    #[serde(
        rename = "investigacao_aeronave_liberada",
        default,
        deserialize_with = "decode::text"
    )]
    pub aircraft_released: Option<String>,
    /// Contributing factor name, `None` when the record has no factor.
    #[serde(rename = "fator_nome", default, deserialize_with = "decode::text")]
    pub factor_name: Option<String>,
    /// Contributing factor aspect.
    #[serde(rename = "fator_aspecto", default, deserialize_with = "decode::text")]
    pub factor_aspect: Option<String>,
    /// Contributing factor area.
    #[serde(rename = "fator_area", default, deserialize_with = "decode::text")]
    pub factor_area: Option<String>,
}

impl OccurrenceRecord {
    /// Returns the textual value of `field`, or `None` when the record
    /// does not carry it.
    #[must_use]
    pub fn text(&self, field: RecordField) -> Option<&str> {
        let value = match field {
            RecordField::Code => &self.code,
            RecordField::Date => &self.date,
            RecordField::State => &self.state,
            RecordField::City => &self.city,
            RecordField::Country => &self.country,
            RecordField::Aerodrome => &self.aerodrome,
            RecordField::AircraftManufacturer => &self.manufacturer,
            RecordField::AircraftModel => &self.model,
            RecordField::AircraftType => &self.vehicle_type,
            RecordField::AircraftOperator => &self.operator_category,
            RecordField::Registration => &self.registration,
            RecordField::OperationPhase => &self.operation_phase,
            RecordField::OperationType => &self.operation_type,
            RecordField::Classification => &self.classification,
            RecordField::OccurrenceType => &self.occurrence_type,
            RecordField::OccurrenceTypeCategory => &self.occurrence_type_category,
            RecordField::DamageLevel => &self.damage_level,
            RecordField::InvestigationStatus => &self.investigation_status,
            RecordField::AircraftReleased => &self.aircraft_released,
            RecordField::FactorName => &self.factor_name,
            RecordField::FactorAspect => &self.factor_aspect,
            RecordField::FactorArea => &self.factor_area,
        };
        value.as_deref()
    }

    /// Returns `(latitude, longitude)` when the record has usable
    /// coordinates: both present, finite, non-zero and within range.
    #[must_use]
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        let latitude = self.latitude?;
        let longitude = self.longitude?;
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        if latitude == 0.0 || longitude == 0.0 {
            return None;
        }
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }
        Some((latitude, longitude))
    }

    /// Whether this record is eligible for map-based aggregation.
    #[must_use]
    pub fn has_coordinates(&self) -> bool {
        self.coordinates().is_some()
    }

    /// Parses the occurrence date using the `DD/MM/YYYY` contract.
    #[must_use]
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(date::parse_occurrence_date)
    }

    /// Normalized damage level.
    #[must_use]
    pub fn damage(&self) -> DamageLevel {
        self.damage_level
            .as_deref()
            .map_or(DamageLevel::Unknown, DamageLevel::from_raw)
    }

    /// Table/export severity derived from the damage level.
    #[must_use]
    pub fn severity(&self) -> Severity {
        self.damage().severity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_field_has_a_unique_column() {
        let mut columns: Vec<&str> = RecordField::all().iter().map(|f| f.column()).collect();
        columns.sort_unstable();
        columns.dedup();
        assert_eq!(columns.len(), RecordField::all().len());
    }

    #[test]
    fn field_parses_from_name_or_column() {
        assert_eq!(
            RecordField::parse_any("classification"),
            Some(RecordField::Classification)
        );
        assert_eq!(
            RecordField::parse_any("ocorrencia_classificacao"),
            Some(RecordField::Classification)
        );
        assert_eq!(
            RecordField::parse_any("aeronave_tipo_veiculo"),
            Some(RecordField::AircraftType)
        );
        assert_eq!(RecordField::parse_any("wingspan"), None);
    }

    #[test]
    fn text_resolves_each_field() {
        let record = OccurrenceRecord {
            state: Some("SP".to_string()),
            factor_area: Some("FATOR HUMANO".to_string()),
            ..OccurrenceRecord::default()
        };
        assert_eq!(record.text(RecordField::State), Some("SP"));
        assert_eq!(record.text(RecordField::FactorArea), Some("FATOR HUMANO"));
        assert_eq!(record.text(RecordField::City), None);
    }

    #[test]
    fn zero_or_missing_coordinates_are_rejected() {
        let mut record = OccurrenceRecord {
            latitude: Some(-23.55),
            longitude: Some(-46.63),
            ..OccurrenceRecord::default()
        };
        assert!(record.has_coordinates());

        record.latitude = Some(0.0);
        assert!(!record.has_coordinates());

        record.latitude = None;
        assert!(!record.has_coordinates());

        record.latitude = Some(123.0);
        assert!(!record.has_coordinates());
    }

    #[test]
    fn damage_levels_normalize() {
        assert_eq!(DamageLevel::from_raw("DESTRUÍDA"), DamageLevel::Destroyed);
        assert_eq!(DamageLevel::from_raw("destruida"), DamageLevel::Destroyed);
        assert_eq!(DamageLevel::from_raw("SUBSTANCIAL"), DamageLevel::Substantial);
        assert_eq!(DamageLevel::from_raw("DANIFICADA"), DamageLevel::Substantial);
        assert_eq!(DamageLevel::from_raw(" leve "), DamageLevel::Light);
        assert_eq!(DamageLevel::from_raw("NENHUM"), DamageLevel::None);
        assert_eq!(DamageLevel::from_raw("INDETERMINADO"), DamageLevel::Unknown);
        assert_eq!(DamageLevel::from_raw(""), DamageLevel::Unknown);
    }

    #[test]
    fn severity_follows_damage() {
        assert_eq!(DamageLevel::Destroyed.severity(), Severity::Fatal);
        assert_eq!(DamageLevel::Substantial.severity(), Severity::Major);
        assert_eq!(DamageLevel::Light.severity(), Severity::Minor);
        assert_eq!(Severity::Fatal.to_string(), "fatal");
    }

    #[test]
    fn state_names_resolve() {
        assert_eq!(BRAZIL_STATES.len(), 27);
        assert_eq!(state_name("sp"), Some("São Paulo"));
        assert_eq!(state_name("XX"), None);
    }

    #[test]
    fn decodes_wire_record_leniently() {
        let json = r#"{
            "codigo_ocorrencia": "80123",
            "ocorrencia_dia": "15/01/2020",
            "ocorrencia_uf": "SP",
            "ocorrencia_cidade": 12,
            "ocorrencia_latitude": "-23,5505",
            "ocorrencia_longitude": -46.6333,
            "aeronave_fatalidades_total": "2",
            "aeronave_nivel_dano": null,
            "fator_nome": ["not", "a", "string"]
        }"#;
        let record: OccurrenceRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.code.as_deref(), Some("80123"));
        assert_eq!(record.city.as_deref(), Some("12"));
        assert_eq!(record.coordinates(), Some((-23.5505, -46.6333)));
        assert_eq!(record.fatalities, 2);
        assert_eq!(record.damage_level, None);
        assert_eq!(record.factor_name, None);
        assert_eq!(record.parsed_date(), NaiveDate::from_ymd_opt(2020, 1, 15));
    }

    #[test]
    fn decodes_csv_rows() {
        let data = "codigo_ocorrencia,ocorrencia_uf,ocorrencia_latitude,ocorrencia_longitude,aeronave_fatalidades_total\n\
                    1,RJ,-22.9,-43.1,\n\
                    2,SP,,,3\n";
        let mut reader = csv::Reader::from_reader(data.as_bytes());
        let records: Vec<OccurrenceRecord> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].state.as_deref(), Some("RJ"));
        assert!(records[0].has_coordinates());
        assert_eq!(records[0].fatalities, 0);
        assert!(!records[1].has_coordinates());
        assert_eq!(records[1].fatalities, 3);
    }
}
