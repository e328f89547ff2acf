#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Categorical filtering for the occurrence dashboard.
//!
//! A [`FilterState`] maps each [`FilterKey`] to a single value or a list
//! of values. [`predicate::passes`] decides whether a record satisfies
//! every active key (AND across keys, OR within a key), and
//! [`store::FilterStore`] is the only place filter state is mutated,
//! notifying registered listeners after every change.

pub mod predicate;
pub mod store;
pub mod vocabulary;

use std::collections::BTreeMap;

use dataplane_occurrence_models::RecordField;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

pub use predicate::{passes, passes_map_scope};
pub use store::{FilterChange, FilterListener, FilterStore};
pub use vocabulary::FilterVocabulary;

/// Errors produced when interpreting user-supplied filter input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    /// The key is not one of the enumerated filter keys.
    #[error("Unknown filter key: {key}")]
    UnknownKey {
        /// The key as provided.
        key: String,
    },

    /// The input is not of the form `key=value[,value...]`.
    #[error("Malformed filter '{input}': expected key=value[,value...]")]
    Malformed {
        /// The input as provided.
        input: String,
    },
}

/// The fixed set of categorical dimensions a user can constrain.
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
pub enum FilterKey {
    /// Two-letter state code (multi-select)
    State,
    /// City, scoped to the selected states
    City,
    /// Occurrence classification
    Classification,
    /// Aircraft vehicle type
    AircraftType,
    /// Aircraft damage level
    DamageLevel,
    /// Operation phase
    OperationPhase,
    /// Operation type
    OperationType,
    /// Aircraft manufacturer
    AircraftManufacturer,
    /// Aircraft model
    AircraftModel,
    /// Operator category
    AircraftOperator,
    /// Investigation status
    InvestigationStatus,
    /// Occurrence type
    OccurrenceType,
}

impl FilterKey {
    /// Returns all variants of this enum, in display order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::State,
            Self::City,
            Self::Classification,
            Self::AircraftType,
            Self::DamageLevel,
            Self::OperationPhase,
            Self::OperationType,
            Self::AircraftManufacturer,
            Self::AircraftModel,
            Self::AircraftOperator,
            Self::InvestigationStatus,
            Self::OccurrenceType,
        ]
    }

    /// Parses a user-supplied key.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::UnknownKey`] if `s` names no filter key.
    pub fn parse(s: &str) -> Result<Self, FilterError> {
        s.trim().parse().map_err(|_| FilterError::UnknownKey {
            key: s.to_string(),
        })
    }

    /// The record field this key constrains.
    #[must_use]
    pub const fn field(self) -> RecordField {
        match self {
            Self::State => RecordField::State,
            Self::City => RecordField::City,
            Self::Classification => RecordField::Classification,
            Self::AircraftType => RecordField::AircraftType,
            Self::DamageLevel => RecordField::DamageLevel,
            Self::OperationPhase => RecordField::OperationPhase,
            Self::OperationType => RecordField::OperationType,
            Self::AircraftManufacturer => RecordField::AircraftManufacturer,
            Self::AircraftModel => RecordField::AircraftModel,
            Self::AircraftOperator => RecordField::AircraftOperator,
            Self::InvestigationStatus => RecordField::InvestigationStatus,
            Self::OccurrenceType => RecordField::OccurrenceType,
        }
    }

    /// Name of the vocabulary category holding this key's options.
    #[must_use]
    pub const fn options_key(self) -> &'static str {
        match self {
            Self::State => "states",
            Self::City => "cities",
            Self::Classification => "classifications",
            Self::AircraftType => "aircraft_types",
            Self::DamageLevel => "damage_levels",
            Self::OperationPhase => "operation_phases",
            Self::OperationType => "operation_types",
            Self::AircraftManufacturer => "aircraft_manufacturers",
            Self::AircraftModel => "aircraft_models",
            Self::AircraftOperator => "aircraft_operators",
            Self::InvestigationStatus => "investigation_status",
            Self::OccurrenceType => "occurrence_types",
        }
    }

    /// Whether the selector for this key accepts several values.
    #[must_use]
    pub const fn is_multi_select(self) -> bool {
        matches!(self, Self::State)
    }
}

/// The value of one filter key: a single string or a list of strings.
///
/// Serialized untagged so the persisted form is `"SP"` or `["SP", "RJ"]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// A single selected value.
    One(String),
    /// Several selected values; a record matches if it matches any.
    Many(Vec<String>),
}

impl FilterValue {
    /// Iterates over the non-blank values.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Self::One(value) => std::slice::from_ref(value),
            Self::Many(values) => values,
        };
        slice
            .iter()
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// An empty string, empty list, or list of blanks is no constraint.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values().next().is_none()
    }

    /// Whether `candidate` equals any of the values, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        self.values().any(|v| eq_normalized(v, candidate))
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::One(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::One(value)
    }
}

impl From<Vec<String>> for FilterValue {
    fn from(values: Vec<String>) -> Self {
        Self::Many(values)
    }
}

impl From<Vec<&str>> for FilterValue {
    fn from(values: Vec<&str>) -> Self {
        Self::Many(values.into_iter().map(str::to_string).collect())
    }
}

/// Compares two strings ignoring case and surrounding whitespace.
#[must_use]
pub fn eq_normalized(a: &str, b: &str) -> bool {
    a.trim()
        .chars()
        .flat_map(char::to_lowercase)
        .eq(b.trim().chars().flat_map(char::to_lowercase))
}

/// The currently active filter selections.
///
/// Absent keys and keys holding an empty value impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterState {
    values: BTreeMap<FilterKey, FilterValue>,
}

impl FilterState {
    /// Creates an empty filter state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the raw value stored for `key`, if any.
    #[must_use]
    pub fn get(&self, key: FilterKey) -> Option<&FilterValue> {
        self.values.get(&key)
    }

    /// Returns the non-blank values selected for `key`.
    #[must_use]
    pub fn selected(&self, key: FilterKey) -> Vec<&str> {
        self.get(key).map(|v| v.values().collect()).unwrap_or_default()
    }

    /// Whether `key` currently constrains records.
    #[must_use]
    pub fn is_active(&self, key: FilterKey) -> bool {
        self.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Iterates over the keys that currently constrain records.
    pub fn active(&self) -> impl Iterator<Item = (FilterKey, &FilterValue)> {
        self.values
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (*key, value))
    }

    /// Number of active keys (the filter badge count).
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active().count()
    }

    /// Whether no key is active.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.active_count() == 0
    }

    /// Stores `value` under `key`; an empty value removes the key.
    pub fn insert(&mut self, key: FilterKey, value: FilterValue) {
        if value.is_empty() {
            self.values.remove(&key);
        } else {
            self.values.insert(key, value);
        }
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&mut self, key: FilterKey) -> Option<FilterValue> {
        self.values.remove(&key)
    }

    /// Removes every key.
    pub fn clear(&mut self) {
        self.values.clear();
    }

    /// Adds `value` to `key` if absent, removes it if present. Returns
    /// whether the value is selected afterwards.
    pub fn toggle(&mut self, key: FilterKey, value: &str) -> bool {
        let mut values: Vec<String> = self.selected(key).into_iter().map(str::to_string).collect();
        let before = values.len();
        values.retain(|v| !eq_normalized(v, value));
        let selected = values.len() == before;
        if selected {
            values.push(value.trim().to_string());
        }
        self.insert(key, FilterValue::Many(values));
        selected
    }

    /// Parses a `key=value[,value...]` assignment as accepted on the
    /// command line.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError`] if the key is unknown or the input has no
    /// `=`.
    pub fn parse_assignment(input: &str) -> Result<(FilterKey, FilterValue), FilterError> {
        let (key, value) = input.split_once('=').ok_or_else(|| FilterError::Malformed {
            input: input.to_string(),
        })?;
        let key = FilterKey::parse(key)?;
        let values: Vec<String> = value
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect();
        let value = match <[String; 1]>::try_from(values) {
            Ok([single]) => FilterValue::One(single),
            Err(values) => FilterValue::Many(values),
        };
        Ok((key, value))
    }
}
