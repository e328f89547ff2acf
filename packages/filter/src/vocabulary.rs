//! Selectable option lists for each filter key.
//!
//! The vocabulary only populates selectors; it never affects the
//! predicate. City options are narrowed to the currently selected states.

use std::collections::BTreeMap;

use crate::{FilterKey, FilterState};

/// Known values per vocabulary category (`"states"`, `"cities"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterVocabulary {
    categories: BTreeMap<String, Vec<String>>,
}

impl FilterVocabulary {
    /// Wraps the category map returned by the filter-options endpoint.
    #[must_use]
    pub const fn new(categories: BTreeMap<String, Vec<String>>) -> Self {
        Self { categories }
    }

    /// All values of a category, unscoped.
    #[must_use]
    pub fn category(&self, name: &str) -> &[String] {
        self.categories.get(name).map_or(&[], Vec::as_slice)
    }

    /// Number of distinct options across all categories.
    #[must_use]
    pub fn total_options(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Whether the selector for `key` is usable given the current
    /// filters. The city selector needs at least one selected state.
    #[must_use]
    pub fn is_enabled(key: FilterKey, filters: &FilterState) -> bool {
        key != FilterKey::City || filters.is_active(FilterKey::State)
    }

    /// Options for `key` under the current filters.
    ///
    /// City options are restricted to entries that carry one of the
    /// selected state codes as a suffix, and are empty while no state is
    /// selected.
    #[must_use]
    pub fn options_for(&self, key: FilterKey, filters: &FilterState) -> Vec<String> {
        let all = self.category(key.options_key());
        if key != FilterKey::City {
            return all.to_vec();
        }
        let states = filters.selected(FilterKey::State);
        if states.is_empty() {
            return Vec::new();
        }
        all.iter()
            .filter(|city| states.iter().any(|state| city_in_state(city, state)))
            .cloned()
            .collect()
    }
}

/// Whether a city option string belongs to the given state code.
///
/// Recognized forms are `"Cidade - UF"`, `"Cidade-UF"`, `"Cidade/UF"` and
/// `"CidadeUF"`.
#[must_use]
pub fn city_in_state(city: &str, state: &str) -> bool {
    let city = city.trim();
    let state = state.trim();
    if state.is_empty() {
        return false;
    }
    if let Some((_, suffix)) = city.rsplit_once(['-', '/']) {
        return suffix.trim().eq_ignore_ascii_case(state);
    }
    city.ends_with(&state.to_uppercase())
}
