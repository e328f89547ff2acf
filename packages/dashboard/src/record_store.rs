//! The fetched record set.

use std::collections::BTreeSet;

use dataplane_filter::{FilterKey, FilterState};
use dataplane_occurrence_models::OccurrenceRecord;
use dataplane_server_models::OccurrencesResponse;

/// Records from the last applied fetch plus the total the server
/// reported. The two can differ when the server caps the page, and are
/// displayed separately.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordStore {
    records: Vec<OccurrenceRecord>,
    server_total: u64,
}

impl RecordStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole record set with a fetch response.
    pub fn replace(&mut self, response: OccurrencesResponse) {
        self.server_total = response.total;
        self.records = response.ocurrences;
        if self.server_total < self.records.len() as u64 {
            log::debug!(
                "Server total {} is below the {} records received",
                self.server_total,
                self.records.len()
            );
        }
    }

    /// All fetched records, read-only.
    #[must_use]
    pub fn records(&self) -> &[OccurrenceRecord] {
        &self.records
    }

    /// Number of records actually fetched.
    #[must_use]
    pub fn fetched(&self) -> usize {
        self.records.len()
    }

    /// Total reported by the server.
    #[must_use]
    pub const fn server_total(&self) -> u64 {
        self.server_total
    }

    /// Whether nothing has been fetched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct city names seen in records of the selected states, sorted.
    /// Used when the vocabulary has no city options for those states.
    #[must_use]
    pub fn observed_cities(&self, filters: &FilterState) -> Vec<String> {
        let states = filters.selected(FilterKey::State);
        if states.is_empty() {
            return Vec::new();
        }
        self.records
            .iter()
            .filter(|r| {
                r.state.as_deref().is_some_and(|s| {
                    states
                        .iter()
                        .any(|selected| s.trim().eq_ignore_ascii_case(selected.trim()))
                })
            })
            .filter_map(|r| r.city.as_deref().map(str::trim))
            .filter(|city| !city.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(state: &str, city: &str) -> OccurrenceRecord {
        OccurrenceRecord {
            state: Some(state.to_string()),
            city: Some(city.to_string()),
            ..OccurrenceRecord::default()
        }
    }

    fn store() -> RecordStore {
        let mut store = RecordStore::new();
        store.replace(OccurrencesResponse {
            total: 5000,
            ocurrences: vec![
                record("SP", "SANTOS"),
                record("SP", "CAMPINAS"),
                record("SP", "SANTOS"),
                record("RJ", "NITERÓI"),
            ],
        });
        store
    }

    #[test]
    fn server_total_is_kept_apart_from_fetched() {
        let store = store();
        assert_eq!(store.fetched(), 4);
        assert_eq!(store.server_total(), 5000);
    }

    #[test]
    fn observed_cities_follow_states() {
        let store = store();
        let mut filters = FilterState::new();
        assert!(store.observed_cities(&filters).is_empty());

        filters.insert(FilterKey::State, vec!["sp"].into());
        assert_eq!(store.observed_cities(&filters), vec!["CAMPINAS", "SANTOS"]);
    }
}
