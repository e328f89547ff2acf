//! The filter state manager.
//!
//! [`FilterStore`] owns the active [`FilterState`] and the chart
//! segmentation field. All mutations go through its setters, each of
//! which bumps the revision and synchronously notifies every registered
//! [`FilterListener`] before returning.

use std::sync::Arc;

use dataplane_occurrence_models::RecordField;

use crate::{FilterKey, FilterState, FilterValue};

/// What a mutation changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterChange {
    /// A key was assigned a new value.
    Set(FilterKey),
    /// A single key was cleared.
    Cleared(FilterKey),
    /// Every key was cleared.
    ClearedAll,
    /// A value was toggled in or out of a multi-select key.
    Toggled {
        /// The key that was toggled.
        key: FilterKey,
        /// The toggled value.
        value: String,
        /// Whether the value is selected after the toggle.
        selected: bool,
    },
    /// The whole state was replaced (e.g. restored from a session).
    Replaced,
    /// The segmentation field changed.
    SegmentBy(Option<RecordField>),
}

/// Observer notified after every filter mutation.
///
/// Implementations must be `Send + Sync` so they can be shared behind an
/// `Arc`.
pub trait FilterListener: Send + Sync {
    /// Called after `change` has been applied.
    fn on_change(
        &self,
        change: &FilterChange,
        filters: &FilterState,
        segment_by: Option<RecordField>,
    );
}

impl<F> FilterListener for F
where
    F: Fn(&FilterChange, &FilterState, Option<RecordField>) + Send + Sync,
{
    fn on_change(
        &self,
        change: &FilterChange,
        filters: &FilterState,
        segment_by: Option<RecordField>,
    ) {
        self(change, filters, segment_by);
    }
}

/// Owner of the filter state and segmentation field.
#[derive(Default)]
pub struct FilterStore {
    filters: FilterState,
    segment_by: Option<RecordField>,
    revision: u64,
    listeners: Vec<Arc<dyn FilterListener>>,
}

impl std::fmt::Debug for FilterStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterStore")
            .field("filters", &self.filters)
            .field("segment_by", &self.segment_by)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl FilterStore {
    /// Creates a store with no active filters and no segmentation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store starting from previously persisted filters.
    #[must_use]
    pub fn with_filters(filters: FilterState) -> Self {
        Self {
            filters,
            ..Self::default()
        }
    }

    /// The active filters.
    #[must_use]
    pub const fn filters(&self) -> &FilterState {
        &self.filters
    }

    /// The chart segmentation field, if any.
    #[must_use]
    pub const fn segment_by(&self) -> Option<RecordField> {
        self.segment_by
    }

    /// Monotonic counter bumped by every mutation.
    #[must_use]
    pub const fn revision(&self) -> u64 {
        self.revision
    }

    /// Registers a listener. It is not called for past mutations.
    pub fn subscribe(&mut self, listener: Arc<dyn FilterListener>) {
        self.listeners.push(listener);
    }

    /// Assigns `value` to `key`. Assigning the state key also clears the
    /// city key, since city options are scoped to the selected states.
    pub fn set_filter(&mut self, key: FilterKey, value: impl Into<FilterValue>) {
        self.filters.insert(key, value.into());
        self.cascade(key);
        self.notify(&FilterChange::Set(key));
    }

    /// Clears a single key. Clearing the state key also clears the city.
    pub fn clear_filter(&mut self, key: FilterKey) {
        self.filters.remove(key);
        self.cascade(key);
        self.notify(&FilterChange::Cleared(key));
    }

    /// Clears every key. The segmentation field is left untouched.
    pub fn clear_all(&mut self) {
        self.filters.clear();
        self.notify(&FilterChange::ClearedAll);
    }

    /// Toggles `value` in or out of `key` (e.g. a map click on a state).
    /// Returns whether the value is selected afterwards.
    pub fn toggle(&mut self, key: FilterKey, value: &str) -> bool {
        let selected = self.filters.toggle(key, value);
        self.cascade(key);
        self.notify(&FilterChange::Toggled {
            key,
            value: value.trim().to_string(),
            selected,
        });
        selected
    }

    /// Replaces the whole filter state.
    pub fn replace(&mut self, filters: FilterState) {
        self.filters = filters;
        self.notify(&FilterChange::Replaced);
    }

    /// Sets or unsets the chart segmentation field.
    pub fn set_segment_by(&mut self, field: Option<RecordField>) {
        self.segment_by = field;
        self.notify(&FilterChange::SegmentBy(field));
    }

    fn cascade(&mut self, key: FilterKey) {
        if key == FilterKey::State && self.filters.remove(FilterKey::City).is_some() {
            log::debug!("State selection changed, city filter reset");
        }
    }

    fn notify(&mut self, change: &FilterChange) {
        self.revision += 1;
        log::trace!("Filter change #{}: {change:?}", self.revision);
        for listener in &self.listeners {
            listener.on_change(change, &self.filters, self.segment_by);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn setting_state_resets_city() {
        let mut store = FilterStore::new();
        store.set_filter(FilterKey::City, "Santos");
        store.set_filter(FilterKey::State, vec!["RJ"]);
        assert!(store.filters().get(FilterKey::City).is_none());

        store.set_filter(FilterKey::City, "Niterói");
        store.set_filter(FilterKey::State, "");
        assert!(store.filters().selected(FilterKey::City).is_empty());
    }

    #[test]
    fn toggling_state_resets_city() {
        let mut store = FilterStore::new();
        store.set_filter(FilterKey::City, "Santos");
        assert!(store.toggle(FilterKey::State, "SP"));
        assert!(!store.filters().is_active(FilterKey::City));
        assert_eq!(store.filters().selected(FilterKey::State), vec!["SP"]);
    }

    #[test]
    fn other_keys_leave_city_alone() {
        let mut store = FilterStore::new();
        store.set_filter(FilterKey::City, "Santos");
        store.set_filter(FilterKey::Classification, "ACIDENTE");
        assert_eq!(store.filters().selected(FilterKey::City), vec!["Santos"]);
    }

    #[test]
    fn clear_all_keeps_segmentation() {
        let mut store = FilterStore::new();
        store.set_segment_by(Some(RecordField::Classification));
        store.set_filter(FilterKey::State, vec!["SP", "RJ"]);
        store.set_filter(FilterKey::DamageLevel, "DESTRUÍDA");
        store.clear_all();
        assert!(store.filters().is_unconstrained());
        assert_eq!(store.segment_by(), Some(RecordField::Classification));
    }

    #[test]
    fn listeners_see_every_mutation_in_order() {
        let seen: Arc<Mutex<Vec<(FilterChange, usize)>>> = Arc::default();
        let sink = Arc::clone(&seen);

        let mut store = FilterStore::new();
        store.subscribe(Arc::new(
            move |change: &FilterChange, filters: &FilterState, _: Option<RecordField>| {
                sink.lock()
                    .unwrap()
                    .push((change.clone(), filters.active_count()));
            },
        ));

        store.set_filter(FilterKey::State, vec!["SP"]);
        store.toggle(FilterKey::State, "RJ");
        store.set_segment_by(Some(RecordField::AircraftType));
        store.clear_filter(FilterKey::State);

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                (FilterChange::Set(FilterKey::State), 1),
                (
                    FilterChange::Toggled {
                        key: FilterKey::State,
                        value: "RJ".to_string(),
                        selected: true,
                    },
                    1
                ),
                (FilterChange::SegmentBy(Some(RecordField::AircraftType)), 1),
                (FilterChange::Cleared(FilterKey::State), 0),
            ]
        );
        assert_eq!(store.revision(), 4);
    }
}
