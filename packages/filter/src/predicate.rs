//! The record predicate.
//!
//! A record passes a [`FilterState`] if, for every active key, its field
//! value matches at least one of the key's values. Fields a record does
//! not carry never exclude it.

use dataplane_occurrence_models::OccurrenceRecord;

use crate::FilterState;

/// Returns `true` if `record` satisfies every active key of `filters`.
#[must_use]
pub fn passes(record: &OccurrenceRecord, filters: &FilterState) -> bool {
    filters
        .active()
        .all(|(key, value)| match record.text(key.field()) {
            Some(field_value) => value.matches(field_value),
            None => true,
        })
}

/// Map-scoped variant of [`passes`]: the record must also have usable
/// coordinates. The coordinate check runs first.
#[must_use]
pub fn passes_map_scope(record: &OccurrenceRecord, filters: &FilterState) -> bool {
    record.has_coordinates() && passes(record, filters)
}

/// Returns the records that pass `filters`, preserving order.
#[must_use]
pub fn filter_records<'a>(
    records: &'a [OccurrenceRecord],
    filters: &FilterState,
) -> Vec<&'a OccurrenceRecord> {
    records.iter().filter(|r| passes(r, filters)).collect()
}

/// Returns the map-eligible records that pass `filters`, preserving order.
#[must_use]
pub fn filter_map_records<'a>(
    records: &'a [OccurrenceRecord],
    filters: &FilterState,
) -> Vec<&'a OccurrenceRecord> {
    records
        .iter()
        .filter(|r| passes_map_scope(r, filters))
        .collect()
}
