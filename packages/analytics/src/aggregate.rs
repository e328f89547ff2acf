//! Group-by with deterministic top-N truncation.
//!
//! Buckets are ordered by value descending. Ties keep the order in which
//! their labels were first encountered, so the same input always yields
//! the same output. Buckets past the top-N cut are folded into a single
//! trailing [`OTHER_LABEL`] bucket, which is only emitted when the folded
//! remainder is non-zero.
//!
//! Values that differ only in case or surrounding whitespace share a
//! bucket, matching how the filter predicate and the map compare them.
//! The bucket keeps the spelling seen first.

use std::collections::HashMap;

use dataplane_analytics_models::{
    AggregationResult, Bucket, Measure, NOT_INFORMED_LABEL, OTHER_LABEL,
};
use dataplane_occurrence_models::{OccurrenceRecord, RecordField};

/// A configured group-by over one record field.
///
/// ```ignore
/// let top_states = Aggregation::count(RecordField::State, 10).run(&records);
/// let deadliest = Aggregation::sum_fatalities(RecordField::AircraftType, 5)
///     .skip_missing()
///     .run(&records);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aggregation {
    field: RecordField,
    top_n: usize,
    measure: Measure,
    skip_missing: bool,
}

impl Aggregation {
    /// Counts records per value of `field`, keeping `top_n` buckets.
    #[must_use]
    pub const fn count(field: RecordField, top_n: usize) -> Self {
        Self {
            field,
            top_n,
            measure: Measure::Count,
            skip_missing: false,
        }
    }

    /// Sums fatalities per value of `field`, keeping `top_n` buckets.
    #[must_use]
    pub const fn sum_fatalities(field: RecordField, top_n: usize) -> Self {
        Self {
            field,
            top_n,
            measure: Measure::Fatalities,
            skip_missing: false,
        }
    }

    /// Leaves out records whose field is missing or blank instead of
    /// grouping them under [`NOT_INFORMED_LABEL`].
    #[must_use]
    pub const fn skip_missing(mut self) -> Self {
        self.skip_missing = true;
        self
    }

    /// The grouped field.
    #[must_use]
    pub const fn field(&self) -> RecordField {
        self.field
    }

    /// Runs the aggregation.
    #[must_use]
    pub fn run<'a>(
        &self,
        records: impl IntoIterator<Item = &'a OccurrenceRecord>,
    ) -> AggregationResult {
        let mut tally = Tally::default();
        for record in records {
            let label = match group_label(record, self.field) {
                Some(label) => label,
                None if self.skip_missing => continue,
                None => NOT_INFORMED_LABEL,
            };
            tally.add(label, measure_of(record, self.measure));
        }
        fold_top_n(tally.ranked(), self.top_n)
    }
}

/// Counts records per value of `field`. Missing values are grouped under
/// [`NOT_INFORMED_LABEL`].
#[must_use]
pub fn aggregate<'a>(
    records: impl IntoIterator<Item = &'a OccurrenceRecord>,
    field: RecordField,
    top_n: usize,
) -> AggregationResult {
    Aggregation::count(field, top_n).run(records)
}

/// Sums fatalities per value of `field`. Missing values are grouped under
/// [`NOT_INFORMED_LABEL`].
#[must_use]
pub fn aggregate_fatalities<'a>(
    records: impl IntoIterator<Item = &'a OccurrenceRecord>,
    field: RecordField,
    top_n: usize,
) -> AggregationResult {
    Aggregation::sum_fatalities(field, top_n).run(records)
}

/// The trimmed, non-blank value of `field`, if any.
pub(crate) fn group_label(record: &OccurrenceRecord, field: RecordField) -> Option<&str> {
    record
        .text(field)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Grouping identity of a label.
pub(crate) fn group_key(label: &str) -> String {
    label.trim().to_lowercase()
}

pub(crate) fn measure_of(record: &OccurrenceRecord, measure: Measure) -> u64 {
    match measure {
        Measure::Count => 1,
        Measure::Fatalities => u64::from(record.fatalities),
    }
}

/// Insertion-ordered accumulator.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    index: HashMap<String, usize>,
    buckets: Vec<Bucket>,
}

impl Tally {
    pub(crate) fn add(&mut self, label: &str, value: u64) {
        let key = group_key(label);
        if let Some(&i) = self.index.get(&key) {
            self.buckets[i].value += value;
        } else {
            self.index.insert(key, self.buckets.len());
            self.buckets.push(Bucket::new(label, value));
        }
    }

    /// Buckets by value descending; `sort_by` is stable so ties stay in
    /// first-seen order.
    pub(crate) fn ranked(mut self) -> Vec<Bucket> {
        self.buckets.sort_by(|a, b| b.value.cmp(&a.value));
        self.buckets
    }
}

/// Keeps the first `top_n` of `ranked` and folds a non-zero remainder
/// into [`OTHER_LABEL`]. A kept bucket whose value already reads
/// [`OTHER_LABEL`] absorbs the remainder instead of being duplicated.
pub(crate) fn fold_top_n(mut ranked: Vec<Bucket>, top_n: usize) -> AggregationResult {
    if ranked.len() > top_n {
        let remainder: u64 = ranked.drain(top_n..).map(|b| b.value).sum();
        if remainder > 0 {
            let other_key = group_key(OTHER_LABEL);
            match ranked.iter_mut().find(|b| group_key(&b.label) == other_key) {
                Some(existing) => {
                    existing.value += remainder;
                    ranked.sort_by(|a, b| b.value.cmp(&a.value));
                }
                None => ranked.push(Bucket::new(OTHER_LABEL, remainder)),
            }
        }
    }
    AggregationResult { buckets: ranked }
}
