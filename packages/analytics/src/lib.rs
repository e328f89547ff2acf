#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Aggregation engine for occurrence records.
//!
//! Every function here is pure: it takes an already filtered record subset
//! and returns a fresh chart-ready value from
//! [`dataplane_analytics_models`]. Nothing is cached between calls.

pub mod aggregate;
pub mod choropleth;
pub mod segmented;
pub mod summary;
pub mod time;

pub use aggregate::{Aggregation, aggregate, aggregate_fatalities};
pub use choropleth::{color_for, counts_by_region, shade_regions};
pub use segmented::segment_by_year;
pub use summary::summarize;
pub use time::{by_month, by_year, fatalities_by_year, time_series};

#[cfg(test)]
pub(crate) mod fixtures {
    use dataplane_occurrence_models::OccurrenceRecord;

    /// A record carrying only the fields the aggregation tests look at.
    pub fn record(
        state: &str,
        classification: &str,
        date: &str,
        fatalities: u32,
    ) -> OccurrenceRecord {
        OccurrenceRecord {
            state: Some(state.to_string()).filter(|s| !s.is_empty()),
            classification: Some(classification.to_string()).filter(|s| !s.is_empty()),
            date: Some(date.to_string()).filter(|s| !s.is_empty()),
            fatalities,
            latitude: Some(-15.8),
            longitude: Some(-47.9),
            ..OccurrenceRecord::default()
        }
    }
}
