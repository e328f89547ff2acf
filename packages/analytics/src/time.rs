//! Time-bucketed aggregation.
//!
//! Dates are read with the `DD/MM/YYYY` contract of
//! [`dataplane_occurrence_models::date`]. Records whose date is missing or
//! does not follow it are left out of the series and counted in
//! [`TimeSeries::skipped`].

use std::collections::BTreeMap;

use chrono::{Datelike as _, NaiveDate};
use dataplane_analytics_models::{Measure, TimeGranularity, TimeSeries, TimeSeriesPoint};
use dataplane_occurrence_models::{OccurrenceRecord, date::month_label};

use crate::aggregate::measure_of;

/// Period label of `date` at `granularity`.
#[must_use]
pub fn period_of(date: NaiveDate, granularity: TimeGranularity) -> String {
    match granularity {
        TimeGranularity::Yearly => date.year().to_string(),
        TimeGranularity::Monthly => month_label(date),
    }
}

/// Buckets records by period, ascending. Only periods that occur in the
/// data are emitted.
#[must_use]
pub fn time_series<'a>(
    records: impl IntoIterator<Item = &'a OccurrenceRecord>,
    granularity: TimeGranularity,
    measure: Measure,
) -> TimeSeries {
    let mut periods: BTreeMap<String, u64> = BTreeMap::new();
    let mut skipped = 0_u64;

    for record in records {
        let Some(date) = record.parsed_date() else {
            skipped += 1;
            continue;
        };
        *periods.entry(period_of(date, granularity)).or_default() += measure_of(record, measure);
    }

    if skipped > 0 {
        log::debug!("Skipped {skipped} records with an unparseable date in {granularity} series");
    }

    TimeSeries {
        granularity,
        measure,
        points: periods
            .into_iter()
            .map(|(period, value)| TimeSeriesPoint { period, value })
            .collect(),
        skipped,
    }
}

/// Occurrence count per calendar year.
#[must_use]
pub fn by_year<'a>(records: impl IntoIterator<Item = &'a OccurrenceRecord>) -> TimeSeries {
    time_series(records, TimeGranularity::Yearly, Measure::Count)
}

/// Occurrence count per year-month.
#[must_use]
pub fn by_month<'a>(records: impl IntoIterator<Item = &'a OccurrenceRecord>) -> TimeSeries {
    time_series(records, TimeGranularity::Monthly, Measure::Count)
}

/// Fatality sum per calendar year.
#[must_use]
pub fn fatalities_by_year<'a>(
    records: impl IntoIterator<Item = &'a OccurrenceRecord>,
) -> TimeSeries {
    time_series(records, TimeGranularity::Yearly, Measure::Fatalities)
}
