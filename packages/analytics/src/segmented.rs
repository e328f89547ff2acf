//! Multi-series chart data: one series per top category, per year.

use std::collections::{BTreeSet, HashMap};

use dataplane_analytics_models::{
    Measure, NOT_INFORMED_LABEL, OTHER_LABEL, SegmentedSeries, Series, TimeGranularity,
};
use dataplane_occurrence_models::{OccurrenceRecord, RecordField};

use crate::{
    aggregate::{Tally, group_key, group_label, measure_of},
    time::period_of,
};

/// Splits records by the value of `field` and by year.
///
/// The `top_n` categories with the largest totals across all years get
/// their own series; the rest are summed into an [`OTHER_LABEL`] series,
/// which is only emitted when it is non-zero. Every series has one value
/// per year in [`SegmentedSeries::periods`], zero where a category has no
/// records that year. Records with an unparseable date are skipped.
#[must_use]
pub fn segment_by_year<'a>(
    records: impl IntoIterator<Item = &'a OccurrenceRecord>,
    field: RecordField,
    top_n: usize,
    measure: Measure,
) -> SegmentedSeries {
    let mut totals = Tally::default();
    let mut cells: Vec<(&str, String, u64)> = Vec::new();
    let mut skipped = 0_u64;

    for record in records {
        let Some(date) = record.parsed_date() else {
            skipped += 1;
            continue;
        };
        let label = group_label(record, field).unwrap_or(NOT_INFORMED_LABEL);
        let value = measure_of(record, measure);
        totals.add(label, value);
        cells.push((label, period_of(date, TimeGranularity::Yearly), value));
    }

    let periods: Vec<String> = cells
        .iter()
        .map(|(_, period, _)| period.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let column: HashMap<&str, usize> = periods
        .iter()
        .enumerate()
        .map(|(i, period)| (period.as_str(), i))
        .collect();

    let mut series: Vec<Series> = totals
        .ranked()
        .into_iter()
        .take(top_n)
        .map(|bucket| Series {
            label: bucket.label,
            values: vec![0; periods.len()],
        })
        .collect();
    let row: HashMap<String, usize> = series
        .iter()
        .enumerate()
        .map(|(i, s)| (group_key(&s.label), i))
        .collect();
    let mut other = vec![0_u64; periods.len()];

    for (label, period, value) in &cells {
        let col = column[period.as_str()];
        match row.get(&group_key(label)) {
            Some(&i) => series[i].values[col] += value,
            None => other[col] += value,
        }
    }

    if other.iter().any(|v| *v > 0) {
        match row.get(&group_key(OTHER_LABEL)) {
            Some(&i) => {
                for (cell, value) in series[i].values.iter_mut().zip(other) {
                    *cell += value;
                }
            }
            None => series.push(Series {
                label: OTHER_LABEL.to_string(),
                values: other,
            }),
        }
    }

    SegmentedSeries {
        periods,
        series,
        skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::record;

    #[test]
    fn series_are_aligned_to_all_years() {
        let records = vec![
            record("SP", "ACIDENTE", "01/01/2018", 0),
            record("SP", "ACIDENTE", "01/01/2020", 0),
            record("SP", "INCIDENTE", "01/01/2019", 0),
            record("SP", "ACIDENTE", "05/05/2020", 0),
        ];
        let result = segment_by_year(&records, RecordField::Classification, 6, Measure::Count);
        assert_eq!(result.periods, vec!["2018", "2019", "2020"]);
        assert_eq!(result.series("ACIDENTE").unwrap().values, vec![1, 0, 2]);
        assert_eq!(result.series("INCIDENTE").unwrap().values, vec![0, 1, 0]);
        assert!(result.series.iter().all(|s| s.values.len() == 3));
        assert!(result.series(OTHER_LABEL).is_none());
    }

    #[test]
    fn categories_past_top_n_fold_into_other() {
        let records = vec![
            record("SP", "", "01/01/2020", 0),
            record("SP", "", "01/01/2021", 0),
            record("RJ", "", "01/01/2020", 0),
            record("MG", "", "01/01/2021", 0),
            record("BA", "", "01/01/2021", 0),
        ];
        let result = segment_by_year(&records, RecordField::State, 2, Measure::Count);
        let labels: Vec<&str> = result.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["SP", "RJ", OTHER_LABEL]);
        assert_eq!(result.series(OTHER_LABEL).unwrap().values, vec![0, 2]);
        let total: u64 = result.series.iter().map(Series::total).sum();
        assert_eq!(total, 5);
    }

    #[test]
    fn mixed_case_values_share_a_series() {
        let records = vec![
            record("SP", "", "01/01/2020", 0),
            record("sp", "", "01/01/2021", 0),
            record("RJ", "", "01/01/2021", 0),
        ];
        let result = segment_by_year(&records, RecordField::State, 1, Measure::Count);
        let labels: Vec<&str> = result.series.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["SP", OTHER_LABEL]);
        assert_eq!(result.series("SP").unwrap().values, vec![1, 1]);
        assert_eq!(result.series(OTHER_LABEL).unwrap().values, vec![0, 1]);
    }

    #[test]
    fn zero_other_series_is_omitted() {
        let records = vec![
            record("SP", "", "01/01/2020", 4),
            record("RJ", "", "01/01/2020", 0),
        ];
        let result = segment_by_year(&records, RecordField::State, 1, Measure::Fatalities);
        assert_eq!(result.series.len(), 1);
        assert_eq!(result.series[0].values, vec![4]);
    }

    #[test]
    fn undated_records_are_skipped() {
        let records = vec![
            record("SP", "", "bad", 0),
            record("", "", "01/01/2020", 0),
        ];
        let result = segment_by_year(&records, RecordField::State, 6, Measure::Count);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.series(NOT_INFORMED_LABEL).unwrap().values, vec![1]);
    }
}
