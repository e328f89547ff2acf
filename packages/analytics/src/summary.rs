//! Headline statistics shown above the charts.

use std::collections::BTreeSet;

use dataplane_analytics_models::{Bucket, OccurrenceSummary};
use dataplane_occurrence_models::{
    OccurrenceRecord, RecordField, Severity, date::format_occurrence_date,
};

use crate::aggregate::{Aggregation, group_label};

/// Computes totals, severity and phase breakdowns, distinct countries and
/// the most recent occurrence date.
#[must_use]
pub fn summarize<'a>(records: impl IntoIterator<Item = &'a OccurrenceRecord>) -> OccurrenceSummary {
    let records: Vec<&OccurrenceRecord> = records.into_iter().collect();

    let mut severity = [0_u64; 3];
    let mut countries = BTreeSet::new();
    let mut fatalities = 0_u64;

    for record in &records {
        fatalities += u64::from(record.fatalities);
        severity[record.severity() as usize] += 1;
        if let Some(country) = group_label(record, RecordField::Country) {
            countries.insert(country.to_uppercase());
        }
    }

    let latest_date = records
        .iter()
        .filter_map(|r| r.parsed_date())
        .max()
        .map(format_occurrence_date);

    OccurrenceSummary {
        total: records.len() as u64,
        fatalities,
        by_severity: Severity::all()
            .iter()
            .map(|s| Bucket::new(s.to_string(), severity[*s as usize]))
            .collect(),
        by_phase: Aggregation::count(RecordField::OperationPhase, usize::MAX)
            .skip_missing()
            .run(records.iter().copied())
            .buckets,
        countries: countries.len(),
        latest_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::record;

    #[test]
    fn summarizes_records() {
        let mut destroyed = record("SP", "ACIDENTE", "10/10/2021", 3);
        destroyed.damage_level = Some("DESTRUÍDA".to_string());
        destroyed.country = Some("BRASIL".to_string());
        destroyed.operation_phase = Some("POUSO".to_string());
        let mut damaged = record("RJ", "ACIDENTE", "01/02/2022", 1);
        damaged.damage_level = Some("SUBSTANCIAL".to_string());
        damaged.country = Some("Brasil".to_string());
        damaged.operation_phase = Some("POUSO".to_string());
        let mut light = record("MG", "INCIDENTE", "not a date", 0);
        light.country = Some("ARGENTINA".to_string());
        light.operation_phase = Some("DECOLAGEM".to_string());

        let summary = summarize(&[destroyed, damaged, light]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.fatalities, 4);
        assert_eq!(
            summary.by_severity,
            vec![
                Bucket::new("minor", 1),
                Bucket::new("major", 1),
                Bucket::new("fatal", 1),
            ]
        );
        assert_eq!(
            summary.by_phase,
            vec![Bucket::new("POUSO", 2), Bucket::new("DECOLAGEM", 1)]
        );
        assert_eq!(summary.countries, 2);
        assert_eq!(summary.latest_date.as_deref(), Some("01/02/2022"));
    }

    #[test]
    fn empty_input() {
        let summary = summarize(&Vec::<OccurrenceRecord>::new());
        assert_eq!(summary.total, 0);
        assert_eq!(summary.latest_date, None);
        assert!(summary.by_phase.is_empty());
        assert!(summary.by_severity.iter().all(|b| b.value == 0));
    }
}
