//! CSV export of the filtered record list.

use std::io::Write;

use chrono::NaiveDate;
use dataplane_occurrence_models::OccurrenceRecord;

use crate::{DashboardError, views::TableRow};

/// Column header, in order.
pub const CSV_HEADER: [&str; 10] = [
    "ID",
    "Date",
    "City",
    "Country",
    "Aircraft",
    "Operator",
    "Phase",
    "Cause",
    "Severity",
    "Fatalities",
];

/// Writes `records` as CSV with [`CSV_HEADER`] to `writer`. Fields that
/// contain commas or quotes are quoted. Returns the number of rows
/// written, excluding the header.
///
/// # Errors
///
/// Returns [`DashboardError`] if writing fails.
pub fn write_csv<'a, W: Write>(
    records: impl IntoIterator<Item = &'a OccurrenceRecord>,
    writer: W,
) -> Result<usize, DashboardError> {
    let mut csv = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    csv.write_record(CSV_HEADER)?;

    let mut rows = 0;
    for record in records {
        let row = TableRow::from(record);
        let fatalities = row.fatalities.to_string();
        csv.write_record([
            row.id.as_str(),
            row.date.as_str(),
            row.city.as_str(),
            row.country.as_str(),
            row.aircraft.as_str(),
            row.operator.as_str(),
            row.phase.as_str(),
            row.cause.as_str(),
            row.severity.as_str(),
            fatalities.as_str(),
        ])?;
        rows += 1;
    }

    csv.flush()?;
    Ok(rows)
}

/// Default export file name for `date`.
#[must_use]
pub fn export_file_name(date: NaiveDate) -> String {
    format!("aviation-occurrences-{}.csv", date.format("%Y-%m-%d"))
}
