//! Derived view models: the map, the charts and the record table.
//!
//! [`DashboardView::build`] recomputes everything from the record store
//! and the current filters. It is called after every filter change and
//! every applied fetch; nothing is updated incrementally.

use dataplane_analytics::{
    Aggregation, by_month, by_year, counts_by_region, fatalities_by_year, segment_by_year,
    shade_regions, summarize,
};
use dataplane_analytics_models::{
    AggregationResult, Measure, OccurrenceSummary, RegionShade, SegmentedSeries, TimeSeries,
};
use dataplane_filter::{FilterKey, FilterState, predicate};
use dataplane_occurrence_models::{OccurrenceRecord, RecordField};
use serde::Serialize;

use crate::{
    config::{ChartLimits, DashboardConfig},
    record_store::RecordStore,
};

/// Receives every freshly built [`DashboardView`].
pub trait ViewRenderer: Send + Sync {
    /// Called with the new view after each recompute.
    fn render(&self, view: &DashboardView);
}

impl<F> ViewRenderer for F
where
    F: Fn(&DashboardView) + Send + Sync,
{
    fn render(&self, view: &DashboardView) {
        self(view);
    }
}

/// A point on the marker layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    /// Occurrence code.
    pub code: Option<String>,
    /// Latitude.
    pub latitude: f64,
    /// Longitude.
    pub longitude: f64,
    /// Classification, for the marker tooltip.
    pub classification: Option<String>,
}

/// The choropleth and marker layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    /// Every state with its count and color.
    pub regions: Vec<RegionShade>,
    /// Map-eligible records that pass the filters.
    pub markers: Vec<MapMarker>,
    /// States currently selected in the state filter (highlighted).
    pub selected_states: Vec<String>,
}

impl MapView {
    fn build(records: &[OccurrenceRecord], filters: &FilterState) -> Self {
        let regions = shade_regions(&counts_by_region(records, filters));
        let markers = predicate::filter_map_records(records, filters)
            .into_iter()
            .filter_map(|r| {
                let (latitude, longitude) = r.coordinates()?;
                Some(MapMarker {
                    code: r.code.clone(),
                    latitude,
                    longitude,
                    classification: r.classification.clone(),
                })
            })
            .collect();
        Self {
            regions,
            markers,
            selected_states: filters
                .selected(FilterKey::State)
                .into_iter()
                .map(|s| s.trim().to_uppercase())
                .collect(),
        }
    }

    /// The shade of `region`, if it is on the map.
    #[must_use]
    pub fn region(&self, region: &str) -> Option<&RegionShade> {
        self.regions.iter().find(|r| r.region == region)
    }
}

/// Chart datasets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartView {
    /// Occurrences per state.
    pub by_state: AggregationResult,
    /// Occurrences per classification.
    pub by_classification: AggregationResult,
    /// Occurrences per damage level.
    pub by_damage: AggregationResult,
    /// Occurrences per aircraft type.
    pub by_aircraft_type: AggregationResult,
    /// Occurrences per year.
    pub yearly: TimeSeries,
    /// Occurrences per year-month.
    pub monthly: TimeSeries,
    /// Fatalities per year.
    pub fatalities_by_year: TimeSeries,
    /// Per-year series split by the segmentation field; `None` when no
    /// segmentation field is set.
    pub segmented: Option<SegmentedSeries>,
    /// Headline numbers.
    pub summary: OccurrenceSummary,
}

impl ChartView {
    fn build(
        filtered: &[&OccurrenceRecord],
        segment_by: Option<RecordField>,
        limits: &ChartLimits,
    ) -> Self {
        let run = |field, top_n| Aggregation::count(field, top_n).run(filtered.iter().copied());
        Self {
            by_state: run(RecordField::State, limits.by_state),
            by_classification: run(RecordField::Classification, limits.by_classification),
            by_damage: run(RecordField::DamageLevel, limits.by_damage),
            by_aircraft_type: run(RecordField::AircraftType, limits.by_aircraft_type),
            yearly: by_year(filtered.iter().copied()),
            monthly: by_month(filtered.iter().copied()),
            fatalities_by_year: fatalities_by_year(filtered.iter().copied()),
            segmented: segment_by.map(|field| {
                segment_by_year(
                    filtered.iter().copied(),
                    field,
                    limits.segmented,
                    Measure::Count,
                )
            }),
            summary: summarize(filtered.iter().copied()),
        }
    }
}

/// One row of the record table and of the CSV export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableRow {
    /// Occurrence code.
    pub id: String,
    /// `DD/MM/YYYY`.
    pub date: String,
    /// City.
    pub city: String,
    /// Country.
    pub country: String,
    /// Vehicle type.
    pub aircraft: String,
    /// Operator category.
    pub operator: String,
    /// Operation phase.
    pub phase: String,
    /// Classification.
    pub cause: String,
    /// `minor`, `major` or `fatal`.
    pub severity: String,
    /// Fatality count.
    pub fatalities: u32,
}

impl From<&OccurrenceRecord> for TableRow {
    fn from(record: &OccurrenceRecord) -> Self {
        let text = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .unwrap_or_default()
                .to_string()
        };
        Self {
            id: text(&record.code),
            date: text(&record.date),
            city: text(&record.city),
            country: text(&record.country),
            aircraft: text(&record.vehicle_type),
            operator: text(&record.operator_category),
            phase: text(&record.operation_phase),
            cause: text(&record.classification),
            severity: record.severity().to_string(),
            fatalities: record.fatalities,
        }
    }
}

/// One page of the filtered record table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TablePage {
    /// Rows of this page.
    pub rows: Vec<TableRow>,
    /// 1-based page number, clamped to `1..=page_count`.
    pub page: usize,
    /// Number of pages; at least 1.
    pub page_count: usize,
    /// Rows per page.
    pub page_size: usize,
    /// Records passing the filters.
    pub filtered: usize,
    /// Records fetched.
    pub fetched: usize,
    /// Total reported by the server.
    pub server_total: u64,
}

impl TablePage {
    /// Slices page `page` (1-based) out of `filtered`.
    #[must_use]
    pub fn build(
        filtered: &[&OccurrenceRecord],
        page: usize,
        page_size: usize,
        store: &RecordStore,
    ) -> Self {
        let page_size = page_size.max(1);
        let page_count = filtered.len().div_ceil(page_size).max(1);
        let page = page.clamp(1, page_count);
        let rows = filtered
            .iter()
            .skip((page - 1) * page_size)
            .take(page_size)
            .map(|r| TableRow::from(*r))
            .collect();
        Self {
            rows,
            page,
            page_count,
            page_size,
            filtered: filtered.len(),
            fetched: store.fetched(),
            server_total: store.server_total(),
        }
    }
}

/// Everything the dashboard renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardView {
    /// Choropleth and markers.
    pub map: MapView,
    /// Chart datasets.
    pub charts: ChartView,
    /// Current table page.
    pub table: TablePage,
    /// Number of active filter keys.
    pub active_filters: usize,
}

impl DashboardView {
    /// Recomputes every view from scratch.
    #[must_use]
    pub fn build(
        store: &RecordStore,
        filters: &FilterState,
        segment_by: Option<RecordField>,
        config: &DashboardConfig,
        page: usize,
    ) -> Self {
        let filtered = predicate::filter_records(store.records(), filters);
        Self {
            map: MapView::build(store.records(), filters),
            charts: ChartView::build(&filtered, segment_by, &config.charts),
            table: TablePage::build(&filtered, page, config.table.page_size, store),
            active_filters: filters.active_count(),
        }
    }
}

impl Default for DashboardView {
    fn default() -> Self {
        Self::build(
            &RecordStore::new(),
            &FilterState::new(),
            None,
            &DashboardConfig::default(),
            1,
        )
    }
}

#[cfg(test)]
mod tests {
    use dataplane_analytics_models::RegionColor;
    use dataplane_server_models::OccurrencesResponse;

    use super::*;

    fn record(code: &str, state: &str, classification: &str, lat: f64) -> OccurrenceRecord {
        OccurrenceRecord {
            code: Some(code.to_string()),
            state: Some(state.to_string()),
            classification: Some(classification.to_string()),
            date: Some("10/05/2021".to_string()),
            latitude: Some(lat),
            longitude: Some(-46.0),
            ..OccurrenceRecord::default()
        }
    }

    fn store(records: Vec<OccurrenceRecord>) -> RecordStore {
        let mut store = RecordStore::new();
        let total = records.len() as u64 + 100;
        store.replace(OccurrencesResponse {
            total,
            ocurrences: records,
        });
        store
    }

    #[test]
    fn map_excludes_records_without_coordinates_but_charts_do_not() {
        let store = store(vec![
            record("1", "SP", "ACIDENTE", -23.0),
            record("2", "SP", "ACIDENTE", 0.0),
        ]);
        let view = DashboardView::build(
            &store,
            &FilterState::new(),
            None,
            &DashboardConfig::default(),
            1,
        );
        assert_eq!(view.map.region("SP").unwrap().count, 1);
        assert_eq!(view.map.markers.len(), 1);
        assert_eq!(view.charts.by_classification.get("ACIDENTE"), Some(2));
        assert_eq!(view.map.region("SP").unwrap().color, RegionColor::Highest);
        assert_eq!(view.map.region("RJ").unwrap().color, RegionColor::Lowest);
    }

    #[test]
    fn state_chart_and_map_agree_on_mixed_case_codes() {
        let store = store(vec![
            record("1", "SP", "ACIDENTE", -23.0),
            record("2", "sp", "ACIDENTE", -23.5),
            record("3", "RJ", "INCIDENTE", -22.0),
        ]);
        let view = DashboardView::build(
            &store,
            &FilterState::new(),
            None,
            &DashboardConfig::default(),
            1,
        );
        assert_eq!(view.charts.by_state.get("SP"), Some(2));
        assert_eq!(view.charts.by_state.get("sp"), None);
        assert_eq!(view.charts.by_state.buckets.len(), 2);
        assert_eq!(view.map.region("SP").unwrap().count, 2);
        for bucket in &view.charts.by_state.buckets {
            let region = view.map.region(&bucket.label).unwrap();
            assert_eq!(region.count, bucket.value);
        }
    }

    #[test]
    fn segmented_chart_only_with_segmentation_field() {
        let store = store(vec![record("1", "SP", "ACIDENTE", -23.0)]);
        let config = DashboardConfig::default();
        let plain = DashboardView::build(&store, &FilterState::new(), None, &config, 1);
        assert!(plain.charts.segmented.is_none());

        let split = DashboardView::build(
            &store,
            &FilterState::new(),
            Some(RecordField::Classification),
            &config,
            1,
        );
        let segmented = split.charts.segmented.unwrap();
        assert_eq!(segmented.periods, vec!["2021"]);
        assert_eq!(segmented.series("ACIDENTE").unwrap().values, vec![1]);
    }

    #[test]
    fn table_pages_are_clamped() {
        let records: Vec<_> = (0..45)
            .map(|i| record(&i.to_string(), "SP", "INCIDENTE", -23.0))
            .collect();
        let store = store(records);
        let filtered = predicate::filter_records(store.records(), &FilterState::new());

        let first = TablePage::build(&filtered, 0, 20, &store);
        assert_eq!(first.page, 1);
        assert_eq!(first.page_count, 3);
        assert_eq!(first.rows.len(), 20);

        let last = TablePage::build(&filtered, 99, 20, &store);
        assert_eq!(last.page, 3);
        assert_eq!(last.rows.len(), 5);
        assert_eq!(last.rows[0].id, "40");
        assert_eq!(last.fetched, 45);
        assert_eq!(last.server_total, 145);
    }

    #[test]
    fn empty_table_has_one_page() {
        let page = TablePage::build(&[], 3, 20, &RecordStore::new());
        assert_eq!(page.page, 1);
        assert_eq!(page.page_count, 1);
        assert!(page.rows.is_empty());
    }

    #[test]
    fn rows_map_severity_from_damage() {
        let mut rec = record("7", "RJ", "ACIDENTE", -22.0);
        rec.damage_level = Some("DESTRUÍDA".to_string());
        rec.fatalities = 2;
        let row = TableRow::from(&rec);
        assert_eq!(row.severity, "fatal");
        assert_eq!(row.cause, "ACIDENTE");
        assert_eq!(row.fatalities, 2);
        assert_eq!(row.city, "");
    }

    #[test]
    fn selected_states_are_highlighted() {
        let mut filters = FilterState::new();
        filters.insert(FilterKey::State, vec!["sp", "RJ"].into());
        let view = DashboardView::build(
            &RecordStore::new(),
            &filters,
            None,
            &DashboardConfig::default(),
            1,
        );
        assert_eq!(view.map.selected_states, vec!["SP", "RJ"]);
        assert_eq!(view.active_filters, 1);
        assert!(
            view.map
                .regions
                .iter()
                .all(|r| r.color == RegionColor::NoData)
        );
    }
}
