#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Chart-ready aggregation result types.
//!
//! These are pure derived views: they are recomputed from the filtered
//! record set on every filter change and never mutated in place.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Label of the bucket that folds everything past the top-N cut.
pub const OTHER_LABEL: &str = "Other";

/// Label of the bucket holding records with a missing or blank value.
pub const NOT_INFORMED_LABEL: &str = "Not informed";

/// What a bucket measures.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Measure {
    /// Number of records.
    Count,
    /// Sum of the fatality counts of the records.
    Fatalities,
}

/// Granularity for time-bucketed aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum TimeGranularity {
    /// One bucket per calendar year (`"2020"`).
    #[strum(serialize = "year")]
    Yearly,
    /// One bucket per year-month (`"2020-01"`).
    #[strum(serialize = "month")]
    Monthly,
}

/// One labeled group and its count or sum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Group label.
    pub label: String,
    /// Count or sum for this group.
    pub value: u64,
}

impl Bucket {
    /// Creates a bucket.
    #[must_use]
    pub fn new(label: impl Into<String>, value: u64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// Ordered buckets, value descending, with an optional trailing
/// [`OTHER_LABEL`] bucket.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregationResult {
    /// Buckets in display order.
    pub buckets: Vec<Bucket>,
}

impl AggregationResult {
    /// Sum of every bucket, including "Other".
    #[must_use]
    pub fn total(&self) -> u64 {
        self.buckets.iter().map(|b| b.value).sum()
    }

    /// Value of the bucket labeled `label`, if present.
    #[must_use]
    pub fn get(&self, label: &str) -> Option<u64> {
        self.buckets
            .iter()
            .find(|b| b.label == label)
            .map(|b| b.value)
    }

    /// Whether the result ends with a folded "Other" bucket.
    #[must_use]
    pub fn has_other(&self) -> bool {
        self.buckets.last().is_some_and(|b| b.label == OTHER_LABEL)
    }

    /// Whether there are no buckets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// `(label, value)` pairs, for compact assertions and printing.
    #[must_use]
    pub fn pairs(&self) -> Vec<(&str, u64)> {
        self.buckets
            .iter()
            .map(|b| (b.label.as_str(), b.value))
            .collect()
    }
}

/// A single time-series data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeriesPoint {
    /// Period label (`"2020"` or `"2020-01"`).
    pub period: String,
    /// Count or sum in this period.
    pub value: u64,
}

/// A time series sorted by period ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSeries {
    /// Bucket width.
    pub granularity: TimeGranularity,
    /// What each point measures.
    pub measure: Measure,
    /// Points in period order.
    pub points: Vec<TimeSeriesPoint>,
    /// Records left out because their date could not be parsed.
    pub skipped: u64,
}

impl TimeSeries {
    /// Period labels in order.
    #[must_use]
    pub fn periods(&self) -> Vec<&str> {
        self.points.iter().map(|p| p.period.as_str()).collect()
    }

    /// Value of `period`, zero if absent.
    #[must_use]
    pub fn value(&self, period: &str) -> u64 {
        self.points
            .iter()
            .find(|p| p.period == period)
            .map_or(0, |p| p.value)
    }
}

/// One series of a segmented chart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Series {
    /// Category label (or [`OTHER_LABEL`]).
    pub label: String,
    /// One value per period of the parent [`SegmentedSeries`].
    pub values: Vec<u64>,
}

impl Series {
    /// Sum over all periods.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }
}

/// Multi-series chart data: one series per top category, all aligned to
/// the same sorted periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentedSeries {
    /// Shared x-axis, ascending.
    pub periods: Vec<String>,
    /// Series in category-total order, "Other" last.
    pub series: Vec<Series>,
    /// Records left out because their date could not be parsed.
    pub skipped: u64,
}

impl SegmentedSeries {
    /// Looks up a series by label.
    #[must_use]
    pub fn series(&self, label: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.label == label)
    }
}

/// Discrete choropleth color classes, lightest to darkest.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RegionColor {
    /// Every region has a zero count.
    NoData,
    /// Intensity ≤ 0.2
    Lowest,
    /// Intensity ≤ 0.4
    Low,
    /// Intensity ≤ 0.6
    Medium,
    /// Intensity ≤ 0.8
    High,
    /// Intensity > 0.8
    Highest,
}

impl RegionColor {
    /// Fill color for this class.
    #[must_use]
    pub const fn token(self) -> &'static str {
        match self {
            Self::NoData => "#e5e7eb",
            Self::Lowest => "#dbeafe",
            Self::Low => "#93c5fd",
            Self::Medium => "#3b82f6",
            Self::High => "#1d4ed8",
            Self::Highest => "#1e3a8a",
        }
    }
}

/// A map region with its filtered count and color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionShade {
    /// Region code (two-letter state).
    pub region: String,
    /// Filtered, map-eligible occurrence count.
    pub count: u64,
    /// Color class.
    pub color: RegionColor,
}

/// Headline statistics of a record set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceSummary {
    /// Number of records.
    pub total: u64,
    /// Sum of fatalities.
    pub fatalities: u64,
    /// Record count per severity, in severity order.
    pub by_severity: Vec<Bucket>,
    /// Record count per operation phase, value descending.
    pub by_phase: Vec<Bucket>,
    /// Number of distinct countries.
    pub countries: usize,
    /// Most recent parseable occurrence date (`DD/MM/YYYY`).
    pub latest_date: Option<String>,
}
