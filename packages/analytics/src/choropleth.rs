//! Map region color model.
//!
//! Each region's intensity is its count divided by the largest count on
//! the map, mapped onto five fixed classes:
//!
//! | intensity     | class                     | token     |
//! |---------------|---------------------------|-----------|
//! | ≤ 0.2         | [`RegionColor::Lowest`]   | `#dbeafe` |
//! | ≤ 0.4         | [`RegionColor::Low`]      | `#93c5fd` |
//! | ≤ 0.6         | [`RegionColor::Medium`]   | `#3b82f6` |
//! | ≤ 0.8         | [`RegionColor::High`]     | `#1d4ed8` |
//! | > 0.8         | [`RegionColor::Highest`]  | `#1e3a8a` |
//! | max count = 0 | [`RegionColor::NoData`]   | `#e5e7eb` |
//!
//! Thresholds are compared in integer arithmetic so that boundary values
//! land in the lower class exactly.

use std::collections::BTreeMap;

use dataplane_analytics_models::{RegionColor, RegionShade};
use dataplane_filter::{FilterState, passes_map_scope};
use dataplane_occurrence_models::{BRAZIL_STATES, OccurrenceRecord};

/// Filtered, map-eligible occurrence count per state code.
///
/// Every one of the 27 states is present, with zero where no record
/// matches. Records without usable coordinates, or whose state is not a
/// known code, are not counted.
#[must_use]
pub fn counts_by_region<'a>(
    records: impl IntoIterator<Item = &'a OccurrenceRecord>,
    filters: &FilterState,
) -> BTreeMap<String, u64> {
    let mut counts: BTreeMap<String, u64> = BRAZIL_STATES
        .iter()
        .map(|(code, _)| ((*code).to_string(), 0))
        .collect();

    for record in records {
        if !passes_map_scope(record, filters) {
            continue;
        }
        let Some(state) = record.state.as_deref() else {
            continue;
        };
        if let Some(count) = counts.get_mut(&state.trim().to_uppercase()) {
            *count += 1;
        }
    }

    counts
}

/// Color class for an individual count given the largest count on the
/// map.
#[must_use]
pub const fn intensity_class(count: u64, max: u64) -> RegionColor {
    if max == 0 {
        return RegionColor::NoData;
    }
    // count / max <= k / 5  <=>  5 * count <= k * max
    let scaled = count.saturating_mul(5);
    if scaled <= max {
        RegionColor::Lowest
    } else if scaled <= max.saturating_mul(2) {
        RegionColor::Low
    } else if scaled <= max.saturating_mul(3) {
        RegionColor::Medium
    } else if scaled <= max.saturating_mul(4) {
        RegionColor::High
    } else {
        RegionColor::Highest
    }
}

/// Color class of `region` under `counts`. Regions absent from `counts`
/// are treated as zero.
#[must_use]
pub fn color_for(region: &str, counts: &BTreeMap<String, u64>) -> RegionColor {
    let max = counts.values().copied().max().unwrap_or(0);
    let count = counts.get(region).copied().unwrap_or(0);
    intensity_class(count, max)
}

/// Every region of `counts` with its count and color, in region order.
#[must_use]
pub fn shade_regions(counts: &BTreeMap<String, u64>) -> Vec<RegionShade> {
    let max = counts.values().copied().max().unwrap_or(0);
    counts
        .iter()
        .map(|(region, &count)| RegionShade {
            region: region.clone(),
            count,
            color: intensity_class(count, max),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use dataplane_filter::FilterKey;

    use super::*;
    use crate::fixtures::record;

    fn counts(pairs: &[(&str, u64)]) -> BTreeMap<String, u64> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), *v)).collect()
    }

    #[test]
    fn boundaries_fall_into_the_lower_class() {
        let map = counts(&[("AC", 1), ("AL", 2), ("AP", 3), ("AM", 4), ("BA", 5)]);
        assert_eq!(color_for("AC", &map), RegionColor::Lowest);
        assert_eq!(color_for("AL", &map), RegionColor::Low);
        assert_eq!(color_for("AP", &map), RegionColor::Medium);
        assert_eq!(color_for("AM", &map), RegionColor::High);
        assert_eq!(color_for("BA", &map), RegionColor::Highest);
    }

    #[test]
    fn just_above_a_boundary_moves_up() {
        // 21 / 100 > 0.2, 81 / 100 > 0.8
        assert_eq!(intensity_class(21, 100), RegionColor::Low);
        assert_eq!(intensity_class(20, 100), RegionColor::Lowest);
        assert_eq!(intensity_class(81, 100), RegionColor::Highest);
        assert_eq!(intensity_class(80, 100), RegionColor::High);
        assert_eq!(intensity_class(0, 100), RegionColor::Lowest);
    }

    #[test]
    fn all_zero_is_no_data() {
        let map = counts(&[("SP", 0), ("RJ", 0)]);
        assert_eq!(color_for("SP", &map), RegionColor::NoData);
        assert_eq!(color_for("XX", &map), RegionColor::NoData);
        assert!(
            shade_regions(&map)
                .iter()
                .all(|s| s.color == RegionColor::NoData)
        );
    }

    #[test]
    fn counts_cover_every_state_and_respect_filters() {
        let mut no_coords = record("SP", "ACIDENTE", "", 0);
        no_coords.latitude = Some(0.0);
        no_coords.longitude = Some(0.0);
        let records = vec![
            record("SP", "ACIDENTE", "", 0),
            record("sp ", "INCIDENTE", "", 0),
            record("RJ", "ACIDENTE", "", 0),
            record("ZZ", "ACIDENTE", "", 0),
            no_coords,
        ];

        let all = counts_by_region(&records, &FilterState::new());
        assert_eq!(all.len(), 27);
        assert_eq!(all["SP"], 2);
        assert_eq!(all["RJ"], 1);
        assert_eq!(all["MG"], 0);

        let mut filters = FilterState::new();
        filters.insert(FilterKey::Classification, "ACIDENTE".into());
        let accidents = counts_by_region(&records, &filters);
        assert_eq!(accidents["SP"], 1);
        assert_eq!(color_for("SP", &accidents), RegionColor::Highest);
        assert_eq!(color_for("MG", &accidents), RegionColor::Lowest);
    }
}
