use crate::data::{InflationRow, OccupancyRow, PanelRow};
use crate::types::{QualityTier, YearQuarter};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Values assumed when an auxiliary table has nothing for a panel row.
///
/// A missing inflation rate means "no price change"; a missing occupancy
/// means "fully utilized".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinPolicy {
    pub missing_inflation_rate: f64,
    pub missing_occupancy: f64,
}

impl Default for JoinPolicy {
    fn default() -> Self {
        Self {
            missing_inflation_rate: 0.0,
            missing_occupancy: 1.0,
        }
    }
}

/// A panel row with its auxiliary columns attached.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedRow {
    pub row: PanelRow,
    pub period: YearQuarter,
    pub inflation_rate: f64,
    pub starting_occupancy: f64,
    pub inflation_defaulted: bool,
    pub occupancy_defaulted: bool,
}

/// Rows for one (market, tier) pair. Rows without a usable period are dropped.
pub fn select_slice(panel: &[PanelRow], market: &str, tier: QualityTier) -> Vec<PanelRow> {
    let mut dropped = 0usize;
    let slice: Vec<PanelRow> = panel
        .iter()
        .filter(|row| row.market == market && row.tier == Some(tier))
        .filter(|row| {
            let keep = row.period().is_some();
            if !keep {
                dropped += 1;
            }
            keep
        })
        .cloned()
        .collect();

    if dropped > 0 {
        debug!(market, tier = tier.label(), dropped, "dropped rows without a year/quarter");
    }
    slice
}

fn index_inflation(inflation: &[InflationRow]) -> HashMap<YearQuarter, Option<f64>> {
    let mut index = HashMap::new();
    for row in inflation {
        if let Some(period) = row.period() {
            if index.contains_key(&period) {
                warn!(%period, "duplicate inflation row, keeping the first");
                continue;
            }
            index.insert(period, row.inflation_rate);
        }
    }
    index
}

fn index_occupancy(occupancy: &[OccupancyRow]) -> HashMap<(String, YearQuarter), Option<f64>> {
    let mut index = HashMap::new();
    for row in occupancy {
        if let Some(period) = row.period() {
            let key = (row.market.clone(), period);
            if index.contains_key(&key) {
                warn!(market = %row.market, %period, "duplicate occupancy row, keeping the first");
                continue;
            }
            index.insert(key, row.starting_occupancy_proportion);
        }
    }
    index
}

/// Left-joins inflation on (year, quarter) and occupancy on (year, quarter, market).
///
/// Row order of `slice` is preserved. Misses, and matches whose value is
/// itself missing, take the policy default.
pub fn join(
    slice: Vec<PanelRow>,
    inflation: &[InflationRow],
    occupancy: &[OccupancyRow],
    policy: &JoinPolicy,
) -> Vec<JoinedRow> {
    let inflation_index = index_inflation(inflation);
    let occupancy_index = index_occupancy(occupancy);

    slice
        .into_iter()
        .filter_map(|row| {
            let period = row.period()?;

            let rate = inflation_index.get(&period).copied().flatten();
            let occupancy = occupancy_index
                .get(&(row.market.clone(), period))
                .copied()
                .flatten();

            Some(JoinedRow {
                inflation_rate: rate.unwrap_or(policy.missing_inflation_rate),
                starting_occupancy: occupancy.unwrap_or(policy.missing_occupancy),
                inflation_defaulted: rate.is_none(),
                occupancy_defaulted: occupancy.is_none(),
                period,
                row,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn panel_row(market: &str, year: i32, quarter: u8, tier: QualityTier) -> PanelRow {
        PanelRow {
            market: market.to_string(),
            year: Some(year),
            quarter: Some(quarter),
            tier: Some(tier),
            total_space: Some(1_000_000.0),
            available_space: Some(200_000.0),
            direct_available_space: Some(150_000.0),
            sublet_available_space: Some(50_000.0),
            internal_class_rent: Some(40.0),
            direct_internal_class_rent: Some(42.0),
            sublet_internal_class_rent: Some(30.0),
        }
    }

    #[test]
    fn test_select_slice_filters_market_tier_and_period() {
        let mut missing_quarter = panel_row("Austin", 2020, 1, QualityTier::Standard);
        missing_quarter.quarter = None;

        let panel = vec![
            panel_row("Austin", 2020, 1, QualityTier::Standard),
            panel_row("Austin", 2020, 1, QualityTier::Premium),
            panel_row("Boston", 2020, 1, QualityTier::Standard),
            missing_quarter,
        ];

        let slice = select_slice(&panel, "Austin", QualityTier::Standard);
        assert_eq!(slice.len(), 1);
        assert_eq!(slice[0].market, "Austin");
        assert!(select_slice(&panel, "Denver", QualityTier::Standard).is_empty());
    }

    #[test]
    fn test_join_applies_data_when_present() {
        let slice = vec![panel_row("Austin", 2020, 1, QualityTier::Standard)];
        let inflation = vec![InflationRow {
            year: Some(2020),
            quarter: Some(1),
            inflation_rate: Some(2.0),
        }];
        let occupancy = vec![OccupancyRow {
            market: "Austin".to_string(),
            year: Some(2020),
            quarter: Some(1),
            starting_occupancy_proportion: Some(0.6),
        }];

        let joined = join(slice, &inflation, &occupancy, &JoinPolicy::default());
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].inflation_rate, 2.0);
        assert_eq!(joined[0].starting_occupancy, 0.6);
        assert!(!joined[0].inflation_defaulted);
        assert!(!joined[0].occupancy_defaulted);
    }

    #[test]
    fn test_join_applies_policy_on_miss() {
        let slice = vec![panel_row("Austin", 2021, 3, QualityTier::Premium)];
        let occupancy = vec![OccupancyRow {
            market: "Boston".to_string(),
            year: Some(2021),
            quarter: Some(3),
            starting_occupancy_proportion: Some(0.5),
        }];

        let joined = join(slice.clone(), &[], &occupancy, &JoinPolicy::default());
        assert_eq!(joined[0].inflation_rate, 0.0);
        assert_eq!(joined[0].starting_occupancy, 1.0);
        assert!(joined[0].inflation_defaulted);
        assert!(joined[0].occupancy_defaulted);

        let policy = JoinPolicy {
            missing_inflation_rate: 0.5,
            missing_occupancy: 0.8,
        };
        let joined = join(slice, &[], &occupancy, &policy);
        assert_eq!(joined[0].inflation_rate, 0.5);
        assert_eq!(joined[0].starting_occupancy, 0.8);
    }

    #[test]
    fn test_matched_but_empty_value_uses_default() {
        let slice = vec![panel_row("Austin", 2020, 2, QualityTier::Standard)];
        let occupancy = vec![OccupancyRow {
            market: "Austin".to_string(),
            year: Some(2020),
            quarter: Some(2),
            starting_occupancy_proportion: None,
        }];

        let joined = join(slice, &[], &occupancy, &JoinPolicy::default());
        assert_eq!(joined[0].starting_occupancy, 1.0);
        assert!(joined[0].occupancy_defaulted);
    }
}
