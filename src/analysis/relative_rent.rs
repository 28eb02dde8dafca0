use super::MarketSeries;
use crate::data::PanelRow;
use crate::types::{BaselineWeighting, EventMarker, QualityTier, RentKind, YearQuarter};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct RelativeRentChart {
    pub kind: RentKind,
    pub tier: QualityTier,
    pub title: String,
    pub y_label: String,
    pub periods: Vec<YearQuarter>,
    pub series: Vec<MarketSeries>,
    pub highlighted: Vec<String>,
    pub event_marker: Option<EventMarker>,
}

impl RelativeRentChart {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn period_position(&self, period: &YearQuarter) -> Option<usize> {
        self.periods.binary_search(period).ok()
    }
}

fn rent_and_space(row: &PanelRow, kind: RentKind) -> (Option<f64>, Option<f64>) {
    match kind {
        RentKind::Direct => (row.direct_internal_class_rent, row.direct_available_space),
        RentKind::Sublet => (row.sublet_internal_class_rent, row.sublet_available_space),
    }
}

/// Space-weighted national average rent per quarter.
///
/// The numerator only ever sees rows with both a rent and a space. With
/// `AllSpace`, unpriced space still adds to the denominator. Quarters whose
/// total weight is zero have no baseline.
pub fn national_baseline<'a, I>(
    rows: I,
    kind: RentKind,
    weighting: BaselineWeighting,
) -> BTreeMap<YearQuarter, f64>
where
    I: IntoIterator<Item = &'a PanelRow>,
{
    let mut sums: BTreeMap<YearQuarter, (f64, f64)> = BTreeMap::new();
    for row in rows {
        let Some(period) = row.period() else { continue };
        let (rent, space) = rent_and_space(row, kind);
        let Some(space) = space else { continue };
        let entry = sums.entry(period).or_insert((0.0, 0.0));
        match (rent, weighting) {
            (Some(rent), _) => {
                entry.0 += rent * space;
                entry.1 += space;
            }
            (None, BaselineWeighting::AllSpace) => entry.1 += space,
            (None, BaselineWeighting::PricedSpace) => {}
        }
    }

    sums.into_iter()
        .filter(|(_, (_, weight))| *weight > 0.0)
        .map(|(period, (weighted, weight))| (period, weighted / weight))
        .collect()
}

/// Each market's rent as a multiple of the national baseline for that quarter.
///
/// The baseline is computed over every market in `tier`, not just the ones
/// plotted. Markets with no usable rows are left out of the chart.
pub fn relative_rents(
    panel: &[PanelRow],
    kind: RentKind,
    tier: QualityTier,
    markets: &[String],
    highlighted: &[String],
    event_marker: Option<EventMarker>,
    weighting: BaselineWeighting,
) -> RelativeRentChart {
    let tier_rows: Vec<&PanelRow> = panel.iter().filter(|r| r.tier == Some(tier)).collect();
    let baseline = national_baseline(tier_rows.iter().copied(), kind, weighting);

    let periods: Vec<YearQuarter> = tier_rows
        .iter()
        .filter_map(|r| r.period())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let series = markets
        .iter()
        .filter_map(|market| {
            let mut points: Vec<(YearQuarter, f64)> = tier_rows
                .iter()
                .filter(|r| &r.market == market)
                .filter_map(|r| {
                    let period = r.period()?;
                    let (rent, _) = rent_and_space(r, kind);
                    Some((period, rent? / baseline.get(&period)?))
                })
                .collect();
            if points.is_empty() {
                return None;
            }
            points.sort_by_key(|(period, _)| *period);
            Some(MarketSeries {
                market: market.clone(),
                points,
            })
        })
        .collect();

    RelativeRentChart {
        kind,
        tier,
        title: format!(
            "Market {} Rent Relative to National Average ({} Properties)",
            kind.label(),
            tier.label()
        ),
        y_label: format!("Relative {} Rent (National Avg = 1)", kind.label()),
        event_marker: event_marker.filter(|e| periods.binary_search(&e.period).is_ok()),
        periods,
        series,
        highlighted: highlighted.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn row(market: &str, quarter: u8, rent: Option<f64>, space: Option<f64>) -> PanelRow {
        PanelRow {
            market: market.to_string(),
            year: Some(2020),
            quarter: Some(quarter),
            tier: Some(QualityTier::Premium),
            total_space: None,
            available_space: None,
            direct_available_space: space,
            sublet_available_space: Some(1.0),
            internal_class_rent: None,
            direct_internal_class_rent: rent,
            sublet_internal_class_rent: Some(10.0),
        }
    }

    fn marker(year: i32, quarter: u8) -> EventMarker {
        EventMarker {
            period: YearQuarter::new(year, quarter),
            label: "Event".to_string(),
        }
    }

    #[test]
    fn test_baseline_is_space_weighted() {
        let rows = vec![
            row("Austin", 1, Some(40.0), Some(100.0)),
            row("Boston", 1, Some(60.0), Some(300.0)),
            row("Denver", 1, None, Some(1000.0)),
        ];
        let baseline =
            national_baseline(&rows, RentKind::Direct, BaselineWeighting::PricedSpace);

        assert_relative_eq!(baseline[&YearQuarter::new(2020, 1)], 55.0, epsilon = 1e-12);
    }

    #[test]
    fn test_all_space_weighting_counts_unpriced_space() {
        let rows = vec![
            row("Austin", 1, Some(40.0), Some(100.0)),
            row("Boston", 1, Some(60.0), Some(300.0)),
            row("Denver", 1, None, Some(1000.0)),
            row("Tampa", 1, Some(90.0), None),
        ];
        let baseline = national_baseline(&rows, RentKind::Direct, BaselineWeighting::AllSpace);

        // (40 * 100 + 60 * 300) / (100 + 300 + 1000)
        assert_relative_eq!(
            baseline[&YearQuarter::new(2020, 1)],
            22_000.0 / 1_400.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_unpriced_quarter_has_baseline_only_when_weighted_by_all_space() {
        let rows = vec![row("Austin", 2, None, Some(500.0))];

        let priced = national_baseline(&rows, RentKind::Direct, BaselineWeighting::PricedSpace);
        assert!(priced.is_empty());
        let all = national_baseline(&rows, RentKind::Direct, BaselineWeighting::AllSpace);
        assert_eq!(all[&YearQuarter::new(2020, 2)], 0.0);
    }

    #[test]
    fn test_zero_weight_quarter_has_no_baseline() {
        let rows = vec![row("Austin", 2, Some(40.0), Some(0.0))];
        let baseline = national_baseline(&rows, RentKind::Direct, BaselineWeighting::AllSpace);
        assert!(baseline.is_empty());
    }

    #[test]
    fn test_relative_rents_divide_by_baseline() {
        let rows = vec![
            row("Austin", 1, Some(40.0), Some(100.0)),
            row("Boston", 1, Some(60.0), Some(300.0)),
            row("Boston", 2, Some(50.0), Some(100.0)),
        ];
        let markets = vec!["Austin".to_string(), "Boston".to_string(), "Tampa".to_string()];
        let chart = relative_rents(
            &rows,
            RentKind::Direct,
            QualityTier::Premium,
            &markets,
            &["Boston".to_string()],
            Some(marker(2020, 1)),
            BaselineWeighting::PricedSpace,
        );

        assert_eq!(chart.series.len(), 2);
        assert_relative_eq!(chart.series[0].points[0].1, 40.0 / 55.0, epsilon = 1e-12);
        assert_relative_eq!(chart.series[1].points[1].1, 1.0, epsilon = 1e-12);
        assert_eq!(chart.periods.len(), 2);
        assert_eq!(chart.event_marker, Some(marker(2020, 1)));
        assert_eq!(
            chart.title,
            "Market Direct Rent Relative to National Average (Premium Properties)"
        );
    }

    #[test]
    fn test_event_marker_outside_range_is_dropped() {
        let rows = vec![row("Austin", 3, Some(40.0), Some(100.0))];
        let chart = relative_rents(
            &rows,
            RentKind::Sublet,
            QualityTier::Premium,
            &["Austin".to_string()],
            &[],
            Some(marker(2019, 1)),
            BaselineWeighting::PricedSpace,
        );

        assert_eq!(chart.event_marker, None);
        assert_relative_eq!(chart.series[0].points[0].1, 1.0, epsilon = 1e-12);
    }
}
