use super::MarketSeries;
use crate::data::OccupancyRow;
use crate::types::YearQuarter;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct OccupancyTrendChart {
    pub title: String,
    pub periods: Vec<YearQuarter>,
    pub series: Vec<MarketSeries>,
}

/// Starting occupancy per market over time, in percent.
///
/// Markets appear in the order they first show up chronologically. Rows
/// with no period or no occupancy value are skipped.
pub fn occupancy_trend(rows: &[OccupancyRow]) -> OccupancyTrendChart {
    let mut usable: Vec<(YearQuarter, &str, f64)> = rows
        .iter()
        .filter_map(|row| {
            Some((
                row.period()?,
                row.market.as_str(),
                row.starting_occupancy_proportion? * 100.0,
            ))
        })
        .collect();
    usable.sort_by_key(|(period, _, _)| *period);

    let mut series: Vec<MarketSeries> = Vec::new();
    for (period, market, pct) in &usable {
        match series.iter_mut().find(|s| s.market == *market) {
            Some(existing) => existing.points.push((*period, *pct)),
            None => series.push(MarketSeries {
                market: market.to_string(),
                points: vec![(*period, *pct)],
            }),
        }
    }

    let periods = usable
        .iter()
        .map(|(period, _, _)| *period)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    OccupancyTrendChart {
        title: "Occupancy Percentage by City Over Time".to_string(),
        periods,
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(market: &str, year: i32, quarter: u8, value: Option<f64>) -> OccupancyRow {
        OccupancyRow {
            market: market.to_string(),
            year: Some(year),
            quarter: Some(quarter),
            starting_occupancy_proportion: value,
        }
    }

    #[test]
    fn test_series_sorted_and_scaled() {
        let rows = vec![
            row("Austin", 2020, 2, Some(0.5)),
            row("Boston", 2020, 1, Some(0.8)),
            row("Austin", 2020, 1, Some(0.6)),
            row("Austin", 2020, 3, None),
        ];
        let chart = occupancy_trend(&rows);

        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].market, "Boston");
        let austin = &chart.series[1];
        assert_eq!(austin.points.len(), 2);
        assert_eq!(austin.points[0].0, YearQuarter::new(2020, 1));
        assert!((austin.points[0].1 - 60.0).abs() < 1e-9);
        assert_eq!(chart.periods.len(), 2);
    }
}
