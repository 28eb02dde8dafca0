use super::deflator::DeflatedRow;
use crate::types::{ChartVariant, QualityTier, YearQuarter};
use ndarray::Array1;

/// Space is charted in millions of square feet.
pub const SQFT_PER_MILLION: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Used,
    AdjustedUsed,
    Underutilized,
    Direct,
    Sublet,
}

impl SegmentKind {
    pub fn label(self) -> &'static str {
        match self {
            SegmentKind::Used => "Used Space",
            SegmentKind::AdjustedUsed => "Adj. Used Space",
            SegmentKind::Underutilized => "Underutilized Space",
            SegmentKind::Direct => "Direct Space",
            SegmentKind::Sublet => "Sublet Space",
        }
    }
}

/// One layer of the stacked bars, bottom to top.
#[derive(Debug, Clone)]
pub struct Segment {
    pub kind: SegmentKind,
    pub values: Array1<f64>,
    pub percentages: Array1<f64>,
}

#[derive(Debug, Clone)]
pub struct UtilizationChart {
    pub market: String,
    pub tier: QualityTier,
    pub variant: ChartVariant,
    pub title: String,
    pub periods: Vec<YearQuarter>,
    pub segments: Vec<Segment>,
    pub total_stacked: Array1<f64>,
    pub direct_rent_adjusted: Vec<Option<f64>>,
    pub sublet_rent_adjusted: Vec<Option<f64>>,
}

impl UtilizationChart {
    pub fn len(&self) -> usize {
        self.periods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.periods.is_empty()
    }

    pub fn period_labels(&self) -> Vec<String> {
        self.periods.iter().map(|p| p.to_string()).collect()
    }

    /// Bottom edge of every segment, aligned with `segments`.
    pub fn segment_bases(&self) -> Vec<Array1<f64>> {
        let mut running = Array1::zeros(self.len());
        let mut bases = Vec::with_capacity(self.segments.len());
        for segment in &self.segments {
            bases.push(running.clone());
            running = running + &segment.values;
        }
        bases
    }

    pub fn max_stack(&self) -> f64 {
        self.total_stacked
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
    }

    pub fn max_rent(&self) -> f64 {
        self.direct_rent_adjusted
            .iter()
            .chain(self.sublet_rent_adjusted.iter())
            .flatten()
            .copied()
            .filter(|v| v.is_finite())
            .fold(0.0, f64::max)
    }
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn percentages(values: &Array1<f64>, total: &Array1<f64>) -> Array1<f64> {
    Array1::from_iter(values.iter().zip(total.iter()).map(|(&v, &t)| {
        if t > 0.0 {
            round_to_tenth(v / t * 100.0)
        } else {
            0.0
        }
    }))
}

fn millions(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0) / SQFT_PER_MILLION
}

/// Builds the stacked segments and rent lines for one deflated slice.
///
/// Missing space values count as zero. Rows are taken in the order given,
/// which `InflationDeflator::deflate` guarantees is chronological.
pub fn build_utilization_chart(
    market: &str,
    tier: QualityTier,
    variant: ChartVariant,
    rows: &[DeflatedRow],
) -> UtilizationChart {
    let used: Array1<f64> = rows
        .iter()
        .map(|r| {
            let panel = &r.joined.row;
            let used = match (panel.total_space, panel.available_space) {
                (Some(total), Some(available)) => Some(total - available),
                _ => None,
            };
            millions(used)
        })
        .collect();
    let direct: Array1<f64> = rows
        .iter()
        .map(|r| millions(r.joined.row.direct_available_space))
        .collect();
    let sublet: Array1<f64> = rows
        .iter()
        .map(|r| millions(r.joined.row.sublet_available_space))
        .collect();

    let mut layers = match variant {
        ChartVariant::Standard => vec![(SegmentKind::Used, used)],
        ChartVariant::Adjusted => {
            let occupancy: Array1<f64> =
                rows.iter().map(|r| r.joined.starting_occupancy).collect();
            let adjusted = &used * &occupancy;
            let underutilized = &used * &occupancy.mapv(|o| 1.0 - o);
            vec![
                (SegmentKind::AdjustedUsed, adjusted),
                (SegmentKind::Underutilized, underutilized),
            ]
        }
    };
    layers.push((SegmentKind::Direct, direct));
    layers.push((SegmentKind::Sublet, sublet));

    let total_stacked: Array1<f64> = layers
        .iter()
        .fold(Array1::zeros(rows.len()), |acc, (_, values)| acc + values);

    let segments = layers
        .into_iter()
        .map(|(kind, values)| Segment {
            kind,
            percentages: percentages(&values, &total_stacked),
            values,
        })
        .collect();

    UtilizationChart {
        market: market.to_string(),
        tier,
        variant,
        title: format!(
            "{} {} Space Utilization and Inflation-Adjusted Rental Prices",
            market, tier
        ),
        periods: rows.iter().map(|r| r.joined.period).collect(),
        segments,
        total_stacked,
        direct_rent_adjusted: rows.iter().map(|r| r.direct_rent_adjusted).collect(),
        sublet_rent_adjusted: rows.iter().map(|r| r.sublet_rent_adjusted).collect(),
    }
}
