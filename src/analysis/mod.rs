pub mod deflator;
pub mod join;
pub mod occupancy;
pub mod pipeline;
pub mod relative_rent;
pub mod utilization;

use crate::types::YearQuarter;

/// A named line over time, sorted by period.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSeries {
    pub market: String,
    pub points: Vec<(YearQuarter, f64)>,
}
