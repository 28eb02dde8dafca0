pub mod loader;
pub mod normalize;

use crate::types::{QualityTier, YearQuarter};
use serde::Deserialize;
use thiserror::Error;

/// Panel record as it appears on disk. Every field is kept as text so that a
/// bad cell becomes a missing value during normalization instead of failing
/// the whole read.
#[derive(Debug, Deserialize)]
pub struct RawPanelRecord {
    pub market: String,
    pub year: Option<String>,
    pub quarter: Option<String>,
    pub is_premium_quality: Option<String>,
    pub total_space: Option<String>,
    pub available_space: Option<String>,
    pub direct_available_space: Option<String>,
    pub sublet_available_space: Option<String>,
    pub internal_class_rent: Option<String>,
    pub direct_internal_class_rent: Option<String>,
    pub sublet_internal_class_rent: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawInflationRecord {
    pub year: Option<String>,
    pub quarter: Option<String>,
    pub inflation_rate: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawOccupancyRecord {
    pub market: String,
    pub year: Option<String>,
    pub quarter: Option<String>,
    pub starting_occupancy_proportion: Option<String>,
}

/// One (market, year, quarter, quality tier) observation.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRow {
    pub market: String,
    pub year: Option<i32>,
    pub quarter: Option<u8>,
    pub tier: Option<QualityTier>,
    pub total_space: Option<f64>,
    pub available_space: Option<f64>,
    pub direct_available_space: Option<f64>,
    pub sublet_available_space: Option<f64>,
    pub internal_class_rent: Option<f64>,
    pub direct_internal_class_rent: Option<f64>,
    pub sublet_internal_class_rent: Option<f64>,
}

impl PanelRow {
    /// The row's position in time, if both keys survived normalization.
    pub fn period(&self) -> Option<YearQuarter> {
        Some(YearQuarter::new(self.year?, self.quarter?))
    }
}

/// Quarter-over-quarter inflation, in percent.
#[derive(Debug, Clone, PartialEq)]
pub struct InflationRow {
    pub year: Option<i32>,
    pub quarter: Option<u8>,
    pub inflation_rate: Option<f64>,
}

impl InflationRow {
    pub fn period(&self) -> Option<YearQuarter> {
        Some(YearQuarter::new(self.year?, self.quarter?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyRow {
    pub market: String,
    pub year: Option<i32>,
    pub quarter: Option<u8>,
    pub starting_occupancy_proportion: Option<f64>,
}

impl OccupancyRow {
    pub fn period(&self) -> Option<YearQuarter> {
        Some(YearQuarter::new(self.year?, self.quarter?))
    }
}

/// The three normalized tables a run works from.
#[derive(Debug, Clone, Default)]
pub struct Sources {
    pub panel: Vec<PanelRow>,
    pub inflation: Vec<InflationRow>,
    pub occupancy: Vec<OccupancyRow>,
}

#[derive(Debug, Error)]
pub enum DataError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(String),
}

pub type Result<T> = std::result::Result<T, DataError>;
