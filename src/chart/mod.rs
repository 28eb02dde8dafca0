pub mod bitmap;

pub use bitmap::BitmapRenderer;

use crate::analysis::occupancy::OccupancyTrendChart;
use crate::analysis::relative_rent::RelativeRentChart;
use crate::analysis::utilization::UtilizationChart;
use crate::types::{ChartVariant, QualityTier, RentKind};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Drawing error: {0}")]
    Drawing(String),
}

pub type Result<T> = std::result::Result<T, ChartError>;

/// Draws prepared chart data to an image file, replacing any file already
/// at `path`.
pub trait ChartRenderer {
    fn render_utilization(&self, chart: &UtilizationChart, path: &Path) -> Result<()>;

    fn render_relative_rent(&self, chart: &RelativeRentChart, path: &Path) -> Result<()>;

    fn render_occupancy_trend(&self, chart: &OccupancyTrendChart, path: &Path) -> Result<()>;
}

/// `stacked_bars/AustinPremium.png` or `adj_stacked_bars/adj_AustinPremium.png`.
pub fn utilization_path(
    dir: &Path,
    market: &str,
    tier: QualityTier,
    variant: ChartVariant,
) -> PathBuf {
    let stem: String = market.chars().filter(|c| *c != ' ').collect();
    match variant {
        ChartVariant::Standard => dir
            .join("stacked_bars")
            .join(format!("{}{}.png", stem, tier.label())),
        ChartVariant::Adjusted => dir
            .join("adj_stacked_bars")
            .join(format!("adj_{}{}.png", stem, tier.label())),
    }
}

pub fn relative_rent_path(dir: &Path, kind: RentKind) -> PathBuf {
    dir.join(format!("relative_{}_rent.png", kind.label().to_lowercase()))
}

pub fn occupancy_trend_path(dir: &Path) -> PathBuf {
    dir.join("city_occupancy_trend.png")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utilization_paths() {
        let dir = Path::new("out");
        assert_eq!(
            utilization_path(dir, "Chicago Suburbs", QualityTier::Premium, ChartVariant::Standard),
            PathBuf::from("out/stacked_bars/ChicagoSuburbsPremium.png")
        );
        assert_eq!(
            utilization_path(
                dir,
                "Orange County (CA)",
                QualityTier::Standard,
                ChartVariant::Adjusted
            ),
            PathBuf::from("out/adj_stacked_bars/adj_OrangeCounty(CA)Standard.png")
        );
    }

    #[test]
    fn test_other_paths() {
        let dir = Path::new("out");
        assert_eq!(
            relative_rent_path(dir, RentKind::Sublet),
            PathBuf::from("out/relative_sublet_rent.png")
        );
        assert_eq!(
            occupancy_trend_path(dir),
            PathBuf::from("out/city_occupancy_trend.png")
        );
    }
}
