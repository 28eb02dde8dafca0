use serde::{Deserialize, Serialize};
use std::fmt;

/// Building quality classification used to slice the panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    Standard,
    Premium,
}

impl QualityTier {
    /// Maps the panel's `is_premium_quality` flag (0 or 1).
    pub fn from_flag(flag: i64) -> Option<Self> {
        match flag {
            0 => Some(QualityTier::Standard),
            1 => Some(QualityTier::Premium),
            _ => None,
        }
    }

    pub fn flag(self) -> u8 {
        match self {
            QualityTier::Standard => 0,
            QualityTier::Premium => 1,
        }
    }

    /// Short name used in file names and progress lines.
    pub fn label(self) -> &'static str {
        match self {
            QualityTier::Standard => "Standard",
            QualityTier::Premium => "Premium",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Quality", self.label())
    }
}

/// Calendar quarter key shared by every source table.
///
/// Field order matters: the derived `Ord` sorts by year, then quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearQuarter {
    pub year: i32,
    pub quarter: u8,
}

impl YearQuarter {
    pub fn new(year: i32, quarter: u8) -> Self {
        Self { year, quarter }
    }
}

impl fmt::Display for YearQuarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} Q{}", self.year, self.quarter)
    }
}

/// A labelled quarter marked with a vertical line on time-series charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMarker {
    pub period: YearQuarter,
    pub label: String,
}

/// Which stacked-bar breakdown to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartVariant {
    /// Used / direct / sublet.
    Standard,
    /// Occupancy-adjusted used / underutilized / direct / sublet.
    Adjusted,
}

/// Which rent series a relative-rent comparison is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RentKind {
    Direct,
    Sublet,
}

impl RentKind {
    pub fn label(self) -> &'static str {
        match self {
            RentKind::Direct => "Direct",
            RentKind::Sublet => "Sublet",
        }
    }
}

/// Which rows weigh into a national average rent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineWeighting {
    /// Only space that also has a rent counts in the denominator.
    #[default]
    PricedSpace,
    /// All reported space counts in the denominator, priced or not.
    AllSpace,
}
