use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analysis::join::JoinPolicy;
use crate::types::{BaselineWeighting, EventMarker, QualityTier, YearQuarter};

/// Read when no configuration file is named on the command line.
pub const DEFAULT_CONFIG_PATH: &str = "config/charts.yaml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub panel_path: PathBuf,
    pub inflation_path: PathBuf,
    pub occupancy_path: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            panel_path: PathBuf::from("data/Cleaned PAD.csv"),
            inflation_path: PathBuf::from("data/Inflation Q over Q 2019-2024.csv"),
            occupancy_path: PathBuf::from("data/Major Market Occupancy Data.csv"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
    pub width: u32,
    pub height: u32,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("visualizations/pngs"),
            width: 2100,
            height: 1200,
        }
    }
}

/// Fallback values applied where a join finds nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultPolicySettings {
    pub missing_inflation_rate: f64,
    pub missing_occupancy: f64,
    pub base_index: f64,
}

impl Default for DefaultPolicySettings {
    fn default() -> Self {
        Self {
            missing_inflation_rate: 0.0,
            missing_occupancy: 1.0,
            base_index: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSelection {
    pub utilization: bool,
    pub adjusted_utilization: bool,
    pub relative_rents: bool,
    pub occupancy_trend: bool,
}

impl Default for ChartSelection {
    fn default() -> Self {
        Self {
            utilization: true,
            adjusted_utilization: true,
            relative_rents: true,
            occupancy_trend: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelativeRentSettings {
    pub tier: QualityTier,
    pub direct_highlights: Vec<String>,
    pub sublet_highlights: Vec<String>,
    pub event_marker: Option<EventMarker>,
    pub weighting: BaselineWeighting,
}

impl Default for RelativeRentSettings {
    fn default() -> Self {
        Self {
            tier: QualityTier::Premium,
            direct_highlights: to_strings(&[
                "Manhattan",
                "San Francisco",
                "Detroit",
                "Baltimore",
                "South Bay",
                "Boston",
                "South Florida",
            ]),
            sublet_highlights: to_strings(&[
                "Manhattan",
                "San Francisco",
                "Atlanta",
                "Los Angeles",
                "Dallas-Ft. Worth",
            ]),
            event_marker: Some(EventMarker {
                period: YearQuarter::new(2020, 1),
                label: "COVID-19 Start".to_string(),
            }),
            weighting: BaselineWeighting::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data: DataPaths,
    pub output: OutputSettings,
    pub defaults: DefaultPolicySettings,
    pub markets: Vec<String>,
    pub quality_tiers: Vec<QualityTier>,
    pub charts: ChartSelection,
    pub relative_rents: RelativeRentSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data: DataPaths::default(),
            output: OutputSettings::default(),
            defaults: DefaultPolicySettings::default(),
            markets: default_markets(),
            quality_tiers: vec![QualityTier::Standard, QualityTier::Premium],
            charts: ChartSelection::default(),
            relative_rents: RelativeRentSettings::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `path` if it exists, otherwise falls back to the built-in settings.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Loads the file named on the command line, which must exist. Without
    /// one, `DEFAULT_CONFIG_PATH` is tried and the built-in settings fill in
    /// when it is absent.
    pub fn from_arg(arg: Option<&str>) -> Result<Self, ConfigError> {
        match arg {
            Some(path) => Self::load(path),
            None => Self::load_or_default(DEFAULT_CONFIG_PATH),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let defaults = &self.defaults;
        if !(defaults.base_index.is_finite() && defaults.base_index > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "base_index must be positive, got {}",
                defaults.base_index
            )));
        }
        if !(0.0..=1.0).contains(&defaults.missing_occupancy) {
            return Err(ConfigError::Invalid(format!(
                "missing_occupancy must be within [0, 1], got {}",
                defaults.missing_occupancy
            )));
        }
        if !defaults.missing_inflation_rate.is_finite() {
            return Err(ConfigError::Invalid(
                "missing_inflation_rate must be finite".to_string(),
            ));
        }
        if self.output.width == 0 || self.output.height == 0 {
            return Err(ConfigError::Invalid("image size must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn join_policy(&self) -> JoinPolicy {
        JoinPolicy {
            missing_inflation_rate: self.defaults.missing_inflation_rate,
            missing_occupancy: self.defaults.missing_occupancy,
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_markets() -> Vec<String> {
    to_strings(&[
        "Atlanta",
        "Austin",
        "Baltimore",
        "Boston",
        "Charlotte",
        "Chicago Suburbs",
        "Dallas-Ft. Worth",
        "Denver-Boulder",
        "Detroit",
        "Houston",
        "Los Angeles",
        "Nashville",
        "Manhattan",
        "Northern New Jersey",
        "Northern Virginia",
        "Orange County (CA)",
        "Philadelphia",
        "Phoenix",
        "Raleigh-Durham",
        "Salt Lake City",
        "San Diego",
        "San Francisco",
        "Seattle",
        "South Bay",
        "South Florida",
        "Suburban Maryland",
        "Tampa",
    ])
}
