use super::normalize::{normalize_inflation, normalize_occupancy, normalize_panel};
use super::{
    DataError, InflationRow, OccupancyRow, PanelRow, RawInflationRecord, RawOccupancyRecord,
    RawPanelRecord, Result, Sources,
};
use crate::config::DataPaths;
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

const PANEL_COLUMNS: [&str; 11] = [
    "market",
    "year",
    "quarter",
    "is_premium_quality",
    "total_space",
    "available_space",
    "direct_available_space",
    "sublet_available_space",
    "internal_class_rent",
    "direct_internal_class_rent",
    "sublet_internal_class_rent",
];

const INFLATION_COLUMNS: [&str; 3] = ["year", "quarter", "inflation_rate"];

const OCCUPANCY_COLUMNS: [&str; 4] = ["market", "year", "quarter", "starting_occupancy_proportion"];

pub struct DataLoader;

impl DataLoader {
    fn verify_required_columns(headers: &[String], required: &[&str]) -> Result<()> {
        let headers_set: HashSet<_> = headers.iter().map(|s| s.to_lowercase()).collect();

        for column in required {
            if !headers_set.contains(&column.to_lowercase()) {
                return Err(DataError::MissingColumn(column.to_string()));
            }
        }
        Ok(())
    }

    fn read_records<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>> {
        let file = File::open(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        // Headers are matched case-insensitively, so lower-case them before serde sees them
        let headers: Vec<String> = rdr.headers()?.iter().map(|s| s.to_lowercase()).collect();
        Self::verify_required_columns(&headers, required)?;
        rdr.set_headers(csv::StringRecord::from(headers));

        let mut records = Vec::new();
        for result in rdr.deserialize() {
            records.push(result?);
        }

        debug!(path = %path.display(), rows = records.len(), "read table");
        Ok(records)
    }

    pub fn load_panel<P: AsRef<Path>>(path: P) -> Result<Vec<PanelRow>> {
        let records: Vec<RawPanelRecord> = Self::read_records(path.as_ref(), &PANEL_COLUMNS)?;
        Ok(records.into_iter().map(normalize_panel).collect())
    }

    pub fn load_inflation<P: AsRef<Path>>(path: P) -> Result<Vec<InflationRow>> {
        let records: Vec<RawInflationRecord> =
            Self::read_records(path.as_ref(), &INFLATION_COLUMNS)?;
        Ok(records.into_iter().map(normalize_inflation).collect())
    }

    pub fn load_occupancy<P: AsRef<Path>>(path: P) -> Result<Vec<OccupancyRow>> {
        let records: Vec<RawOccupancyRecord> =
            Self::read_records(path.as_ref(), &OCCUPANCY_COLUMNS)?;
        Ok(records.into_iter().map(normalize_occupancy).collect())
    }

    /// Reads all three tables. Any missing or unreadable table fails the load.
    pub fn load_sources(paths: &DataPaths) -> Result<Sources> {
        let sources = Sources {
            panel: Self::load_panel(&paths.panel_path)?,
            inflation: Self::load_inflation(&paths.inflation_path)?,
            occupancy: Self::load_occupancy(&paths.occupancy_path)?,
        };

        info!(
            panel = sources.panel.len(),
            inflation = sources.inflation.len(),
            occupancy = sources.occupancy.len(),
            "loaded source tables"
        );
        Ok(sources)
    }

    /// Distinct markets in the panel, sorted.
    pub fn get_markets(panel: &[PanelRow]) -> Vec<String> {
        let mut markets: Vec<String> = panel
            .iter()
            .map(|row| row.market.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        markets.sort();
        markets
    }
}
