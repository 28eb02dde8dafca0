//! Cell-level coercion. Nothing in here fails: a value that cannot be read
//! becomes `None` and flows downstream as a missing value.

use super::{
    InflationRow, OccupancyRow, PanelRow, RawInflationRecord, RawOccupancyRecord, RawPanelRecord,
};
use crate::types::QualityTier;

fn field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}

/// Parses a numeric cell. Empty, unparsable and NaN cells are missing.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|v| !v.is_nan())
}

fn parse_integral(raw: &str) -> Option<i64> {
    let value = parse_numeric(raw)?;
    if value.is_finite() && value.fract() == 0.0 {
        Some(value as i64)
    } else {
        None
    }
}

/// Four-digit calendar year. Accepts "2020" and "2020.0".
pub fn parse_year(raw: &str) -> Option<i32> {
    parse_integral(raw)
        .filter(|y| (1000..=9999).contains(y))
        .map(|y| y as i32)
}

/// Quarter number 1-4. Accepts "3", "Q3" and the doubled "QQ3" form.
pub fn parse_quarter(raw: &str) -> Option<u8> {
    let digits: String = raw.chars().filter(|c| *c != 'Q' && *c != 'q').collect();
    parse_integral(&digits)
        .filter(|q| (1..=4).contains(q))
        .map(|q| q as u8)
}

pub fn parse_quality(raw: &str) -> Option<QualityTier> {
    parse_integral(raw).and_then(QualityTier::from_flag)
}

pub fn normalize_panel(record: RawPanelRecord) -> PanelRow {
    PanelRow {
        year: parse_year(field(&record.year)),
        quarter: parse_quarter(field(&record.quarter)),
        tier: parse_quality(field(&record.is_premium_quality)),
        total_space: parse_numeric(field(&record.total_space)),
        available_space: parse_numeric(field(&record.available_space)),
        direct_available_space: parse_numeric(field(&record.direct_available_space)),
        sublet_available_space: parse_numeric(field(&record.sublet_available_space)),
        internal_class_rent: parse_numeric(field(&record.internal_class_rent)),
        direct_internal_class_rent: parse_numeric(field(&record.direct_internal_class_rent)),
        sublet_internal_class_rent: parse_numeric(field(&record.sublet_internal_class_rent)),
        market: record.market.trim().to_string(),
    }
}

pub fn normalize_inflation(record: RawInflationRecord) -> InflationRow {
    InflationRow {
        year: parse_year(field(&record.year)),
        quarter: parse_quarter(field(&record.quarter)),
        inflation_rate: parse_numeric(field(&record.inflation_rate)),
    }
}

pub fn normalize_occupancy(record: RawOccupancyRecord) -> OccupancyRow {
    OccupancyRow {
        year: parse_year(field(&record.year)),
        quarter: parse_quarter(field(&record.quarter)),
        starting_occupancy_proportion: parse_numeric(field(
            &record.starting_occupancy_proportion,
        )),
        market: record.market.trim().to_string(),
    }
}
