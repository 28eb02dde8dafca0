use super::join::JoinedRow;

/// Index value assigned to the first quarter of a slice.
pub const DEFAULT_BASE_INDEX: f64 = 100.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DeflatedRow {
    pub joined: JoinedRow,
    pub cumulative_index: f64,
    pub deflation_factor: f64,
    pub direct_rent_adjusted: Option<f64>,
    pub sublet_rent_adjusted: Option<f64>,
}

/// Converts nominal rents into rents expressed in the prices of the slice's
/// first quarter.
///
/// The baseline is whichever quarter sorts first in the rows handed to
/// `deflate`, so adjusted rents are comparable within one slice only.
#[derive(Debug, Clone, Copy)]
pub struct InflationDeflator {
    base: f64,
}

impl Default for InflationDeflator {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_INDEX)
    }
}

impl InflationDeflator {
    pub fn new(base: f64) -> Self {
        Self { base }
    }

    pub fn base(&self) -> f64 {
        self.base
    }

    /// Sorts by (year, quarter) and compounds the index forward from the base.
    ///
    /// Sorting is stable, so rows sharing a quarter keep their input order.
    pub fn deflate(&self, mut rows: Vec<JoinedRow>) -> Vec<DeflatedRow> {
        rows.sort_by_key(|row| row.period);

        let rates: Vec<f64> = rows.iter().map(|row| row.inflation_rate).collect();
        let index = cumulative_index(&rates, self.base);

        rows.into_iter()
            .zip(index)
            .map(|(joined, cumulative_index)| {
                // A run of -100% rates zeroes the index; the non-finite result is passed through
                let deflation_factor = self.base / cumulative_index;
                DeflatedRow {
                    direct_rent_adjusted: joined
                        .row
                        .direct_internal_class_rent
                        .map(|rent| rent * deflation_factor),
                    sublet_rent_adjusted: joined
                        .row
                        .sublet_internal_class_rent
                        .map(|rent| rent * deflation_factor),
                    cumulative_index,
                    deflation_factor,
                    joined,
                }
            })
            .collect()
    }
}

/// Running index over quarter-over-quarter rates given in percent.
///
/// The first entry is always `base`; its own rate is ignored because it
/// describes the change into the baseline quarter.
pub fn cumulative_index(rates: &[f64], base: f64) -> Vec<f64> {
    rates
        .iter()
        .enumerate()
        .scan(base, |index, (i, rate)| {
            if i > 0 {
                *index *= 1.0 + rate / 100.0;
            }
            Some(*index)
        })
        .collect()
}
