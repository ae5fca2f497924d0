use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use crate::epivars::EpiSeries;
use crate::error::{ForecastError, Result};

/// First day-of-year (March 16 in a leap year) scaled by the social
/// distancing multiplier.
pub const SOCIAL_DISTANCING_DOY: u32 = 76;

/// Seasonal reproduction number: the historical median R for each
/// day-of-year observed in a region's history.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReproductionProfile {
    by_doy: BTreeMap<u32, f64>,
}

/// Median of `values`, averaging the two middle values for even counts.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.)
    } else {
        Some(values[mid])
    }
}

impl ReproductionProfile {
    /// Group the defined R values of `epi` by day-of-year and take the median
    /// of each group. With `social_mod`, days-of-year from
    /// [`SOCIAL_DISTANCING_DOY`] onward are multiplied by it.
    pub fn from_series(epi: &EpiSeries, social_mod: Option<f64>) -> ReproductionProfile {
        let mut groups: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
        for (ds, r) in epi.dates.iter().zip(&epi.r) {
            if let Some(r) = r {
                groups.entry(ds.ordinal()).or_default().push(*r);
            }
        }
        let by_doy = groups
            .into_iter()
            .filter_map(|(doy, mut values)| {
                let r = median(&mut values)?;
                let r = match social_mod {
                    Some(factor) if doy >= SOCIAL_DISTANCING_DOY => r * factor,
                    _ => r,
                };
                Some((doy, r))
            })
            .collect();
        ReproductionProfile { by_doy }
    }

    pub fn get(&self, doy: u32) -> Option<f64> {
        self.by_doy.get(&doy).copied()
    }

    /// R for the day-of-year of `date`. Day 366 falls back to day 365 when
    /// the history holds no leap-day-of-year value.
    pub fn lookup(&self, date: NaiveDate) -> Result<f64> {
        let doy = date.ordinal();
        self.get(doy)
            .or_else(|| if doy == 366 { self.get(365) } else { None })
            .ok_or(ForecastError::UnknownDayOfYear { doy, date })
    }

    pub fn len(&self) -> usize {
        self.by_doy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_doy.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, f64)> + '_ {
        self.by_doy.iter().map(|(doy, r)| (*doy, *r))
    }
}
