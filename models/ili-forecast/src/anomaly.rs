//! Expected influenza ranges from a forecast ensemble, and observations
//! that fall outside them.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::error::{ForecastError, Result};
use crate::output::{AnomalyFlag, AnomalyStatus, EnsembleBand, ForecastPoint};
use crate::series::Observation;

/// Quantile of ascending `sorted` values, interpolating linearly between
/// order statistics.
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let position = q * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    let fraction = position - below as f64;
    Some(sorted[below] + (sorted[above] - sorted[below]) * fraction)
}

/// One band per (region, cutoff, ds), ordered by region first appearance,
/// then cutoff, then date.
pub fn summarize_bands(
    points: &[ForecastPoint],
    lower_q: f64,
    upper_q: f64,
) -> Result<Vec<EnsembleBand>> {
    if !(0. ..=1.).contains(&lower_q) || !(0. ..=1.).contains(&upper_q) || lower_q >= upper_q {
        return Err(ForecastError::InvalidParameter(format!(
            "band quantiles must satisfy 0 <= lower < upper <= 1, got [{lower_q}, {upper_q}]"
        )));
    }

    let mut regions: Vec<&str> = Vec::new();
    let mut groups: BTreeMap<(usize, NaiveDate, NaiveDate), Vec<&ForecastPoint>> = BTreeMap::new();
    for point in points {
        let region = match regions.iter().position(|r| *r == point.region) {
            Some(index) => index,
            None => {
                regions.push(&point.region);
                regions.len() - 1
            }
        };
        groups
            .entry((region, point.cutoff, point.ds))
            .or_default()
            .push(point);
    }

    let mut bands = Vec::with_capacity(groups.len());
    for ((region, cutoff, ds), members) in groups {
        let baseline = members
            .iter()
            .find(|point| point.run == 0)
            .map(|point| point.percent_ill);
        let mut values: Vec<f64> = members.iter().map(|point| point.percent_ill).collect();
        values.sort_by(|a, b| a.total_cmp(b));
        let (Some(lower), Some(upper)) = (quantile(&values, lower_q), quantile(&values, upper_q))
        else {
            continue;
        };
        bands.push(EnsembleBand {
            region: regions[region].to_string(),
            cutoff,
            ds,
            baseline,
            lower,
            upper,
            runs: values.len(),
        });
    }
    Ok(bands)
}

/// Compare each band with the observation for its region and date. Bands
/// with no matching observation are skipped.
pub fn flag_anomalies(observations: &[Observation], bands: &[EnsembleBand]) -> Vec<AnomalyFlag> {
    let observed: HashMap<(&str, NaiveDate), f64> = observations
        .iter()
        .map(|obs| ((obs.region.as_str(), obs.ds), obs.percent_ill))
        .collect();
    bands
        .iter()
        .filter_map(|band| {
            let value = *observed.get(&(band.region.as_str(), band.ds))?;
            let status = if value > band.upper {
                AnomalyStatus::Above
            } else if value < band.lower {
                AnomalyStatus::Below
            } else {
                AnomalyStatus::Within
            };
            Some(AnomalyFlag {
                region: band.region.clone(),
                cutoff: band.cutoff,
                ds: band.ds,
                observed: value,
                lower: band.lower,
                upper: band.upper,
                status,
            })
        })
        .collect()
}
