use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One row of the input table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub region: String,
    pub ds: NaiveDate,
    pub percent_ill: f64,
}

/// Raw daily incidence for a single region, ordered by date.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionSeries {
    pub region: String,
    pub dates: Vec<NaiveDate>,
    pub incidence: Vec<f64>,
}

impl RegionSeries {
    pub fn new(region: impl Into<String>, mut points: Vec<(NaiveDate, f64)>) -> RegionSeries {
        points.sort_by_key(|(ds, _)| *ds);
        let (dates, incidence) = points.into_iter().unzip();
        RegionSeries {
            region: region.into(),
            dates,
            incidence,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

/// Split a multi-region table into per-region series. Regions keep the order
/// in which they first appear; rows need not be sorted.
pub fn group_by_region(observations: &[Observation]) -> Vec<RegionSeries> {
    let mut order: Vec<&str> = Vec::new();
    let mut points: HashMap<&str, Vec<(NaiveDate, f64)>> = HashMap::new();
    for obs in observations {
        let entry = points.entry(obs.region.as_str()).or_insert_with(|| {
            order.push(obs.region.as_str());
            Vec::new()
        });
        entry.push((obs.ds, obs.percent_ill));
    }
    order
        .into_iter()
        .map(|region| RegionSeries::new(region, points.remove(region).unwrap_or_default()))
        .collect()
}
