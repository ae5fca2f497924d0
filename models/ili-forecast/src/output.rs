use chrono::NaiveDate;
use serde::Serialize;

/// One row of the forecast table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub ds: NaiveDate,
    pub cutoff: NaiveDate,
    pub percent_ill: f64,
    pub run: u32,
    pub region: String,
    pub error_scale: f64,
}

/// Expected range for one forecast date across an ensemble.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnsembleBand {
    pub region: String,
    pub cutoff: NaiveDate,
    pub ds: NaiveDate,
    /// Value of the unperturbed run, if it is part of the ensemble.
    pub baseline: Option<f64>,
    pub lower: f64,
    pub upper: f64,
    pub runs: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyStatus {
    Below,
    Within,
    Above,
}

/// An observed value compared against a band covering its date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnomalyFlag {
    pub region: String,
    pub cutoff: NaiveDate,
    pub ds: NaiveDate,
    pub observed: f64,
    pub lower: f64,
    pub upper: f64,
    pub status: AnomalyStatus,
}
