use chrono::NaiveDate;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ForecastError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    /// Fewer observations than the generation kernel spans.
    #[error("insufficient history: {needed} observations required, {available} available")]
    InsufficientHistory { needed: usize, available: usize },

    /// The reproduction profile has no value for the day-of-year a forecast
    /// date falls on.
    #[error("no reproduction number for day-of-year {doy} (forecast date {date})")]
    UnknownDayOfYear { doy: u32, date: NaiveDate },

    #[error("invalid generation kernel: {0}")]
    InvalidKernel(String),

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("region '{region}' has no observations on or before the run date")]
    NoObservations { region: String },
}
