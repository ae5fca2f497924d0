//! Near-term influenza-like-illness forecasts from a renewal equation.
//!
//! A fixed generation-time kernel turns recent incidence into effective
//! incidence; a smoothed reproduction number, aggregated by day-of-year over
//! past seasons, propagates incidence forward from each run date. Jittered
//! re-runs give the forecast's uncertainty.

pub mod anomaly;
pub mod epivars;
pub mod error;
pub mod forecast;
pub mod kernel;
pub mod orchestrator;
pub mod output;
pub mod parameters;
pub mod profile;
pub mod series;

pub use anomaly::{flag_anomalies, summarize_bands};
pub use epivars::EpiSeries;
pub use error::{ForecastError, Result};
pub use forecast::{ForwardForecaster, PredictedDay};
pub use kernel::GenerationKernel;
pub use orchestrator::{EnsembleConfig, MonteCarloOrchestrator, ProgressEvent};
pub use output::{AnomalyFlag, AnomalyStatus, EnsembleBand, ForecastPoint};
pub use parameters::Parameters;
pub use profile::ReproductionProfile;
pub use series::{Observation, RegionSeries};
