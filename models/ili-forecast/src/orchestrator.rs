//! Ensemble driver: every region, every run date, every simulation.
//!
//! Each region's history is derived once and then only read. Run dates and
//! simulations are independent of one another, so regions and simulations
//! are evaluated in parallel. Simulation `s >= 1` draws its jitter from a
//! random stream seeded by (run seed, replicate, region, run date, `s`),
//! which keeps results reproducible whatever the scheduling.

use chrono::NaiveDate;
use log::{debug, info, warn};
use rand::{SeedableRng, distr::Distribution, rngs::StdRng};
use rand_distr::Normal;
use rayon::prelude::*;

use crate::epivars::{EpiSeries, LEAKAGE_GUARD_DAYS};
use crate::error::{ForecastError, Result};
use crate::forecast::ForwardForecaster;
use crate::kernel::{GenerationKernel, KERNEL_LEN};
use crate::output::ForecastPoint;
use crate::profile::ReproductionProfile;
use crate::series::{Observation, RegionSeries, group_by_region};

#[derive(Debug, Clone, PartialEq)]
pub struct EnsembleConfig {
    pub run_dates: Vec<NaiveDate>,
    /// Forecast length in weeks.
    pub horizon: u32,
    pub simulations: u32,
    pub social_mod: Option<f64>,
    pub seed: u64,
    pub replicate: u64,
}

impl EnsembleConfig {
    pub fn validate(&self) -> Result<()> {
        if self.run_dates.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "run_dates must not be empty".to_string(),
            ));
        }
        if self.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "horizon must be at least 1 week".to_string(),
            ));
        }
        if self.simulations == 0 {
            return Err(ForecastError::InvalidParameter(
                "simulations must be at least 1".to_string(),
            ));
        }
        if let Some(factor) = self.social_mod
            && !(factor.is_finite() && factor > 0.)
        {
            return Err(ForecastError::InvalidParameter(format!(
                "social_mod must be a positive number, got {factor}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent<'a> {
    RegionStarted {
        region: &'a str,
        index: usize,
        total: usize,
    },
    RunDateFinished {
        region: &'a str,
        run_date: NaiveDate,
        points: usize,
    },
}

pub type ProgressHook = Box<dyn Fn(&ProgressEvent<'_>) + Send + Sync>;

/// Default progress hook.
pub fn log_progress(event: &ProgressEvent<'_>) {
    match event {
        ProgressEvent::RegionStarted {
            region,
            index,
            total,
        } => info!("Forecasting for {region} ({}/{total})", index + 1),
        ProgressEvent::RunDateFinished {
            region,
            run_date,
            points,
        } => debug!("{region} {run_date}: {points} forecast points"),
    }
}

/// Profile built only from R values whose smoothing window ends on or before
/// the last row of `truncated`.
pub fn guarded_profile(truncated: &EpiSeries, social_mod: Option<f64>) -> ReproductionProfile {
    let guarded = truncated.mask_recent_r(LEAKAGE_GUARD_DAYS);
    ReproductionProfile::from_series(&guarded, social_mod)
}

/// Everything a run date's simulations share. `cutoff` is the last
/// observation on or before `run_date` and anchors the recurrence; output is
/// tagged with `run_date`.
struct RunDateContext<'a> {
    region: &'a str,
    run_date: NaiveDate,
    cutoff: NaiveDate,
    recent: &'a [f64],
    profile: ReproductionProfile,
    error_scale: f64,
}

pub struct MonteCarloOrchestrator {
    kernel: GenerationKernel,
    config: EnsembleConfig,
    progress: ProgressHook,
}

impl MonteCarloOrchestrator {
    pub fn new(kernel: GenerationKernel, config: EnsembleConfig) -> Result<Self> {
        config.validate()?;
        Ok(MonteCarloOrchestrator {
            kernel,
            config,
            progress: Box::new(log_progress),
        })
    }

    pub fn with_progress(
        mut self,
        hook: impl Fn(&ProgressEvent<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Box::new(hook);
        self
    }

    /// Forecast every region of `observations` from every run date.
    ///
    /// Points come back grouped by region (first appearance order), then run
    /// date, then simulation index.
    pub fn run(&self, observations: &[Observation]) -> Result<Vec<ForecastPoint>> {
        let regions = group_by_region(observations);
        let total = regions.len();
        let per_region = regions
            .par_iter()
            .enumerate()
            .map(|(index, series)| self.run_region(series, index, total))
            .collect::<Result<Vec<_>>>()?;
        Ok(per_region.into_iter().flatten().collect())
    }

    pub fn run_region(
        &self,
        series: &RegionSeries,
        index: usize,
        total: usize,
    ) -> Result<Vec<ForecastPoint>> {
        (self.progress)(&ProgressEvent::RegionStarted {
            region: &series.region,
            index,
            total,
        });
        let epi = EpiSeries::derive(series, &self.kernel)?;
        let mut points = Vec::new();
        for run_date in &self.config.run_dates {
            let forecast = self.run_date(&epi, *run_date)?;
            (self.progress)(&ProgressEvent::RunDateFinished {
                region: &series.region,
                run_date: *run_date,
                points: forecast.len(),
            });
            points.extend(forecast);
        }
        Ok(points)
    }

    /// All simulations for one region and run date. `epi` must hold the
    /// region's full derived history.
    pub fn run_date(&self, epi: &EpiSeries, run_date: NaiveDate) -> Result<Vec<ForecastPoint>> {
        let truncated = epi.truncate(run_date);
        let Some(cutoff) = truncated.last_date() else {
            return Err(ForecastError::NoObservations {
                region: epi.region.clone(),
            });
        };
        if truncated.len() < KERNEL_LEN {
            return Err(ForecastError::InsufficientHistory {
                needed: KERNEL_LEN,
                available: truncated.len(),
            });
        }
        if cutoff < run_date {
            warn!(
                "{}: last observation {cutoff} precedes run date {run_date}, forecasting from {cutoff}",
                epi.region
            );
        }

        let error_scale = truncated.error_scale().unwrap_or_else(|| {
            warn!(
                "{}: too little history before {run_date} to estimate error scale",
                epi.region
            );
            0.
        });

        let context = RunDateContext {
            region: &epi.region,
            run_date,
            cutoff,
            recent: &truncated.incidence[truncated.len() - KERNEL_LEN..],
            profile: guarded_profile(&truncated, self.config.social_mod),
            error_scale,
        };

        let per_simulation = (0..self.config.simulations)
            .into_par_iter()
            .map(|run| self.simulate(&context, run))
            .collect::<Result<Vec<_>>>()?;
        Ok(per_simulation.into_iter().flatten().collect())
    }

    fn simulate(&self, context: &RunDateContext<'_>, run: u32) -> Result<Vec<ForecastPoint>> {
        let jitter = if run == 0 {
            0.
        } else {
            let run_date = context.run_date.to_string();
            let run_label = run.to_string();
            let seed = mrp::derive_seed(
                self.config.seed,
                self.config.replicate,
                &[context.region, run_date.as_str(), run_label.as_str()],
            );
            let mut rng = StdRng::seed_from_u64(seed);
            Normal::new(0., context.error_scale)
                .map_err(|e| ForecastError::InvalidParameter(format!("error scale: {e}")))?
                .sample(&mut rng)
        };
        // One draw shifts the whole history; only the last five values reach
        // the forecaster.
        let recent: Vec<f64> = context.recent.iter().map(|v| v + jitter).collect();

        let predicted = ForwardForecaster::new(&self.kernel, &context.profile).forecast(
            &recent,
            context.cutoff,
            self.config.horizon,
        )?;
        Ok(predicted
            .into_iter()
            .map(|day| ForecastPoint {
                ds: day.ds,
                cutoff: context.run_date,
                percent_ill: day.percent_ill,
                run,
                region: context.region.to_string(),
                error_scale: context.error_scale,
            })
            .collect())
    }
}
