use chrono::{Days, NaiveDate};

use crate::error::{ForecastError, Result};
use crate::kernel::{GenerationKernel, KERNEL_LEN};
use crate::profile::ReproductionProfile;

/// One forecast value, before ensemble tagging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedDay {
    pub ds: NaiveDate,
    pub cutoff: NaiveDate,
    pub percent_ill: f64,
}

/// Renewal-equation propagation of incidence past a cutoff date.
pub struct ForwardForecaster<'a> {
    kernel: &'a GenerationKernel,
    profile: &'a ReproductionProfile,
}

impl<'a> ForwardForecaster<'a> {
    pub fn new(kernel: &'a GenerationKernel, profile: &'a ReproductionProfile) -> Self {
        ForwardForecaster { kernel, profile }
    }

    /// Forecast `horizon_weeks * 7` days after `cutoff`.
    ///
    /// `recent` holds incidence up to and including `cutoff`, oldest first;
    /// only its last five values are used. Each day's prediction is the
    /// effective incidence of the five preceding days times the profile's R
    /// for that day-of-year, and feeds the following days. Values are not
    /// clamped.
    pub fn forecast(
        &self,
        recent: &[f64],
        cutoff: NaiveDate,
        horizon_weeks: u32,
    ) -> Result<Vec<PredictedDay>> {
        if recent.len() < KERNEL_LEN {
            return Err(ForecastError::InsufficientHistory {
                needed: KERNEL_LEN,
                available: recent.len(),
            });
        }
        let horizon_days = horizon_weeks as usize * 7;
        let mut buffer = Vec::with_capacity(KERNEL_LEN + horizon_days);
        buffer.extend_from_slice(&recent[recent.len() - KERNEL_LEN..]);

        let mut predicted = Vec::with_capacity(horizon_days);
        for day in 1..=horizon_days as u64 {
            let ds = cutoff + Days::new(day);
            let r = self.profile.lookup(ds)?;
            let ibar = self.kernel.effective_incidence(&buffer)?;
            let percent_ill = ibar * r;
            buffer.push(percent_ill);
            predicted.push(PredictedDay {
                ds,
                cutoff,
                percent_ill,
            });
        }
        Ok(predicted)
    }
}
