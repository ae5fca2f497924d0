//! Effective incidence and reproduction number derived from a region's
//! observed history.

use chrono::NaiveDate;
use log::warn;

use crate::error::{ForecastError, Result};
use crate::kernel::{GenerationKernel, KERNEL_LEN};
use crate::series::RegionSeries;

/// Width of the centered moving average used to smooth R and residuals.
pub const SMOOTHING_WINDOW: usize = 30;

/// Trailing R values whose smoothing window reaches past the last
/// observation.
pub const LEAKAGE_GUARD_DAYS: usize = SMOOTHING_WINDOW / 2;

/// A region's history augmented with the derived `ibar` and `R` columns.
///
/// Every stage returns a new value; nothing here is mutated in place.
#[derive(Debug, Clone, PartialEq)]
pub struct EpiSeries {
    pub region: String,
    pub dates: Vec<NaiveDate>,
    pub incidence: Vec<f64>,
    pub ibar: Vec<f64>,
    pub r: Vec<Option<f64>>,
}

/// Centered moving average with a full-window requirement.
///
/// For an even `window` the frame at `i` spans `i - window/2 ..= i + window/2 - 1`.
/// Positions whose frame runs off either end, or covers a missing value, are
/// `None`.
pub fn centered_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let lead = window.saturating_sub(1) / 2;
    (0..n)
        .map(|i| {
            let end = i + 1 + lead;
            if window == 0 || end > n || end < window {
                return None;
            }
            let frame = &values[end - window..end];
            let mut total = 0.;
            for value in frame {
                total += (*value)?;
            }
            Some(total / window as f64)
        })
        .collect()
}

fn defined(values: &[f64]) -> Vec<Option<f64>> {
    values.iter().copied().map(Some).collect()
}

impl EpiSeries {
    /// Derive `ibar` and `R` over a region's full history.
    ///
    /// The first five `ibar` entries are the mean of the first five
    /// observations. `R` is the centered mean of next-day incidence over the
    /// centered mean of `ibar`; undefined ratios take the mean of the defined
    /// ones.
    pub fn derive(series: &RegionSeries, kernel: &GenerationKernel) -> Result<EpiSeries> {
        let n = series.len();
        if n < KERNEL_LEN {
            return Err(ForecastError::InsufficientHistory {
                needed: KERNEL_LEN,
                available: n,
            });
        }
        let incidence = &series.incidence;

        let warm_up = incidence[..KERNEL_LEN].iter().sum::<f64>() / KERNEL_LEN as f64;
        let mut ibar = vec![warm_up; n];
        for i in KERNEL_LEN..n {
            ibar[i] = kernel.effective_incidence(&incidence[i + 1 - KERNEL_LEN..=i])?;
        }

        let next_day: Vec<Option<f64>> = (0..n).map(|i| incidence.get(i + 1).copied()).collect();
        let numerator = centered_mean(&next_day, SMOOTHING_WINDOW);
        let denominator = centered_mean(&defined(&ibar), SMOOTHING_WINDOW);
        let raw: Vec<Option<f64>> = numerator
            .iter()
            .zip(&denominator)
            .map(|(num, den)| match (num, den) {
                (Some(num), Some(den)) => Some(num / den).filter(|r| r.is_finite()),
                _ => None,
            })
            .collect();

        let known: Vec<f64> = raw.iter().flatten().copied().collect();
        let r = if known.is_empty() {
            warn!(
                "{}: {} observations are too few to estimate R",
                series.region, n
            );
            raw
        } else {
            let fill = known.iter().sum::<f64>() / known.len() as f64;
            raw.into_iter().map(|r| Some(r.unwrap_or(fill))).collect()
        };

        Ok(EpiSeries {
            region: series.region.clone(),
            dates: series.dates.clone(),
            incidence: incidence.clone(),
            ibar,
            r,
        })
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    /// Rows dated on or before `run_date`.
    pub fn truncate(&self, run_date: NaiveDate) -> EpiSeries {
        let keep = self.dates.partition_point(|ds| *ds <= run_date);
        EpiSeries {
            region: self.region.clone(),
            dates: self.dates[..keep].to_vec(),
            incidence: self.incidence[..keep].to_vec(),
            ibar: self.ibar[..keep].to_vec(),
            r: self.r[..keep].to_vec(),
        }
    }

    /// Copy with the last `days` R values cleared.
    pub fn mask_recent_r(&self, days: usize) -> EpiSeries {
        let cut = self.r.len().saturating_sub(days);
        let mut r = self.r.clone();
        r[cut..].fill(None);
        EpiSeries { r, ..self.clone() }
    }

    /// Population standard deviation of incidence around its centered
    /// moving average. `None` when the series is shorter than the window.
    pub fn error_scale(&self) -> Option<f64> {
        let smooth = centered_mean(&defined(&self.incidence), SMOOTHING_WINDOW);
        let residuals: Vec<f64> = self
            .incidence
            .iter()
            .zip(&smooth)
            .filter_map(|(value, mean)| mean.map(|mean| value - mean))
            .collect();
        if residuals.is_empty() {
            return None;
        }
        let n = residuals.len() as f64;
        let mean = residuals.iter().sum::<f64>() / n;
        let variance = residuals.iter().map(|e| (e - mean).powi(2)).sum::<f64>() / n;
        Some(variance.sqrt())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Days;

    fn series(values: &[f64]) -> RegionSeries {
        let start = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();
        let points = values
            .iter()
            .enumerate()
            .map(|(i, v)| (start + Days::new(i as u64), *v))
            .collect();
        RegionSeries::new("kings", points)
    }

    #[test]
    fn test_centered_mean_frame() {
        let values: Vec<Option<f64>> = (0..40).map(|i| Some(i as f64)).collect();
        let smooth = centered_mean(&values, 30);
        assert_eq!(smooth[14], None);
        assert_eq!(smooth[15], Some(14.5));
        assert_eq!(smooth[25], Some(24.5));
        assert_eq!(smooth[26], None);
    }

    #[test]
    fn test_centered_mean_skips_missing() {
        let mut values: Vec<Option<f64>> = vec![Some(1.); 40];
        values[20] = None;
        let smooth = centered_mean(&values, 30);
        assert!(smooth[15..=25].iter().all(Option::is_none));
    }

    #[test]
    fn test_constant_series_is_stable() {
        let epi = EpiSeries::derive(&series(&[2.; 40]), &GenerationKernel::default()).unwrap();
        for ibar in &epi.ibar {
            assert!(f64::abs(ibar - 2.) < 1e-9);
        }
        for r in &epi.r {
            assert!(f64::abs(r.unwrap() - 1.) < 1e-9);
        }
    }

    #[test]
    fn test_warm_up_uses_mean_of_first_five() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let kernel = GenerationKernel::default();
        let epi = EpiSeries::derive(&series(&values), &kernel).unwrap();
        assert_eq!(&epi.ibar[..5], &[3.; 5]);
        let expected = kernel.effective_incidence(&values[1..6]).unwrap();
        assert!(f64::abs(epi.ibar[5] - expected) < 1e-12);
    }

    #[test]
    fn test_undefined_r_takes_mean_of_defined() {
        let values: Vec<f64> = (0..60).map(|i| 1. + 0.5 * f64::sin(i as f64 / 5.)).collect();
        let epi = EpiSeries::derive(&series(&values), &GenerationKernel::default()).unwrap();
        let n = values.len();
        let inner: Vec<f64> = epi.r[15..=n - 16].iter().map(|r| r.unwrap()).collect();
        let fill = inner.iter().sum::<f64>() / inner.len() as f64;
        for i in (0..15).chain(n - 15..n) {
            assert!(f64::abs(epi.r[i].unwrap() - fill) < 1e-12);
        }
    }

    #[test]
    fn test_short_series_has_no_r() {
        let epi = EpiSeries::derive(&series(&[1.; 20]), &GenerationKernel::default()).unwrap();
        assert!(epi.r.iter().all(Option::is_none));
        assert_eq!(epi.ibar.len(), 20);
    }

    #[test]
    fn test_too_few_observations() {
        let result = EpiSeries::derive(&series(&[1.; 4]), &GenerationKernel::default());
        assert_eq!(
            result,
            Err(ForecastError::InsufficientHistory {
                needed: 5,
                available: 4
            })
        );
    }

    #[test]
    fn test_truncate_and_mask() {
        let epi = EpiSeries::derive(&series(&[2.; 40]), &GenerationKernel::default()).unwrap();
        let run_date = NaiveDate::from_ymd_opt(2019, 1, 30).unwrap();
        let truncated = epi.truncate(run_date);
        assert_eq!(truncated.len(), 30);
        assert_eq!(truncated.last_date(), Some(run_date));

        let masked = truncated.mask_recent_r(LEAKAGE_GUARD_DAYS);
        assert!(masked.r[..15].iter().all(Option::is_some));
        assert!(masked.r[15..].iter().all(Option::is_none));
        assert_eq!(masked.incidence, truncated.incidence);

        let before = epi.truncate(NaiveDate::from_ymd_opt(2018, 12, 1).unwrap());
        assert!(before.is_empty());
    }

    #[test]
    fn test_error_scale() {
        let flat = EpiSeries::derive(&series(&[2.; 40]), &GenerationKernel::default()).unwrap();
        assert!(f64::abs(flat.error_scale().unwrap()) < 1e-12);

        let alternating: Vec<f64> = (0..41).map(|i| if i % 2 == 0 { 3. } else { 1. }).collect();
        let epi = EpiSeries::derive(&series(&alternating), &GenerationKernel::default()).unwrap();
        assert!(f64::abs(epi.error_scale().unwrap() - 1.) < 1e-12);

        let short = EpiSeries::derive(&series(&[2.; 10]), &GenerationKernel::default()).unwrap();
        assert_eq!(short.error_scale(), None);
    }
}
