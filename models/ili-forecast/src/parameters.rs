use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{ForecastError, Result};
use crate::kernel::GenerationKernel;
use crate::orchestrator::EnsembleConfig;

/// Model input, read from the `input` section of the run environment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Parameters {
    pub run_dates: Vec<NaiveDate>,
    /// Forecast length in weeks.
    pub horizon: u32,
    #[serde(default = "default_simulations")]
    pub simulations: u32,
    #[serde(default)]
    pub social_mod: Option<f64>,
    /// Overrides the literature generation-time kernel.
    #[serde(default)]
    pub generation_kernel: Option<Vec<f64>>,
    /// Key of the observation table under `model.files`.
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_band_quantiles")]
    pub band_quantiles: [f64; 2],
}

fn default_simulations() -> u32 {
    1
}

fn default_data_file() -> String {
    "observations".to_string()
}

fn default_band_quantiles() -> [f64; 2] {
    [0.05, 0.95]
}

impl Parameters {
    pub fn kernel(&self) -> Result<GenerationKernel> {
        match &self.generation_kernel {
            Some(weights) => GenerationKernel::from_slice(weights),
            None => Ok(GenerationKernel::default()),
        }
    }

    pub fn ensemble_config(&self, seed: u64, replicate: u64) -> EnsembleConfig {
        EnsembleConfig {
            run_dates: self.run_dates.clone(),
            horizon: self.horizon,
            simulations: self.simulations,
            social_mod: self.social_mod,
            seed,
            replicate,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let [lower, upper] = self.band_quantiles;
        if !(0. ..=1.).contains(&lower) || !(0. ..=1.).contains(&upper) || lower >= upper {
            return Err(ForecastError::InvalidParameter(format!(
                "band_quantiles must satisfy 0 <= lower < upper <= 1, got [{lower}, {upper}]"
            )));
        }
        self.kernel()?;
        self.ensemble_config(0, 0).validate()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let parameters: Parameters = serde_json::from_value(json!({
            "run_dates": ["2020-03-01", "2020-03-15"],
            "horizon": 4
        }))
        .unwrap();
        assert_eq!(parameters.simulations, 1);
        assert_eq!(parameters.social_mod, None);
        assert_eq!(parameters.data_file, "observations");
        assert_eq!(parameters.band_quantiles, [0.05, 0.95]);
        assert_eq!(parameters.kernel().unwrap(), GenerationKernel::default());
        assert_eq!(
            parameters.run_dates[1],
            NaiveDate::from_ymd_opt(2020, 3, 15).unwrap()
        );
        assert!(parameters.validate().is_ok());

        let config = parameters.ensemble_config(11, 2);
        assert_eq!(config.seed, 11);
        assert_eq!(config.replicate, 2);
        assert_eq!(config.horizon, 4);
    }

    #[test]
    fn test_custom_kernel() {
        let parameters: Parameters = serde_json::from_value(json!({
            "run_dates": ["2020-03-01"],
            "horizon": 1,
            "generation_kernel": [0.0, 0.5, 0.5, 0.0, 0.0]
        }))
        .unwrap();
        assert_eq!(parameters.kernel().unwrap().weights(), &[0.0, 0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let base = json!({ "run_dates": ["2020-03-01"], "horizon": 1 });
        let cases = [
            json!({ "social_mod": 0.0 }),
            json!({ "simulations": 0 }),
            json!({ "band_quantiles": [0.9, 0.1] }),
            json!({ "band_quantiles": [0.5, 0.5] }),
            json!({ "generation_kernel": [0.5, 0.5] }),
        ];
        for case in cases {
            let mut input = base.clone();
            for (key, value) in case.as_object().unwrap() {
                input[key] = value.clone();
            }
            let parameters: Parameters = serde_json::from_value(input).unwrap();
            assert!(parameters.validate().is_err(), "{case} should be rejected");
        }
    }
}
