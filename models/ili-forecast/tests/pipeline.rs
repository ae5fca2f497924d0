use std::f64::consts::PI;
use std::fmt::Write as _;
use std::fs;

use chrono::{Datelike, NaiveDate};
use ili_forecast::{
    AnomalyStatus, MonteCarloOrchestrator, Observation, Parameters, flag_anomalies,
    summarize_bands,
};
use mrp::Environment;
use serde_json::json;

fn write_history(path: &std::path::Path) {
    let mut csv = String::from("region,ds,percent_ill\n");
    let start = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
    for region in ["brooklyn", "manhattan"] {
        for (i, ds) in start.iter_days().take(800).enumerate() {
            let season = f64::cos(2. * PI * ds.ordinal() as f64 / 365.);
            let ripple = 0.2 * f64::sin(2. * PI * i as f64 / 7.);
            writeln!(csv, "{region},{ds},{:.6}", 3. + 1.5 * season + ripple).unwrap();
        }
    }
    fs::write(path, csv).unwrap();
}

#[test]
fn test_pipeline_through_run_environment() {
    let dir = tempfile::tempdir().unwrap();
    let data = dir.path().join("ili.csv");
    let out = dir.path().join("out");
    write_history(&data);

    let ctx = Environment::from_json(json!({
        "input": {
            "seed": 1234,
            "run_dates": ["2019-09-01", "2019-11-15"],
            "horizon": 2,
            "simulations": 20,
            "social_mod": 0.8
        },
        "model": { "files": { "observations": data.to_str().unwrap() } },
        "output": { "spec": "filesystem", "dir": out.to_str().unwrap() }
    }))
    .with_input_type::<Parameters>()
    .unwrap();
    let parameters = ctx.input().unwrap();
    parameters.validate().unwrap();

    let observations: Vec<Observation> = ctx.read_csv(&parameters.data_file).unwrap();
    assert_eq!(observations.len(), 1600);

    let orchestrator = MonteCarloOrchestrator::new(
        parameters.kernel().unwrap(),
        parameters.ensemble_config(ctx.seed, ctx.replicate),
    )
    .unwrap();
    let points = orchestrator.run(&observations).unwrap();
    assert_eq!(points.len(), 2 * 2 * 20 * 14);
    assert!(points.iter().all(|p| p.percent_ill.is_finite()));
    assert!(points.iter().all(|p| p.error_scale > 0.));

    ctx.write_csv("forecast.csv", &points).unwrap();
    let written = fs::read_to_string(out.join("forecast.csv")).unwrap();
    let mut lines = written.lines();
    assert_eq!(
        lines.next(),
        Some("ds,cutoff,percent_ill,run,region,error_scale")
    );
    assert_eq!(lines.count(), points.len());

    let [lower, upper] = parameters.band_quantiles;
    let bands = summarize_bands(&points, lower, upper).unwrap();
    assert_eq!(bands.len(), 2 * 2 * 14);
    for band in &bands {
        assert_eq!(band.runs, 20);
        assert!(band.lower <= band.upper);
    }

    // Every forecast date is inside the observed history.
    let flags = flag_anomalies(&observations, &bands);
    assert_eq!(flags.len(), bands.len());
    for flag in &flags {
        let inside = flag.lower <= flag.observed && flag.observed <= flag.upper;
        assert_eq!(inside, flag.status == AnomalyStatus::Within);
    }
}
