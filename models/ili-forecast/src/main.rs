use anyhow::Context;
use log::info;

use ili_forecast::{MonteCarloOrchestrator, Observation, Parameters, flag_anomalies, summarize_bands};
use mrp::Environment;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // A TOML config path may stand in for the JSON environment on stdin.
    let ctx = match std::env::args().nth(1) {
        Some(path) => Environment::from_toml_file(&path)
            .with_context(|| format!("reading config {path}"))?
            .with_input_type::<Parameters>()?,
        None => Environment::<Parameters>::load()?,
    };
    let parameters = ctx.input()?;
    parameters.validate()?;

    let digest = ctx.file_digest(&parameters.data_file)?;
    info!("input '{}' sha256 {digest}", parameters.data_file);
    let observations: Vec<Observation> = ctx
        .read_csv(&parameters.data_file)
        .with_context(|| format!("loading '{}'", parameters.data_file))?;
    info!("loaded {} observations", observations.len());

    let orchestrator = MonteCarloOrchestrator::new(
        parameters.kernel()?,
        parameters.ensemble_config(ctx.seed, ctx.replicate),
    )?;
    let points = orchestrator.run(&observations)?;
    info!("produced {} forecast points", points.len());

    ctx.write_csv("forecast.csv", &points)?;
    if ctx.output_dir().is_none() {
        // Only one table fits on stdout.
        return Ok(());
    }

    let [lower, upper] = parameters.band_quantiles;
    let bands = summarize_bands(&points, lower, upper)?;
    ctx.write_csv("bands.csv", &bands)?;
    let flags = flag_anomalies(&observations, &bands);
    if !flags.is_empty() {
        ctx.write_csv("anomalies.csv", &flags)?;
    }
    Ok(())
}
