//! Run an energy scenario and print notable events as JSON lines.
//!
//! Usage:
//!   cargo run --bin joule-sim -- --scenario flight.json
//!   cargo run --bin joule-sim -- --seed 42 --legs 20     # random waypoint flight
//!   RUST_LOG=joule=debug cargo run --bin joule-sim      # per-update accounting

use anyhow::Context;
use joule::Scenario;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let scenario = match arg_value(&args, "--scenario") {
        Some(path) => Scenario::from_json_file(path)
            .with_context(|| format!("loading scenario {path}"))?,
        None => {
            let seed = arg_value(&args, "--seed")
                .map(str::parse::<u64>)
                .transpose()
                .context("--seed must be an integer")?
                .unwrap_or(1);
            let legs = arg_value(&args, "--legs")
                .map(str::parse::<usize>)
                .transpose()
                .context("--legs must be an integer")?
                .unwrap_or(12);
            info!(seed, legs, "generating random waypoint flight");
            Scenario::random_flight(seed, legs)
        }
    };

    let report = scenario.run().context("running scenario")?;
    for event in &report.events {
        println!("{}", serde_json::to_string(event)?);
    }
    info!(
        remaining_j = report.final_remaining_j,
        mode = ?report.final_mode,
        recharge_complete = report.recharge_complete,
        "done"
    );
    Ok(())
}
