use anyhow::{Context, Result};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rigex::{SessionConfig, parse_responses};
use rigex_experiment::Session;
use rigex_station::SimulatedStation;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Run a behavioural session headlessly on a simulated station.
#[derive(Debug, Parser)]
#[command(name = "rigex", version)]
struct Args {
    /// Session configuration (TOML). Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of trials, overriding the config file.
    #[arg(short, long)]
    trials: Option<u64>,

    /// RNG seed, overriding the config file.
    #[arg(short, long)]
    seed: Option<u64>,

    /// Scripted subject responses replayed every trial, as
    /// `frame:port[:hold]` entries separated by commas.
    #[arg(short, long)]
    responses: Option<String>,

    /// Trial frame at which the experimenter aborts.
    #[arg(long)]
    quit_at: Option<u64>,

    /// Print the summary and compiled record as JSON on stdout.
    #[arg(long)]
    json: bool,

    /// Also write the JSON report to this file.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(trials) = args.trials {
        config.trials = trials;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    let seed = config.seed.unwrap_or_else(rand::random);

    let paradigm = config.manager.paradigm();
    let manager = config
        .manager
        .clone()
        .build()
        .with_context(|| format!("invalid {paradigm} configuration"))?;

    let mut station = SimulatedStation::new(config.station.clone());
    let mut script = match &args.responses {
        Some(text) => parse_responses(text)?,
        None => Default::default(),
    };
    script.quit_at = args.quit_at;
    station.set_default_script(script);

    tracing::info!(
        component = "cli",
        paradigm,
        station = ?config.station.kind,
        trials = config.trials,
        seed,
        "starting session"
    );

    let mut rng = StdRng::seed_from_u64(seed);
    let mut session = Session::new(manager.as_ref(), config.subject.clone());
    let summary = session.run(&mut station, config.trials, &mut rng);
    let stats = station.calibration_stats();

    tracing::info!(
        component = "cli",
        trials = summary.trials,
        correct = summary.correct,
        incorrect = summary.incorrect,
        completed = summary.completed,
        errored_out = summary.errored_out,
        manual_quit = summary.manual_quit,
        frames = stats.frames,
        "session finished"
    );

    if args.json || args.output.is_some() {
        let report = serde_json::json!({
            "seed": seed,
            "summary": summary,
            "compiled_record": session.compiled(),
        });
        let text = serde_json::to_string_pretty(&report)?;
        if let Some(path) = &args.output {
            std::fs::write(path, &text)
                .with_context(|| format!("writing report to {}", path.display()))?;
        }
        if args.json {
            println!("{text}");
        }
    }

    Ok(())
}
