mod app;
mod keyboard;

use anyhow::{Context, Result};
use app::{App, AppOptions};
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rigex::SessionConfig;
use rigex_experiment::{Session, TrialManager};
use rigex_render::Viewing;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Run a session in a fullscreen window with the keyboard as the station.
#[derive(Debug, Parser)]
#[command(name = "rigex-app", version)]
struct Args {
    /// Session configuration (TOML). The station section only supplies the
    /// fallback refresh rate.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long)]
    trials: Option<u64>,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Screen pixels per visual degree.
    #[arg(long, default_value_t = Viewing::default().pixels_per_degree)]
    pixels_per_degree: f64,

    /// Write the compiled record as JSON here on exit.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    let seed = args.seed.or(config.seed).unwrap_or_else(rand::random);
    let paradigm = config.manager.paradigm();
    let manager = config
        .manager
        .build()
        .with_context(|| format!("invalid {paradigm} configuration"))?;
    // The session borrows the manager for the lifetime of the event loop.
    let manager: &'static dyn TrialManager = Box::leak(manager);

    let options = AppOptions {
        trials: args.trials.unwrap_or(config.trials),
        fallback_refresh_hz: config.station.refresh_hz,
        viewing: Viewing {
            pixels_per_degree: args.pixels_per_degree,
        },
        output: args.output,
    };
    tracing::info!(component = "app", paradigm, seed, trials = options.trials, "starting session");

    let session = Session::new(manager, config.subject);
    App::new(session, StdRng::seed_from_u64(seed), options).run()
}
