//! Shelfcheck runner
//!
//! Runs the five book table scenarios once against the configured page.
//! Launches Chrome by default, or attaches to a running one when a DevTools
//! URL is configured.

use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use shelfcheck_e2e::browser::ChromeSurface;
use shelfcheck_e2e::report::{JsonFileSink, LogSink, ReportSink};
use shelfcheck_e2e::runner::run_acquired;
use shelfcheck_e2e::{E2eResult, HarnessConfig, RunOutcome};

#[derive(Parser, Debug)]
#[command(name = "shelfcheck")]
#[command(about = "End-to-end checks for the books table")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "SHELFCHECK_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("Run aborted before any scenario: {}", e);
            std::process::exit(2);
        }
    };

    let outcome = run(config).await;
    std::process::exit(outcome.exit_code());
}

fn load_config(args: &Args) -> E2eResult<HarnessConfig> {
    let config = HarnessConfig::load(args.config.as_deref())?.with_env_overrides()?;
    config.validate()?;
    Ok(config)
}

async fn run(config: HarnessConfig) -> RunOutcome {
    info!("Starting book table checks against {}", config.target_url);

    let browser = config.browser.clone();
    let artifacts_dir = config.artifacts_dir.clone();
    let output_dir = config.output_dir.clone();

    let acquire = {
        let artifacts_dir = artifacts_dir.clone();
        async move { ChromeSurface::connect(&browser, &artifacts_dir).await }
    };
    let outcome = run_acquired(config, acquire).await;

    let mut sinks: Vec<Box<dyn ReportSink>> = vec![
        Box::new(LogSink::new().with_artifacts_dir(artifacts_dir)),
        Box::new(JsonFileSink::new(output_dir)),
    ];
    for sink in &mut sinks {
        if let Err(e) = sink.publish(outcome.report()) {
            error!("Report sink failed: {}", e);
        }
    }

    if let RunOutcome::Aborted { error, .. } = &outcome {
        error!("Run aborted before any scenario: {}", error);
    }
    outcome
}
