//! `till` entry point.

use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use till_ledger::Till;
use tracing::debug;

use till_runtime::telemetry::init_logging;
use till_runtime::{run, Cli, Outcome, RuntimeConfig};

fn main() -> ExitCode {
    let cli = Cli::parse();

    match try_main(&cli) {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn try_main(cli: &Cli) -> Result<Outcome> {
    // Load configuration
    let config = RuntimeConfig::from_env().with_cli(&cli.global);

    // Initialize logging
    init_logging(&config)?;
    debug!(data_dir = %config.ledger.data_dir().display(), role = %cli.global.role, "starting");

    let till = Till::open(config.ledger.clone()).with_context(|| {
        format!(
            "cannot open data directory {}",
            config.ledger.data_dir().display()
        )
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli, &till, &mut out)
}
