use std::io;
use std::process::ExitCode;

use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::info;

use hostlink_config::{Config, ConfigError};
use hostlinkd::telemetry::{self, TelemetryError};
use hostlinkd::{Collaborators, ServerError};

const MAIN_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::main");

#[derive(Debug, Error)]
enum RunError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("server: {0}")]
    Server(#[from] ServerError),
    #[error("signal handling: {0}")]
    Signals(#[source] io::Error),
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Telemetry may not be up yet; stderr is the only safe sink.
            eprintln!("hostlinkd: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), RunError> {
    let config = Config::load()?;
    telemetry::initialise(&config)?;

    let daemon = hostlinkd::start(&config, Collaborators::host())?;
    info!(
        target: MAIN_TARGET,
        command = %daemon.command_addr(),
        discovery = %daemon.discovery_addr(),
        "hostlinkd ready"
    );

    wait_for_shutdown()?;

    info!(target: MAIN_TARGET, "shutdown requested");
    daemon.shutdown();
    daemon.join()?;
    info!(target: MAIN_TARGET, "hostlinkd stopped");
    Ok(())
}

fn wait_for_shutdown() -> Result<(), RunError> {
    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(RunError::Signals)?;
    // Blocks until the first delivery; in-flight sessions are abandoned
    // with the process.
    for signal in signals.forever() {
        info!(target: MAIN_TARGET, signal, "received shutdown signal");
        break;
    }
    Ok(())
}
