//! pgscript launcher.
//!
//! Connects to PostgreSQL (unless `-X`), then runs the given script, either
//! directly or inside a single transaction (`--begin`). The connection is
//! always closed before the process exits.

use pgscript::{Cli, usage};
use pgscript_core::{
    DefaultScriptRunner, Environment, ExecutionDriver, PgScriptError, PostgresConnector, Result,
    init_logging, resolve,
};
use std::process::ExitCode;
use tracing::debug;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = std::env::args_os().map(|arg| arg.to_string_lossy().into_owned());
    let cli = match Cli::parse_invocation(args) {
        Ok(cli) => cli,
        Err(e) => e.exit(),
    };
    let quiet = cli.shell.quiet;

    if let Err(e) = init_logging(cli.verbose, quiet) {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(PgScriptError::Usage) => {
            println!("{}", usage());
            ExitCode::FAILURE
        }
        Err(e) => {
            if !quiet {
                report(&e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    if cli.is_empty_invocation() {
        return Err(PgScriptError::Usage);
    }

    debug!("pgscript {}", env!("CARGO_PKG_VERSION"));
    let config = resolve(cli.to_raw_arguments(), &Environment::from_process())?;

    let driver = ExecutionDriver::for_current_dir(
        Box::new(PostgresConnector),
        Box::new(DefaultScriptRunner::default()),
    )?;

    driver.run(&config).await
}

/// Prints the error and its cause chain to stderr.
fn report(error: &dyn std::error::Error) {
    eprintln!("Error: {}", error);
    let mut source = error.source();
    while let Some(cause) = source {
        eprintln!("  caused by: {}", cause);
        source = cause.source();
    }
}
