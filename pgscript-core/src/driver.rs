//! Execution driver: connect, wrap, run, tear down.
//!
//! # Teardown
//! A connection opened by [`ExecutionDriver::run`] is closed exactly once
//! before `run` returns, whatever happened in between: script success,
//! script failure, rollback failure or commit failure.

use crate::Result;
use crate::config::ResolvedConfig;
use crate::database::{Connector, DatabaseConnection, SqlSession};
use crate::error::PgScriptError;
use crate::script::{ScriptContext, ScriptKind, ScriptRef, ScriptRunner};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

/// How the script body is invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Script runs as-is
    Direct,
    /// Script runs inside BEGIN ... COMMIT, rolled back on error
    Transactional,
}

impl ExecutionMode {
    /// Transactional only when connecting and `--begin` was given.
    pub fn select(config: &ResolvedConfig) -> Self {
        if config.should_connect && config.run_in_transaction {
            Self::Transactional
        } else {
            Self::Direct
        }
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => f.write_str("direct"),
            Self::Transactional => f.write_str("transactional"),
        }
    }
}

/// Drives a single launcher invocation.
pub struct ExecutionDriver {
    connector: Box<dyn Connector>,
    runner: Box<dyn ScriptRunner>,
    working_dir: PathBuf,
}

impl ExecutionDriver {
    /// Creates a driver resolving relative scripts against `working_dir`.
    pub fn new(
        connector: Box<dyn Connector>,
        runner: Box<dyn ScriptRunner>,
        working_dir: PathBuf,
    ) -> Self {
        Self {
            connector,
            runner,
            working_dir,
        }
    }

    /// Creates a driver for the current working directory.
    ///
    /// # Errors
    /// Returns an I/O error if the working directory cannot be determined
    pub fn for_current_dir(
        connector: Box<dyn Connector>,
        runner: Box<dyn ScriptRunner>,
    ) -> Result<Self> {
        let working_dir = std::env::current_dir()
            .map_err(|e| PgScriptError::io("Failed to read the current directory", e))?;
        Ok(Self::new(connector, runner, working_dir))
    }

    /// Runs the configured script.
    ///
    /// The script locator is resolved before any connection is opened, so a
    /// missing script never costs a connection attempt.
    ///
    /// # Errors
    /// Returns error if:
    /// - The script locator is missing or invalid
    /// - The connection cannot be opened (the script does not run)
    /// - The script fails (wrapped as `Transaction` when rolled back)
    /// - The transaction cannot be started or committed
    pub async fn run(&self, config: &ResolvedConfig) -> Result<()> {
        let script = ScriptRef::resolve(&config.script_locator, &self.working_dir)?;
        let mode = ExecutionMode::select(config);

        if config.run_in_transaction && !config.should_connect {
            warn!("--begin has no effect without a database connection");
        }
        if mode == ExecutionMode::Transactional && script.kind() == ScriptKind::Shell {
            warn!("--begin only wraps SQL sent by pgscript itself; shell scripts open their own connections");
        }

        let connection = if config.should_connect {
            Some(self.connector.connect(config).await?)
        } else {
            debug!("Skipping connection (--no-connect)");
            None
        };

        info!("Running {} ({} mode)", script, mode);
        let outcome = self
            .execute(mode, &script, config, connection.as_deref())
            .await;

        if let Some(connection) = connection {
            connection.close().await;
        }

        outcome
    }

    async fn execute(
        &self,
        mode: ExecutionMode,
        script: &ScriptRef,
        config: &ResolvedConfig,
        connection: Option<&dyn DatabaseConnection>,
    ) -> Result<()> {
        let ctx = ScriptContext::new(script, config);

        match (mode, connection) {
            (ExecutionMode::Transactional, Some(connection)) => {
                let mut transaction = connection.begin().await?;
                let result = self.runner.run(&ctx, Some(transaction.session())).await;

                match result {
                    Ok(()) => {
                        transaction.commit().await?;
                        info!("Transaction committed");
                        Ok(())
                    }
                    Err(e) => {
                        warn!("Script failed, rolling back");
                        if let Err(rollback_error) = transaction.rollback().await {
                            error!("Rollback failed: {}", rollback_error);
                        }
                        Err(PgScriptError::rolled_back(e))
                    }
                }
            }
            (_, Some(connection)) => {
                let mut session = connection.session();
                let session: &mut dyn SqlSession = &mut *session;
                self.runner.run(&ctx, Some(session)).await
            }
            (_, None) => self.runner.run(&ctx, None).await,
        }
    }
}
