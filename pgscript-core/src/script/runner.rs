//! Script runners.
//!
//! The driver hands a runner the resolved script plus, when connected, a
//! borrowed [`SqlSession`]. Runners never own or close the connection.

use super::{ScriptKind, ScriptRef};
use crate::Result;
use crate::config::{PassthroughOptions, PoolOptions, ResolvedConfig};
use crate::database::SqlSession;
use crate::error::PgScriptError;
use crate::tls::TlsPolicy;
use async_trait::async_trait;
use std::process::Stdio;
use tracing::{debug, info};

/// Shell used when `--shell` is not given.
pub const DEFAULT_SHELL: &str = "bash";

/// Prepended to shell scripts when `--prefix` is not given.
pub const DEFAULT_PREFIX: &str = "set -euo pipefail;";

/// Environment variable carrying the connection string to shell scripts.
pub const DATABASE_URL_ENV_VAR: &str = "DATABASE_URL";

/// libpq variable carrying the resolved TLS mode to shell scripts.
pub const SSL_MODE_ENV_VAR: &str = "PGSSLMODE";

/// libpq variable carrying named connection parameters to shell scripts.
pub const OPTIONS_ENV_VAR: &str = "PGOPTIONS";

/// Everything a runner needs besides the session.
#[derive(Clone, Copy)]
pub struct ScriptContext<'a> {
    /// Script to run
    pub script: &'a ScriptRef,
    /// Positional arguments for the script
    pub args: &'a [String],
    /// Forwarded command-line flags (`quiet`, `shell`, `prefix`, ...)
    pub options: &'a PassthroughOptions,
    /// Connection string, exported to child processes when present
    pub connection_target: Option<&'a str>,
    /// Resolved TLS mode, exported as `PGSSLMODE`
    pub tls_policy: Option<&'a TlsPolicy>,
    /// Pool options; named parameters are exported as `PGOPTIONS`
    pub pool_options: &'a PoolOptions,
}

impl<'a> ScriptContext<'a> {
    /// Builds the context for `script` from a resolved configuration.
    pub fn new(script: &'a ScriptRef, config: &'a ResolvedConfig) -> Self {
        Self {
            script,
            args: &config.script_args,
            options: &config.passthrough_options,
            connection_target: config.connection_target.as_deref(),
            tls_policy: config.tls_policy.as_ref(),
            pool_options: &config.pool_options,
        }
    }
}

/// Loads and executes a script.
#[async_trait]
pub trait ScriptRunner: Send + Sync {
    /// Runs the script. `session` is `None` when the launcher did not connect.
    ///
    /// # Errors
    /// Returns error if the script cannot be loaded or fails
    async fn run(&self, ctx: &ScriptContext<'_>, session: Option<&mut dyn SqlSession>)
    -> Result<()>;
}

/// Sends the whole script as one batch over the database session.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlScriptRunner;

#[async_trait]
impl ScriptRunner for SqlScriptRunner {
    async fn run(
        &self,
        ctx: &ScriptContext<'_>,
        session: Option<&mut dyn SqlSession>,
    ) -> Result<()> {
        let session = session.ok_or_else(|| {
            PgScriptError::configuration(format!(
                "{} is a SQL script and needs a database connection (drop -X/--no-connect)",
                ctx.script
            ))
        })?;

        let source = ctx.script.load().await?;
        debug!("Executing {} bytes of SQL from {}", source.len(), ctx.script);

        let affected = session.execute(&source).await?;
        info!("{} finished, {} rows affected", ctx.script, affected);
        Ok(())
    }
}

/// Runs the script through a shell as a child process.
///
/// Honors the forwarded `shell`, `prefix` and `quiet` flags. The connection
/// string, when known, is exported as `DATABASE_URL`; the TLS mode and named
/// parameters go out as `PGSSLMODE` and `PGOPTIONS`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellScriptRunner;

impl ShellScriptRunner {
    fn command(ctx: &ScriptContext<'_>, source: &str) -> tokio::process::Command {
        let shell = ctx.options.string("shell").unwrap_or(DEFAULT_SHELL);
        let prefix = match ctx.options.get("prefix") {
            Some(value) => value.as_str().unwrap_or_default(),
            None => DEFAULT_PREFIX,
        };

        let mut command = tokio::process::Command::new(shell);
        command
            .arg("-c")
            .arg(format!("{}\n{}", prefix, source))
            .arg(ctx.script.name())
            .args(ctx.args)
            .stdin(Stdio::inherit())
            .stderr(Stdio::inherit());

        if ctx.options.is_enabled("quiet") {
            command.stdout(Stdio::null());
        } else {
            command.stdout(Stdio::inherit());
        }

        if let Some(target) = ctx.connection_target {
            command.env(DATABASE_URL_ENV_VAR, target);
        }
        if let Some(policy) = ctx.tls_policy {
            command.env(SSL_MODE_ENV_VAR, policy.libpq_mode());
        }
        if let Some(options) = ctx.pool_options.libpq_options() {
            command.env(OPTIONS_ENV_VAR, options);
        }

        command
    }
}

#[async_trait]
impl ScriptRunner for ShellScriptRunner {
    async fn run(
        &self,
        ctx: &ScriptContext<'_>,
        _session: Option<&mut dyn SqlSession>,
    ) -> Result<()> {
        let source = ctx.script.load().await?;
        let status = Self::command(ctx, &source)
            .status()
            .await
            .map_err(|e| PgScriptError::io(format!("Failed to start shell for {}", ctx.script), e))?;

        if status.success() {
            info!("{} finished", ctx.script);
            Ok(())
        } else {
            Err(PgScriptError::script_message(format!(
                "{} exited with {}",
                ctx.script, status
            )))
        }
    }
}

/// Dispatches to the SQL or shell runner by script kind.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultScriptRunner {
    sql: SqlScriptRunner,
    shell: ShellScriptRunner,
}

#[async_trait]
impl ScriptRunner for DefaultScriptRunner {
    async fn run(
        &self,
        ctx: &ScriptContext<'_>,
        session: Option<&mut dyn SqlSession>,
    ) -> Result<()> {
        match ctx.script.kind() {
            ScriptKind::Sql => self.sql.run(ctx, session).await,
            ScriptKind::Shell => self.shell.run(ctx, session).await,
        }
    }
}
