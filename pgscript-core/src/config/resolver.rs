//! Option resolution: raw arguments + environment to a runnable configuration.

use super::{Environment, FlagValue, PassthroughOptions, PoolOptions, RawArguments};
use crate::error::{PgScriptError, redact_database_url};
use crate::tls::{TlsPolicy, resolve_tls_policy};

const FLAG_NO_CONNECT_SHORT: &str = "X";
const FLAG_NO_CONNECT: &str = "no-connect";
const FLAG_BEGIN: &str = "begin";
const FLAG_SSL: &str = "ssl";
const FLAG_SQL_MAX: &str = "sql-max";
const FLAG_SQL_IDLE_TIMEOUT: &str = "sql-idle-timeout";
const FLAG_SQL_CONNECT_TIMEOUT: &str = "sql-connect-timeout";
const FLAG_SQL_PREPARE: &str = "sql-prepare";
const FLAG_SQL_VAR: &str = "sql-var";

/// Fully resolved launcher configuration. Immutable once built.
#[derive(Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Connection string; `None` defers to the driver's environment defaults
    pub connection_target: Option<String>,
    /// False when `-X`/`--no-connect` was given
    pub should_connect: bool,
    /// `None` leaves the driver's default TLS behavior in place
    pub tls_policy: Option<TlsPolicy>,
    /// Explicitly supplied pool options
    pub pool_options: PoolOptions,
    /// Whether the script runs inside one transaction (`--begin`)
    pub run_in_transaction: bool,
    /// Script path or URL as given on the command line
    pub script_locator: String,
    /// Positional values after the script locator
    pub script_args: Vec<String>,
    /// Unrecognized flags for the script runners
    pub passthrough_options: PassthroughOptions,
}

impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedConfig")
            .field(
                "connection_target",
                &self.connection_target.as_deref().map(redact_database_url),
            )
            .field("should_connect", &self.should_connect)
            .field("tls_policy", &self.tls_policy)
            .field("pool_options", &self.pool_options)
            .field("run_in_transaction", &self.run_in_transaction)
            .field("script_locator", &self.script_locator)
            .field("script_args", &self.script_args)
            .field("passthrough_options", &self.passthrough_options)
            .finish()
    }
}

/// Resolves raw arguments into a [`ResolvedConfig`].
///
/// Recognized flags are extracted by name; everything left over is forwarded
/// as [`PassthroughOptions`]. No connection string is required here: the
/// driver falls back to `PG*` environment variables at connect time.
///
/// # Errors
/// Returns error if:
/// - No script locator is present (`RequiredScriptMissing`)
/// - A numeric pool flag is not a non-negative integer
/// - A `--sql-var` entry is malformed
///
/// # Example
/// ```rust
/// use pgscript_core::config::{Environment, FlagValue, RawArguments, resolve};
///
/// let raw = RawArguments::new(vec!["postgres://localhost/app".into(), "migrate.sql".into()])
///     .with_flag("begin", FlagValue::Bool(true));
/// let config = resolve(raw, &Environment::default())?;
///
/// assert!(config.should_connect);
/// assert!(config.run_in_transaction);
/// assert_eq!(config.script_locator, "migrate.sql");
/// # Ok::<(), pgscript_core::PgScriptError>(())
/// ```
pub fn resolve(mut raw: RawArguments, env: &Environment) -> crate::Result<ResolvedConfig> {
    let mut positionals = std::mem::take(&mut raw.positionals).into_iter();
    let (connection_target, script_locator) = match (positionals.next(), positionals.next()) {
        (Some(script), None) => (None, Some(script)),
        (Some(target), Some(script)) => (Some(target), Some(script)),
        (None, _) => (None, None),
    };
    let script_args: Vec<String> = positionals.collect();

    let script_locator = script_locator
        .filter(|locator| !locator.trim().is_empty())
        .ok_or(PgScriptError::RequiredScriptMissing)?;

    let no_connect = [FLAG_NO_CONNECT_SHORT, FLAG_NO_CONNECT]
        .into_iter()
        .filter_map(|name| raw.take_flag(name))
        .fold(false, |set, value| set || value.is_truthy());

    let run_in_transaction = raw
        .take_flag(FLAG_BEGIN)
        .is_some_and(|value| value.is_truthy());

    let pool_options = PoolOptions {
        max_connections: take_number::<u32>(&mut raw, FLAG_SQL_MAX)?,
        idle_timeout_secs: take_number::<u64>(&mut raw, FLAG_SQL_IDLE_TIMEOUT)?,
        connect_timeout_secs: take_number::<u64>(&mut raw, FLAG_SQL_CONNECT_TIMEOUT)?,
        auto_prepare: take_bool(&mut raw, FLAG_SQL_PREPARE),
        named_parameters: match raw.take_flag(FLAG_SQL_VAR) {
            Some(value) => super::parse_named_parameters(value.values())?,
            None => Default::default(),
        },
    };
    pool_options.validate()?;

    let tls_policy = resolve_tls_policy(
        raw.take_flag(FLAG_SSL).as_ref(),
        connection_target.as_deref(),
        env,
    );

    let config = ResolvedConfig {
        connection_target,
        should_connect: !no_connect,
        tls_policy,
        pool_options,
        run_in_transaction,
        script_locator,
        script_args,
        passthrough_options: PassthroughOptions::from(raw.flags),
    };

    tracing::debug!(?config, "Resolved launcher configuration");
    if tracing::enabled!(tracing::Level::TRACE)
        && let Ok(dump) = serde_json::to_string(&(&config.tls_policy, &config.pool_options))
    {
        tracing::trace!(settings = %dump, "Connection settings");
    }
    Ok(config)
}

fn take_number<T>(raw: &mut RawArguments, name: &str) -> crate::Result<Option<T>>
where
    T: std::str::FromStr,
{
    let Some(value) = raw.take_flag(name) else {
        return Ok(None);
    };

    let text = value.as_str().ok_or_else(|| {
        PgScriptError::configuration(format!("--{} requires a numeric value", name))
    })?;

    text.trim().parse::<T>().map(Some).map_err(|_| {
        PgScriptError::configuration(format!(
            "--{} expects a non-negative integer, got '{}'",
            name, text
        ))
    })
}

fn take_bool(raw: &mut RawArguments, name: &str) -> Option<bool> {
    raw.take_flag(name).map(|value| match value {
        FlagValue::Bool(flag) => flag,
        other => !matches!(other.as_str(), Some("false" | "0" | "no") | None),
    })
}
