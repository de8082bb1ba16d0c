//! Core of the pgscript launcher.
//!
//! pgscript runs a user script against a PostgreSQL database, optionally
//! inside a single transaction. This crate holds everything except the CLI:
//!
//! - [`config`]: turns positional arguments, flags and the environment into
//!   a [`ResolvedConfig`]
//! - [`tls`]: the `--ssl` policy resolver, including the `heroku` heuristic
//! - [`database`]: connector traits and the sqlx implementation
//! - [`script`]: locator resolution plus SQL and shell runners
//! - [`driver`]: the connect / wrap / run / close protocol
//!
//! # Security
//! Connection strings are redacted before they reach logs or error messages.

pub mod config;
pub mod database;
pub mod driver;
pub mod error;
pub mod logging;
pub mod script;
pub mod tls;

// Re-export commonly used types
pub use config::{Environment, FlagValue, RawArguments, ResolvedConfig, resolve};
pub use database::{Connector, PostgresConnector};
pub use driver::{ExecutionDriver, ExecutionMode};
pub use error::{PgScriptError, Result};
pub use logging::init_logging;
pub use script::{DefaultScriptRunner, ScriptRef};
pub use tls::TlsPolicy;
