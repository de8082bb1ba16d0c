//! User scripts: where they live and how they run.

mod locator;
mod runner;

pub use locator::{ScriptKind, ScriptRef};
pub use runner::{
    DATABASE_URL_ENV_VAR, DEFAULT_PREFIX, DEFAULT_SHELL, DefaultScriptRunner, ScriptContext,
    ScriptRunner, ShellScriptRunner, SqlScriptRunner,
};
