//! Launcher configuration.
//!
//! - `raw`: tokenized arguments, forwarded flags and the environment snapshot
//! - `pool`: pool tuning options and `--sql-var` parsing
//! - `resolver`: turns raw arguments into a [`ResolvedConfig`]

mod pool;
mod raw;
mod resolver;

pub use pool::{PoolOptions, parse_named_parameters};
pub use raw::{Environment, FlagValue, PassthroughOptions, RawArguments};
pub use resolver::{ResolvedConfig, resolve};
