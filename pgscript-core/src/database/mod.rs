//! Database collaborator traits.
//!
//! The execution driver only talks to these traits, which keeps the
//! transaction and teardown protocol independent of the driver crate.
//! [`postgres`] provides the sqlx-backed implementation used by the binary.
//!
//! # Object Safety
//! All traits are object-safe and used through `Box<dyn ...>`.

use crate::{Result, config::ResolvedConfig};
use async_trait::async_trait;

pub mod postgres;

pub use postgres::PostgresConnector;

/// Something a script can send SQL through.
#[async_trait]
pub trait SqlSession: Send {
    /// Executes a batch of one or more statements using the simple query
    /// protocol and returns the number of affected rows.
    ///
    /// # Errors
    /// Returns a script execution error if any statement fails
    async fn execute(&mut self, sql: &str) -> Result<u64>;
}

/// An open transaction. Consumed by commit or rollback.
#[async_trait]
pub trait TransactionHandle: Send {
    /// Session bound to this transaction.
    fn session(&mut self) -> &mut dyn SqlSession;

    /// Commits the transaction.
    ///
    /// # Errors
    /// Returns error if the commit fails
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rolls the transaction back.
    ///
    /// # Errors
    /// Returns error if the rollback fails
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// An open database connection, owned by the execution driver.
#[async_trait]
pub trait DatabaseConnection: Send + Sync {
    /// Session without transactional wrapping.
    fn session(&self) -> Box<dyn SqlSession>;

    /// Begins a transaction.
    ///
    /// # Errors
    /// Returns error if the transaction cannot be started
    async fn begin(&self) -> Result<Box<dyn TransactionHandle>>;

    /// Closes the connection. Called exactly once by the driver.
    async fn close(&self);
}

/// Opens connections from a resolved configuration.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Opens a connection using the target, TLS policy and pool options of
    /// `config`.
    ///
    /// # Errors
    /// Returns a connection error if the database is unreachable or the
    /// options are invalid
    async fn connect(&self, config: &ResolvedConfig) -> Result<Box<dyn DatabaseConnection>>;
}
