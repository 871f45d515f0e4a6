//! Setup applied to connections opened in the middle of a transaction.
//!
//! When a transaction is already running and we open another connection,
//! that connection has to join it: auto-commit off, savepoints recreated.
//! Post-processors registered with the session run once on each new
//! connection and are dropped when the session's connections are closed.

use std::fmt::Debug;

use async_trait::async_trait;

use super::{Connection, DriverError};

#[async_trait]
pub trait ConnectionPostProcessor: Send + Sync + Debug {
    async fn process(&self, connection: &dyn Connection) -> Result<(), DriverError>;
}

/// Set auto-commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoCommit(pub bool);

#[async_trait]
impl ConnectionPostProcessor for AutoCommit {
    async fn process(&self, connection: &dyn Connection) -> Result<(), DriverError> {
        connection.set_auto_commit(self.0).await
    }
}

/// Create a savepoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Savepoint(pub String);

impl Savepoint {
    pub fn query(&self) -> String {
        format!("SAVEPOINT {}", self.0)
    }
}

#[async_trait]
impl ConnectionPostProcessor for Savepoint {
    async fn process(&self, connection: &dyn Connection) -> Result<(), DriverError> {
        connection.execute(&self.query()).await
    }
}
