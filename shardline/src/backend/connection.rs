//! Physical connections and the pool that hands them out.
//!
//! Drivers and pools live outside of this crate; they plug in
//! through the traits below.

use std::fmt::{Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::{DriverType, Error};

/// Error reported by a database driver.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct DriverError {
    pub message: String,
    pub sql_state: Option<String>,
}

impl DriverError {
    pub fn new(message: impl ToString) -> Self {
        Self {
            message: message.to_string(),
            sql_state: None,
        }
    }

    pub fn with_sql_state(mut self, sql_state: impl ToString) -> Self {
        self.sql_state = Some(sql_state.to_string());
        self
    }
}

/// How connections are fetched for a statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionMode {
    /// One connection per execution unit, results are streamed.
    MemoryStrictly,
    /// Units share a limited number of connections, results are buffered.
    ConnectionStrictly,
}

impl ConnectionMode {
    /// More units than connections we're allowed to hold means units
    /// have to share connections.
    pub fn select(max_connections: usize, units: usize) -> Self {
        if max_connections < units {
            Self::ConnectionStrictly
        } else {
            Self::MemoryStrictly
        }
    }
}

impl Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MemoryStrictly => write!(f, "memory_strictly"),
            Self::ConnectionStrictly => write!(f, "connection_strictly"),
        }
    }
}

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReadUncommitted => write!(f, "READ UNCOMMITTED"),
            Self::ReadCommitted => write!(f, "READ COMMITTED"),
            Self::RepeatableRead => write!(f, "REPEATABLE READ"),
            Self::Serializable => write!(f, "SERIALIZABLE"),
        }
    }
}

/// Result set produced by a statement. Rows are consumed
/// by the merging layer; we only need to be able to close it.
#[async_trait]
pub trait ResultSet: Send + Sync + Debug {
    async fn close(&self) -> Result<(), DriverError>;
}

/// Outcome of executing one statement.
#[derive(Debug, Clone)]
pub enum ExecuteResult {
    Query(Arc<dyn ResultSet>),
    Update(u64),
}

/// Statement created on a physical connection.
#[async_trait]
pub trait Statement: Send + Sync + Debug {
    /// Execute the statement with bound parameters.
    async fn execute(&self, parameters: &[Option<String>]) -> Result<ExecuteResult, DriverError>;

    /// Interrupt execution, if any is in progress.
    async fn cancel(&self) -> Result<(), DriverError>;

    async fn close(&self) -> Result<(), DriverError>;
}

/// Physical connection to a backend.
#[async_trait]
pub trait Connection: Send + Sync + Debug {
    /// Product name reported by the server, e.g. `"PostgreSQL"`.
    async fn product_name(&self) -> Result<String, DriverError>;

    /// Execute a statement without a result, e.g. `SET` or `SAVEPOINT`.
    async fn execute(&self, sql: &str) -> Result<(), DriverError>;

    /// Create a statement for `sql`.
    async fn create_statement(
        &self,
        sql: &str,
        driver_type: DriverType,
        mode: ConnectionMode,
    ) -> Result<Arc<dyn Statement>, DriverError>;

    async fn set_auto_commit(&self, auto_commit: bool) -> Result<(), DriverError>;

    async fn set_read_only(&self, read_only: bool) -> Result<(), DriverError>;

    async fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<(), DriverError>;

    async fn commit(&self) -> Result<(), DriverError>;

    async fn rollback(&self) -> Result<(), DriverError>;

    /// Return the connection to its pool.
    async fn close(&self) -> Result<(), DriverError>;

    async fn is_closed(&self) -> Result<bool, DriverError>;
}

/// Source of physical connections.
#[async_trait]
pub trait ConnectionPoolProvider: Send + Sync {
    /// Fetch `count` connections to `data_source` of `database`.
    ///
    /// Fails with [`Error::PoolExhausted`] or [`Error::Connect`].
    async fn acquire(
        &self,
        database: &str,
        data_source: &str,
        count: usize,
        mode: ConnectionMode,
    ) -> Result<Vec<Arc<dyn Connection>>, Error>;
}

/// Two handles point to the same physical connection.
pub fn same_connection(a: &Arc<dyn Connection>, b: &Arc<dyn Connection>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
