//! Backend connections held by a client session.

pub mod cache;
pub mod connection;
pub mod dialect;
pub mod error;
pub mod handler;
pub mod manager;
pub mod post_processor;
pub mod prepare;
pub mod replay;
pub mod transaction;

pub use cache::{CacheKey, ConnectionCache};
pub use connection::{
    Connection, ConnectionMode, ConnectionPoolProvider, DriverError, ExecuteResult,
    IsolationLevel, ResultSet, Statement,
};
pub use dialect::SessionReset;
pub use error::Error;
pub use handler::{BackendHandler, HandlerId, HandlerRegistry, StatementResourceTracker};
pub use manager::ConnectionManager;
pub use post_processor::ConnectionPostProcessor;
pub use prepare::{DriverType, ExecutionGroup, ExecutionPrepareEngine, ExecutionUnit};
pub use transaction::{DistributedTransactionManager, TransactionManager};

#[cfg(test)]
pub mod test;
