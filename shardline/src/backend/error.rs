//! Backend errors.

use thiserror::Error;

use super::DriverError;
use crate::config::TransactionKind;

#[derive(Debug, Error)]
pub enum Error {
    #[error("no database selected")]
    NoDatabaseSelected,

    #[error("session is closed")]
    SessionClosed,

    #[error("pool exhausted for \"{data_source}\": requested {requested}, got {acquired}")]
    PoolExhausted {
        data_source: String,
        requested: usize,
        acquired: usize,
    },

    #[error("can't connect to \"{data_source}\": {source}")]
    Connect {
        data_source: String,
        #[source]
        source: DriverError,
    },

    #[error("replaying session variables: {source}")]
    VariableReplay {
        #[source]
        source: DriverError,
        /// New connections that failed to close after the replay failed.
        close_failures: Vec<Error>,
    },

    #[error("preparing new connection: {source}")]
    ConnectionSetup {
        #[source]
        source: Box<Error>,
        close_failures: Vec<Error>,
    },

    #[error("transaction option: {0}")]
    TransactionOption(#[source] DriverError),

    #[error("post-processing connection: {0}")]
    PostProcess(#[source] DriverError),

    #[error("product name: {0}")]
    Metadata(#[source] DriverError),

    #[error("reset session: {0}")]
    Reset(#[source] DriverError),

    #[error("rollback: {0}")]
    Rollback(#[source] DriverError),

    #[error("commit: {0}")]
    Commit(#[source] DriverError),

    #[error("savepoint: {0}")]
    Savepoint(#[source] DriverError),

    #[error("close connection: {0}")]
    Close(#[source] DriverError),

    #[error("cancel statement: {0}")]
    CancelStatement(#[source] DriverError),

    #[error("close statement: {0}")]
    CloseStatement(#[source] DriverError),

    #[error("close result set: {0}")]
    CloseResultSet(#[source] DriverError),

    #[error("execute: {0}")]
    Execute(#[source] DriverError),

    #[error("distributed transaction: {0}")]
    DistributedTransaction(#[source] DriverError),

    #[error("{0} transactions need a distributed transaction manager")]
    DistributedTransactionUnavailable(TransactionKind),
}

impl Error {
    /// Driver error behind this error, if there is one.
    pub fn driver_error(&self) -> Option<&DriverError> {
        match self {
            Self::Connect { source, .. } | Self::VariableReplay { source, .. } => Some(source),
            Self::ConnectionSetup { source, .. } => source.driver_error(),
            Self::TransactionOption(err)
            | Self::PostProcess(err)
            | Self::Metadata(err)
            | Self::Reset(err)
            | Self::Rollback(err)
            | Self::Commit(err)
            | Self::Savepoint(err)
            | Self::Close(err)
            | Self::CancelStatement(err)
            | Self::CloseStatement(err)
            | Self::CloseResultSet(err)
            | Self::Execute(err)
            | Self::DistributedTransaction(err) => Some(err),
            _ => None,
        }
    }

    /// Failures closing connections while unwinding a failed acquisition.
    pub fn close_failures(&self) -> &[Error] {
        match self {
            Self::VariableReplay { close_failures, .. }
            | Self::ConnectionSetup { close_failures, .. } => close_failures,
            _ => &[],
        }
    }
}
