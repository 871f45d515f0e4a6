//! Frontend errors.

use thiserror::Error;

use crate::config::{Dialect, TransactionKind};

use super::StatementKind;

/// Frontend error.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Backend(#[from] crate::backend::Error),

    #[error("{kind} is not allowed inside a {transaction} transaction on {dialect}")]
    TableModifyInTransaction {
        kind: StatementKind,
        dialect: Dialect,
        transaction: TransactionKind,
    },

    #[error("handler is closed")]
    HandlerClosed,
}
