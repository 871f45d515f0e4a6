//! Decide if a statement may run in the current transaction.
//!
//! Changing table structure inside a transaction is unsafe when the
//! transaction spans backends (XA) or when the backend is PostgreSQL-like,
//! where we can't keep DDL consistent with the rest of the transaction.

use std::fmt::Display;

use crate::config::{Dialect, TransactionKind};

use super::{Error, TransactionStatus};

/// What a statement does, as far as admission is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementKind {
    CreateTable,
    AlterTable,
    DropTable,
    Truncate,
    /// `DECLARE`, `FETCH`, `MOVE`, `CLOSE`.
    Cursor,
    Dml,
    Other,
}

impl StatementKind {
    /// Statement changes the structure or the whole contents of a table.
    pub fn modifies_table(&self) -> bool {
        matches!(
            self,
            Self::CreateTable | Self::AlterTable | Self::DropTable | Self::Truncate
        )
    }
}

impl Display for StatementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateTable => write!(f, "CREATE TABLE"),
            Self::AlterTable => write!(f, "ALTER TABLE"),
            Self::DropTable => write!(f, "DROP TABLE"),
            Self::Truncate => write!(f, "TRUNCATE"),
            Self::Cursor => write!(f, "cursor statement"),
            Self::Dml => write!(f, "DML"),
            Self::Other => write!(f, "statement"),
        }
    }
}

/// Admission check, executed once per statement before
/// any backend connection is touched.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmissionChecker;

impl AdmissionChecker {
    pub fn check(
        &self,
        kind: StatementKind,
        dialect: Dialect,
        status: &TransactionStatus,
    ) -> Result<(), Error> {
        if !status.in_transaction() || !kind.modifies_table() {
            return Ok(());
        }

        // Started implicitly, so it's local.
        let transaction = status.kind().unwrap_or_default();

        let reject = match transaction {
            TransactionKind::Base => false,
            TransactionKind::Xa => true,
            TransactionKind::Local => dialect.postgres_family(),
        };

        if reject {
            Err(Error::TableModifyInTransaction {
                kind,
                dialect,
                transaction,
            })
        } else {
            Ok(())
        }
    }
}
