//! Client transactions.
//!
//! Local transactions run on the cached connections directly. XA and
//! BASE transactions are coordinated by a [`DistributedTransactionManager`]
//! supplied by the proxy.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::post_processor::{AutoCommit, Savepoint};
use super::{ConnectionManager, DriverError, Error};
use crate::config::TransactionKind;

/// Coordinator for transactions spanning several backends.
#[async_trait]
pub trait DistributedTransactionManager: Send + Sync + Debug {
    async fn begin(&self, kind: TransactionKind) -> Result<(), DriverError>;

    async fn commit(&self, kind: TransactionKind) -> Result<(), DriverError>;

    async fn rollback(&self, kind: TransactionKind) -> Result<(), DriverError>;
}

/// Transaction control for one session.
#[derive(Debug)]
pub struct TransactionManager<'a> {
    manager: &'a ConnectionManager,
}

impl<'a> TransactionManager<'a> {
    pub fn new(manager: &'a ConnectionManager) -> Self {
        Self { manager }
    }

    /// Start a transaction of the configured kind.
    ///
    /// Whatever the session had open before is closed first, so the
    /// transaction starts on fresh connections.
    pub async fn begin(&self) -> Result<(), Error> {
        if self.manager.in_transaction() {
            debug!("transaction already started");
            return Ok(());
        }

        let mut errors = self.manager.close_handlers(true).await;
        errors.extend(self.manager.close_connections(false).await);
        for err in errors {
            warn!("[cleanup] before begin: {}", err);
        }

        let kind = self
            .manager
            .context()
            .config()
            .general
            .default_transaction_kind;

        if kind.distributed() {
            let distributed = self
                .manager
                .context()
                .distributed()
                .ok_or(Error::DistributedTransactionUnavailable(kind))?;
            distributed
                .begin(kind)
                .await
                .map_err(Error::DistributedTransaction)?;
        } else {
            self.manager.add_post_processor(Arc::new(AutoCommit(false)));
        }

        self.manager.session().transaction_mut().begin(kind);
        debug!("{} transaction started", kind);

        Ok(())
    }

    /// Commit the running transaction. Does nothing outside of one.
    pub async fn commit(&self) -> Vec<Error> {
        self.finish(true).await
    }

    /// Roll back the running transaction. Does nothing outside of one.
    pub async fn rollback(&self) -> Vec<Error> {
        self.finish(false).await
    }

    async fn finish(&self, commit: bool) -> Vec<Error> {
        let kind = {
            let session = self.manager.session();
            match session.transaction().kind() {
                Some(kind) if session.in_transaction() => kind,
                _ => return vec![],
            }
        };

        let mut errors = vec![];

        match kind {
            TransactionKind::Local => {
                for connection in self.manager.cache().connections().await {
                    let result = if commit {
                        connection.commit().await.map_err(Error::Commit)
                    } else {
                        connection.rollback().await.map_err(Error::Rollback)
                    };
                    if let Err(err) = result {
                        errors.push(err);
                    }
                }
            }

            TransactionKind::Xa | TransactionKind::Base => {
                match self.manager.context().distributed() {
                    Some(distributed) => {
                        let result = if commit {
                            distributed.commit(kind).await
                        } else {
                            distributed.rollback(kind).await
                        };
                        if let Err(err) = result {
                            errors.push(Error::DistributedTransaction(err));
                        }
                    }
                    None => errors.push(Error::DistributedTransactionUnavailable(kind)),
                }
            }
        }

        self.manager.session().transaction_mut().finish();

        let action = if commit { "commit" } else { "rollback" };
        for err in &errors {
            warn!("{} {} transaction: {}", action, kind, err);
        }

        errors
    }

    /// Create a savepoint on every cached connection, and on
    /// connections opened later in this transaction.
    pub async fn set_savepoint(&self, name: &str) -> Vec<Error> {
        let savepoint = Savepoint(name.to_string());
        let errors = self.execute_all(&savepoint.query()).await;
        self.manager.add_post_processor(Arc::new(savepoint));
        errors
    }

    pub async fn rollback_to(&self, name: &str) -> Vec<Error> {
        self.execute_all(&format!("ROLLBACK TO SAVEPOINT {}", name)).await
    }

    pub async fn release_savepoint(&self, name: &str) -> Vec<Error> {
        self.execute_all(&format!("RELEASE SAVEPOINT {}", name)).await
    }

    async fn execute_all(&self, query: &str) -> Vec<Error> {
        let mut errors = vec![];

        for connection in self.manager.cache().connections().await {
            if let Err(err) = connection.execute(query).await {
                errors.push(Error::Savepoint(err));
            }
        }

        errors
    }
}
