//! Statements and result sets opened by one handler.

use std::sync::Arc;

use tracing::debug;

use crate::backend::{Error, ResultSet, Statement};

/// Everything a handler has to close when it's done.
#[derive(Default, Debug)]
pub struct StatementResourceTracker {
    statements: Vec<Arc<dyn Statement>>,
    result_sets: Vec<Arc<dyn ResultSet>>,
}

impl StatementResourceTracker {
    pub fn track_statement(&mut self, statement: Arc<dyn Statement>) {
        self.statements.push(statement);
    }

    pub fn track_result_set(&mut self, result_set: Arc<dyn ResultSet>) {
        self.result_sets.push(result_set);
    }

    pub fn statements(&self) -> usize {
        self.statements.len()
    }

    pub fn result_sets(&self) -> usize {
        self.result_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty() && self.result_sets.is_empty()
    }

    /// Close result sets first, then statements. Statements are cancelled
    /// before they're closed. Every resource gets a close attempt and
    /// all failures are returned.
    ///
    /// Tracking is cleared when this returns, whether anything failed or not.
    pub async fn close_all(&mut self) -> Vec<Error> {
        let result_sets = std::mem::take(&mut self.result_sets);
        let statements = std::mem::take(&mut self.statements);
        let mut errors = vec![];

        debug!(
            "[cleanup] closing {} result sets and {} statements",
            result_sets.len(),
            statements.len()
        );

        for result_set in result_sets {
            if let Err(err) = result_set.close().await {
                errors.push(Error::CloseResultSet(err));
            }
        }

        for statement in statements {
            if let Err(err) = statement.cancel().await {
                errors.push(Error::CancelStatement(err));
            }
            if let Err(err) = statement.close().await {
                errors.push(Error::CloseStatement(err));
            }
        }

        errors
    }
}
