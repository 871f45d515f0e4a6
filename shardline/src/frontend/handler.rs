//! Handler executing one client statement on the backends.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use tokio::sync::Mutex;
use tracing::debug;

use crate::backend::{
    self, BackendHandler, ConnectionManager, DriverType, ExecuteResult, ExecutionGroup,
    ExecutionPrepareEngine, ExecutionUnit, HandlerId, StatementResourceTracker,
};
use crate::config::Dialect;

use super::{AdmissionChecker, Error, StatementKind};

/// Client statement, already parsed and routed.
#[derive(Debug, Clone)]
pub struct QueryContext {
    pub statement_kind: StatementKind,
    /// Dialect the client speaks.
    pub dialect: Dialect,
    pub units: Vec<ExecutionUnit>,
    /// Parameters bound by the client.
    pub parameters: Vec<Option<String>>,
}

impl QueryContext {
    pub fn new(
        statement_kind: StatementKind,
        dialect: Dialect,
        units: Vec<ExecutionUnit>,
    ) -> Self {
        Self {
            statement_kind,
            dialect,
            units,
            parameters: vec![],
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Option<String>>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Executes a [`QueryContext`] and owns the statements
/// and result sets it creates.
#[derive(Debug)]
pub struct StandardHandler {
    id: HandlerId,
    manager: Arc<ConnectionManager>,
    query: QueryContext,
    driver_type: DriverType,
    tracker: Mutex<StatementResourceTracker>,
    closed: AtomicBool,
}

impl StandardHandler {
    pub fn new(manager: Arc<ConnectionManager>, query: QueryContext) -> Arc<Self> {
        let prefer_prepared = manager.context().config().general.prefer_prepared_statement;
        let driver_type = DriverType::select(prefer_prepared, &query.parameters);

        Arc::new(Self {
            id: HandlerId::next(),
            manager,
            query,
            driver_type,
            tracker: Mutex::new(StatementResourceTracker::default()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn driver_type(&self) -> DriverType {
        self.driver_type
    }

    /// Run the statement.
    ///
    /// The statement is checked against the session's transaction before
    /// any connection is touched. The handler registers with the session
    /// once a transaction (if any) is started, and if the statement returns
    /// rows, it stays in use until [`Self::release`].
    pub async fn execute(self: &Arc<Self>) -> Result<Vec<ExecuteResult>, Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::HandlerClosed);
        }

        let status = *self.manager.session().transaction();
        AdmissionChecker.check(self.query.statement_kind, self.query.dialect, &status)?;

        self.manager.handle_auto_commit().await?;
        self.manager.add(self.clone());

        let mut engine = ExecutionPrepareEngine::new(&self.manager);
        let groups = engine.prepare(self.query.units.clone()).await?;

        debug!(
            "executing {} on {} connections [{}]",
            self.query.statement_kind,
            groups.len(),
            self.id
        );

        let results = try_join_all(groups.into_iter().map(|group| self.execute_group(group)))
            .await?
            .into_iter()
            .flatten()
            .collect::<Vec<_>>();

        if results
            .iter()
            .any(|result| matches!(result, ExecuteResult::Query(_)))
        {
            self.manager.mark_in_use(self.id);
        }

        Ok(results)
    }

    /// Units sharing a connection run one after another.
    async fn execute_group(
        &self,
        group: ExecutionGroup,
    ) -> Result<Vec<ExecuteResult>, backend::Error> {
        let mut results = vec![];

        for unit in &group.units {
            let statement = group
                .connection
                .create_statement(&unit.sql, self.driver_type, group.mode)
                .await
                .map_err(backend::Error::Execute)?;
            self.tracker.lock().await.track_statement(statement.clone());

            let result = statement
                .execute(&unit.parameters)
                .await
                .map_err(backend::Error::Execute)?;
            if let ExecuteResult::Query(result_set) = &result {
                self.tracker.lock().await.track_result_set(result_set.clone());
            }

            results.push(result);
        }

        Ok(results)
    }

    /// Client consumed the results.
    ///
    /// Outside of a transaction this closes everything the session holds,
    /// this handler included.
    pub async fn release(&self) -> Vec<Error> {
        self.manager.unmark_in_use(self.id);
        self.manager
            .close_execution_resources()
            .await
            .into_iter()
            .map(Error::from)
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl BackendHandler for StandardHandler {
    fn id(&self) -> HandlerId {
        self.id
    }

    async fn close(&self) -> Vec<backend::Error> {
        self.closed.store(true, Ordering::Release);
        self.tracker.lock().await.close_all().await
    }
}
