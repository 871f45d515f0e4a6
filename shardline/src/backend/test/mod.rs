//! Mock connections, pools and handlers.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::*;
use crate::config::{Config, DataSource, Dialect, TransactionKind};
use crate::context::ProxyContext;
use crate::frontend::SessionState;

static SEQUENCE: AtomicU64 = AtomicU64::new(1);

/// Global ordering of mock events.
fn tick() -> u64 {
    SEQUENCE.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug, Default)]
struct Failures {
    execute: HashMap<String, DriverError>,
    product_name: Option<DriverError>,
    create_statement: Option<DriverError>,
    set_read_only: Option<DriverError>,
    commit: Option<DriverError>,
    rollback: Option<DriverError>,
    close: Option<DriverError>,
    is_closed: Option<Result<bool, DriverError>>,
}

/// Connection recording everything done to it.
#[derive(Debug)]
pub struct MockConnection {
    product: String,
    calls: Mutex<Vec<String>>,
    executed: Mutex<Vec<String>>,
    statements: Mutex<Vec<Arc<MockStatement>>>,
    failures: Mutex<Failures>,
    closed: AtomicBool,
}

impl Default for MockConnection {
    fn default() -> Self {
        Self::with_product("PostgreSQL")
    }
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_product(product: &str) -> Self {
        Self {
            product: product.to_string(),
            calls: Mutex::new(vec![]),
            executed: Mutex::new(vec![]),
            statements: Mutex::new(vec![]),
            failures: Mutex::new(Failures::default()),
            closed: AtomicBool::new(false),
        }
    }

    fn call(&self, call: impl ToString) {
        self.calls.lock().push(call.to_string());
    }

    /// Every call, in order, e.g. `["rollback", "product_name", "execute RESET ALL", "close"]`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    /// SQL sent through [`Connection::execute`].
    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn statements(&self) -> Vec<Arc<MockStatement>> {
        self.statements.lock().clone()
    }

    /// Closed successfully.
    pub fn closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn fail_execute(&self, sql: &str, err: DriverError) {
        self.failures.lock().execute.insert(sql.to_string(), err);
    }

    pub fn fail_product_name(&self, err: DriverError) {
        self.failures.lock().product_name = Some(err);
    }

    pub fn fail_create_statement(&self, err: DriverError) {
        self.failures.lock().create_statement = Some(err);
    }

    pub fn fail_set_read_only(&self, err: DriverError) {
        self.failures.lock().set_read_only = Some(err);
    }

    pub fn fail_commit(&self, err: DriverError) {
        self.failures.lock().commit = Some(err);
    }

    pub fn fail_rollback(&self, err: DriverError) {
        self.failures.lock().rollback = Some(err);
    }

    pub fn fail_close(&self, err: DriverError) {
        self.failures.lock().close = Some(err);
    }

    /// What `is_closed` reports. Defaults to whether `close` succeeded.
    pub fn report_closed(&self, closed: Result<bool, DriverError>) {
        self.failures.lock().is_closed = Some(closed);
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn product_name(&self) -> Result<String, DriverError> {
        self.call("product_name");
        match self.failures.lock().product_name.clone() {
            Some(err) => Err(err),
            None => Ok(self.product.clone()),
        }
    }

    async fn execute(&self, sql: &str) -> Result<(), DriverError> {
        self.call(format!("execute {}", sql));
        self.executed.lock().push(sql.to_string());
        match self.failures.lock().execute.get(sql).cloned() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn create_statement(
        &self,
        sql: &str,
        driver_type: DriverType,
        mode: ConnectionMode,
    ) -> Result<Arc<dyn Statement>, DriverError> {
        self.call(format!("create_statement {:?} {}", driver_type, mode));
        if let Some(err) = self.failures.lock().create_statement.clone() {
            return Err(err);
        }
        let statement = Arc::new(MockStatement::for_sql(sql));
        self.statements.lock().push(statement.clone());
        Ok(statement)
    }

    async fn set_auto_commit(&self, auto_commit: bool) -> Result<(), DriverError> {
        self.call(format!("set_auto_commit {}", auto_commit));
        Ok(())
    }

    async fn set_read_only(&self, read_only: bool) -> Result<(), DriverError> {
        self.call(format!("set_read_only {}", read_only));
        match self.failures.lock().set_read_only.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<(), DriverError> {
        self.call(format!("set_transaction_isolation {}", level));
        Ok(())
    }

    async fn commit(&self) -> Result<(), DriverError> {
        self.call("commit");
        match self.failures.lock().commit.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn rollback(&self) -> Result<(), DriverError> {
        self.call("rollback");
        match self.failures.lock().rollback.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.call("close");
        match self.failures.lock().close.clone() {
            Some(err) => Err(err),
            None => {
                self.closed.store(true, Ordering::SeqCst);
                Ok(())
            }
        }
    }

    async fn is_closed(&self) -> Result<bool, DriverError> {
        self.call("is_closed");
        match self.failures.lock().is_closed.clone() {
            Some(closed) => closed,
            None => Ok(self.closed()),
        }
    }
}

/// `n` fresh connections.
pub fn connections(n: usize) -> Vec<Arc<dyn Connection>> {
    (0..n)
        .map(|_| Arc::new(MockConnection::new()) as Arc<dyn Connection>)
        .collect()
}

/// Statement returning rows for `SELECT` and an update count otherwise.
#[derive(Debug, Default)]
pub struct MockStatement {
    sql: String,
    parameters: Mutex<Vec<Option<String>>>,
    result_sets: Mutex<Vec<Arc<MockResultSet>>>,
    cancelled: AtomicBool,
    closed_at: Mutex<Option<u64>>,
    fail_cancel: Mutex<Option<DriverError>>,
    fail_close: Mutex<Option<DriverError>>,
    fail_execute: Mutex<Option<DriverError>>,
}

impl MockStatement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_sql(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
            ..Default::default()
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameters(&self) -> Vec<Option<String>> {
        self.parameters.lock().clone()
    }

    pub fn result_sets(&self) -> Vec<Arc<MockResultSet>> {
        self.result_sets.lock().clone()
    }

    pub fn fail_cancel(&self, err: DriverError) {
        *self.fail_cancel.lock() = Some(err);
    }

    pub fn fail_close(&self, err: DriverError) {
        *self.fail_close.lock() = Some(err);
    }

    pub fn fail_execute(&self, err: DriverError) {
        *self.fail_execute.lock() = Some(err);
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Close was attempted.
    pub fn closed(&self) -> bool {
        self.closed_at.lock().is_some()
    }

    pub fn closed_at(&self) -> Option<u64> {
        *self.closed_at.lock()
    }
}

#[async_trait]
impl Statement for MockStatement {
    async fn execute(&self, parameters: &[Option<String>]) -> Result<ExecuteResult, DriverError> {
        *self.parameters.lock() = parameters.to_vec();
        if let Some(err) = self.fail_execute.lock().clone() {
            return Err(err);
        }
        if self.sql.to_uppercase().starts_with("SELECT") {
            let result_set = Arc::new(MockResultSet::new());
            self.result_sets.lock().push(result_set.clone());
            Ok(ExecuteResult::Query(result_set))
        } else {
            Ok(ExecuteResult::Update(1))
        }
    }

    async fn cancel(&self) -> Result<(), DriverError> {
        self.cancelled.store(true, Ordering::SeqCst);
        match self.fail_cancel.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        *self.closed_at.lock() = Some(tick());
        match self.fail_close.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Default)]
pub struct MockResultSet {
    closed_at: Mutex<Option<u64>>,
    failure: Option<DriverError>,
}

impl MockResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(err: DriverError) -> Self {
        Self {
            failure: Some(err),
            ..Default::default()
        }
    }

    /// Close was attempted.
    pub fn closed(&self) -> bool {
        self.closed_at.lock().is_some()
    }

    pub fn closed_at(&self) -> Option<u64> {
        *self.closed_at.lock()
    }
}

#[async_trait]
impl ResultSet for MockResultSet {
    async fn close(&self) -> Result<(), DriverError> {
        *self.closed_at.lock() = Some(tick());
        match self.failure.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Pool acquisition request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub database: String,
    pub data_source: String,
    pub count: usize,
    pub mode: ConnectionMode,
}

/// Pool handing out [`MockConnection`]s.
///
/// Connections queued with [`MockPool::queue`] are handed out first,
/// so tests can prepare failing ones.
#[derive(Debug, Default)]
pub struct MockPool {
    requests: Mutex<Vec<Request>>,
    queued: Mutex<VecDeque<Arc<MockConnection>>>,
    created: Mutex<Vec<Arc<MockConnection>>>,
    product: Mutex<Option<String>>,
    limit: Mutex<Option<usize>>,
    failure: Mutex<Option<DriverError>>,
}

impl MockPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Product name of connections created from now on.
    pub fn product(&self, product: &str) {
        *self.product.lock() = Some(product.to_string());
    }

    pub fn queue(&self, connection: Arc<MockConnection>) {
        self.queued.lock().push_back(connection);
    }

    /// Hand out at most `limit` connections per request.
    pub fn limit(&self, limit: usize) {
        *self.limit.lock() = Some(limit);
    }

    /// Fail every request.
    pub fn fail(&self, err: DriverError) {
        *self.failure.lock() = Some(err);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    /// Every connection handed out, in order.
    pub fn created(&self) -> Vec<Arc<MockConnection>> {
        self.created.lock().clone()
    }

    fn next(&self) -> Arc<MockConnection> {
        if let Some(connection) = self.queued.lock().pop_front() {
            return connection;
        }
        match self.product.lock().as_deref() {
            Some(product) => Arc::new(MockConnection::with_product(product)),
            None => Arc::new(MockConnection::new()),
        }
    }
}

#[async_trait]
impl ConnectionPoolProvider for MockPool {
    async fn acquire(
        &self,
        database: &str,
        data_source: &str,
        count: usize,
        mode: ConnectionMode,
    ) -> Result<Vec<Arc<dyn Connection>>, Error> {
        self.requests.lock().push(Request {
            database: database.to_string(),
            data_source: data_source.to_string(),
            count,
            mode,
        });

        if let Some(err) = self.failure.lock().clone() {
            return Err(Error::Connect {
                data_source: data_source.to_string(),
                source: err,
            });
        }

        let count = match *self.limit.lock() {
            Some(limit) => count.min(limit),
            None => count,
        };

        let mut connections: Vec<Arc<dyn Connection>> = vec![];
        for _ in 0..count {
            let connection = self.next();
            self.created.lock().push(connection.clone());
            connections.push(connection);
        }

        Ok(connections)
    }
}

/// Handler counting close calls.
#[derive(Debug)]
pub struct MockHandler {
    id: HandlerId,
    closes: AtomicUsize,
    failure: Option<DriverError>,
}

impl MockHandler {
    pub fn new() -> Self {
        Self {
            id: HandlerId::next(),
            closes: AtomicUsize::new(0),
            failure: None,
        }
    }

    pub fn failing(err: DriverError) -> Self {
        Self {
            failure: Some(err),
            ..Self::new()
        }
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendHandler for MockHandler {
    fn id(&self) -> HandlerId {
        self.id
    }

    async fn close(&self) -> Vec<Error> {
        self.closes.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(err) => vec![Error::CloseStatement(err.clone())],
            None => vec![],
        }
    }
}

/// Distributed transaction manager recording calls.
#[derive(Debug, Default)]
pub struct MockDistributed {
    calls: Mutex<Vec<String>>,
    fail_commit: Mutex<Option<DriverError>>,
}

impl MockDistributed {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn fail_commit(&self, err: DriverError) {
        *self.fail_commit.lock() = Some(err);
    }
}

#[async_trait]
impl DistributedTransactionManager for MockDistributed {
    async fn begin(&self, kind: TransactionKind) -> Result<(), DriverError> {
        self.calls.lock().push(format!("begin {}", kind));
        Ok(())
    }

    async fn commit(&self, kind: TransactionKind) -> Result<(), DriverError> {
        self.calls.lock().push(format!("commit {}", kind));
        match self.fail_commit.lock().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn rollback(&self, kind: TransactionKind) -> Result<(), DriverError> {
        self.calls.lock().push(format!("rollback {}", kind));
        Ok(())
    }
}

/// Two PostgreSQL data sources and one MySQL.
pub fn config() -> Config {
    Config {
        data_sources: vec![
            DataSource::new("ds_0", Dialect::Postgres),
            DataSource::new("ds_1", Dialect::Postgres),
            DataSource::new("ds_mysql", Dialect::Mysql),
        ],
        ..Default::default()
    }
}

/// Manager for a session connected to `sharding_db`.
pub fn manager(pool: Arc<MockPool>) -> Arc<ConnectionManager> {
    manager_with(config(), pool)
}

pub fn manager_with(mut config: Config, pool: Arc<MockPool>) -> Arc<ConnectionManager> {
    crate::logger();
    if config.data_sources.is_empty() {
        config.data_sources = self::config().data_sources;
    }
    let context = ProxyContext::new(config, pool);
    Arc::new(ConnectionManager::new(
        context,
        SessionState::new("sharding_db"),
    ))
}

/// Manager able to run distributed transactions.
pub fn distributed_manager(
    kind: TransactionKind,
    pool: Arc<MockPool>,
    distributed: Option<Arc<MockDistributed>>,
) -> Arc<ConnectionManager> {
    crate::logger();
    let mut config = config();
    config.general.default_transaction_kind = kind;
    let context = match distributed {
        Some(distributed) => {
            ProxyContext::with_distributed_transaction_manager(config, pool, distributed)
        }
        None => ProxyContext::new(config, pool),
    };
    Arc::new(ConnectionManager::new(
        context,
        SessionState::new("sharding_db"),
    ))
}
