//! Backend connections of one client session.
//!
//! The manager hands out physical connections per data source, keeps
//! them for as long as the client's transaction lasts, and closes them,
//! along with every handler, when a statement, transaction or the whole
//! session ends.
//!
//! Teardown never stops at the first failure. Every resource gets a
//! close attempt and all failures are returned to the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, warn};

use super::{
    replay, BackendHandler, CacheKey, Connection, ConnectionCache, ConnectionMode,
    ConnectionPostProcessor, Error, HandlerId, HandlerRegistry, IsolationLevel,
    TransactionManager,
};
use crate::context::ProxyContext;
use crate::frontend::SessionState;

/// Session state copied out of the lock before touching new connections.
struct Setup {
    variables: Vec<String>,
    read_only: bool,
    isolation_level: Option<IsolationLevel>,
    post_processors: Vec<Arc<dyn ConnectionPostProcessor>>,
}

/// Connection manager for one client session.
#[derive(Debug)]
pub struct ConnectionManager {
    context: ProxyContext,
    session: Mutex<SessionState>,
    cache: ConnectionCache,
    registry: Mutex<HandlerRegistry>,
    post_processors: Mutex<Vec<Arc<dyn ConnectionPostProcessor>>>,
    closed: AtomicBool,
}

impl ConnectionManager {
    pub fn new(context: ProxyContext, session: SessionState) -> Self {
        Self {
            context,
            session: Mutex::new(session),
            cache: ConnectionCache::new(),
            registry: Mutex::new(HandlerRegistry::default()),
            post_processors: Mutex::new(vec![]),
            closed: AtomicBool::new(false),
        }
    }

    pub fn context(&self) -> &ProxyContext {
        &self.context
    }

    /// Lock the session state. Don't hold the guard across an `.await`.
    pub fn session(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock()
    }

    #[inline]
    pub fn in_transaction(&self) -> bool {
        self.session.lock().in_transaction()
    }

    /// Session was closed by [`Self::close_all_resources`].
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get `count` connections to `data_source` in the session's database,
    /// starting at `offset`.
    ///
    /// The same window keeps returning the same connections while they're
    /// cached; windows that don't overlap never share a connection. Only
    /// missing connections are fetched from the pool, and each of them
    /// gets the session's state before it's handed out.
    pub async fn get_connections(
        &self,
        data_source: &str,
        offset: usize,
        count: usize,
        mode: ConnectionMode,
    ) -> Result<Vec<Arc<dyn Connection>>, Error> {
        let database = self
            .session
            .lock()
            .used_database
            .clone()
            .ok_or(Error::NoDatabaseSelected)?;

        self.get_connections_for(&database, data_source, offset, count, mode)
            .await
    }

    /// Same as [`Self::get_connections`], for an explicit logical database.
    pub async fn get_connections_for(
        &self,
        database: &str,
        data_source: &str,
        offset: usize,
        count: usize,
        mode: ConnectionMode,
    ) -> Result<Vec<Arc<dyn Connection>>, Error> {
        if self.is_closed() {
            return Err(Error::SessionClosed);
        }

        let key = CacheKey::new(database, data_source);
        let connections = self
            .cache
            .window(&key, offset, count, |missing| {
                self.create_connections(&key, missing, mode)
            })
            .await?;

        let mut session = self.session.lock();
        if !session.auto_commit && !session.in_transaction() {
            let kind = self.context.config().general.default_transaction_kind;
            debug!("auto-commit is off, starting {} transaction [{}]", kind, key);
            session.transaction_mut().begin(kind);
        }

        Ok(connections)
    }

    /// Fetch new connections from the pool and prepare them for the session.
    async fn create_connections(
        &self,
        key: &CacheKey,
        count: usize,
        mode: ConnectionMode,
    ) -> Result<Vec<Arc<dyn Connection>>, Error> {
        let connections = self
            .context
            .provider()
            .acquire(&key.database, &key.data_source, count, mode)
            .await?;

        if connections.len() < count {
            let acquired = connections.len();
            for err in close_batch(&connections).await {
                warn!("[cleanup] {} [{}]", err, key);
            }
            return Err(Error::PoolExhausted {
                data_source: key.data_source.clone(),
                requested: count,
                acquired,
            });
        }

        let setup = self.setup();

        for connection in &connections {
            if let Err(err) = Self::prepare(connection.as_ref(), &setup).await {
                warn!("new connection setup failed: {} [{}]", err, key);
                let close_failures = close_batch(&connections).await;

                return Err(match err {
                    Error::VariableReplay { source, .. } => Error::VariableReplay {
                        source,
                        close_failures,
                    },
                    err => Error::ConnectionSetup {
                        source: Box::new(err),
                        close_failures,
                    },
                });
            }
        }

        Ok(connections)
    }

    fn setup(&self) -> Setup {
        let session = self.session.lock();
        Setup {
            variables: session.variables().set_statements(),
            read_only: session.read_only,
            isolation_level: session.isolation_level,
            post_processors: self.post_processors.lock().clone(),
        }
    }

    /// Replay variables, transaction options and post-processors, in that order.
    async fn prepare(connection: &dyn Connection, setup: &Setup) -> Result<(), Error> {
        replay::replay(connection, &setup.variables)
            .await
            .map_err(|source| Error::VariableReplay {
                source,
                close_failures: vec![],
            })?;

        if setup.read_only {
            connection
                .set_read_only(true)
                .await
                .map_err(Error::TransactionOption)?;
        }

        if let Some(level) = setup.isolation_level {
            connection
                .set_transaction_isolation(level)
                .await
                .map_err(Error::TransactionOption)?;
        }

        for post_processor in &setup.post_processors {
            post_processor
                .process(connection)
                .await
                .map_err(Error::PostProcess)?;
        }

        Ok(())
    }

    /// Close every cached connection.
    ///
    /// Each connection is rolled back (if `force_rollback` and a transaction
    /// is running), reset (if the client set any variables) and closed,
    /// in that order. Connections are independent of each other and may be
    /// closed concurrently.
    ///
    /// Post-processors are cleared afterwards. Variables are cleared
    /// once connections were reset, even if something failed, and are
    /// kept if there was nothing to reset.
    pub async fn close_connections(&self, force_rollback: bool) -> Vec<Error> {
        let (rollback, reset) = {
            let session = self.session.lock();
            (
                force_rollback && session.in_transaction(),
                !session.variables().is_empty(),
            )
        };

        let connections = self.cache.drain().await;
        self.post_processors.lock().clear();

        if connections.is_empty() {
            return vec![];
        }

        debug!(
            "[cleanup] closing {} connections (rollback: {}, reset: {})",
            connections.len(),
            rollback,
            reset
        );

        let context = &self.context;
        let errors = if context.config().general.close_in_parallel {
            join_all(
                connections
                    .iter()
                    .map(|(key, conn)| close_one(context, key, conn.as_ref(), rollback, reset)),
            )
            .await
            .into_iter()
            .flatten()
            .collect()
        } else {
            let mut errors = vec![];
            for (key, conn) in &connections {
                errors.extend(close_one(context, key, conn.as_ref(), rollback, reset).await);
            }
            errors
        };

        self.session.lock().variables_mut().clear();

        errors
    }

    /// Close handlers. Forced closes all of them, otherwise only
    /// handlers that aren't in use.
    pub async fn close_handlers(&self, forced: bool) -> Vec<Error> {
        let handlers = self.registry.lock().take_closable(forced);
        let mut errors = vec![];

        for handler in handlers {
            let failures = handler.close().await;
            for err in &failures {
                warn!("[cleanup] {} [{}]", err, handler.id());
            }
            errors.extend(failures);
        }

        errors
    }

    /// Statement finished.
    ///
    /// Outside of a transaction, everything is closed: handlers and
    /// connections. Inside one, only handlers that aren't in use are
    /// closed; connections stay with the transaction. Once the session
    /// is closed, everything is rolled back and closed.
    pub async fn close_execution_resources(&self) -> Vec<Error> {
        if self.is_closed() {
            self.close_session().await
        } else if self.in_transaction() {
            self.close_handlers(false).await
        } else {
            let mut errors = self.close_handlers(true).await;
            errors.extend(self.close_connections(false).await);
            errors
        }
    }

    /// Client disconnected. Rolls back a running transaction.
    pub async fn close_all_resources(&self) -> Vec<Error> {
        self.closed.store(true, Ordering::Release);

        let errors = self.close_session().await;

        if !errors.is_empty() {
            warn!("[cleanup] session closed with {} errors", errors.len());
        }

        errors
    }

    /// Roll back and close connections, then close every handler.
    async fn close_session(&self) -> Vec<Error> {
        let mut errors = self.close_connections(true).await;
        self.session.lock().transaction_mut().finish();
        errors.extend(self.close_handlers(true).await);
        errors
    }

    /// Start a transaction if the client turned auto-commit off
    /// and none is running yet.
    pub async fn handle_auto_commit(&self) -> Result<(), Error> {
        let begin = {
            let session = self.session.lock();
            !session.auto_commit && !session.in_transaction()
        };

        if begin {
            TransactionManager::new(self).begin().await?;
        }

        Ok(())
    }

    pub fn add(&self, handler: Arc<dyn BackendHandler>) {
        self.registry.lock().add(handler);
    }

    pub fn mark_in_use(&self, id: HandlerId) {
        self.registry.lock().mark_in_use(id);
    }

    pub fn unmark_in_use(&self, id: HandlerId) {
        self.registry.lock().unmark_in_use(id);
    }

    /// Run `post_processor` on every connection opened from now on,
    /// until connections are closed.
    pub fn add_post_processor(&self, post_processor: Arc<dyn ConnectionPostProcessor>) {
        self.post_processors.lock().push(post_processor);
    }

    /// Data sources with cached connections.
    pub fn data_source_names(&self) -> Vec<String> {
        self.cache.data_source_names()
    }

    /// Number of cached connections.
    pub async fn connection_count(&self) -> usize {
        self.cache.len().await
    }

    pub(crate) fn cache(&self) -> &ConnectionCache {
        &self.cache
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> MutexGuard<'_, HandlerRegistry> {
        self.registry.lock()
    }

    #[cfg(test)]
    pub(crate) fn post_processors(&self) -> usize {
        self.post_processors.lock().len()
    }
}

/// Rollback, reset and close one connection. Every step is attempted.
async fn close_one(
    context: &ProxyContext,
    key: &CacheKey,
    connection: &dyn Connection,
    rollback: bool,
    reset: bool,
) -> Vec<Error> {
    let mut errors = vec![];

    if rollback {
        debug!("[cleanup] rolling back [{}]", key);
        if let Err(err) = connection.rollback().await {
            errors.push(Error::Rollback(err));
        }
    }

    if reset {
        let result = match replay::dialect(context, &key.data_source, connection).await {
            Ok(dialect) => replay::reset(connection, dialect).await.map(|_| ()),
            Err(err) => Err(err),
        };
        if let Err(err) = result {
            errors.push(err);
        }
    }

    if let Some(err) = close_connection(connection).await {
        errors.push(err);
    }

    for err in &errors {
        warn!("[cleanup] {} [{}]", err, key);
    }

    errors
}

/// Close a connection. A failed close is fine if the
/// connection reports being closed anyway.
async fn close_connection(connection: &dyn Connection) -> Option<Error> {
    let err = connection.close().await.err()?;

    match connection.is_closed().await {
        Ok(true) => {
            debug!("[cleanup] ignoring close failure, connection is closed: {}", err);
            None
        }
        Ok(false) | Err(_) => Some(Error::Close(err)),
    }
}

/// Close connections we just got and won't use.
async fn close_batch(connections: &[Arc<dyn Connection>]) -> Vec<Error> {
    join_all(
        connections
            .iter()
            .map(|connection| close_connection(connection.as_ref())),
    )
    .await
    .into_iter()
    .flatten()
    .collect()
}
