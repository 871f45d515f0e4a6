//! Proxy-wide context shared by every session.
//!
//! Created once at startup and passed to each [`ConnectionManager`](crate::backend::ConnectionManager).
//! Cloning is cheap.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::backend::{ConnectionPoolProvider, DistributedTransactionManager};
use crate::config::{Config, Dialect};

struct Inner {
    config: Config,
    provider: Arc<dyn ConnectionPoolProvider>,
    distributed: Option<Arc<dyn DistributedTransactionManager>>,
    /// Dialects read from connections of data sources configured as `other`.
    learned: Mutex<IndexMap<String, Dialect>>,
}

#[derive(Clone)]
pub struct ProxyContext {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ProxyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyContext")
            .field("data_sources", &self.inner.config.data_sources.len())
            .field("distributed", &self.inner.distributed.is_some())
            .finish()
    }
}

impl ProxyContext {
    pub fn new(config: Config, provider: Arc<dyn ConnectionPoolProvider>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                provider,
                distributed: None,
                learned: Mutex::new(IndexMap::new()),
            }),
        }
    }

    /// Context able to run XA and BASE transactions.
    pub fn with_distributed_transaction_manager(
        config: Config,
        provider: Arc<dyn ConnectionPoolProvider>,
        distributed: Arc<dyn DistributedTransactionManager>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                provider,
                distributed: Some(distributed),
                learned: Mutex::new(IndexMap::new()),
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn provider(&self) -> &Arc<dyn ConnectionPoolProvider> {
        &self.inner.provider
    }

    pub fn distributed(&self) -> Option<&Arc<dyn DistributedTransactionManager>> {
        self.inner.distributed.as_ref()
    }

    /// Dialect of a data source, if known.
    ///
    /// The configured dialect wins. Data sources that aren't configured,
    /// or are configured as `other`, use the dialect learned from their
    /// connections, if any.
    pub fn dialect(&self, data_source: &str) -> Option<Dialect> {
        match self.inner.config.data_source(data_source).map(|ds| ds.dialect) {
            Some(Dialect::Other) | None => self.inner.learned.lock().get(data_source).copied(),
            configured => configured,
        }
    }

    /// Remember the dialect a data source's connections reported.
    pub fn learn_dialect(&self, data_source: &str, dialect: Dialect) {
        self.inner
            .learned
            .lock()
            .insert(data_source.to_string(), dialect);
    }
}
