//! Physical connections cached by a session.
//!
//! Each data source gets an ordered list of connections. Position `i`
//! in the list is connection offset `i`: the same offset keeps returning
//! the same connection for as long as it's cached, and different offsets
//! never share one.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;

use super::{Connection, Error};

/// Logical database and physical data source pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub database: String,
    pub data_source: String,
}

impl CacheKey {
    pub fn new(database: impl ToString, data_source: impl ToString) -> Self {
        Self {
            database: database.to_string(),
            data_source: data_source.to_string(),
        }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.data_source)
    }
}

type Slot = Arc<AsyncMutex<Vec<Arc<dyn Connection>>>>;

/// Connections cached per data source.
#[derive(Default, Debug)]
pub struct ConnectionCache {
    slots: Mutex<IndexMap<CacheKey, Slot>>,
}

impl ConnectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        self.slots.lock().entry(key.clone()).or_default().clone()
    }

    /// Get connections `[offset, offset + count)` for `key`.
    ///
    /// If the list is too short, `grow` is called with the number of
    /// missing connections and whatever it returns is appended. Callers
    /// growing the same key are serialized; callers on different keys
    /// are not.
    pub async fn window<F, Fut>(
        &self,
        key: &CacheKey,
        offset: usize,
        count: usize,
        grow: F,
    ) -> Result<Vec<Arc<dyn Connection>>, Error>
    where
        F: FnOnce(usize) -> Fut,
        Fut: Future<Output = Result<Vec<Arc<dyn Connection>>, Error>>,
    {
        let slot = self.slot(key);
        let mut connections = slot.lock().await;
        let needed = offset + count;

        if connections.len() < needed {
            let missing = needed - connections.len();
            match grow(missing).await {
                Ok(fresh) => {
                    debug!(
                        "cached {} new connections, {} total [{}]",
                        fresh.len(),
                        connections.len() + fresh.len(),
                        key
                    );
                    connections.extend(fresh);
                }
                Err(err) => {
                    let empty = connections.is_empty();
                    drop(connections);
                    if empty {
                        self.remove_if_empty(key, &slot);
                    }
                    return Err(err);
                }
            }
        }

        Ok(connections[offset..needed].to_vec())
    }

    /// Drop a slot we created for an acquisition that failed.
    fn remove_if_empty(&self, key: &CacheKey, slot: &Slot) {
        let mut slots = self.slots.lock();
        let same = slots
            .get(key)
            .map(|existing| Arc::ptr_eq(existing, slot))
            .unwrap_or(false);
        if same && slot.try_lock().map(|c| c.is_empty()).unwrap_or(false) {
            slots.shift_remove(key);
        }
    }

    /// Remove every cached connection, leaving the cache empty.
    pub async fn drain(&self) -> Vec<(CacheKey, Arc<dyn Connection>)> {
        let slots = std::mem::take(&mut *self.slots.lock());
        let mut drained = vec![];

        for (key, slot) in slots {
            let connections = std::mem::take(&mut *slot.lock().await);
            drained.extend(connections.into_iter().map(|conn| (key.clone(), conn)));
        }

        drained
    }

    /// Every cached connection, in cache order.
    pub async fn connections(&self) -> Vec<Arc<dyn Connection>> {
        let slots = self.slots.lock().values().cloned().collect::<Vec<_>>();
        let mut connections = vec![];

        for slot in slots {
            connections.extend(slot.lock().await.iter().cloned());
        }

        connections
    }

    /// Names of data sources holding at least one connection.
    pub fn data_source_names(&self) -> Vec<String> {
        let mut names: Vec<String> = vec![];
        for (key, slot) in self.slots.lock().iter() {
            let empty = slot.try_lock().map(|c| c.is_empty()).unwrap_or(false);
            if !empty && !names.contains(&key.data_source) {
                names.push(key.data_source.clone());
            }
        }
        names
    }

    /// Total number of cached connections.
    pub async fn len(&self) -> usize {
        let slots = self.slots.lock().values().cloned().collect::<Vec<_>>();
        let mut len = 0;
        for slot in slots {
            len += slot.lock().await.len();
        }
        len
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Number of connections cached for `key`.
    pub async fn len_of(&self, key: &CacheKey) -> usize {
        let slot = self.slots.lock().get(key).cloned();
        match slot {
            Some(slot) => slot.lock().await.len(),
            None => 0,
        }
    }

    /// Put connections straight into the cache.
    #[cfg(test)]
    pub(crate) async fn insert(&self, key: &CacheKey, connections: Vec<Arc<dyn Connection>>) {
        self.slot(key).lock().await.extend(connections);
    }
}
