//! Handlers known to a session.

use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use super::{BackendHandler, HandlerId};

/// Every handler of the session, and the ones currently in use.
///
/// Handlers in use are always registered, so closing everything
/// can never miss one.
#[derive(Default, Debug)]
pub struct HandlerRegistry {
    all: IndexMap<HandlerId, Arc<dyn BackendHandler>>,
    in_use: IndexSet<HandlerId>,
}

impl HandlerRegistry {
    pub fn add(&mut self, handler: Arc<dyn BackendHandler>) {
        self.all.insert(handler.id(), handler);
    }

    /// Handler is streaming results. Ignored for unknown handlers.
    pub fn mark_in_use(&mut self, id: HandlerId) -> bool {
        if self.all.contains_key(&id) {
            self.in_use.insert(id)
        } else {
            false
        }
    }

    pub fn unmark_in_use(&mut self, id: HandlerId) -> bool {
        self.in_use.shift_remove(&id)
    }

    pub fn is_in_use(&self, id: HandlerId) -> bool {
        self.in_use.contains(&id)
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.all.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }

    pub fn in_use_len(&self) -> usize {
        self.in_use.len()
    }

    /// Take handlers out of the registry for closing.
    ///
    /// Forced takes everything. Otherwise only idle handlers are
    /// taken; handlers in use stay registered.
    pub fn take_closable(&mut self, forced: bool) -> Vec<Arc<dyn BackendHandler>> {
        if forced {
            self.in_use.clear();
            std::mem::take(&mut self.all).into_values().collect()
        } else {
            let (keep, take) = std::mem::take(&mut self.all)
                .into_iter()
                .partition::<IndexMap<_, _>, _>(|(id, _)| self.in_use.contains(id));
            self.all = keep;
            take.into_values().collect()
        }
    }
}
