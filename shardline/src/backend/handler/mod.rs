//! Statement handlers attached to a session.
//!
//! A handler owns the statements and result sets it created. The
//! session keeps track of every handler it has, and which of them are
//! still streaming results to the client.

use std::fmt::{Debug, Display};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use super::Error;

pub mod registry;
pub mod tracker;

pub use registry::HandlerRegistry;
pub use tracker::StatementResourceTracker;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Handler identifier, unique within the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    pub fn next() -> Self {
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for HandlerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handler_{}", self.0)
    }
}

/// Something executing statements on behalf of the session.
#[async_trait]
pub trait BackendHandler: Send + Sync + Debug {
    fn id(&self) -> HandlerId;

    /// Close all statements and result sets. Returns every failure,
    /// not just the first one.
    async fn close(&self) -> Vec<Error>;
}
