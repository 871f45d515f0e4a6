//! Client-facing side of a session: its state, the statements it sends
//! and the handlers executing them.

pub mod admission;
pub mod error;
pub mod handler;
pub mod session;

pub use admission::{AdmissionChecker, StatementKind};
pub use error::Error;
pub use handler::{QueryContext, StandardHandler};
pub use session::{SessionState, TransactionStatus, VariableRecorder};
