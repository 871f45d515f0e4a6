// Submodules
pub mod core;
pub mod data_source;
pub mod error;
pub mod general;
pub mod transaction;

pub use core::Config;
pub use data_source::{DataSource, Dialect};
pub use error::Error;
pub use general::{General, LogFormat};
pub use transaction::TransactionKind;
