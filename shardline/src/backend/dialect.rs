//! Dialect-specific session handling.

use crate::config::Dialect;

/// Whether a dialect can wipe session state with one statement.
pub trait SessionReset {
    /// Dialect has a single "reset everything" statement.
    fn supports_session_reset(&self) -> bool {
        self.reset_all_statement().is_some()
    }

    /// Statement that restores every session variable to its default.
    fn reset_all_statement(&self) -> Option<&'static str>;
}

impl SessionReset for Dialect {
    fn reset_all_statement(&self) -> Option<&'static str> {
        match self {
            Dialect::Postgres | Dialect::OpenGauss => Some("RESET ALL"),
            Dialect::Mysql | Dialect::Mariadb | Dialect::Other => None,
        }
    }
}
