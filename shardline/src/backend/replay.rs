//! Session state replay.
//!
//! Variables set by the client are sent to every new connection, and
//! removed from connections before they go back to the pool.

use tracing::debug;

use super::{Connection, DriverError, Error, SessionReset};
use crate::config::Dialect;
use crate::context::ProxyContext;

/// Run `SET` statements on a new connection, in order.
/// Stops at the first failure.
pub async fn replay(connection: &dyn Connection, statements: &[String]) -> Result<(), DriverError> {
    for statement in statements {
        debug!("replaying \"{}\"", statement);
        connection.execute(statement).await?;
    }

    Ok(())
}

/// Outcome of resetting one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reset {
    /// Reset statement was executed.
    Done(Dialect),
    /// Dialect can't reset all session state in one statement.
    Unsupported(Dialect),
}

/// Dialect of a connection to `data_source`.
///
/// Configured dialects are used as is. Otherwise the connection's product
/// name is read once and remembered for the data source.
pub async fn dialect(
    context: &ProxyContext,
    data_source: &str,
    connection: &dyn Connection,
) -> Result<Dialect, Error> {
    if let Some(dialect) = context.dialect(data_source) {
        return Ok(dialect);
    }

    let product = connection.product_name().await.map_err(Error::Metadata)?;
    let dialect = Dialect::from_product_name(&product);
    debug!("data source \"{}\" is {} (\"{}\")", data_source, dialect, product);
    context.learn_dialect(data_source, dialect);

    Ok(dialect)
}

/// Reset session state on a connection.
pub async fn reset(connection: &dyn Connection, dialect: Dialect) -> Result<Reset, Error> {
    match dialect.reset_all_statement() {
        Some(statement) => {
            debug!("[cleanup] {} [{}]", statement, dialect);
            connection
                .execute(statement)
                .await
                .map_err(Error::Reset)?;
            Ok(Reset::Done(dialect))
        }
        None => Ok(Reset::Unsupported(dialect)),
    }
}
