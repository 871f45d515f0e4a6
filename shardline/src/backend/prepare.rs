//! Bind routed execution units to connections.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use super::{Connection, ConnectionManager, ConnectionMode, Error};

/// How statements are sent to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriverType {
    Statement,
    PreparedStatement,
}

impl DriverType {
    /// Prepared statements when the client prefers them or
    /// the query has parameters.
    pub fn select(prefer_prepared: bool, parameters: &[Option<String>]) -> Self {
        if prefer_prepared || !parameters.is_empty() {
            Self::PreparedStatement
        } else {
            Self::Statement
        }
    }
}

/// One routed fragment of a client statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionUnit {
    pub data_source: String,
    pub sql: String,
    pub parameters: Vec<Option<String>>,
}

impl ExecutionUnit {
    pub fn new(data_source: impl ToString, sql: impl ToString) -> Self {
        Self {
            data_source: data_source.to_string(),
            sql: sql.to_string(),
            parameters: vec![],
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Option<String>>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Units that run on the same connection, one after another.
#[derive(Debug, Clone)]
pub struct ExecutionGroup {
    pub data_source: String,
    pub mode: ConnectionMode,
    pub connection: Arc<dyn Connection>,
    pub units: Vec<ExecutionUnit>,
}

/// Groups units by data source and fetches connections for them.
///
/// One engine is used per client statement. Every call to
/// [`Self::prepare`] moves the connection offset of each data source
/// forward, so groups prepared separately never share a connection.
#[derive(Debug)]
pub struct ExecutionPrepareEngine<'a> {
    manager: &'a ConnectionManager,
    max_connections: usize,
    offsets: HashMap<String, usize>,
}

impl<'a> ExecutionPrepareEngine<'a> {
    pub fn new(manager: &'a ConnectionManager) -> Self {
        let max_connections = manager
            .context()
            .config()
            .general
            .max_connections_size_per_query
            .max(1);

        Self {
            manager,
            max_connections,
            offsets: HashMap::new(),
        }
    }

    pub async fn prepare(
        &mut self,
        units: Vec<ExecutionUnit>,
    ) -> Result<Vec<ExecutionGroup>, Error> {
        let mut by_data_source: IndexMap<String, Vec<ExecutionUnit>> = IndexMap::new();
        for unit in units {
            by_data_source
                .entry(unit.data_source.clone())
                .or_default()
                .push(unit);
        }

        let mut groups = vec![];

        for (data_source, units) in by_data_source {
            let mode = ConnectionMode::select(self.max_connections, units.len());
            let count = self.max_connections.min(units.len());
            let offset = self.offsets.get(&data_source).copied().unwrap_or(0);

            let connections = self
                .manager
                .get_connections(&data_source, offset, count, mode)
                .await?;
            self.offsets.insert(data_source.clone(), offset + count);

            debug!(
                "{} units on {} connections, {} [{}]",
                units.len(),
                count,
                mode,
                data_source
            );

            let per_connection = units.len().div_ceil(count);
            for (connection, chunk) in connections.into_iter().zip(units.chunks(per_connection)) {
                groups.push(ExecutionGroup {
                    data_source: data_source.clone(),
                    mode,
                    connection,
                    units: chunk.to_vec(),
                });
            }
        }

        Ok(groups)
    }
}
