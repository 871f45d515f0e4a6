//! State of one client session.
//!
//! The session hides the shard topology and presents a single
//! logical connection. When the client issues `SET`, the variable is
//! recorded here so it can be replayed onto every physical connection
//! we open for it afterwards.

use indexmap::IndexMap;

use crate::backend::IsolationLevel;
use crate::config::TransactionKind;

/// Transaction bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransactionStatus {
    in_transaction: bool,
    kind: Option<TransactionKind>,
}

impl TransactionStatus {
    /// Inside an explicit or implicit transaction.
    #[inline]
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Kind of the current transaction, `None` outside of one.
    #[inline]
    pub fn kind(&self) -> Option<TransactionKind> {
        self.kind
    }

    /// Start a transaction.
    pub fn begin(&mut self, kind: TransactionKind) {
        self.in_transaction = true;
        self.kind = Some(kind);
    }

    /// Transaction committed or rolled back.
    pub fn finish(&mut self) {
        self.in_transaction = false;
        self.kind = None;
    }
}

/// Session variables set by the client, in the order they were set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariableRecorder {
    variables: IndexMap<String, String>,
}

impl VariableRecorder {
    /// Record a variable. Setting it again keeps its original position.
    pub fn set(&mut self, name: impl ToString, value: impl ToString) {
        self.variables.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(|value| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn clear(&mut self) {
        self.variables.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// One `SET` statement per variable, in recorded order.
    pub fn set_statements(&self) -> Vec<String> {
        self.iter()
            .map(|(name, value)| format!("SET {}={}", name, value))
            .collect()
    }
}

/// Client session.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Auto-commit is on.
    pub auto_commit: bool,
    /// Logical database selected by the client.
    pub used_database: Option<String>,
    /// Session is read-only.
    pub read_only: bool,
    /// Isolation level requested by the client.
    pub isolation_level: Option<IsolationLevel>,
    transaction: TransactionStatus,
    variables: VariableRecorder,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            auto_commit: true,
            used_database: None,
            read_only: false,
            isolation_level: None,
            transaction: TransactionStatus::default(),
            variables: VariableRecorder::default(),
        }
    }
}

impl SessionState {
    /// New session connected to `database`.
    pub fn new(database: impl ToString) -> Self {
        Self {
            used_database: Some(database.to_string()),
            ..Default::default()
        }
    }

    pub fn transaction(&self) -> &TransactionStatus {
        &self.transaction
    }

    pub fn transaction_mut(&mut self) -> &mut TransactionStatus {
        &mut self.transaction
    }

    #[inline]
    pub fn in_transaction(&self) -> bool {
        self.transaction.in_transaction()
    }

    pub fn variables(&self) -> &VariableRecorder {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableRecorder {
        &mut self.variables
    }

    /// Client ran `SET name = value`.
    pub fn set_variable(&mut self, name: impl ToString, value: impl ToString) {
        self.variables.set(name, value);
    }

    /// Client ran `USE database` or equivalent.
    pub fn use_database(&mut self, database: impl ToString) {
        self.used_database = Some(database.to_string());
    }
}
