use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Kind of transaction a session opens when it leaves auto-commit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    /// Each backend connection runs its own local transaction (default).
    #[default]
    Local,
    /// Two-phase commit coordinated across backends.
    Xa,
    /// Eventually consistent, compensating transactions.
    Base,
}

impl TransactionKind {
    /// Transaction is coordinated outside of the backend connections.
    pub fn distributed(&self) -> bool {
        matches!(self, Self::Xa | Self::Base)
    }
}

impl Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Xa => write!(f, "xa"),
            Self::Base => write!(f, "base"),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "xa" => Ok(Self::Xa),
            "base" => Ok(Self::Base),
            _ => Err(format!("Invalid transaction kind: {}", s)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_transaction_kind_from_str() {
        assert_eq!("XA".parse::<TransactionKind>(), Ok(TransactionKind::Xa));
        assert_eq!("local".parse::<TransactionKind>(), Ok(TransactionKind::Local));
        assert!("saga".parse::<TransactionKind>().is_err());
        assert!(TransactionKind::Base.distributed());
        assert!(!TransactionKind::Local.distributed());
    }
}
