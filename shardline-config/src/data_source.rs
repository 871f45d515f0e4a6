use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Database product spoken by a backend.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    #[default]
    Postgres,
    OpenGauss,
    Mysql,
    Mariadb,
    /// Anything we don't have special handling for.
    Other,
}

impl Dialect {
    /// Resolve the dialect from the product name a driver reports,
    /// e.g. `"PostgreSQL"` or `"MySQL"`.
    pub fn from_product_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "postgresql" | "postgres" => Self::Postgres,
            "opengauss" => Self::OpenGauss,
            "mysql" => Self::Mysql,
            "mariadb" => Self::Mariadb,
            _ => Self::Other,
        }
    }

    /// PostgreSQL and databases derived from it.
    pub fn postgres_family(&self) -> bool {
        matches!(self, Self::Postgres | Self::OpenGauss)
    }
}

impl Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres => write!(f, "postgres"),
            Self::OpenGauss => write!(f, "open_gauss"),
            Self::Mysql => write!(f, "mysql"),
            Self::Mariadb => write!(f, "mariadb"),
            Self::Other => write!(f, "other"),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['_', '-'], "").as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "opengauss" => Ok(Self::OpenGauss),
            "mysql" => Ok(Self::Mysql),
            "mariadb" => Ok(Self::Mariadb),
            "other" => Ok(Self::Other),
            _ => Err(format!("Invalid dialect: {}", s)),
        }
    }
}

/// Physical data source reachable through the connection pool.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataSource {
    /// Name routing uses to address this data source.
    pub name: String,
    /// Logical database this data source belongs to.
    #[serde(default = "DataSource::database")]
    pub database: String,
    /// Backend dialect.
    #[serde(default)]
    pub dialect: Dialect,
}

impl DataSource {
    /// Data source in the default database.
    pub fn new(name: impl ToString, dialect: Dialect) -> Self {
        Self {
            name: name.to_string(),
            database: Self::database(),
            dialect,
        }
    }

    fn database() -> String {
        "postgres".into()
    }
}
