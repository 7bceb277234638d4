//! The blocking database seam the migration core talks through.
//!
//! Each shipped driver maps a missing version ledger table to
//! [`Error::LedgerMissing`] and every other failure to [`Error::Database`].

use gosling_common::{Error, Result};

use crate::dialect::Dialect;

#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;
mod sqlite;

/// Positional statement parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    Int(i64),
    Bool(bool),
}

/// One row read from the version ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRow {
    pub id: i64,
    pub version_id: i64,
    pub is_applied: bool,
    /// Insert time as the database renders it. `None` if the column is null.
    pub tstamp: Option<String>,
}

pub trait Connection {
    /// Run a single parameterized statement, returning the affected row count.
    fn execute(&mut self, sql: &str, params: &[Param]) -> Result<u64>;

    /// Run a query whose columns are `id`, `version_id`, `is_applied` and
    /// `tstamp`, in that order, with `id` as a 64-bit integer and `tstamp`
    /// as text. Rows come back in the order the database returns them.
    fn query_versions(&mut self, sql: &str, params: &[Param]) -> Result<Vec<LedgerRow>>;

    /// Run one or more unparameterized statements, such as a migration body.
    fn batch_execute(&mut self, sql: &str) -> Result<()>;
}

/// Open a connection for `dialect` using the driver compiled into this build.
pub fn open(dialect: Dialect, database: &str) -> Result<Box<dyn Connection>> {
    if database.is_empty() {
        return Err(Error::Config(
            "no database connection string configured".into(),
        ));
    }

    match dialect {
        Dialect::Sqlite3 => Ok(Box::new(sqlite::open(database)?)),
        #[cfg(feature = "postgres")]
        Dialect::Postgres => Ok(Box::new(self::postgres::open(database)?)),
        #[cfg(feature = "mysql")]
        Dialect::MySql => Ok(Box::new(self::mysql::open(database)?)),
        #[allow(unreachable_patterns)]
        other => Err(Error::Config(format!(
            "{other} driver not compiled in, rebuild with `--features {other}`"
        ))),
    }
}
