use std::fmt;
use std::str::FromStr;

use gosling_common::{Error, Result};

use crate::conn::{Connection, LedgerRow, Param};

/// Name of the version ledger table.
pub const LEDGER_TABLE: &str = "goose_db_version";

/// Database product the ledger SQL is written for. Chosen once from
/// configuration and passed to whatever needs it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    MySql,
    Sqlite3,
}

impl Dialect {
    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite3 => "sqlite3",
        }
    }

    pub fn create_ledger_table_sql(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "CREATE TABLE goose_db_version (
                    id serial NOT NULL,
                    version_id bigint NOT NULL,
                    is_applied boolean NOT NULL,
                    tstamp timestamp NULL default now(),
                    PRIMARY KEY(id)
                );"
            }
            Dialect::MySql => {
                "CREATE TABLE goose_db_version (
                    id serial NOT NULL,
                    version_id bigint NOT NULL,
                    is_applied boolean NOT NULL,
                    tstamp timestamp NULL default now(),
                    PRIMARY KEY(id)
                );"
            }
            Dialect::Sqlite3 => {
                "CREATE TABLE goose_db_version (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    version_id INTEGER NOT NULL,
                    is_applied INTEGER NOT NULL,
                    tstamp TIMESTAMP DEFAULT (datetime('now'))
                );"
            }
        }
    }

    /// Parameterized insert of `(version_id, is_applied)`.
    pub fn insert_ledger_row_sql(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "INSERT INTO goose_db_version (version_id, is_applied) VALUES ($1, $2)"
            }
            Dialect::MySql | Dialect::Sqlite3 => {
                "INSERT INTO goose_db_version (version_id, is_applied) VALUES (?, ?)"
            }
        }
    }

    // `serial` is 32-bit on postgres and unsigned on mysql, and neither
    // driver hands back timestamps as text, so both columns are cast.
    fn history_sql(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT CAST(id AS BIGINT), version_id, is_applied, CAST(tstamp AS TEXT) \
                 FROM goose_db_version ORDER BY id DESC"
            }
            Dialect::MySql => {
                "SELECT CAST(id AS SIGNED), version_id, is_applied, CAST(tstamp AS CHAR) \
                 FROM goose_db_version ORDER BY id DESC"
            }
            Dialect::Sqlite3 => {
                "SELECT id, version_id, is_applied, tstamp \
                 FROM goose_db_version ORDER BY id DESC"
            }
        }
    }

    fn version_status_sql(&self) -> &'static str {
        match self {
            Dialect::Postgres => {
                "SELECT CAST(id AS BIGINT), version_id, is_applied, CAST(tstamp AS TEXT) \
                 FROM goose_db_version WHERE version_id = $1 ORDER BY id DESC LIMIT 1"
            }
            Dialect::MySql => {
                "SELECT CAST(id AS SIGNED), version_id, is_applied, CAST(tstamp AS CHAR) \
                 FROM goose_db_version WHERE version_id = ? ORDER BY id DESC LIMIT 1"
            }
            Dialect::Sqlite3 => {
                "SELECT id, version_id, is_applied, tstamp \
                 FROM goose_db_version WHERE version_id = ? ORDER BY id DESC LIMIT 1"
            }
        }
    }

    /// All ledger rows, newest first.
    pub fn query_ledger_history(&self, conn: &mut dyn Connection) -> Result<Vec<LedgerRow>> {
        conn.query_versions(self.history_sql(), &[])
    }

    /// Newest ledger row for `version`, if it has any.
    pub fn query_version_row(
        &self,
        conn: &mut dyn Connection,
        version: i64,
    ) -> Result<Option<LedgerRow>> {
        let rows = conn.query_versions(self.version_status_sql(), &[Param::Int(version)])?;
        Ok(rows.into_iter().next())
    }

    /// Whether the newest ledger row for `version` is marked applied.
    /// A version with no rows at all is simply not applied.
    pub fn query_version_applied(&self, conn: &mut dyn Connection, version: i64) -> Result<bool> {
        let row = self.query_version_row(conn, version)?;
        Ok(row.is_some_and(|row| row.is_applied))
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "postgres" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "sqlite3" => Ok(Dialect::Sqlite3),
            other => Err(Error::Config(format!("{other:?}: unknown dialect"))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
