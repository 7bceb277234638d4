use gosling_common::{Error, Result};
use rusqlite::types::ToSqlOutput;
use rusqlite::{ToSql, params_from_iter};
use tracing::info;

use super::{Connection, LedgerRow, Param};
use crate::dialect::LEDGER_TABLE;

pub(super) fn open(path: &str) -> Result<rusqlite::Connection> {
    info!("opening sqlite database at {path}");
    rusqlite::Connection::open(path)
        .map_err(|e| Error::Database(format!("failed to open database: {e}")))
}

impl ToSql for Param {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            Param::Int(v) => v.to_sql(),
            Param::Bool(v) => v.to_sql(),
        }
    }
}

impl Connection for rusqlite::Connection {
    fn execute(&mut self, sql: &str, params: &[Param]) -> Result<u64> {
        let changed = rusqlite::Connection::execute(self, sql, params_from_iter(params.iter()))
            .map_err(|e| map_error(e, "failed to execute statement"))?;
        Ok(changed as u64)
    }

    fn query_versions(&mut self, sql: &str, params: &[Param]) -> Result<Vec<LedgerRow>> {
        let mut stmt = self
            .prepare(sql)
            .map_err(|e| map_error(e, "failed to prepare query"))?;

        let rows = stmt
            .query_map(params_from_iter(params.iter()), |row| {
                Ok(LedgerRow {
                    id: row.get(0)?,
                    version_id: row.get(1)?,
                    is_applied: row.get(2)?,
                    tstamp: row.get(3)?,
                })
            })
            .map_err(|e| map_error(e, "failed to query version ledger"))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| map_error(e, "failed to read ledger row"))
    }

    fn batch_execute(&mut self, sql: &str) -> Result<()> {
        self.execute_batch(sql)
            .map_err(|e| map_error(e, "failed to execute batch"))
    }
}

fn map_error(e: rusqlite::Error, context: &str) -> Error {
    match &e {
        rusqlite::Error::SqliteFailure(_, Some(msg))
            if msg.starts_with("no such table") && msg.contains(LEDGER_TABLE) =>
        {
            Error::LedgerMissing(msg.clone())
        }
        _ => Error::Database(format!("{context}: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELECT_ALL: &str =
        "SELECT id, version_id, is_applied, tstamp FROM goose_db_version ORDER BY id";

    fn ledger_conn() -> rusqlite::Connection {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE goose_db_version (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                version_id INTEGER NOT NULL,
                is_applied INTEGER NOT NULL,
                tstamp TEXT
            );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn execute_binds_int_and_bool_params() {
        let mut conn = ledger_conn();
        let changed = Connection::execute(
            &mut conn,
            "INSERT INTO goose_db_version (version_id, is_applied) VALUES (?, ?)",
            &[Param::Int(42), Param::Bool(true)],
        )
        .unwrap();
        assert_eq!(changed, 1);

        let rows = conn.query_versions(SELECT_ALL, &[]).unwrap();
        assert_eq!(
            rows,
            vec![LedgerRow {
                id: 1,
                version_id: 42,
                is_applied: true,
                tstamp: None,
            }]
        );
    }

    #[test]
    fn reads_timestamp_column_as_text() {
        let mut conn = ledger_conn();
        conn.execute_batch(
            "INSERT INTO goose_db_version (version_id, is_applied, tstamp)
             VALUES (7, 0, '2024-05-01 12:30:00');",
        )
        .unwrap();

        let rows = conn.query_versions(SELECT_ALL, &[]).unwrap();
        assert_eq!(rows[0].tstamp.as_deref(), Some("2024-05-01 12:30:00"));
        assert!(!rows[0].is_applied);
    }

    #[test]
    fn missing_ledger_table_maps_to_ledger_missing() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = conn.query_versions(SELECT_ALL, &[]).unwrap_err();
        assert!(matches!(err, Error::LedgerMissing(_)));
    }

    #[test]
    fn other_missing_tables_are_database_errors() {
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = conn.batch_execute("INSERT INTO users VALUES (1);").unwrap_err();
        assert!(matches!(err, Error::Database(_)));
    }
}
