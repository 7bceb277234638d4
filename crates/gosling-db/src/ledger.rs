use std::collections::HashSet;

use gosling_common::{Error, Result};
use tracing::info;

use crate::conn::{Connection, LedgerRow, Param};
use crate::dialect::{Dialect, LEDGER_TABLE};
use crate::version::MIN_VERSION;

/// Reads and appends to the version ledger. Rows are only ever inserted,
/// never updated or deleted, so the table is a log of every transition.
#[derive(Debug, Clone, Copy)]
pub struct Ledger {
    dialect: Dialect,
}

impl Ledger {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Create the ledger table on first use and seed it with the sentinel
    /// version so an empty database reports version 0.
    pub fn ensure(&self, conn: &mut dyn Connection) -> Result<()> {
        match self.dialect.query_ledger_history(conn) {
            Ok(_) => Ok(()),
            Err(Error::LedgerMissing(_)) => {
                info!("creating version ledger table {LEDGER_TABLE}");
                conn.batch_execute(self.dialect.create_ledger_table_sql())?;
                self.insert(conn, MIN_VERSION, true)
            }
            Err(e) => Err(e),
        }
    }

    pub fn history(&self, conn: &mut dyn Connection) -> Result<Vec<LedgerRow>> {
        self.dialect.query_ledger_history(conn)
    }

    /// Version of the newest applied row whose version has not been
    /// reverted by a later row. [`MIN_VERSION`] when nothing is applied.
    pub fn current_version(&self, conn: &mut dyn Connection) -> Result<i64> {
        let rows = self.history(conn)?;
        Ok(current_from_history(&rows))
    }

    pub fn is_applied(&self, conn: &mut dyn Connection, version: i64) -> Result<bool> {
        self.dialect.query_version_applied(conn, version)
    }

    /// Newest row recorded for `version`, applied or not.
    pub fn latest_row(
        &self,
        conn: &mut dyn Connection,
        version: i64,
    ) -> Result<Option<LedgerRow>> {
        self.dialect.query_version_row(conn, version)
    }

    pub fn record_applied(&self, conn: &mut dyn Connection, version: i64) -> Result<()> {
        self.insert(conn, version, true)
    }

    pub fn record_reverted(&self, conn: &mut dyn Connection, version: i64) -> Result<()> {
        self.insert(conn, version, false)
    }

    fn insert(&self, conn: &mut dyn Connection, version: i64, applied: bool) -> Result<()> {
        conn.execute(
            self.dialect.insert_ledger_row_sql(),
            &[Param::Int(version), Param::Bool(applied)],
        )?;
        Ok(())
    }
}

/// `rows` must be newest first.
fn current_from_history(rows: &[LedgerRow]) -> i64 {
    let mut reverted = HashSet::new();
    for row in rows {
        if !row.is_applied {
            reverted.insert(row.version_id);
        } else if !reverted.contains(&row.version_id) {
            return row.version_id;
        }
    }
    MIN_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(version_id: i64, is_applied: bool) -> LedgerRow {
        LedgerRow {
            id: 0,
            version_id,
            is_applied,
            tstamp: None,
        }
    }

    fn ledger() -> (Ledger, rusqlite::Connection) {
        let ledger = Ledger::new(Dialect::Sqlite3);
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        ledger.ensure(&mut conn).unwrap();
        (ledger, conn)
    }

    #[test]
    fn empty_history_is_min_version() {
        assert_eq!(current_from_history(&[]), MIN_VERSION);
        assert_eq!(current_from_history(&[row(5, false)]), MIN_VERSION);
    }

    #[test]
    fn newest_applied_row_wins() {
        let rows = [row(3, true), row(2, true), row(1, true)];
        assert_eq!(current_from_history(&rows), 3);
    }

    #[test]
    fn reverted_versions_are_skipped() {
        let rows = [row(3, false), row(3, true), row(2, true), row(1, true)];
        assert_eq!(current_from_history(&rows), 2);

        let reapplied = [row(3, true), row(3, false), row(3, true), row(2, true)];
        assert_eq!(current_from_history(&reapplied), 3);
    }

    #[test]
    fn ensure_bootstraps_once() {
        let (ledger, mut conn) = ledger();
        ledger.ensure(&mut conn).unwrap();

        let rows = ledger.history(&mut conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].version_id, rows[0].is_applied), (MIN_VERSION, true));
        assert_eq!(ledger.current_version(&mut conn).unwrap(), MIN_VERSION);
    }

    #[test]
    fn current_version_without_table_is_ledger_missing() {
        let ledger = Ledger::new(Dialect::Sqlite3);
        let mut conn = rusqlite::Connection::open_in_memory().unwrap();
        let err = ledger.current_version(&mut conn).unwrap_err();
        assert!(matches!(err, Error::LedgerMissing(_)));
    }

    #[test]
    fn records_are_appended() {
        let (ledger, mut conn) = ledger();
        ledger.record_applied(&mut conn, 20230101000000).unwrap();
        ledger.record_applied(&mut conn, 20230102000000).unwrap();
        ledger.record_reverted(&mut conn, 20230102000000).unwrap();

        assert_eq!(ledger.history(&mut conn).unwrap().len(), 4);
        assert_eq!(ledger.current_version(&mut conn).unwrap(), 20230101000000);
        assert!(ledger.is_applied(&mut conn, 20230101000000).unwrap());
        assert!(!ledger.is_applied(&mut conn, 20230102000000).unwrap());
        assert!(!ledger.is_applied(&mut conn, 20230103000000).unwrap());
    }

    #[test]
    fn latest_row_is_the_newest_transition() {
        let (ledger, mut conn) = ledger();
        ledger.record_applied(&mut conn, 20230101000000).unwrap();
        ledger.record_reverted(&mut conn, 20230101000000).unwrap();

        let latest = ledger.latest_row(&mut conn, 20230101000000).unwrap().unwrap();
        assert!(!latest.is_applied);
        assert_eq!(latest.id, 3);
        assert!(latest.tstamp.is_some());
        assert!(ledger.latest_row(&mut conn, 20230102000000).unwrap().is_none());
    }
}
