use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use gosling_common::{Error, Result};
use gosling_db::command::{self, Outcome};
use gosling_db::{Catalog, Connection, Dialect, LedgerRow, Migration, Migrator, Param};

const V1: i64 = 20230101000000;
const V2: i64 = 20230102000000;
const V3: i64 = 20230103000000;

/// Registers a migration that records its version in `runs` when applied.
fn tracked(version: i64, runs: &Arc<std::sync::Mutex<Vec<i64>>>) -> Migration {
    let runs = Arc::clone(runs);
    Migration::routine(version, format!("m{version}"), move |_| {
        runs.lock().unwrap().push(version);
        Ok(())
    })
}

fn tracked_migrator(runs: &Arc<std::sync::Mutex<Vec<i64>>>) -> Migrator {
    let catalog = Catalog::new()
        .register(tracked(V1, runs))
        .register(tracked(V2, runs))
        .register(tracked(V3, runs));
    Migrator::new(Dialect::Sqlite3, catalog)
}

fn applied_rows(migrator: &Migrator, conn: &mut rusqlite::Connection) -> Vec<i64> {
    let mut rows: Vec<i64> = migrator
        .ledger()
        .history(conn)
        .unwrap()
        .into_iter()
        .filter(|r| r.is_applied && r.version_id != 0)
        .map(|r| r.version_id)
        .collect();
    rows.reverse();
    rows
}

#[test]
fn up_reaches_max_version_and_is_idempotent() {
    let runs = Arc::new(std::sync::Mutex::new(Vec::new()));
    let migrator = tracked_migrator(&runs);
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();

    migrator.up(&mut conn).unwrap();
    assert_eq!(migrator.version(&mut conn).unwrap(), V3);

    assert!(migrator.up(&mut conn).unwrap().is_empty());
    assert_eq!(*runs.lock().unwrap(), vec![V1, V2, V3]);
}

#[test]
fn up_from_runs_the_tail_in_order() {
    let runs = Arc::new(std::sync::Mutex::new(Vec::new()));
    let migrator = tracked_migrator(&runs);
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();

    migrator.up_by_one(&mut conn).unwrap();
    assert_eq!(migrator.version(&mut conn).unwrap(), V1);
    runs.lock().unwrap().clear();

    let outcome = command::run("up-from", &["20230102".to_string()], &migrator, &mut conn).unwrap();
    assert_eq!(outcome, Outcome::Applied(vec![V2, V3]));
    assert_eq!(*runs.lock().unwrap(), vec![V2, V3]);
}

#[test]
fn up_from_skips_versions_applied_out_of_band() {
    let runs = Arc::new(std::sync::Mutex::new(Vec::new()));
    let migrator = tracked_migrator(&runs);
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();

    migrator.ledger().ensure(&mut conn).unwrap();
    migrator.ledger().record_applied(&mut conn, V2).unwrap();

    let outcome = command::run("up-from", &["20230101".to_string()], &migrator, &mut conn).unwrap();
    assert_eq!(outcome, Outcome::Applied(vec![V1, V3]));
    assert_eq!(*runs.lock().unwrap(), vec![V1, V3]);
}

#[test]
fn failure_halts_run_and_keeps_completed_rows() {
    let runs = Arc::new(std::sync::Mutex::new(Vec::new()));
    let catalog = Catalog::new()
        .register(tracked(V1, &runs))
        .register(Migration::routine(V2, "broken", |_| {
            Err(Error::Database("table already exists".into()))
        }))
        .register(tracked(V3, &runs));
    let migrator = Migrator::new(Dialect::Sqlite3, catalog);
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();

    let err = migrator.up(&mut conn).unwrap_err();
    assert!(matches!(err, Error::Execution { version: V2, .. }));
    assert_eq!(applied_rows(&migrator, &mut conn), vec![V1]);
    assert_eq!(*runs.lock().unwrap(), vec![V1]);
    assert_eq!(migrator.version(&mut conn).unwrap(), V1);
}

#[test]
fn sql_files_are_applied_against_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("20230101000000_users.sql"),
        "-- +goose Up\nCREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);\n-- +goose Down\nDROP TABLE users;\n",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("20230102000000_email.sql"),
        "-- +goose Up\nALTER TABLE users ADD COLUMN email TEXT;\n",
    )
    .unwrap();

    let migrator = Migrator::new(Dialect::Sqlite3, Catalog::dir(dir.path()));
    let mut conn = rusqlite::Connection::open_in_memory().unwrap();

    assert_eq!(migrator.up(&mut conn).unwrap(), vec![V1, V2]);
    conn.execute(
        "INSERT INTO users (id, name, email) VALUES (1, 'a', 'a@example.com')",
        [],
    )
    .unwrap();
}

/// Counts every call made through the connection seam.
#[derive(Default)]
struct CountingConnection {
    calls: AtomicUsize,
}

impl Connection for CountingConnection {
    fn execute(&mut self, _sql: &str, _params: &[Param]) -> Result<u64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(0)
    }

    fn query_versions(&mut self, _sql: &str, _params: &[Param]) -> Result<Vec<LedgerRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn batch_execute(&mut self, _sql: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn long_up_from_version_fails_before_any_database_call() {
    let runs = Arc::new(std::sync::Mutex::new(Vec::new()));
    let migrator = tracked_migrator(&runs);
    let mut conn = CountingConnection::default();

    let err = command::run(
        "up-from",
        &["202301020000000".to_string()],
        &migrator,
        &mut conn,
    )
    .unwrap_err();

    assert!(matches!(err, Error::InvalidVersion(_)));
    assert_eq!(conn.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn dialects_can_coexist_in_one_process() {
    let pg = Migrator::new(Dialect::Postgres, Catalog::new());
    let sqlite = Migrator::new(Dialect::Sqlite3, Catalog::new());
    assert_eq!(pg.ledger().dialect(), Dialect::Postgres);
    assert_eq!(sqlite.ledger().dialect(), Dialect::Sqlite3);
}
