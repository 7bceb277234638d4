//! Execution strategies over a [`Catalog`] and the version [`Ledger`].
//!
//! Every strategy runs migrations one at a time, in ascending version
//! order, and stops at the first failure. Nothing is retried and earlier
//! migrations of the same run are not undone, so the ledger always lists
//! exactly the migrations that completed.
//!
//! There is no locking against a second process migrating the same
//! database at the same time. Callers that need that must serialize runs
//! themselves.

use gosling_common::{Error, Result};
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::conn::Connection;
use crate::dialect::Dialect;
use crate::ledger::Ledger;
use crate::migrations::Migration;
use crate::sequence::MigrationSequence;
use crate::version::{MAX_VERSION, MIN_VERSION};

/// Applied state of one migration, as reported by [`Migrator::status`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub version: i64,
    pub name: String,
    pub applied: bool,
    /// Ledger timestamp of the row that applied it. `None` while pending.
    pub applied_at: Option<String>,
}

pub struct Migrator {
    ledger: Ledger,
    catalog: Catalog,
    min_version: i64,
    max_version: i64,
}

impl Migrator {
    pub fn new(dialect: Dialect, catalog: Catalog) -> Self {
        Self {
            ledger: Ledger::new(dialect),
            catalog,
            min_version: MIN_VERSION,
            max_version: MAX_VERSION,
        }
    }

    pub fn with_range(mut self, min_version: i64, max_version: i64) -> Self {
        self.min_version = min_version;
        self.max_version = max_version;
        self
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    fn migrations(&self) -> Result<MigrationSequence> {
        self.catalog.discover(self.min_version, self.max_version)
    }

    /// Apply every pending migration. The current version is re-read from
    /// the ledger before each step so changes made elsewhere are honoured.
    pub fn up(&self, conn: &mut dyn Connection) -> Result<Vec<i64>> {
        let migrations = self.migrations()?;
        self.ledger.ensure(conn)?;

        let mut applied = Vec::new();
        loop {
            let current = self.ledger.current_version(conn)?;
            let next = match migrations.next(current) {
                Ok(next) => next,
                Err(Error::NoNextVersion) => {
                    info!("no migrations to run, current version: {current}");
                    return Ok(applied);
                }
                Err(e) => return Err(e),
            };
            self.apply(conn, next)?;
            applied.push(next.version);
        }
    }

    /// Apply only the next pending migration. `None` means there was
    /// nothing to do.
    pub fn up_by_one(&self, conn: &mut dyn Connection) -> Result<Option<i64>> {
        let migrations = self.migrations()?;
        self.ledger.ensure(conn)?;

        let current = self.ledger.current_version(conn)?;
        match migrations.next(current) {
            Ok(next) => {
                self.apply(conn, next)?;
                Ok(Some(next.version))
            }
            Err(Error::NoNextVersion) => {
                info!("no migrations to run, current version: {current}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Apply every migration at or above `start` that the ledger does not
    /// already mark as applied. Already applied migrations are skipped.
    pub fn up_from(&self, conn: &mut dyn Connection, start: i64) -> Result<Vec<i64>> {
        let migrations = self.migrations()?;
        let pending = migrations.from_version(start);
        if pending.is_empty() {
            info!("no migrations to run at or above {start}");
            return Ok(Vec::new());
        }
        self.ledger.ensure(conn)?;

        let mut applied = Vec::new();
        for migration in pending {
            if self.ledger.is_applied(conn, migration.version)? {
                debug!("skipping {}, already applied", migration.version);
                continue;
            }
            self.apply(conn, migration)?;
            applied.push(migration.version);
        }
        Ok(applied)
    }

    /// Revert the migration matching the current version.
    pub fn down(&self, conn: &mut dyn Connection) -> Result<Option<i64>> {
        let migrations = self.migrations()?;
        self.ledger.ensure(conn)?;

        let current = self.ledger.current_version(conn)?;
        if current == MIN_VERSION {
            info!("no migrations to revert, current version: {current}");
            return Ok(None);
        }

        let migration = migrations.get(current)?;
        self.revert(conn, migration)?;
        Ok(Some(current))
    }

    /// Revert migrations, newest first, until the current version is at or
    /// below `target`.
    pub fn down_to(&self, conn: &mut dyn Connection, target: i64) -> Result<Vec<i64>> {
        let migrations = self.migrations()?;
        self.ledger.ensure(conn)?;

        let mut reverted = Vec::new();
        loop {
            let current = self.ledger.current_version(conn)?;
            if current <= target || current == MIN_VERSION {
                info!("no migrations to revert, current version: {current}");
                return Ok(reverted);
            }
            let migration = migrations.get(current)?;
            self.revert(conn, migration)?;
            reverted.push(current);
        }
    }

    /// Revert and re-apply the current migration.
    pub fn redo(&self, conn: &mut dyn Connection) -> Result<Option<i64>> {
        let migrations = self.migrations()?;
        self.ledger.ensure(conn)?;

        let current = self.ledger.current_version(conn)?;
        if current == MIN_VERSION {
            info!("no migrations to redo, current version: {current}");
            return Ok(None);
        }

        let migration = migrations.get(current)?;
        self.revert(conn, migration)?;
        self.apply(conn, migration)?;
        Ok(Some(current))
    }

    pub fn status(&self, conn: &mut dyn Connection) -> Result<Vec<MigrationStatus>> {
        let migrations = self.migrations()?;
        self.ledger.ensure(conn)?;

        let mut statuses = Vec::with_capacity(migrations.len());
        for m in &migrations {
            let (applied, applied_at) = match self.ledger.latest_row(conn, m.version)? {
                Some(row) if row.is_applied => (true, row.tstamp),
                _ => (false, None),
            };
            statuses.push(MigrationStatus {
                version: m.version,
                name: m.name.clone(),
                applied,
                applied_at,
            });
        }
        Ok(statuses)
    }

    pub fn version(&self, conn: &mut dyn Connection) -> Result<i64> {
        self.ledger.ensure(conn)?;
        self.ledger.current_version(conn)
    }

    fn apply(&self, conn: &mut dyn Connection, migration: &Migration) -> Result<()> {
        debug!("applying migration {}", migration.version);
        migration.up(conn)?;
        self.ledger.record_applied(conn, migration.version)?;
        info!("applied migration {} ({})", migration.version, migration.name);
        Ok(())
    }

    fn revert(&self, conn: &mut dyn Connection, migration: &Migration) -> Result<()> {
        debug!("reverting migration {}", migration.version);
        migration.down(conn)?;
        self.ledger.record_reverted(conn, migration.version)?;
        info!("reverted migration {} ({})", migration.version, migration.name);
        Ok(())
    }
}
