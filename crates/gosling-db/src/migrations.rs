use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gosling_common::{Error, Result};
use tracing::debug;

use crate::conn::Connection;

/// A migration body written in Rust.
pub type MigrationFn = Arc<dyn Fn(&mut dyn Connection) -> Result<()> + Send + Sync>;

/// One direction of a migration: raw SQL or a registered routine.
#[derive(Clone)]
pub enum Action {
    Sql(String),
    Routine(MigrationFn),
}

impl Action {
    fn run(&self, conn: &mut dyn Connection) -> Result<()> {
        match self {
            Action::Sql(sql) if sql.trim().is_empty() => Ok(()),
            Action::Sql(sql) => conn.batch_execute(sql),
            Action::Routine(f) => (f.as_ref())(conn),
        }
    }
}

/// A versioned schema change. Versions are unique within a catalog and
/// migrations are applied in ascending version order.
#[derive(Clone)]
pub struct Migration {
    pub version: i64,
    pub name: String,
    source: Option<PathBuf>,
    up: Action,
    down: Option<Action>,
}

impl Migration {
    pub fn sql(
        version: i64,
        name: impl Into<String>,
        up: impl Into<String>,
        down: Option<String>,
    ) -> Self {
        Self {
            version,
            name: name.into(),
            source: None,
            up: Action::Sql(up.into()),
            down: down.map(Action::Sql),
        }
    }

    pub fn routine<F>(version: i64, name: impl Into<String>, up: F) -> Self
    where
        F: Fn(&mut dyn Connection) -> Result<()> + Send + Sync + 'static,
    {
        Self {
            version,
            name: name.into(),
            source: None,
            up: Action::Routine(Arc::new(up)),
            down: None,
        }
    }

    pub fn with_down<F>(mut self, down: F) -> Self
    where
        F: Fn(&mut dyn Connection) -> Result<()> + Send + Sync + 'static,
    {
        self.down = Some(Action::Routine(Arc::new(down)));
        self
    }

    pub fn with_source(mut self, path: impl Into<PathBuf>) -> Self {
        self.source = Some(path.into());
        self
    }

    /// File this migration was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn up(&self, conn: &mut dyn Connection) -> Result<()> {
        self.up.run(conn).map_err(|e| self.execution_error(e))
    }

    /// Run the down action. A migration without one reverts as a no-op.
    pub fn down(&self, conn: &mut dyn Connection) -> Result<()> {
        match &self.down {
            Some(action) => action.run(conn).map_err(|e| self.execution_error(e)),
            None => {
                debug!("migration {} has no down action", self.version);
                Ok(())
            }
        }
    }

    fn execution_error(&self, e: Error) -> Error {
        match e {
            Error::Execution { .. } => e,
            other => Error::execution(self.version, other),
        }
    }
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version)
            .field("name", &self.name)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
