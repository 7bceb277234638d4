use std::collections::BTreeMap;

use gosling_common::{Error, Result};

use crate::migrations::Migration;

/// Migrations sorted ascending by version, with no two sharing a version.
#[derive(Debug, Clone, Default)]
pub struct MigrationSequence {
    migrations: Vec<Migration>,
}

impl MigrationSequence {
    pub fn new(migrations: Vec<Migration>) -> Result<Self> {
        let mut by_version = BTreeMap::new();
        for migration in migrations {
            let version = migration.version;
            if by_version.insert(version, migration).is_some() {
                return Err(Error::DuplicateVersion(version));
            }
        }
        Ok(Self {
            migrations: by_version.into_values().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Migration> {
        self.migrations.iter()
    }

    pub fn versions(&self) -> Vec<i64> {
        self.migrations.iter().map(|m| m.version).collect()
    }

    /// First migration strictly newer than `current`.
    pub fn next(&self, current: i64) -> Result<&Migration> {
        self.migrations
            .iter()
            .find(|m| m.version > current)
            .ok_or(Error::NoNextVersion)
    }

    /// Last migration strictly older than `current`.
    pub fn previous(&self, current: i64) -> Result<&Migration> {
        self.migrations
            .iter()
            .rev()
            .find(|m| m.version < current)
            .ok_or(Error::NoNextVersion)
    }

    /// The migration with exactly `version`.
    pub fn get(&self, version: i64) -> Result<&Migration> {
        self.migrations
            .binary_search_by_key(&version, |m| m.version)
            .map(|idx| &self.migrations[idx])
            .map_err(|_| Error::MissingMigration(version))
    }

    /// Every migration at or above `start`. A plain filter: the ledger is
    /// not consulted.
    pub fn from_version(&self, start: i64) -> &[Migration] {
        let idx = self.migrations.partition_point(|m| m.version < start);
        &self.migrations[idx..]
    }
}

impl<'a> IntoIterator for &'a MigrationSequence {
    type Item = &'a Migration;
    type IntoIter = std::slice::Iter<'a, Migration>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
