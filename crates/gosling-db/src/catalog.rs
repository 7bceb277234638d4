use std::path::{Path, PathBuf};

use gosling_common::{Error, Result};
use tracing::debug;

use crate::migrations::Migration;
use crate::sequence::MigrationSequence;
use crate::version::{parse_migration_stem, validate_version};

const ANNOTATION: &str = "-- +goose";

/// Where migrations come from: `.sql` files in a directory and/or Rust
/// routines registered in code. Collected fresh on every call, with no
/// database access.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    dir: Option<PathBuf>,
    registered: Vec<Migration>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dir(path: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(path.into()),
            registered: Vec::new(),
        }
    }

    pub fn register(mut self, migration: Migration) -> Self {
        self.registered.push(migration);
        self
    }

    pub fn migration_dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Collect every migration with a version in `[min, max]`, sorted.
    pub fn discover(&self, min: i64, max: i64) -> Result<MigrationSequence> {
        let in_range = |v: i64| v >= min && v <= max;

        let mut migrations = Vec::new();
        for migration in &self.registered {
            validate_version(migration.version)?;
            if in_range(migration.version) {
                migrations.push(migration.clone());
            }
        }

        if let Some(dir) = &self.dir {
            for path in sql_files(dir)? {
                let stem = path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .ok_or_else(|| {
                        Error::InvalidVersion(format!("{}: unreadable file name", path.display()))
                    })?;
                let (version, name) = parse_migration_stem(stem)?;
                if !in_range(version) {
                    continue;
                }
                migrations.push(load_sql_migration(&path, version, name)?);
            }
        }

        let sequence = MigrationSequence::new(migrations)?;
        debug!("discovered {} migrations", sequence.len());
        Ok(sequence)
    }
}

/// Shorthand for [`Catalog::discover`] over a directory.
pub fn discover(dir: &Path, min: i64, max: i64) -> Result<MigrationSequence> {
    Catalog::dir(dir).discover(min, max)
}

fn sql_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::Config(format!(
            "migration directory {} does not exist",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_sql_migration(path: &Path, version: i64, name: String) -> Result<Migration> {
    let contents = std::fs::read_to_string(path)?;
    let (up, down) = split_sections(&contents)
        .ok_or_else(|| {
            Error::InvalidMigration(format!(
                "{}: missing `{ANNOTATION} Up` annotation",
                path.display()
            ))
        })?;
    Ok(Migration::sql(version, name, up, down).with_source(path))
}

enum Section {
    Preamble,
    Up,
    Down,
}

/// Split a SQL file on its `-- +goose Up` / `-- +goose Down` markers.
/// Returns `None` when there is no Up marker.
fn split_sections(contents: &str) -> Option<(String, Option<String>)> {
    let mut section = Section::Preamble;
    let mut up: Option<String> = None;
    let mut down: Option<String> = None;

    for line in contents.lines() {
        if let Some(directive) = line.trim().strip_prefix(ANNOTATION) {
            match directive.trim() {
                "Up" => {
                    section = Section::Up;
                    up.get_or_insert_with(String::new);
                }
                "Down" => {
                    section = Section::Down;
                    down.get_or_insert_with(String::new);
                }
                // StatementBegin / StatementEnd and friends carry no meaning here.
                _ => {}
            }
            continue;
        }

        let target = match section {
            Section::Preamble => continue,
            Section::Up => up.as_mut(),
            Section::Down => down.as_mut(),
        };
        if let Some(buf) = target {
            buf.push_str(line);
            buf.push('\n');
        }
    }

    up.map(|up| (up, down))
}
