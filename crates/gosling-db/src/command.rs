use std::path::PathBuf;

use chrono::Local;
use gosling_common::{Error, Result};

use crate::conn::Connection;
use crate::migrator::{MigrationStatus, Migrator};
use crate::scaffold::{self, TemplateKind};
use crate::version::pad_version_prefix;

/// A parsed migration command. Parsing validates every argument, so a
/// malformed command never reaches the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Up,
    UpByOne,
    UpFrom(i64),
    Down,
    DownTo(i64),
    Redo,
    Status,
    Version,
    Create { name: String, kind: TemplateKind },
}

/// What a command did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Applied(Vec<i64>),
    Reverted(Vec<i64>),
    Status(Vec<MigrationStatus>),
    Version(i64),
    Created(PathBuf),
}

impl Command {
    pub fn parse(command: &str, args: &[String]) -> Result<Self> {
        let arg = |i: usize| args.get(i).map(String::as_str);

        match command {
            "up" => Ok(Command::Up),
            "up-by-one" => Ok(Command::UpByOne),
            "up-from" => {
                let version = arg(0).ok_or_else(|| usage("up-from VERSION"))?;
                Ok(Command::UpFrom(pad_version_prefix(version)?))
            }
            "down" => Ok(Command::Down),
            "down-to" => {
                let version = arg(0).ok_or_else(|| usage("down-to VERSION"))?;
                let version = version
                    .parse::<i64>()
                    .map_err(|e| Error::InvalidVersion(format!("{version:?}: {e}")))?;
                Ok(Command::DownTo(version))
            }
            "redo" => Ok(Command::Redo),
            "status" => Ok(Command::Status),
            "version" => Ok(Command::Version),
            "create" => {
                let name = arg(0).ok_or_else(|| usage("create NAME [sql|rs]"))?;
                let kind = arg(1).unwrap_or("sql").parse()?;
                Ok(Command::Create {
                    name: name.to_string(),
                    kind,
                })
            }
            other => Err(Error::Config(format!("{other:?}: no such command"))),
        }
    }

    pub fn run(&self, migrator: &Migrator, conn: &mut dyn Connection) -> Result<Outcome> {
        match self {
            Command::Up => migrator.up(conn).map(Outcome::Applied),
            Command::UpByOne => migrator
                .up_by_one(conn)
                .map(|v| Outcome::Applied(v.into_iter().collect())),
            Command::UpFrom(start) => migrator.up_from(conn, *start).map(Outcome::Applied),
            Command::Down => migrator
                .down(conn)
                .map(|v| Outcome::Reverted(v.into_iter().collect())),
            Command::DownTo(target) => migrator.down_to(conn, *target).map(Outcome::Reverted),
            Command::Redo => migrator
                .redo(conn)
                .map(|v| Outcome::Applied(v.into_iter().collect())),
            Command::Status => migrator.status(conn).map(Outcome::Status),
            Command::Version => migrator.version(conn).map(Outcome::Version),
            Command::Create { name, kind } => create(migrator, name, *kind),
        }
    }
}

/// Write a migration template into the catalog directory.
pub fn create(migrator: &Migrator, name: &str, kind: TemplateKind) -> Result<Outcome> {
    let dir = migrator
        .catalog()
        .migration_dir()
        .ok_or_else(|| Error::Config("no migration directory configured".into()))?;
    scaffold::create(dir, name, kind, Local::now().naive_local()).map(Outcome::Created)
}

/// Parse and run `command` in one step.
pub fn run(
    command: &str,
    args: &[String],
    migrator: &Migrator,
    conn: &mut dyn Connection,
) -> Result<Outcome> {
    Command::parse(command, args)?.run(migrator, conn)
}

fn usage(form: &str) -> Error {
    Error::Config(format!("usage: gosling [OPTIONS] {form}"))
}
