use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::NaiveDateTime;
use gosling_common::{Error, Result};
use tracing::{info, warn};

/// Shown after writing a Rust template, which directory discovery skips.
pub const REGISTER_HINT: &str =
    "Rust migrations are not discovered from the migration directory; \
     add the file to your crate and pass it to Catalog::register";

/// Kind of file written by `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    Sql,
    Rust,
}

impl TemplateKind {
    fn extension(&self) -> &'static str {
        match self {
            TemplateKind::Sql => "sql",
            TemplateKind::Rust => "rs",
        }
    }

    fn render(&self, version: &str, name: &str) -> String {
        match self {
            TemplateKind::Sql => "-- +goose Up\n\
                 -- SQL in this section is executed when the migration is applied.\n\n\
                 -- +goose Down\n\
                 -- SQL in this section is executed when the migration is rolled back.\n"
                .to_string(),
            TemplateKind::Rust => format!(
                "use gosling_db::{{Connection, Migration}};\n\
                 use gosling_common::Result;\n\n\
                 /// Register with `Catalog::register(migration_{version}())`.\n\
                 pub fn migration_{version}() -> Migration {{\n\
                 \x20   Migration::routine({version}, \"{name}\", up).with_down(down)\n\
                 }}\n\n\
                 fn up(conn: &mut dyn Connection) -> Result<()> {{\n\
                 \x20   let _ = conn;\n\
                 \x20   Ok(())\n\
                 }}\n\n\
                 fn down(conn: &mut dyn Connection) -> Result<()> {{\n\
                 \x20   let _ = conn;\n\
                 \x20   Ok(())\n\
                 }}\n"
            ),
        }
    }
}

impl FromStr for TemplateKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sql" => Ok(TemplateKind::Sql),
            "rs" | "rust" => Ok(TemplateKind::Rust),
            other => Err(Error::Config(format!(
                "{other:?}: unknown migration kind, expected sql or rs"
            ))),
        }
    }
}

/// Write a new `YYYYMMDDHHMMSS_name.{sql,rs}` template into `dir`.
pub fn create(dir: &Path, name: &str, kind: TemplateKind, now: NaiveDateTime) -> Result<PathBuf> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(Error::Config(format!("{name:?}: migration name is empty")));
    }

    std::fs::create_dir_all(dir)?;
    let version = now.format("%Y%m%d%H%M%S").to_string();
    let path = dir.join(format!("{version}_{slug}.{}", kind.extension()));
    if path.exists() {
        return Err(Error::Config(format!("{} already exists", path.display())));
    }

    std::fs::write(&path, kind.render(&version, &slug))?;
    info!("created migration {}", path.display());
    if kind == TemplateKind::Rust {
        warn!("{REGISTER_HINT}");
    }
    Ok(path)
}

fn slugify(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
