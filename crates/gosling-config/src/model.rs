use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for a migration run. Every field has a default so a config file
/// only needs to name what differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Dialect name: `postgres`, `mysql` or `sqlite3`.
    pub dialect: String,
    /// Connection string handed to the database driver.
    pub database: String,
    /// Directory holding `.sql` migration files.
    pub dir: PathBuf,
    pub min_version: i64,
    pub max_version: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            dialect: "sqlite3".to_string(),
            database: String::new(),
            dir: PathBuf::from("migrations"),
            min_version: 0,
            max_version: i64::MAX,
        }
    }
}
