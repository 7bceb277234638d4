use std::path::{Path, PathBuf};

use gosling_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

/// File names tried by [`ConfigLoader::discover`], in order.
const CANDIDATES: [&str; 3] = ["gosling.yml", "gosling.yaml", "gosling.toml"];

pub struct ConfigLoader;

impl ConfigLoader {
    /// Parse a config file, picking the format from its extension.
    pub fn load(path: &Path) -> Result<AppConfig> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let config = match ext {
            "yml" | "yaml" => serde_yaml::from_str(&contents)
                .map_err(|e| Error::Config(format!("YAML parse error: {e}")))?,
            "toml" => toml::from_str(&contents)
                .map_err(|e| Error::Config(format!("TOML parse error: {e}")))?,
            other => {
                return Err(Error::Config(format!(
                    "unsupported config extension: {other}"
                )));
            }
        };

        info!("loaded config from {}", path.display());
        Ok(config)
    }

    /// Look for a `gosling.{yml,yaml,toml}` file in `dir`. Falls back to the
    /// defaults when none exists.
    pub fn discover(dir: &Path) -> Result<AppConfig> {
        match Self::find(dir) {
            Some(path) => Self::load(&path),
            None => {
                debug!("no config file in {}, using defaults", dir.display());
                Ok(AppConfig::default())
            }
        }
    }

    fn find(dir: &Path) -> Option<PathBuf> {
        CANDIDATES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}
