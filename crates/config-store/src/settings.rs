#[cfg(test)]
#[path = "./settings_tests.rs"]
mod tests;

use crate::store::ConfigStore;
use crate::{StoreError, StoreResult};
use std::io;
use std::path::{Path, PathBuf};
use toml_patchwork::{Document, Value};
use tracing::{debug, info};

/// Where the bot keeps its configuration files.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreConfig {
    pub bot_config: PathBuf,
    pub model_config: PathBuf,
    /// Each subdirectory holding a `config.toml` is a plugin.
    pub plugins_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            bot_config: PathBuf::from("../Bot/config/bot_config.toml"),
            model_config: PathBuf::from("../Bot/config/model_config.toml"),
            plugins_dir: PathBuf::from("../Bot/config/plugins"),
        }
    }
}

impl StoreConfig {
    /// Reads the `[paths]` table of the settings file at `path`.
    ///
    /// A missing file, a missing table or a missing key falls back to the
    /// defaults. Relative paths in the file are resolved against the file's
    /// directory.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed, or when a key under
    /// `[paths]` is not a string.
    pub fn load(store: &dyn ConfigStore, path: &Path) -> StoreResult<Self> {
        let bytes = match store.read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file not found, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_owned(),
                    source,
                });
            }
        };
        let text = String::from_utf8(bytes).map_err(|_| StoreError::Encoding {
            path: path.to_owned(),
        })?;
        let doc = toml_patchwork::parse(&text).map_err(|source| StoreError::Parse {
            path: path.to_owned(),
            source,
        })?;

        let base = path.parent().unwrap_or(Path::new(""));
        let settings = Self::from_document(&doc, base).map_err(|key| StoreError::Settings {
            path: path.to_owned(),
            key,
        })?;
        info!(
            path = %path.display(),
            bot_config = %settings.bot_config.display(),
            plugins_dir = %settings.plugins_dir.display(),
            "loaded store settings"
        );
        Ok(settings)
    }

    /// Builds settings from the `[paths]` table of `doc`. On a non-string
    /// value, returns the offending key.
    fn from_document(doc: &Document, base: &Path) -> Result<Self, String> {
        let mut settings = Self::default();
        let Some(Value::Table(paths)) = doc.root().get("paths") else {
            return Ok(settings);
        };
        let fields = [
            ("bot_config", &mut settings.bot_config),
            ("model_config", &mut settings.model_config),
            ("plugins_dir", &mut settings.plugins_dir),
        ];
        for (key, slot) in fields {
            match paths.get(key) {
                None => {}
                Some(Value::String(value)) => *slot = base.join(value),
                Some(_) => return Err(format!("paths.{key}")),
            }
        }
        Ok(settings)
    }
}
