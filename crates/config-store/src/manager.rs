#[cfg(test)]
#[path = "./manager_tests.rs"]
mod tests;

use crate::session::{ConfigSession, load};
use crate::store::ConfigStore;
use crate::{StoreConfig, StoreError, StoreResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toml_patchwork::{ConfigSection, Document, ErrorCategory, SectionPatch, Value, dotted_path};
use tracing::{debug, info, warn};

/// A configuration file split into sections for display.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConfigFile {
    /// Name shown to the user, such as `bot_config.toml` or
    /// `my_plugin/config.toml`.
    pub filename: String,
    pub path: PathBuf,
    pub sections: Vec<ConfigSection>,
    pub raw_content: String,
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PluginConfig {
    /// Name of the plugin's directory.
    pub name: String,
    pub path: PathBuf,
    pub config: ConfigFile,
}

/// Finds and loads the bot's configuration files.
pub struct ConfigManager {
    store: Arc<dyn ConfigStore>,
    settings: StoreConfig,
}

impl ConfigManager {
    pub fn new(store: Arc<dyn ConfigStore>, settings: StoreConfig) -> Self {
        Self { store, settings }
    }

    pub fn settings(&self) -> &StoreConfig {
        &self.settings
    }

    pub fn bot_config(&self) -> StoreResult<ConfigFile> {
        self.config_file(&self.settings.bot_config, "bot_config.toml")
    }

    pub fn model_config(&self) -> StoreResult<ConfigFile> {
        self.config_file(&self.settings.model_config, "model_config.toml")
    }

    /// Loads `config.toml` from every plugin directory.
    ///
    /// Plugins without a config file are ignored, and plugins whose config
    /// cannot be loaded are skipped with a warning. A missing plugins
    /// directory yields an empty list.
    pub fn plugin_configs(&self) -> StoreResult<Vec<PluginConfig>> {
        let dir = &self.settings.plugins_dir;
        if !self.store.exists(dir) {
            debug!(path = %dir.display(), "plugins directory not found");
            return Ok(Vec::new());
        }
        let dirs = self.store.list_dirs(dir).map_err(|source| StoreError::Read {
            path: dir.clone(),
            source,
        })?;

        let mut plugins = Vec::new();
        for plugin_dir in dirs {
            let Some(name) = plugin_dir.file_name() else {
                continue;
            };
            let name = name.to_string_lossy().into_owned();
            let path = plugin_dir.join("config.toml");
            if !self.store.exists(&path) {
                continue;
            }
            match self.config_file(&path, &format!("{name}/config.toml")) {
                Ok(config) => plugins.push(PluginConfig { name, path, config }),
                Err(error) => {
                    warn!(plugin = %name, %error, "skipping plugin config");
                }
            }
        }
        info!(count = plugins.len(), "loaded plugin configs");
        Ok(plugins)
    }

    /// Opens a session for editing the file at `path`.
    pub fn open(&self, path: impl Into<PathBuf>) -> StoreResult<ConfigSession> {
        ConfigSession::open(self.store.clone(), path)
    }

    /// Writes the field values of `file` back into its text.
    ///
    /// Only fields whose value differs from `file.raw_content` are patched,
    /// so comments and layout survive. Fields the textual patch refuses,
    /// such as multi-line values or tables declared through sub-table
    /// headers, are set on the parsed document instead and the whole file is
    /// re-rendered, which drops its comments.
    ///
    /// Returns the new text, which is also written to `file.path` when
    /// anything changed.
    pub fn save_config(&self, file: &ConfigFile) -> StoreResult<String> {
        let edit_error = |source: toml_patchwork::Error| StoreError::Edit {
            path: file.path.clone(),
            source,
        };
        let current = toml_patchwork::parse(&file.raw_content).map_err(|source| {
            StoreError::Parse {
                path: file.path.clone(),
                source,
            }
        })?;

        let mut text = file.raw_content.clone();
        let mut refused = Vec::new();
        for change in changes(&current, file) {
            match change.patch().apply(&text) {
                Ok(patched) => text = patched,
                Err(error) if error.category() == ErrorCategory::Patch => {
                    debug!(
                        path = %file.path.display(),
                        %error,
                        "textual patch refused"
                    );
                    refused.extend(
                        change
                            .fields
                            .into_iter()
                            .map(|(_, path, value)| (path, value)),
                    );
                }
                Err(error) => return Err(edit_error(error)),
            }
        }

        if !refused.is_empty() {
            let mut doc = toml_patchwork::parse(&text).map_err(edit_error)?;
            for (path, value) in refused.iter().cloned() {
                doc.set(&path, value).map_err(edit_error)?;
            }
            text = doc.to_toml().map_err(edit_error)?;
            warn!(
                path = %file.path.display(),
                fields = refused.len(),
                "config re-rendered, comments were dropped"
            );
        }

        if text != file.raw_content {
            self.store
                .write(&file.path, text.as_bytes())
                .map_err(|source| StoreError::Write {
                    path: file.path.clone(),
                    source,
                })?;
            info!(path = %file.path.display(), "config saved");
        }
        Ok(text)
    }

    fn config_file(&self, path: &Path, filename: &str) -> StoreResult<ConfigFile> {
        let (raw_content, doc) = load(self.store.as_ref(), path)?;
        Ok(ConfigFile {
            filename: filename.to_owned(),
            path: path.to_owned(),
            sections: toml_patchwork::sections(&doc, &raw_content),
            raw_content,
        })
    }
}

/// The changed fields of one section, or of one array of tables element.
struct Change<'a> {
    section: &'a str,
    element: Option<usize>,
    /// Key, document path and new value of each field.
    fields: Vec<(&'a str, String, Value)>,
}

impl Change<'_> {
    fn patch(&self) -> SectionPatch {
        let name = dotted_path([self.section]);
        let mut patch = match self.element {
            _ if self.section.is_empty() => SectionPatch::root(),
            Some(index) => SectionPatch::element(name, index),
            None => SectionPatch::new(name),
        };
        for (key, _, value) in &self.fields {
            patch = patch.set(*key, value.clone());
        }
        patch
    }
}

/// Collects the fields of `file` whose value differs from `current`.
fn changes<'a>(current: &Document, file: &'a ConfigFile) -> Vec<Change<'a>> {
    let mut changes: Vec<Change<'a>> = Vec::new();
    for section in &file.sections {
        let is_array = matches!(
            current.root().get(&section.name),
            Some(Value::Array(array)) if array.is_array_of_tables()
        );
        let first = changes.len();
        for field in &section.fields {
            let (element, key) = match is_array {
                true => split_field(&field.name),
                false => (None, field.name.as_str()),
            };
            let mut keys = Vec::new();
            if !section.name.is_empty() {
                keys.push(section.name.clone());
            }
            if let Some(index) = element {
                keys.push(index.to_string());
            }
            keys.push(key.to_owned());
            let path = dotted_path(&keys);
            if current.get(&path).ok().flatten() == Some(&field.value) {
                continue;
            }

            let slot = match changes[first..].iter().position(|c| c.element == element) {
                Some(at) => first + at,
                None => {
                    changes.push(Change {
                        section: &section.name,
                        element,
                        fields: Vec::new(),
                    });
                    changes.len() - 1
                }
            };
            changes[slot].fields.push((key, path, field.value.clone()));
        }
    }
    changes
}

/// Splits a field name of the section view into its array of tables index,
/// if any, and its key: `[1].name` is element 1, key `name`.
fn split_field(name: &str) -> (Option<usize>, &str) {
    if let Some(rest) = name.strip_prefix('[')
        && let Some((index, key)) = rest.split_once("].")
        && let Ok(index) = index.parse()
    {
        return (Some(index), key);
    }
    (None, name)
}
