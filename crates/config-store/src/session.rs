#[cfg(test)]
#[path = "./session_tests.rs"]
mod tests;

use crate::store::ConfigStore;
use crate::{StoreError, StoreResult};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use toml_patchwork::{ConfigSection, Document, Key, SectionPatch, Value};
use tracing::{debug, info, warn};

struct State {
    /// Text as last read from or written to the store.
    raw: String,
    doc: Document,
    /// Bumped on every structured edit.
    revision: u64,
    /// Revision that matches what is in the store.
    saved: u64,
}

impl State {
    fn dirty(&self) -> bool {
        self.revision != self.saved
    }
}

/// One configuration file loaded from a [`ConfigStore`].
///
/// Structured edits ([`set`](Self::set), [`update_section`](Self::update_section))
/// change the in-memory document and mark the session dirty until
/// [`save`](Self::save) rewrites the file. Text patches
/// ([`patch_section`](Self::patch_section)) edit the file directly and keep its
/// comments.
///
/// Saves on one session are serialized; concurrent sessions on the same file
/// overwrite each other.
pub struct ConfigSession {
    path: PathBuf,
    store: Arc<dyn ConfigStore>,
    state: Mutex<State>,
    save_lock: Mutex<()>,
}

impl std::fmt::Debug for ConfigSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigSession")
            .field("path", &self.path)
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

/// Reads and parses the file at `path`.
pub(crate) fn load(store: &dyn ConfigStore, path: &Path) -> StoreResult<(String, Document)> {
    let bytes = store.read(path).map_err(|source| StoreError::Read {
        path: path.to_owned(),
        source,
    })?;
    let raw = String::from_utf8(bytes).map_err(|_| StoreError::Encoding {
        path: path.to_owned(),
    })?;
    let doc = toml_patchwork::parse(&raw).map_err(|source| StoreError::Parse {
        path: path.to_owned(),
        source,
    })?;
    Ok((raw, doc))
}

impl ConfigSession {
    pub fn open(store: Arc<dyn ConfigStore>, path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let (raw, doc) = load(store.as_ref(), &path)?;
        debug!(path = %path.display(), bytes = raw.len(), "config loaded");
        Ok(Self {
            path,
            store,
            state: Mutex::new(State {
                raw,
                doc,
                revision: 0,
                saved: 0,
            }),
            save_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether structured edits have not been saved yet.
    pub fn is_dirty(&self) -> bool {
        self.state.lock().dirty()
    }

    /// A copy of the current document, including unsaved edits.
    pub fn document(&self) -> Document {
        self.state.lock().doc.clone()
    }

    /// The file text as last read or written.
    pub fn raw(&self) -> String {
        self.state.lock().raw.clone()
    }

    /// The document's sections, with comments taken from the file text.
    pub fn sections(&self) -> Vec<ConfigSection> {
        let state = self.state.lock();
        toml_patchwork::sections(&state.doc, &state.raw)
    }

    pub fn get(&self, path: &str) -> StoreResult<Option<Value>> {
        let state = self.state.lock();
        let value = state.doc.get(path).map_err(|source| self.edit_error(source))?;
        Ok(value.cloned())
    }

    /// Sets the value at a dotted path, see [`Document::set`].
    pub fn set(&self, path: &str, value: Value) -> StoreResult<Option<Value>> {
        let mut state = self.state.lock();
        let previous = state
            .doc
            .set(path, value)
            .map_err(|source| self.edit_error(source))?;
        state.revision += 1;
        Ok(previous)
    }

    pub fn remove(&self, path: &str) -> StoreResult<Option<Value>> {
        let mut state = self.state.lock();
        let removed = state
            .doc
            .remove(path)
            .map_err(|source| self.edit_error(source))?;
        if removed.is_some() {
            state.revision += 1;
        }
        Ok(removed)
    }

    /// Sets several fields of one table, see [`Document::update_section`].
    pub fn update_section<K, I>(&self, section: &str, fields: I) -> StoreResult<()>
    where
        K: Into<Key>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let mut state = self.state.lock();
        state
            .doc
            .update_section(section, fields)
            .map_err(|source| self.edit_error(source))?;
        state.revision += 1;
        Ok(())
    }

    /// Serializes the document and writes it to the store.
    ///
    /// Edits made while the write is in progress keep the session dirty. A
    /// failed write leaves the session dirty and the file unchanged.
    pub fn save(&self) -> StoreResult<()> {
        let _guard = self.save_lock.lock();
        let (text, revision) = {
            let state = self.state.lock();
            let text = state.doc.to_toml().map_err(|source| self.edit_error(source))?;
            (text, state.revision)
        };

        if let Err(source) = self.store.write(&self.path, text.as_bytes()) {
            warn!(path = %self.path.display(), error = %source, "failed to save config");
            return Err(StoreError::Write {
                path: self.path.clone(),
                source,
            });
        }

        let mut state = self.state.lock();
        state.raw = text;
        state.saved = revision;
        info!(path = %self.path.display(), revision, "config saved");
        Ok(())
    }

    /// Rewrites `key = value` lines of one section in the file text and
    /// writes the result, see [`SectionPatch`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unsaved`] while structured edits are pending,
    /// since writing the patched text would drop them.
    pub fn patch_section(&self, section: Option<&str>, updates: &[(&str, Value)]) -> StoreResult<()> {
        let mut patch = match section {
            Some(name) => SectionPatch::new(name),
            None => SectionPatch::root(),
        };
        for (key, value) in updates {
            patch = patch.set(*key, value.clone());
        }
        self.apply_patch(&patch)
    }

    pub fn apply_patch(&self, patch: &SectionPatch) -> StoreResult<()> {
        let _guard = self.save_lock.lock();
        // Held across the write so no structured edit can slip in between.
        let mut state = self.state.lock();
        if state.dirty() {
            return Err(StoreError::Unsaved {
                path: self.path.clone(),
            });
        }
        let text = patch
            .apply(&state.raw)
            .map_err(|source| self.edit_error(source))?;
        let doc = toml_patchwork::parse(&text).map_err(|source| self.edit_error(source))?;

        self.store
            .write(&self.path, text.as_bytes())
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        state.raw = text;
        state.doc = doc;
        debug!(path = %self.path.display(), "section patched");
        Ok(())
    }

    /// Reads the file again, discarding unsaved edits. On failure the
    /// current document is kept.
    pub fn reload(&self) -> StoreResult<()> {
        let _guard = self.save_lock.lock();
        let (raw, doc) = load(self.store.as_ref(), &self.path)?;
        let mut state = self.state.lock();
        state.raw = raw;
        state.doc = doc;
        state.saved = state.revision;
        debug!(path = %self.path.display(), "config reloaded");
        Ok(())
    }

    fn edit_error(&self, source: toml_patchwork::Error) -> StoreError {
        StoreError::Edit {
            path: self.path.clone(),
            source,
        }
    }
}
