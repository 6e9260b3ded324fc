#[cfg(test)]
#[path = "./store_tests.rs"]
mod tests;

use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Byte-level access to configuration files.
pub trait ConfigStore: Send + Sync {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Replaces the whole file. A reader never observes a partial write.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Immediate subdirectories of `path`, sorted.
    fn list_dirs(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// The local file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct FsStore;

impl FsStore {
    fn temp_path(path: &Path) -> io::Result<PathBuf> {
        let Some(name) = path.file_name() else {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} has no file name", path.display()),
            ));
        };
        let mut temp = name.to_os_string();
        temp.push(".tmp");
        Ok(path.with_file_name(temp))
    }
}

impl ConfigStore for FsStore {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let temp = Self::temp_path(path)?;
        std::fs::write(&temp, contents)?;
        std::fs::rename(&temp, path).inspect_err(|_| {
            let _ = std::fs::remove_file(&temp);
        })?;
        debug!(path = %path.display(), bytes = contents.len(), "config written");
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dirs(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                dirs.push(entry.path());
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

/// Files kept in memory, for tests and previews.
///
/// Directories exist implicitly as the parents of stored files.
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: Mutex<BTreeMap<PathBuf, Vec<u8>>>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a file directly, bypassing the read-only flag.
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.lock().insert(path.into(), contents.into());
    }

    /// The file as text, if it exists and is UTF-8.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let files = self.files.lock();
        let bytes = files.get(path.as_ref())?;
        String::from_utf8(bytes.clone()).ok()
    }

    /// While set, every [`ConfigStore::write`] fails with
    /// [`io::ErrorKind::PermissionDenied`].
    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::Relaxed);
    }
}

impl ConfigStore for MemoryStore {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        match self.files.lock().get(path) {
            Some(bytes) => Ok(bytes.clone()),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )),
        }
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        if self.read_only.load(Ordering::Relaxed) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "store is read-only",
            ));
        }
        self.files.lock().insert(path.to_owned(), contents.to_vec());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        let files = self.files.lock();
        files.contains_key(path)
            || files
                .keys()
                .any(|file| file != path && file.starts_with(path))
    }

    fn list_dirs(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let files = self.files.lock();
        let mut dirs: Vec<PathBuf> = Vec::new();
        for file in files.keys() {
            let Ok(rest) = file.strip_prefix(path) else {
                continue;
            };
            let mut components = rest.components();
            let (Some(first), Some(_)) = (components.next(), components.next()) else {
                continue;
            };
            let dir = path.join(first);
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        if dirs.is_empty() && !files.keys().any(|file| file.starts_with(path)) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            ));
        }
        dirs.sort();
        Ok(dirs)
    }
}
