use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from loading, editing or saving a configuration file.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The file is not UTF-8 text.
    #[error("{} is not valid UTF-8", .path.display())]
    Encoding { path: PathBuf },

    /// The file is not valid TOML.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml_patchwork::Error,
    },

    /// An edit or serialization of the document failed.
    #[error("failed to update {}: {source}", .path.display())]
    Edit {
        path: PathBuf,
        #[source]
        source: toml_patchwork::Error,
    },

    /// A text patch was requested while structured edits are unsaved.
    #[error("{} has unsaved changes", .path.display())]
    Unsaved { path: PathBuf },

    /// The store settings file has a value of the wrong type.
    #[error("invalid setting `{key}` in {}: expected a string", .path.display())]
    Settings { path: PathBuf, key: String },
}

impl StoreError {
    /// The file the error is about.
    pub fn path(&self) -> &std::path::Path {
        match self {
            StoreError::Read { path, .. }
            | StoreError::Write { path, .. }
            | StoreError::Encoding { path }
            | StoreError::Parse { path, .. }
            | StoreError::Edit { path, .. }
            | StoreError::Unsaved { path }
            | StoreError::Settings { path, .. } => path,
        }
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
