//! Repository content providers.
//!
//! A [`ContentProvider`] lists directories and reads files of one repository.
//! The scanner only ever talks to this trait, so a hosted repository API can
//! stand in for the local filesystem.

mod local;

pub use local::LocalProvider;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Errors from listing or reading repository content.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is not valid UTF-8")]
    Decode { path: String },
    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
}

/// One item of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub kind: EntryKind,
    /// Repository-relative path with `/` separators.
    pub path: String,
    /// Provider-assigned content id (e.g. a blob sha), when the provider has one.
    pub content_identity: Option<String>,
    /// Size in bytes, when known without reading.
    pub size: Option<u64>,
}

impl Entry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::File,
            path: path.into(),
            content_identity: None,
            size: None,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            kind: EntryKind::Dir,
            path: path.into(),
            content_identity: None,
            size: None,
        }
    }

    pub fn with_identity(mut self, id: impl Into<String>) -> Self {
        self.content_identity = Some(id.into());
        self
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// List the immediate children of `path` (`""` is the repository root).
    async fn list_contents(&self, path: &str) -> Result<Vec<Entry>, ProviderError>;

    /// Read a file entry as UTF-8 text.
    async fn read_content(&self, entry: &Entry) -> Result<String, ProviderError>;
}
