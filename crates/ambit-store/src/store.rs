//! Document stores.
//!
//! A store keeps whole documents as plain text under string paths.
//! [`FileStore`] maps paths into a root directory and refuses to step
//! outside it; [`MemStore`] keeps everything in a map.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::StoreError;

/// Ack text a successful post returns.
const SAVE_ACK: &str = "Saved Doc";

/// Where documents live.
///
/// `fetch` returns the full serialized text, `post` replaces it and
/// answers with a short ack string for the status line.
pub trait DocStore {
    /// Full text of the document under `path`.
    fn fetch(&self, path: &str) -> Result<String, StoreError>;

    /// Writes `text` under `path`. Returns the store's ack text.
    fn post(&mut self, path: &str, text: &str) -> Result<String, StoreError>;
}

/// Documents as plain-text files under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Store rooted at `root`. The directory is created on the first
    /// post, not here.
    pub fn new(root: impl Into<PathBuf>) -> FileStore {
        FileStore { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a document path into the root. Absolute paths and any
    /// `..` step are rejected, so a hostile path cannot reach
    /// outside the store.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path);
        let jailed = !relative.is_absolute()
            && relative
                .components()
                .all(|part| matches!(part, Component::Normal(_)))
            && relative.components().next().is_some();
        if !jailed {
            return Err(StoreError::PathOutsideRoot(path.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl DocStore for FileStore {
    fn fetch(&self, path: &str) -> Result<String, StoreError> {
        let full = self.resolve(path)?;
        match fs::read_to_string(&full) {
            Ok(text) => Ok(text),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(path.to_string()))
            }
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn post(&mut self, path: &str, text: &str) -> Result<String, StoreError> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&full, text)?;
        Ok(SAVE_ACK.to_string())
    }
}

/// In-memory store for tests and examples.
#[derive(Debug, Clone, Default)]
pub struct MemStore {
    documents: BTreeMap<String, String>,
}

impl MemStore {
    /// Empty store.
    pub fn new() -> MemStore {
        MemStore::default()
    }

    /// True when a document exists under `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.documents.contains_key(path)
    }
}

impl DocStore for MemStore {
    fn fetch(&self, path: &str) -> Result<String, StoreError> {
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_string()))
    }

    fn post(&mut self, path: &str, text: &str) -> Result<String, StoreError> {
        self.documents.insert(path.to_string(), text.to_string());
        Ok(SAVE_ACK.to_string())
    }
}
