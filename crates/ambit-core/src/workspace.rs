//! Multi-document workspace.
//!
//! A [`Workspace`] owns one [`EditorState`] per open path and tracks
//! which one is active. Documents are fully isolated: pools, row
//! identities, versions, and subscriptions never cross documents.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use crate::state::EditorState;

/// Error raised by workspace lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    /// No document is open under the path.
    NotFound {
        /// The path that missed.
        path: String,
    },
}

impl std::fmt::Display for WorkspaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkspaceError::NotFound { path } => {
                write!(f, "No document open under {:?}", path)
            }
        }
    }
}

impl std::error::Error for WorkspaceError {}

/// All open documents, keyed by path.
#[derive(Default)]
pub struct Workspace {
    documents: BTreeMap<String, EditorState>,
    active: Option<String>,
}

impl Workspace {
    /// Empty workspace.
    pub fn new() -> Workspace {
        Workspace::default()
    }

    /// Opens `text` under `path` and makes it the active document.
    /// Reopening an existing path reloads its content in place, so
    /// subscriptions and the version counter survive.
    pub fn open(&mut self, path: &str, text: &str) -> &mut EditorState {
        self.active = Some(path.to_string());
        match self.documents.entry(path.to_string()) {
            Entry::Occupied(entry) => {
                let state = entry.into_mut();
                state.reload(text);
                state
            }
            Entry::Vacant(entry) => entry.insert(EditorState::new(path, text)),
        }
    }

    /// Document under `path`.
    pub fn get(&self, path: &str) -> Option<&EditorState> {
        self.documents.get(path)
    }

    /// Mutable document under `path`.
    pub fn get_mut(&mut self, path: &str) -> Option<&mut EditorState> {
        self.documents.get_mut(path)
    }

    /// True when a document is open under `path`.
    pub fn is_open(&self, path: &str) -> bool {
        self.documents.contains_key(path)
    }

    /// Closes the document under `path`. When it was active, the
    /// first remaining document becomes active.
    pub fn close(&mut self, path: &str) -> Result<(), WorkspaceError> {
        if self.documents.remove(path).is_none() {
            return Err(WorkspaceError::NotFound {
                path: path.to_string(),
            });
        }
        if self.active.as_deref() == Some(path) {
            self.active = self.documents.keys().next().cloned();
        }
        Ok(())
    }

    /// Makes an already open document the active one.
    pub fn set_active(&mut self, path: &str) -> Result<(), WorkspaceError> {
        if !self.documents.contains_key(path) {
            return Err(WorkspaceError::NotFound {
                path: path.to_string(),
            });
        }
        self.active = Some(path.to_string());
        Ok(())
    }

    /// Path of the active document.
    pub fn active_path(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The active document.
    pub fn active(&self) -> Option<&EditorState> {
        self.documents.get(self.active.as_deref()?)
    }

    /// The active document, mutable.
    pub fn active_mut(&mut self) -> Option<&mut EditorState> {
        let path = self.active.clone()?;
        self.documents.get_mut(&path)
    }

    /// Number of open documents.
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True when no document is open.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Open paths in sorted order.
    pub fn paths(&self) -> Vec<&str> {
        self.documents.keys().map(String::as_str).collect()
    }
}
