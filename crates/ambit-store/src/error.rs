use thiserror::Error;

#[derive(Debug, Error)]
/// Errors produced by document stores.
pub enum StoreError {
    #[error("document not found: {0}")]
    /// No document is stored under the path.
    NotFound(String),

    #[error("path escapes the store root: {0}")]
    /// The path is absolute or walks above the store's root.
    PathOutsideRoot(String),

    #[error("I/O error: {0}")]
    /// Filesystem I/O failed.
    Io(#[from] std::io::Error),
}
