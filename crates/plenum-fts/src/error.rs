//! Error types for plenum-fts.

/// Result type alias for plenum-fts operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the analysis and index layer.
///
/// Model declarations the mapping cannot express are not errors: the field
/// is logged and dropped, and the service continues.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Tantivy failure (writer, commit, search).
    #[error("index error: {0}")]
    Index(#[from] tantivy::TantivyError),

    /// Filesystem failure around the index directory.
    #[error("index I/O error: {0}")]
    Io(#[from] std::io::Error),
}
