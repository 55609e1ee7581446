//! Error types for plenum-core.

use std::path::PathBuf;

/// Result type alias for plenum-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the shared domain layer.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Invalid or missing configuration. Fatal at startup.
    #[error("configuration error: {0}")]
    Config(String),

    /// A fully qualified identifier that does not have the
    /// `<collection>/<positive id>` form.
    #[error("invalid fqid: {0:?}")]
    InvalidFqid(String),

    /// The collection model file could not be read.
    #[error("reading model file {path:?} failed: {source}")]
    ModelIo {
        /// Path of the model file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The collection model file could not be parsed.
    #[error("parsing model file failed: {0}")]
    ModelParse(#[from] serde_yaml::Error),
}
