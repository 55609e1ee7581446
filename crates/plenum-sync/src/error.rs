//! Error types for plenum-sync.

/// Result type alias for plenum-sync operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while walking the source store.
///
/// Every variant aborts the current cycle; the synchronizer state stays
/// where it was and the next cycle retries the same window.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Database failure (connect, query, decode).
    #[error("source database error: {0}")]
    Source(#[from] sqlx::Error),

    /// A change-log entry carried a malformed fqid.
    #[error(transparent)]
    Core(#[from] plenum_core::Error),

    /// The event consumer went away mid-cycle.
    #[error("event channel closed")]
    ChannelClosed,
}
