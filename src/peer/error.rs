use thiserror::Error;

/// Errors that can occur while running a peer node.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Network or disk I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Block store failure.
    #[error("storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// Registry interaction failure.
    #[error("tracker error: {0}")]
    Tracker(#[from] crate::tracker::TrackerError),
}
