use thiserror::Error;

/// Errors that can occur in the block store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Disk I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Reconstruction found blocks missing. Carries every missing index,
    /// not just the first. A normal state while the download is underway.
    #[error("reconstruction incomplete, {} block(s) missing", missing.len())]
    Incomplete { missing: Vec<u32> },
}
