use thiserror::Error;

/// Errors that can occur talking to or serving the swarm registry.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Network I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The registry rejected a request.
    #[error("registry rejected request: {0}")]
    Rejected(String),

    /// The registry's reply could not be understood.
    #[error("invalid registry reply: {0}")]
    InvalidReply(String),

    /// Malformed JSON in a peer-list reply.
    #[error("peer list decode error: {0}")]
    PeerList(#[from] serde_json::Error),
}
