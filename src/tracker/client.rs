use std::net::SocketAddr;
use std::time::Duration;

use tracing::debug;

use super::error::TrackerError;
use super::registry::PeerRecord;
use crate::config::IO_TIMEOUT;
use crate::transport;

/// Client side of the swarm registry protocol.
#[derive(Debug, Clone)]
pub struct TrackerClient {
    tracker_addr: SocketAddr,
    io_timeout: Duration,
}

impl TrackerClient {
    pub fn new(tracker_addr: SocketAddr) -> Self {
        Self {
            tracker_addr,
            io_timeout: IO_TIMEOUT,
        }
    }

    pub fn with_timeout(tracker_addr: SocketAddr, io_timeout: Duration) -> Self {
        Self {
            tracker_addr,
            io_timeout,
        }
    }

    /// Registers (or re-registers) this peer's address with the registry.
    pub async fn register(
        &self,
        peer_id: &str,
        host: &str,
        port: u16,
    ) -> Result<(), TrackerError> {
        let request = format!("REGISTER {peer_id} {host} {port}");
        let reply =
            transport::exchange(self.tracker_addr, request.as_bytes(), self.io_timeout).await?;
        let text = String::from_utf8_lossy(&reply);
        let text = text.trim();

        match text {
            "OK" => Ok(()),
            _ => match text.strip_prefix("ERROR ") {
                Some(reason) => Err(TrackerError::Rejected(reason.to_string())),
                None => Err(TrackerError::InvalidReply(text.to_string())),
            },
        }
    }

    /// Fetches a sample of other registered peers.
    pub async fn get_peers(&self, peer_id: &str) -> Result<Vec<PeerRecord>, TrackerError> {
        let request = format!("GET_PEERS {peer_id}");
        let reply =
            transport::exchange(self.tracker_addr, request.as_bytes(), self.io_timeout).await?;
        let peers: Vec<PeerRecord> = serde_json::from_slice(&reply)?;
        debug!(peer_id, count = peers.len(), "peer list received");
        Ok(peers)
    }
}
