use std::collections::HashMap;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// A registered peer as reported to other peers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerRecord {
    pub peer_id: String,
    pub host: String,
    pub port: u16,
}

/// The mutable peer map behind the tracker.
///
/// One mutex guards every read and write; each connection handler takes the
/// lock only for the duration of its single operation.
pub struct Registry {
    peers: Mutex<HashMap<String, (String, u16)>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            peers: Mutex::new(HashMap::new()),
        }
    }

    /// Upserts a peer unconditionally; the most recent address wins.
    pub fn register(&self, peer_id: &str, host: &str, port: u16) {
        self.peers
            .lock()
            .insert(peer_id.to_string(), (host.to_string(), port));
    }

    /// Returns up to `limit` peers chosen uniformly at random, excluding
    /// the requester. Returns everyone else when fewer than `limit` remain.
    pub fn list_peers(&self, requester_id: &str, limit: usize) -> Vec<PeerRecord> {
        let peers = self.peers.lock();
        let others: Vec<PeerRecord> = peers
            .iter()
            .filter(|(peer_id, _)| peer_id.as_str() != requester_id)
            .map(|(peer_id, (host, port))| PeerRecord {
                peer_id: peer_id.clone(),
                host: host.clone(),
                port: *port,
            })
            .collect();

        others
            .choose_multiple(&mut rand::thread_rng(), limit)
            .cloned()
            .collect()
    }

    /// Number of registered peers.
    pub fn len(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.lock().is_empty()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
