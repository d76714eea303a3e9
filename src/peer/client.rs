use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::protocol::{decode, Decoded, Message};
use crate::storage::BlockStore;
use crate::transport;

/// Fetches block inventories and block payloads from remote peers.
///
/// Peers are addressed by host and port as the registry reported them; a
/// hostname resolves at connect time. Every failure mode collapses at this
/// boundary: an unreachable or misbehaving peer means "currently unusable",
/// never a hard error. The orchestrator simply skips it until the next
/// cycle.
pub struct BlockClient {
    store: Arc<BlockStore>,
    io_timeout: Duration,
}

impl BlockClient {
    pub fn new(store: Arc<BlockStore>, io_timeout: Duration) -> Self {
        Self { store, io_timeout }
    }

    /// Asks a peer for the set of blocks it holds.
    ///
    /// `None` on connection failure, timeout, or any reply that is not
    /// BLOCKS.
    pub async fn fetch_blocks(&self, host: &str, port: u16) -> Option<HashSet<u32>> {
        let request = Message::List.encode();
        let reply = match transport::exchange((host, port), &request, self.io_timeout).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!(host, port, error = %e, "LIST exchange failed");
                return None;
            }
        };

        match decode(&reply) {
            Decoded::Message(Message::Blocks(indices)) => Some(indices.into_iter().collect()),
            _ => {
                debug!(host, port, "unexpected LIST reply");
                None
            }
        }
    }

    /// Fetches one block and persists it through the store.
    ///
    /// Success requires a BLOCK reply whose echoed index matches the request
    /// and whose payload is non-empty; anything else leaves no state behind
    /// and returns `false`.
    pub async fn fetch_block(&self, host: &str, port: u16, index: u32) -> bool {
        let request = Message::Get(index).encode();
        let reply = match transport::exchange((host, port), &request, self.io_timeout).await {
            Ok(reply) => reply,
            Err(e) => {
                debug!(host, port, index, error = %e, "GET exchange failed");
                return false;
            }
        };

        match decode(&reply) {
            Decoded::Message(Message::Block {
                index: echoed,
                data,
            }) if echoed == index && !data.is_empty() => {
                if let Err(e) = self.store.put(index, &data).await {
                    warn!(index, error = %e, "failed to persist fetched block");
                    return false;
                }
                debug!(host, port, index, len = data.len(), "block received");
                true
            }
            _ => {
                debug!(host, port, index, "unusable GET reply");
                false
            }
        }
    }
}
