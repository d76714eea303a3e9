//! Tuning parameters and node configuration.
//!
//! Constants carry the swarm's default cadences and limits; the config
//! structs bundle everything a [`crate::peer::PeerNode`] or
//! [`crate::tracker::TrackerServer`] needs at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Blocks
// ============================================================================

/// Size of every block except possibly the final one.
pub const BLOCK_SIZE: usize = 1024;

// ============================================================================
// Network
// ============================================================================

/// Timeout applied to every connect, read, and write.
pub const IO_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on a single wire frame. Frames are read until the peer
/// closes its write half, so this only guards against hostile senders.
pub const MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Maximum connection handlers running at once per accept loop.
pub const MAX_CONNECTIONS: usize = 64;

// ============================================================================
// Swarm cadence
// ============================================================================

/// Period of the orchestrator's fetch cycle.
pub const CYCLE_PERIOD: Duration = Duration::from_secs(2);

/// Choke state is recomputed every this many fetch cycles.
pub const CHOKE_UPDATE_CYCLES: u64 = 5;

/// Delay before retrying after a failed reconstruction.
pub const RECONSTRUCT_RETRY_DELAY: Duration = Duration::from_secs(3);

// ============================================================================
// Peer selection
// ============================================================================

/// Number of regular unchoke slots.
pub const MAX_UNCHOKED: usize = 4;

/// Maximum peers returned by a single GET_PEERS query.
pub const PEER_SAMPLE_LIMIT: usize = 5;

/// Configuration for a [`crate::tracker::TrackerServer`].
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Address to listen on.
    pub listen_addr: SocketAddr,
    /// Peers returned per GET_PEERS query.
    pub sample_limit: usize,
    /// Network operation timeout.
    pub io_timeout: Duration,
}

impl TrackerConfig {
    pub fn new(listen_addr: SocketAddr) -> Self {
        Self {
            listen_addr,
            sample_limit: PEER_SAMPLE_LIMIT,
            io_timeout: IO_TIMEOUT,
        }
    }
}

/// Configuration for a [`crate::peer::PeerNode`].
#[derive(Debug, Clone)]
pub struct PeerConfig {
    /// Identity this peer registers under.
    pub peer_id: String,
    /// Address of the swarm registry.
    pub tracker_addr: SocketAddr,
    /// Address the block server listens on. Port 0 binds an ephemeral port;
    /// the real port is what gets registered.
    pub listen_addr: SocketAddr,
    /// Host other peers should use to reach this node.
    pub advertised_host: String,
    /// Root directory holding per-peer block stores.
    pub base_dir: PathBuf,
    /// Total number of blocks in the file, supplied by the bootstrap setup.
    pub total_blocks: u32,
    /// Fetch cycle period.
    pub cycle_period: Duration,
    /// Choke recomputation cadence, in fetch cycles.
    pub choke_update_cycles: u64,
    /// Network operation timeout.
    pub io_timeout: Duration,
}

impl PeerConfig {
    /// Builds a config with the default cadences, listening on an ephemeral
    /// localhost port.
    pub fn new(
        peer_id: impl Into<String>,
        tracker_addr: SocketAddr,
        base_dir: impl Into<PathBuf>,
        total_blocks: u32,
    ) -> Self {
        Self {
            peer_id: peer_id.into(),
            tracker_addr,
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            advertised_host: "127.0.0.1".to_string(),
            base_dir: base_dir.into(),
            total_blocks,
            cycle_period: CYCLE_PERIOD,
            choke_update_cycles: CHOKE_UPDATE_CYCLES,
            io_timeout: IO_TIMEOUT,
        }
    }

    /// Path the reconstructed file is written to once all blocks are local.
    pub fn output_path(&self) -> PathBuf {
        self.base_dir
            .join("restored")
            .join(format!("{}.bin", self.peer_id))
    }
}
