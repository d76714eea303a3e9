//! blockswarm - cooperative block distribution over a peer swarm
//!
//! This library distributes a file as fixed-size blocks across a swarm of
//! peers. Peers discover each other through a central tracker and exchange
//! blocks directly until each of them can reconstruct the full file, after
//! which they stay online as seeders.
//!
//! # Modules
//!
//! - [`protocol`] - Text+binary wire protocol between peers
//! - [`storage`] - Per-peer block store with an in-memory cache
//! - [`tracker`] - Swarm registry server and client
//! - [`peer`] - Block server/client, selection strategy, and the peer lifecycle
//! - [`config`] - Tuning constants and node configuration

pub mod config;
pub mod peer;
pub mod protocol;
pub mod storage;
pub mod tracker;

mod transport;

pub use config::{PeerConfig, TrackerConfig};
pub use peer::{BlockClient, BlockServer, NodeState, PeerError, PeerNode, Strategy, SwarmView};
pub use protocol::{decode, Decoded, Message};
pub use storage::{BlockStore, StorageError};
pub use tracker::{PeerRecord, Registry, TrackerClient, TrackerError, TrackerServer};
