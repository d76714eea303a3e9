//! Peer-side machinery: block server, block client, selection strategy,
//! and the download/reconstruct/seed lifecycle.
//!
//! A [`PeerNode`] ties the pieces together: it serves its local blocks over
//! [`BlockServer`], discovers the swarm through the tracker, queries each
//! peer's inventory with [`BlockClient`], and lets [`Strategy`] decide which
//! peers to request from and in which order blocks are wanted.

mod client;
mod error;
mod node;
mod server;
mod strategy;

pub use client::BlockClient;
pub use error::PeerError;
pub use node::{NodeState, PeerNode};
pub use server::BlockServer;
pub use strategy::{rarest_first, Strategy, SwarmView};
