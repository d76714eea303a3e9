//! Swarm registry (tracker).
//!
//! Peers register their identity and address here and query for a random
//! sample of other peers. The registry is in-memory only and does not
//! survive a restart; re-registration repopulates it.
//!
//! Wire format, one request/response per connection:
//!
//! - `REGISTER <peer-id> <host> <port>` → `OK` or `ERROR <text>`
//! - `GET_PEERS <peer-id>` → JSON array of `{peer_id, host, port}`

mod client;
mod error;
mod registry;
mod server;

pub use client::TrackerClient;
pub use error::TrackerError;
pub use registry::{PeerRecord, Registry};
pub use server::TrackerServer;
