//! Per-peer block storage.
//!
//! Blocks live on disk as one `block_<index>.bin` file each, under
//! `<base>/<peer_id>/blocks/`, with an in-memory cache filled on miss.
//! Callers see a single store interface; the cache is never exposed.
//!
//! Writes go through a temporary file and a rename, so a read racing a
//! write to the same index observes either the old or the new content,
//! never a partial block.

mod blocks;
mod error;

pub use blocks::BlockStore;
pub use error::StorageError;
