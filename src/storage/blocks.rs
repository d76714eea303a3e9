use std::collections::HashSet;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use dashmap::DashMap;
use tracing::{debug, warn};

use super::error::StorageError;

const BLOCK_PREFIX: &str = "block_";
const BLOCK_SUFFIX: &str = ".bin";

/// Persisted block storage for one peer, with a fill-on-miss cache.
///
/// Cheap to share: all methods take `&self`, and the cache tolerates
/// concurrent access across different indices.
pub struct BlockStore {
    blocks_dir: PathBuf,
    cache: DashMap<u32, Bytes>,
}

impl BlockStore {
    /// Opens (creating if needed) the block directory for `peer_id`.
    pub async fn open(
        base_dir: impl AsRef<Path>,
        peer_id: &str,
    ) -> Result<Self, StorageError> {
        let blocks_dir = base_dir.as_ref().join(peer_id).join("blocks");
        tokio::fs::create_dir_all(&blocks_dir).await?;
        Ok(Self {
            blocks_dir,
            cache: DashMap::new(),
        })
    }

    /// Scans the backing directory and returns every stored block index.
    ///
    /// Files that do not match the `block_<index>.bin` convention are
    /// skipped, not errors.
    pub async fn enumerate(&self) -> Result<HashSet<u32>, StorageError> {
        let mut indices = HashSet::new();
        let mut entries = tokio::fs::read_dir(&self.blocks_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(index) = parse_block_name(name) {
                indices.insert(index);
            }
        }
        Ok(indices)
    }

    /// Persists a block durably, then refreshes the cache. Overwrites any
    /// existing content at that index.
    pub async fn put(&self, index: u32, data: &[u8]) -> Result<(), StorageError> {
        let path = self.block_path(index);
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        self.cache.insert(index, Bytes::copy_from_slice(data));
        Ok(())
    }

    /// Returns a block's content, reading through the cache.
    ///
    /// `None` means the block is not stored or could not be read; storage
    /// failures never terminate the caller.
    pub async fn get(&self, index: u32) -> Option<Bytes> {
        if let Some(data) = self.cache.get(&index) {
            return Some(data.clone());
        }

        match tokio::fs::read(self.block_path(index)).await {
            Ok(data) => {
                let data = Bytes::from(data);
                self.cache.insert(index, data.clone());
                Some(data)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(index, error = %e, "block read failed");
                None
            }
        }
    }

    /// Concatenates blocks `0..total_blocks` into `output_path`.
    ///
    /// Fails with [`StorageError::Incomplete`] listing every missing index;
    /// nothing is written unless all blocks are present.
    pub async fn reconstruct(
        &self,
        total_blocks: u32,
        output_path: impl AsRef<Path>,
    ) -> Result<(), StorageError> {
        let mut parts = Vec::with_capacity(total_blocks as usize);
        let mut missing = Vec::new();

        for index in 0..total_blocks {
            match self.get(index).await {
                Some(data) => parts.push(data),
                None => missing.push(index),
            }
        }

        if !missing.is_empty() {
            return Err(StorageError::Incomplete { missing });
        }

        let output_path = output_path.as_ref();
        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut contents = Vec::with_capacity(parts.iter().map(|p| p.len()).sum());
        for part in &parts {
            contents.extend_from_slice(part);
        }

        let tmp = output_path.with_extension("tmp");
        tokio::fs::write(&tmp, &contents).await?;
        tokio::fs::rename(&tmp, output_path).await?;
        debug!(total_blocks, path = %output_path.display(), "file reconstructed");
        Ok(())
    }

    fn block_path(&self, index: u32) -> PathBuf {
        self.blocks_dir
            .join(format!("{BLOCK_PREFIX}{index}{BLOCK_SUFFIX}"))
    }
}

fn parse_block_name(name: &str) -> Option<u32> {
    name.strip_prefix(BLOCK_PREFIX)?
        .strip_suffix(BLOCK_SUFFIX)?
        .parse()
        .ok()
}
