use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use super::traits::{BlockStat, BlockStore, ContentAddress, StoreError};

/// Content-addressed block store held in memory.
///
/// Addresses are the lower-case hex SHA-256 of the payload, so writing the
/// same bytes twice leaves a single object behind.
pub struct MemoryBlockStore {
    blocks: DashMap<ContentAddress, Vec<u8>>,
    puts: AtomicU64,
}

impl MemoryBlockStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: DashMap::new(),
            puts: AtomicU64::new(0),
        }
    }

    /// Address a payload would be stored under.
    #[must_use]
    pub fn address_for(payload: &[u8]) -> ContentAddress {
        ContentAddress::new(hex::encode(Sha256::digest(payload)))
    }

    /// Read back a committed payload
    #[must_use]
    pub fn get(&self, address: &ContentAddress) -> Option<Vec<u8>> {
        self.blocks.get(address).map(|r| r.value().clone())
    }

    /// Number of distinct objects stored
    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Total `put` calls received, including ones that hit an existing address
    #[must_use]
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.blocks.clear();
    }
}

impl Default for MemoryBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlockStore for MemoryBlockStore {
    async fn put(&self, payload: Vec<u8>) -> Result<ContentAddress, StoreError> {
        self.puts.fetch_add(1, Ordering::Relaxed);
        let address = Self::address_for(&payload);
        self.blocks.entry(address.clone()).or_insert(payload);
        Ok(address)
    }

    async fn stat(&self, address: &ContentAddress) -> Result<BlockStat, StoreError> {
        self.blocks
            .get(address)
            .map(|r| BlockStat { size: r.value().len() as u64 })
            .ok_or_else(|| StoreError::NotFound(address.to_string()))
    }
}
