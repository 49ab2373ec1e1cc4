//! Memo cache of committed nodes.
//!
//! Keyed by the SHA-256 of the encoded payload, so a run that was already
//! written (by an earlier attempt, or by another dataset sharing a prefix)
//! is reused without writing it again. The materializer confirms every hit
//! with a `stat` against its own store and rewrites the node when the store
//! no longer has it, so a cache outliving or moving between stores is safe.
//! The cache is always handed in by the caller; nothing here is
//! process-global.

use async_trait::async_trait;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::node::StoredNode;

/// SHA-256 of an encoded node payload.
pub type PayloadDigest = [u8; 32];

#[must_use]
pub fn payload_digest(payload: &[u8]) -> PayloadDigest {
    Sha256::digest(payload).into()
}

#[async_trait]
pub trait NodeCache: Send + Sync {
    async fn get(&self, digest: &PayloadDigest) -> Option<StoredNode>;
    async fn insert(&self, digest: PayloadDigest, node: StoredNode);
}

pub struct MemoryNodeCache {
    nodes: DashMap<PayloadDigest, StoredNode>,
}

impl MemoryNodeCache {
    #[must_use]
    pub fn new() -> Self {
        Self { nodes: DashMap::new() }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for MemoryNodeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NodeCache for MemoryNodeCache {
    async fn get(&self, digest: &PayloadDigest) -> Option<StoredNode> {
        self.nodes.get(digest).map(|r| r.value().clone())
    }

    async fn insert(&self, digest: PayloadDigest, node: StoredNode) {
        self.nodes.insert(digest, node);
    }
}
