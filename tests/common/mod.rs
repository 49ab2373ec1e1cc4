//! Shared fixtures and store wrappers for the integration suites.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cid::CidGeneric;
use multihash::Multihash;
use geo_range_index::{
    BlockStat, BlockStore, ContentAddress, CountryTable, Entry, GeoRecord, IpBlock, LocationRow,
    MemoryBlockStore, Node, Normalizer, StoreError, StoredNode,
};

// =============================================================================
// Reference dataset
// =============================================================================

pub fn reference_countries() -> CountryTable {
    [
        ("AC", "Ascension Island"),
        ("AD", "Andorra"),
        ("AE", "United Arab Emirates"),
        ("AF", "Afghanistan"),
        ("AG", "Antigua And Barbuda"),
    ]
    .into_iter()
    .collect()
}

fn location(code: &str, latitude: f64, longitude: f64) -> LocationRow {
    LocationRow {
        country_code: code.to_string(),
        latitude,
        longitude,
        ..Default::default()
    }
}

pub fn reference_normalizer() -> Normalizer {
    Normalizer::from_rows(
        [
            (1, location("AD", 42.5, 1.5)),
            (2, location("AE", 24.0, 54.0)),
            (3, location("AF", 33.0, 65.0)),
            (4, location("AG", 17.05, -61.8)),
        ],
        &reference_countries(),
    )
}

pub fn reference_blocks() -> Vec<IpBlock> {
    vec![
        IpBlock::new(16777216, 16777471, 1),
        IpBlock::new(16777472, 16778239, 2),
        IpBlock::new(16778240, 16779263, 3),
        IpBlock::new(16779264, 16781311, 4),
    ]
}

pub fn andorra() -> GeoRecord {
    GeoRecord::new("Andorra", "AD", 42.5, 1.5)
}

/// `count` entries 256 keys apart, every third one a gap.
pub fn synthetic_entries(count: u64) -> Vec<Entry> {
    (0..count)
        .map(|i| {
            let start = i * 256 + 1;
            if i % 3 == 0 {
                Entry::no_data(start)
            } else {
                let mut record = andorra();
                record.city = format!("City {}", i);
                record.latitude = (i % 90) as f64 + 0.25;
                Entry::new(start, record)
            }
        })
        .collect()
}

// =============================================================================
// Identity-CID stub
// =============================================================================

/// dag-pb multicodec
const DAG_PB: u64 = 0x70;
/// identity multihash code
const IDENTITY: u64 = 0x00;

/// Largest value [`identity_cid`] can inline.
pub const MAX_INLINE: usize = 256;

pub type InlineCid = CidGeneric<MAX_INLINE>;

/// CIDv1 string (dag-pb codec, identity multihash) inlining `value`.
pub fn identity_cid(value: &str) -> String {
    let hash = Multihash::<MAX_INLINE>::wrap(IDENTITY, value.as_bytes())
        .expect("value too long to inline in an identity CID");
    InlineCid::new_v1(DAG_PB, hash).to_string()
}

/// Addresses every payload as the identity CID of `"myhash" + payload length`
/// and reports the address's string length as its size.
#[derive(Default)]
pub struct IdentityCidStore {
    puts: AtomicU64,
}

impl IdentityCidStore {
    pub fn put_count(&self) -> u64 {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockStore for IdentityCidStore {
    async fn put(&self, payload: Vec<u8>) -> Result<ContentAddress, StoreError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(ContentAddress::new(identity_cid(&format!("myhash{}", payload.len()))))
    }

    async fn stat(&self, address: &ContentAddress) -> Result<BlockStat, StoreError> {
        Ok(BlockStat { size: address.as_str().len() as u64 })
    }
}

// =============================================================================
// Store wrappers
// =============================================================================

/// Memory store whose `stat` charges a fixed framing overhead per object,
/// so encoded length underestimates stored size.
pub struct FramedStore {
    pub inner: Arc<MemoryBlockStore>,
    pub overhead: u64,
}

impl FramedStore {
    pub fn new(overhead: u64) -> Self {
        Self { inner: Arc::new(MemoryBlockStore::new()), overhead }
    }
}

#[async_trait]
impl BlockStore for FramedStore {
    async fn put(&self, payload: Vec<u8>) -> Result<ContentAddress, StoreError> {
        self.inner.put(payload).await
    }

    async fn stat(&self, address: &ContentAddress) -> Result<BlockStat, StoreError> {
        let stat = self.inner.stat(address).await?;
        Ok(BlockStat { size: stat.size + self.overhead })
    }
}

/// Injects an error on chosen `put` call numbers (1-indexed).
pub struct FailingStore {
    pub inner: Arc<MemoryBlockStore>,
    calls: AtomicU64,
    fail_on_calls: HashSet<u64>,
    error: StoreError,
}

impl FailingStore {
    pub fn new(fail_on_calls: impl IntoIterator<Item = u64>, error: StoreError) -> Self {
        Self {
            inner: Arc::new(MemoryBlockStore::new()),
            calls: AtomicU64::new(0),
            fail_on_calls: fail_on_calls.into_iter().collect(),
            error,
        }
    }

    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockStore for FailingStore {
    async fn put(&self, payload: Vec<u8>) -> Result<ContentAddress, StoreError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_calls.contains(&call) {
            return Err(self.error.clone());
        }
        self.inner.put(payload).await
    }

    async fn stat(&self, address: &ContentAddress) -> Result<BlockStat, StoreError> {
        self.inner.stat(address).await
    }
}

/// `put` succeeds but `stat` never finds anything.
pub struct ForgetfulStore;

#[async_trait]
impl BlockStore for ForgetfulStore {
    async fn put(&self, payload: Vec<u8>) -> Result<ContentAddress, StoreError> {
        Ok(MemoryBlockStore::address_for(&payload))
    }

    async fn stat(&self, address: &ContentAddress) -> Result<BlockStat, StoreError> {
        Err(StoreError::NotFound(address.to_string()))
    }
}

// =============================================================================
// Tree traversal
// =============================================================================

/// Everything reachable from a root.
#[derive(Debug, Default)]
pub struct Walk {
    /// Leaf entries in depth-first, key order
    pub entries: Vec<Entry>,
    /// Every reachable object with its decoded payload
    pub nodes: Vec<(StoredNode, Node)>,
}

impl Walk {
    pub fn leaves(&self) -> impl Iterator<Item = &(StoredNode, Node)> {
        self.nodes.iter().filter(|(_, node)| node.is_leaf())
    }
}

/// Depth-first walk from `root`, children visited in key order.
pub fn walk(store: &MemoryBlockStore, root: &StoredNode) -> Walk {
    let mut result = Walk::default();
    let mut stack = vec![root.clone()];

    while let Some(current) = stack.pop() {
        let bytes = store
            .get(&current.address)
            .unwrap_or_else(|| panic!("{} not in store", current.address));
        let node = Node::decode(&bytes).expect("undecodable node");

        match &node {
            Node::Leaf { entries } => {
                assert_eq!(entries[0].start, current.start, "leaf start mismatch");
                result.entries.extend(entries.iter().cloned());
            }
            Node::Branch { children } => {
                assert_eq!(children[0].start, current.start, "branch start mismatch");
                assert!(
                    children.windows(2).all(|w| w[0].start < w[1].start),
                    "branch children out of order"
                );
                stack.extend(children.iter().rev().cloned());
            }
        }
        result.nodes.push((current, node));
    }

    result
}
