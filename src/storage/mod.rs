//! Block store seam.
//!
//! The assembler only needs two operations from a content-addressed store:
//! `put` a payload and `stat` the resulting address. Anything that speaks
//! those (an IPFS node, an object bucket, the in-memory store used in tests)
//! can back the index.

pub mod memory;
pub mod traits;

pub use memory::MemoryBlockStore;
pub use traits::{BlockStat, BlockStore, ContentAddress, StoreError};
