//! # Geo Range Index
//!
//! Builds a content-addressed, range-queryable index that maps numeric IP
//! ranges to geolocation records, laid out as a tree of size-bounded
//! objects in a content-addressed block store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Record Normalizer                       │
//! │  • Joins IP blocks to locations                            │
//! │  • Emits sorted entries, NoData for gaps                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Tree Folder                          │
//! │  • Packs each level into runs under the size budget        │
//! │  • Bisects runs the store reports as too large             │
//! │  • Repeats on the references until one object remains      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                     (concurrent sibling writes)
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Leaf Materializer                       │
//! │  • Encodes one run, put + stat against the block store     │
//! │  • Optional memo cache keyed by payload digest             │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every object is ordered by range start, so a reader can binary search
//! each level on the way down. Identical runs encode to identical bytes and
//! therefore land on identical addresses.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use geo_range_index::{
//!     Assembler, AssemblerConfig, CountryTable, IpBlock, LocationRow, MemoryBlockStore, Normalizer,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let countries: CountryTable = [("AD", "Andorra")].into_iter().collect();
//!     let normalizer = Normalizer::from_rows(
//!         [(1, LocationRow { country_code: "AD".into(), latitude: 42.5, longitude: 1.5, ..Default::default() })],
//!         &countries,
//!     );
//!
//!     let store = Arc::new(MemoryBlockStore::new());
//!     let assembler = Assembler::new(AssemblerConfig::default(), store).unwrap();
//!
//!     let root = assembler
//!         .assemble_blocks(&normalizer, vec![IpBlock::new(16777216, 16777471, 1)])
//!         .await
//!         .expect("Failed to assemble");
//!     println!("root {} ({} bytes)", root.address, root.size);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`normalize`]: blocks and locations to entries
//! - [`assemble`]: leaf materializer, tree folder, memo cache
//! - [`assembler`]: validated, retrying entry point
//! - [`storage`]: block store trait and in-memory store
//! - [`resilience`]: retry with backoff

pub mod assemble;
pub mod assembler;
pub mod config;
pub mod entry;
pub mod metrics;
pub mod node;
pub mod normalize;
pub mod resilience;
pub mod storage;

pub use assemble::{AssembleError, LeafMaterializer, MemoryNodeCache, NodeCache, TreeFolder};
pub use assembler::{Assembler, BuildError};
pub use config::AssemblerConfig;
pub use entry::{Entry, GeoRecord, RangeData, RangeKey};
pub use node::{KeyRange, Node, NodeBody, StoredNode};
pub use normalize::{CountryTable, IpBlock, LocationId, LocationRow, NormalizeError, Normalizer};
pub use resilience::retry::RetryConfig;
pub use storage::{BlockStat, BlockStore, ContentAddress, MemoryBlockStore, StoreError};
