//! The hierarchical range-index assembler.
//!
//! - [`LeafMaterializer`]: commits one run of items as one store object
//! - [`TreeFolder`]: folds a whole entry sequence into a size-bounded tree
//! - [`NodeCache`]: optional memo of already-committed payloads
//! - [`plan`]: partition planning and bisection

pub mod cache;
pub mod error;
pub mod folder;
pub mod materialize;
pub mod plan;

pub use cache::{MemoryNodeCache, NodeCache, PayloadDigest};
pub use error::AssembleError;
pub use folder::TreeFolder;
pub use materialize::LeafMaterializer;
