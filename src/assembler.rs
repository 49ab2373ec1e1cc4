// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Top-level entry point: normalize, fold, retry.
//!
//! [`Assembler`] wraps a [`TreeFolder`] with the caller-side policy the
//! folder deliberately leaves out: validating configuration, retrying
//! transient store failures, and memoizing committed runs so that a retry
//! picks up where the failed attempt stopped.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use geo_range_index::{Assembler, AssemblerConfig, Entry, GeoRecord, MemoryBlockStore};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = Arc::new(MemoryBlockStore::new());
//! let assembler = Assembler::new(AssemblerConfig::default(), store.clone()).unwrap();
//!
//! let root = assembler
//!     .assemble(vec![
//!         Entry::no_data(1),
//!         Entry::new(16777216, GeoRecord::new("Andorra", "AD", 42.5, 1.5)),
//!     ])
//!     .await
//!     .unwrap();
//!
//! assert_eq!(root.start, 1);
//! assert_eq!(store.len(), 1);
//! # }
//! ```

use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};

use crate::assemble::{AssembleError, MemoryNodeCache, NodeCache, TreeFolder};
use crate::config::AssemblerConfig;
use crate::entry::Entry;
use crate::node::StoredNode;
use crate::normalize::{IpBlock, NormalizeError, Normalizer};
use crate::resilience::retry::{retry_if, RetryConfig};
use crate::storage::BlockStore;

/// Failure of a dataset build: either the blocks could not be normalized
/// or the fold failed.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}

pub struct Assembler {
    config: AssemblerConfig,
    store: Arc<dyn BlockStore>,
    cache: Option<Arc<dyn NodeCache>>,
    retry: RetryConfig,
}

impl Assembler {
    pub fn new(config: AssemblerConfig, store: Arc<dyn BlockStore>) -> Result<Self, AssembleError> {
        config.validate().map_err(AssembleError::InvalidConfig)?;
        let retry = config.retry_config();
        Ok(Self { config, store, cache: None, retry })
    }

    /// Share `cache` across calls, e.g. to reuse nodes between datasets
    /// that share unchanged prefixes. Without one, each call gets a fresh
    /// cache that lives only as long as that call. Hits are checked against
    /// this assembler's store, so entries for objects the store has lost
    /// are rewritten.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn NodeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the backoff derived from the config, e.g. with
    /// [`RetryConfig::publisher`] for a background job that must land the
    /// index however long the store stays down.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    /// Fold `entries` into the store and return the root.
    ///
    /// Transient store failures rerun the fold with the configured backoff
    /// (`max_retries` attempts unless [`with_retry`](Self::with_retry) says
    /// otherwise).
    /// On final failure the error names the key range that could not be
    /// written; no root is returned.
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub async fn assemble(&self, entries: Vec<Entry>) -> Result<StoredNode, AssembleError> {
        let cache: Arc<dyn NodeCache> = match &self.cache {
            Some(cache) => cache.clone(),
            None => Arc::new(MemoryNodeCache::new()),
        };
        let folder = TreeFolder::new(self.store.clone(), &self.config).with_cache(cache);
        let entries: Arc<[Entry]> = Arc::from(entries);
        let folder = &folder;

        retry_if(
            "fold_index",
            &self.retry,
            AssembleError::is_retryable,
            move || folder.fold_shared(entries.clone()),
        )
        .await
    }

    /// Normalize raw blocks against `normalizer`'s locations, then assemble.
    pub async fn assemble_blocks(
        &self,
        normalizer: &Normalizer,
        blocks: Vec<IpBlock>,
    ) -> Result<StoredNode, BuildError> {
        let block_count = blocks.len();
        let entries = normalizer.normalize(blocks)?;
        info!(blocks = block_count, entries = entries.len(), "Dataset normalized");
        Ok(self.assemble(entries).await?)
    }
}
