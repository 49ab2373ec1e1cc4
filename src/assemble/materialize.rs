// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Leaf materializer: commit one run as one block store object.

use std::sync::Arc;
use tracing::debug;

use super::cache::{payload_digest, NodeCache};
use crate::entry::RangeKey;
use crate::metrics;
use crate::node::{Foldable, NodeBody, StoredNode};
use crate::storage::{BlockStore, StoreError};

/// Writes node payloads and reports the size the store actually charged.
///
/// The size always comes from `stat`; the store may wrap payloads in
/// framing whose length is not known locally. Failures are returned as-is,
/// retrying is the caller's decision.
#[derive(Clone)]
pub struct LeafMaterializer {
    store: Arc<dyn BlockStore>,
    cache: Option<Arc<dyn NodeCache>>,
}

impl LeafMaterializer {
    pub fn new(store: Arc<dyn BlockStore>) -> Self {
        Self { store, cache: None }
    }

    /// Consult (and fill) `cache` before writing.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn NodeCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Commit `items` as one object starting at `start`.
    pub async fn put_object<T: Foldable>(
        &self,
        items: &[T],
        start: RangeKey,
    ) -> Result<StoredNode, StoreError> {
        self.put_body(&T::body(items), start).await
    }

    pub async fn put_body(
        &self,
        body: &NodeBody<'_>,
        start: RangeKey,
    ) -> Result<StoredNode, StoreError> {
        let payload = body
            .encode()
            .map_err(|e| StoreError::EncodingRejected(e.to_string()))?;
        let kind = match body {
            NodeBody::Leaf { .. } => "leaf",
            NodeBody::Branch { .. } => "branch",
        };

        let digest = self.cache.as_ref().map(|_| payload_digest(&payload));
        if let (Some(cache), Some(digest)) = (&self.cache, &digest) {
            if let Some(hit) = cache.get(digest).await {
                // A hit only counts if the store still holds the object
                match self.store.stat(&hit.address).await {
                    Ok(stat) => {
                        metrics::record_cache_hit();
                        debug!(start, address = %hit.address, "Node served from cache");
                        return Ok(StoredNode { start, size: stat.size, address: hit.address });
                    }
                    Err(StoreError::NotFound(_)) => {
                        debug!(start, address = %hit.address, "Cached node missing from store, rewriting");
                    }
                    Err(err) => {
                        metrics::record_store_error(&err);
                        return Err(err);
                    }
                }
            }
        }

        let payload_len = payload.len();
        let address = self
            .store
            .put(payload)
            .await
            .inspect_err(metrics::record_store_error)?;
        let stat = self
            .store
            .stat(&address)
            .await
            .inspect_err(metrics::record_store_error)?;

        let node = StoredNode { start, size: stat.size, address };
        metrics::record_object_written(kind, node.size);
        debug!(
            kind,
            start,
            items = body.len(),
            payload_len,
            size = node.size,
            address = %node.address,
            "Object committed"
        );

        if let (Some(cache), Some(digest)) = (&self.cache, digest) {
            cache.insert(digest, node.clone()).await;
        }
        Ok(node)
    }
}
