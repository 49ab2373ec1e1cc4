// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for the index assembler.
//!
//! Uses the `metrics` crate for backend-agnostic collection. The embedding
//! process chooses the exporter.
//!
//! # Metric Naming Convention
//! - `geo_index_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//! - `_bytes` suffix for size histograms
//!
//! # Labels
//! - `kind`: leaf, branch
//! - `error`: unavailable, rejected, not_found

use metrics::{counter, histogram};
use std::time::{Duration, Instant};

use crate::storage::StoreError;

/// Record an object committed to the block store
pub fn record_object_written(kind: &'static str, size: u64) {
    counter!("geo_index_objects_written_total", "kind" => kind).increment(1);
    histogram!("geo_index_object_bytes", "kind" => kind).record(size as f64);
}

/// Record a write skipped because the memo cache already held the node
pub fn record_cache_hit() {
    counter!("geo_index_cache_hits_total").increment(1);
}

/// Record a candidate run split in two after exceeding the budget
pub fn record_bisection() {
    counter!("geo_index_bisections_total").increment(1);
}

/// Record a single-item object accepted over budget
pub fn record_irreducible() {
    counter!("geo_index_irreducible_nodes_total").increment(1);
}

/// Record one tree level folded into the next
pub fn record_level(items_in: usize, items_out: usize) {
    counter!("geo_index_levels_total").increment(1);
    histogram!("geo_index_level_fan_in").record(items_in as f64 / items_out.max(1) as f64);
}

/// Record a block store failure by category
pub fn record_store_error(err: &StoreError) {
    let label = match err {
        StoreError::Unavailable(_) => "unavailable",
        StoreError::EncodingRejected(_) => "rejected",
        StoreError::NotFound(_) => "not_found",
    };
    counter!("geo_index_store_errors_total", "error" => label).increment(1);
}

/// Record a completed fold
pub fn record_fold_latency(duration: Duration) {
    histogram!("geo_index_fold_seconds").record(duration.as_secs_f64());
}

/// A timing guard that records fold latency on drop
pub struct FoldTimer {
    start: Instant,
}

impl FoldTimer {
    #[must_use]
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }
}

impl Drop for FoldTimer {
    fn drop(&mut self) {
        record_fold_latency(self.start.elapsed());
    }
}
