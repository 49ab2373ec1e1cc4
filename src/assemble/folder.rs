// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Tree folder: size-bounded, level-by-level folding of an entry sequence.
//!
//! ```text
//! level 0   e e e e e e e e e e e e e e e e      entries
//!           └──┬──┘ └──┬──┘ └──┬──┘ └──┬──┘
//! level 1    leaf    leaf    leaf    leaf        references to leaves
//!              └───┬───┘       └───┬───┘
//! level 2       branch          branch
//!                   └──────┬──────┘
//! root                  branch
//! ```
//!
//! Each level is packed greedily into runs that fit the budget by encoded
//! length, then every run is written and checked against the size the store
//! reports. A run the store says is too large is split in half and both
//! halves go back on the queue. Folding stops at the first level that fits
//! in a single object.

use std::collections::{BTreeMap, VecDeque};
use std::ops::Range;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use super::cache::NodeCache;
use super::error::AssembleError;
use super::materialize::LeafMaterializer;
use super::plan::{bisect, plan_runs, LevelSizes};
use crate::config::AssemblerConfig;
use crate::entry::Entry;
use crate::metrics::{self, FoldTimer};
use crate::node::{key_range, Foldable, StoredNode};
use crate::storage::{BlockStore, StoreError};

/// Outcome of folding one level.
enum Folded {
    /// The level fit in one object (or was already a single reference)
    Root(StoredNode),
    /// References to the objects written, in key order
    Level(Vec<StoredNode>),
}

/// Folds sorted entries into a tree of objects no larger than the budget.
///
/// Each call to [`fold`](Self::fold) is independent; the only state shared
/// between calls is the store and the optional cache passed in.
#[derive(Clone)]
pub struct TreeFolder {
    materializer: LeafMaterializer,
    budget: u64,
    max_concurrent_writes: usize,
}

impl TreeFolder {
    pub fn new(store: Arc<dyn BlockStore>, config: &AssemblerConfig) -> Self {
        Self {
            materializer: LeafMaterializer::new(store),
            budget: config.max_node_bytes,
            max_concurrent_writes: config.max_concurrent_writes.max(1),
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn NodeCache>) -> Self {
        self.materializer = self.materializer.with_cache(cache);
        self
    }

    #[must_use]
    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Fold `entries` (strictly ascending by `start`) and return the root.
    ///
    /// Any store failure aborts the fold; the error carries the key range of
    /// the run that could not be written.
    pub async fn fold(&self, entries: Vec<Entry>) -> Result<StoredNode, AssembleError> {
        self.fold_shared(Arc::from(entries)).await
    }

    /// [`fold`](Self::fold) over a shared sequence, so repeated attempts do
    /// not copy the entries.
    #[instrument(skip(self, entries), fields(entries = entries.len(), budget = self.budget))]
    pub async fn fold_shared(&self, entries: Arc<[Entry]>) -> Result<StoredNode, AssembleError> {
        check_order(&entries)?;
        let _timer = FoldTimer::start();

        let mut level = 0;
        let mut references = match self.fold_level(entries, level).await? {
            Folded::Root(root) => return Ok(self.finish(root, level)),
            Folded::Level(references) => references,
        };

        loop {
            level += 1;
            match self.fold_level(Arc::from(references), level).await? {
                Folded::Root(root) => return Ok(self.finish(root, level)),
                Folded::Level(next) => references = next,
            }
        }
    }

    fn finish(&self, root: StoredNode, level: usize) -> StoredNode {
        info!(
            start = root.start,
            size = root.size,
            address = %root.address,
            depth = level,
            "Index root assembled"
        );
        root
    }

    async fn fold_level<T: Foldable>(
        &self,
        items: Arc<[T]>,
        level: usize,
    ) -> Result<Folded, AssembleError> {
        let count = items.len();
        if count == 1 {
            if let Some(reference) = items[0].as_reference() {
                return Ok(Folded::Root(reference));
            }
        }

        let sizes = LevelSizes::measure(&items[..]).map_err(|e| AssembleError::Store {
            range: key_range(&items[..]),
            source: StoreError::EncodingRejected(e.to_string()),
        })?;

        let mut whole_level_too_large = false;
        if sizes.total_len() as u64 <= self.budget || count == 1 {
            let node = self.materialize(&items[..]).await?;
            if node.size <= self.budget {
                return Ok(Folded::Root(node));
            }
            if count == 1 {
                warn!(start = node.start, size = node.size, budget = self.budget, "Irreducible entry exceeds budget");
                metrics::record_irreducible();
                return Ok(Folded::Root(node));
            }
            debug!(level, size = node.size, budget = self.budget, "Store framing pushed level over budget");
            metrics::record_bisection();
            whole_level_too_large = true;
        }

        let runs = if whole_level_too_large {
            let (left, right) = bisect(0..count);
            vec![left, right]
        } else {
            plan_runs(&sizes, self.budget)
        };
        let planned = runs.len();
        let references = self.write_runs(items, runs).await?;

        metrics::record_level(count, references.len());
        info!(level, items = count, planned, nodes = references.len(), "Level folded");

        if let [only] = references.as_slice() {
            return Ok(Folded::Root(only.clone()));
        }
        if level > 0 && references.len() >= count {
            return Err(AssembleError::BudgetTooSmall { budget: self.budget, level });
        }
        Ok(Folded::Level(references))
    }

    async fn materialize<T: Foldable>(&self, items: &[T]) -> Result<StoredNode, AssembleError> {
        let start = items.first().map_or(0, |item| item.start());
        self.materializer
            .put_object(items, start)
            .await
            .map_err(|source| AssembleError::Store { range: key_range(items), source })
    }

    /// Write every run, bisecting any the store reports over budget, and
    /// return the accepted references ordered by position in the level.
    async fn write_runs<T: Foldable>(
        &self,
        items: Arc<[T]>,
        runs: Vec<Range<usize>>,
    ) -> Result<Vec<StoredNode>, AssembleError> {
        let mut accepted: BTreeMap<usize, StoredNode> = BTreeMap::new();
        let mut pending: VecDeque<Range<usize>> = runs.into();
        let mut join_set: JoinSet<(Range<usize>, Result<StoredNode, StoreError>)> = JoinSet::new();

        loop {
            while join_set.len() < self.max_concurrent_writes {
                let Some(run) = pending.pop_front() else { break };

                // A lone reference is already a committed object
                if run.len() == 1 {
                    if let Some(reference) = items[run.start].as_reference() {
                        accepted.insert(run.start, reference);
                        continue;
                    }
                }

                let materializer = self.materializer.clone();
                let items = items.clone();
                join_set.spawn(async move {
                    let slice = &items[run.clone()];
                    let start = slice[0].start();
                    let result = materializer.put_object(slice, start).await;
                    (run, result)
                });
            }

            // Dropping the join set on error aborts the writes still in flight
            let Some(joined) = join_set.join_next().await else { break };
            let (run, result) = joined.map_err(|e| AssembleError::Task(e.to_string()))?;
            let node = result.map_err(|source| AssembleError::Store {
                range: key_range(&items[run.clone()]),
                source,
            })?;

            if node.size <= self.budget {
                accepted.insert(run.start, node);
            } else if run.len() > 1 {
                debug!(
                    start = node.start,
                    items = run.len(),
                    size = node.size,
                    budget = self.budget,
                    "Run over budget, bisecting"
                );
                metrics::record_bisection();
                let (left, right) = bisect(run);
                pending.push_back(left);
                pending.push_back(right);
            } else {
                warn!(start = node.start, size = node.size, budget = self.budget, "Irreducible entry exceeds budget");
                metrics::record_irreducible();
                accepted.insert(run.start, node);
            }
        }

        Ok(accepted.into_values().collect())
    }
}

fn check_order(entries: &[Entry]) -> Result<(), AssembleError> {
    if entries.is_empty() {
        return Err(AssembleError::EmptyInput);
    }
    for (index, pair) in entries.windows(2).enumerate() {
        if pair[1].start <= pair[0].start {
            return Err(AssembleError::Unsorted {
                index: index + 1,
                previous: pair[0].start,
                start: pair[1].start,
            });
        }
    }
    Ok(())
}
