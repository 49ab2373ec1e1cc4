//! Partition planning.
//!
//! Greedy packing of a level into the fewest contiguous runs whose encoded
//! length fits the budget. Encoded length is only an estimate of stored
//! size (the store may add framing), so every run is still confirmed with a
//! trial write and bisected when the store disagrees.

use std::ops::Range;

use crate::node::Foldable;

/// Encoded lengths of one level: per-item lengths plus the fixed envelope
/// around an empty node of that level.
#[derive(Debug, Clone)]
pub struct LevelSizes {
    envelope: usize,
    items: Vec<usize>,
}

impl LevelSizes {
    pub fn measure<T: Foldable>(items: &[T]) -> Result<Self, serde_json::Error> {
        let envelope = T::body(&[]).encode()?.len();
        let items = items
            .iter()
            .map(|item| serde_json::to_vec(item).map(|bytes| bytes.len()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { envelope, items })
    }

    #[cfg(test)]
    fn from_parts(envelope: usize, items: Vec<usize>) -> Self {
        Self { envelope, items }
    }

    /// Exact encoded length of the node holding `run`.
    #[must_use]
    pub fn run_len(&self, run: Range<usize>) -> usize {
        let count = run.len();
        let items: usize = self.items[run].iter().sum();
        self.envelope + items + count.saturating_sub(1)
    }

    #[must_use]
    pub fn total_len(&self) -> usize {
        self.run_len(0..self.items.len())
    }
}

/// Runs covering `0..sizes.items.len()` in order.
///
/// A run is extended while its encoded length stays within `budget`. An
/// item too large to share a node starts (and ends) a run of its own.
#[must_use]
pub fn plan_runs(sizes: &LevelSizes, budget: u64) -> Vec<Range<usize>> {
    let budget = usize::try_from(budget).unwrap_or(usize::MAX);
    let mut runs = Vec::new();
    let mut run_start = 0;
    let mut run_len = sizes.envelope;

    for (i, &item_len) in sizes.items.iter().enumerate() {
        if i == run_start {
            run_len = sizes.envelope + item_len;
            continue;
        }
        // +1 for the separating comma
        let extended = run_len + 1 + item_len;
        if extended <= budget {
            run_len = extended;
        } else {
            runs.push(run_start..i);
            run_start = i;
            run_len = sizes.envelope + item_len;
        }
    }

    if run_start < sizes.items.len() {
        runs.push(run_start..sizes.items.len());
    }
    runs
}

/// Split a run near its midpoint by item count.
#[must_use]
pub fn bisect(run: Range<usize>) -> (Range<usize>, Range<usize>) {
    let mid = run.start + run.len() / 2;
    (run.start..mid, mid..run.end)
}
