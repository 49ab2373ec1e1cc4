use thiserror::Error;

use crate::entry::RangeKey;
use crate::node::KeyRange;
use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum AssembleError {
    /// A block store call failed while writing the run covering `range`.
    #[error("Store failure writing range {range}: {source}")]
    Store {
        range: KeyRange,
        #[source]
        source: StoreError,
    },
    #[error("Cannot assemble an index from zero entries")]
    EmptyInput,
    #[error("Entries out of order at index {index}: start {start} follows {previous}")]
    Unsorted {
        index: usize,
        previous: RangeKey,
        start: RangeKey,
    },
    #[error("Budget of {budget} bytes cannot hold two references at level {level}")]
    BudgetTooSmall { budget: u64, level: usize },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Write task failed: {0}")]
    Task(String),
}

impl AssembleError {
    /// Whether running the same fold again may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Store { source, .. } => source.is_retryable(),
            _ => false,
        }
    }

    /// Sub-range whose write failed, if the failure came from the store.
    #[must_use]
    pub fn failed_range(&self) -> Option<KeyRange> {
        match self {
            Self::Store { range, .. } => Some(*range),
            _ => None,
        }
    }

    #[must_use]
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            Self::Store { source, .. } => Some(source),
            _ => None,
        }
    }
}
