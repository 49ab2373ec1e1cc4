// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Stored tree nodes and their payload encoding.
//!
//! Every object the assembler writes is one of two shapes:
//!
//! ```text
//! {"kind":"leaf","entries":[{"start":1,"data":0},{"start":16777216,"data":[...]}]}
//! {"kind":"branch","children":[{"start":1,"size":812,"address":"..."},...]}
//! ```
//!
//! Leaves hold raw [`Entry`] values, branches hold references to child
//! objects only. Both are ordered by `start`, so a reader can binary search
//! any level for the last item whose `start` is `<=` the key it wants.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::entry::{Entry, RangeKey};
use crate::storage::ContentAddress;

/// A committed object: where it starts, how big the store says it is, and
/// where it lives.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredNode {
    /// First key covered by the object
    pub start: RangeKey,
    /// Stored size as reported by the block store
    pub size: u64,
    pub address: ContentAddress,
}

/// Borrowed payload, ready to encode.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeBody<'a> {
    Leaf { entries: &'a [Entry] },
    Branch { children: &'a [StoredNode] },
}

impl NodeBody<'_> {
    /// Encode to the bytes handed to the block store.
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Leaf { entries } => entries.len(),
            Self::Branch { children } => children.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Decoded payload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Node {
    Leaf { entries: Vec<Entry> },
    Branch { children: Vec<StoredNode> },
}

impl Node {
    pub fn decode(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }
}

/// Inclusive span of range starts covered by a run of items, used to tag
/// failures with the part of the dataset that could not be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyRange {
    pub first: RangeKey,
    pub last: RangeKey,
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..={}]", self.first, self.last)
    }
}

/// Items a tree level can be built from.
///
/// The bottom level folds [`Entry`] values into leaves; every level above
/// folds the [`StoredNode`] references produced by the level below.
pub trait Foldable: Serialize + Send + Sync + 'static {
    fn start(&self) -> RangeKey;

    /// Wrap a contiguous run in the payload shape for this level.
    fn body(items: &[Self]) -> NodeBody<'_>
    where
        Self: Sized;

    /// A reference that can stand in for a one-item run unchanged.
    fn as_reference(&self) -> Option<StoredNode>;
}

impl Foldable for Entry {
    fn start(&self) -> RangeKey {
        self.start
    }

    fn body(items: &[Self]) -> NodeBody<'_> {
        NodeBody::Leaf { entries: items }
    }

    fn as_reference(&self) -> Option<StoredNode> {
        None
    }
}

impl Foldable for StoredNode {
    fn start(&self) -> RangeKey {
        self.start
    }

    fn body(items: &[Self]) -> NodeBody<'_> {
        NodeBody::Branch { children: items }
    }

    fn as_reference(&self) -> Option<StoredNode> {
        Some(self.clone())
    }
}

/// Key span of a non-empty run.
pub(crate) fn key_range<T: Foldable>(items: &[T]) -> KeyRange {
    KeyRange {
        first: items.first().map_or(0, |item| item.start()),
        last: items.last().map_or(0, |item| item.start()),
    }
}
