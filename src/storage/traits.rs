// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Block store unavailable: {0}")]
    Unavailable(String),
    #[error("Payload rejected by block store: {0}")]
    EncodingRejected(String),
    #[error("Address not found: {0}")]
    NotFound(String),
}

impl StoreError {
    /// Transient failures that may succeed if the same write is issued again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Address assigned by the block store to a committed payload.
///
/// Identical payloads always map to the same address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentAddress(String);

impl ContentAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl From<&str> for ContentAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

/// Size accounting reported by the store for one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockStat {
    /// Authoritative stored size in bytes, including any encoding overhead
    /// the store adds around the payload.
    pub size: u64,
}

#[async_trait]
pub trait BlockStore: Send + Sync {
    /// Persist an encoded payload and return its content address.
    async fn put(&self, payload: Vec<u8>) -> Result<ContentAddress, StoreError>;

    /// Stored size for a previously committed address.
    async fn stat(&self, address: &ContentAddress) -> Result<BlockStat, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_unavailable_is_retryable() {
        assert!(StoreError::Unavailable("timeout".into()).is_retryable());
        assert!(!StoreError::EncodingRejected("too big".into()).is_retryable());
        assert!(!StoreError::NotFound("abc".into()).is_retryable());
    }

    #[test]
    fn test_address_serializes_as_plain_string() {
        let address = ContentAddress::new("bafy123");
        assert_eq!(serde_json::to_string(&address).unwrap(), "\"bafy123\"");
        assert_eq!(address.to_string(), "bafy123");
    }
}
