//! Caller-side resilience: retry with backoff.

pub mod retry;
