//! Reliability patterns for gateway communication.
//!
//! Provides retry with exponential backoff for transport failures.

mod retry;

pub use retry::{RetryPolicy, is_retryable, retry_if, retry_with_backoff};
