//! Exponential backoff retry logic for transient failures.
//!
//! Only failures that happened before the gateway could act on a request are
//! retried. A rejection by the gateway is final and goes straight back to the
//! caller.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Configuration for retry behavior.
///
/// The delay between retries increases exponentially up to a maximum value.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use alifpay::reliability::RetryPolicy;
///
/// // Default policy: 3 attempts, 100ms initial delay, 5s max delay
/// let policy = RetryPolicy::default();
///
/// // No retries at all
/// let once = RetryPolicy::with_max_attempts(1);
/// # let _ = (policy, once);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one (default: 3)
    pub max_attempts: u32,
    /// Initial delay between retries (default: 100ms)
    #[serde(with = "millis", rename = "initial_delay_ms")]
    pub initial_delay: Duration,
    /// Maximum delay between retries (default: 5s)
    #[serde(with = "millis", rename = "max_delay_ms")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a policy with custom maximum attempts.
    ///
    /// # Examples
    ///
    /// ```
    /// use alifpay::reliability::RetryPolicy;
    ///
    /// let policy = RetryPolicy::with_max_attempts(5);
    /// assert_eq!(policy.max_attempts, 5);
    /// ```
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::default() }
    }

    /// Validates the policy.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if `max_attempts` is 0 or above
    /// 10, if the multiplier is below 1, or if `initial_delay` exceeds
    /// `max_delay`.
    pub fn validate(&self) -> crate::Result<()> {
        if !(1..=10).contains(&self.max_attempts) {
            return Err(GatewayError::Configuration(format!(
                "retry max_attempts must be between 1 and 10, got {}",
                self.max_attempts
            )));
        }
        if self.backoff_multiplier.is_nan() || self.backoff_multiplier < 1.0 {
            return Err(GatewayError::Configuration(format!(
                "retry backoff_multiplier must be at least 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay > self.max_delay {
            return Err(GatewayError::Configuration(
                "retry initial_delay_ms cannot exceed max_delay_ms".to_owned(),
            ));
        }
        Ok(())
    }

    /// Calculates delay for a specific attempt.
    ///
    /// Uses exponential backoff: delay = `initial_delay` * (multiplier ^ attempt)
    /// Capped at `max_delay` to prevent excessive waits.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "delay_ms is positive and compared against max_delay before use"
    )]
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_ms =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(exponent);

        if delay_ms.is_finite() && (delay_ms as u128) < self.max_delay.as_millis() {
            Duration::from_millis(delay_ms as u64)
        } else {
            self.max_delay
        }
    }
}

/// Executes a gateway operation with exponential backoff retry.
///
/// Retries only errors for which [`is_retryable`] returns `true`. Any other
/// error is returned after the first attempt.
///
/// # Errors
///
/// Returns the last error if all attempts fail, or the first non-retryable
/// error.
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    retry_if(policy, is_retryable, operation).await
}

/// Executes an operation, retrying errors accepted by `should_retry`.
///
/// A policy with `max_attempts` of 0 still makes one attempt.
///
/// # Examples
///
/// ```
/// use std::sync::{
///     Arc,
///     atomic::{AtomicU32, Ordering},
/// };
///
/// use alifpay::reliability::{RetryPolicy, retry_if};
///
/// # async fn example() -> Result<String, String> {
/// let policy = RetryPolicy::default();
/// let attempt = Arc::new(AtomicU32::new(0));
///
/// let result = retry_if(&policy, |_: &String| true, || {
///     let attempt = Arc::clone(&attempt);
///     async move {
///         let n = attempt.fetch_add(1, Ordering::Relaxed);
///         if n < 2 { Err("temporary failure".to_owned()) } else { Ok("success".to_owned()) }
///     }
/// })
/// .await?;
///
/// assert_eq!(result, "success");
/// # Ok(result)
/// # }
/// ```
///
/// # Errors
///
/// Returns the last error if all attempts fail, or the first error rejected
/// by `should_retry`.
pub async fn retry_if<F, Fut, T, E, P>(
    policy: &RetryPolicy,
    should_retry: P,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
    P: Fn(&E) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => {
                let retryable = should_retry(&error);
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts,
                    retryable,
                    error = %error,
                    "Operation failed"
                );

                if !retryable || attempt + 1 >= max_attempts {
                    return Err(error);
                }

                let delay = policy.delay_for_attempt(attempt);
                tracing::debug!(delay_ms = delay.as_millis(), "Sleeping before retry");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Determines if an error is retryable.
///
/// Only transport failures that leave no trace on the gateway qualify:
/// timeouts and connection failures. Re-sending the same signed envelope after
/// such a failure cannot create a second payment.
///
/// # Examples
///
/// ```
/// use alifpay::{GatewayError, reliability::is_retryable};
///
/// // Gateway rejections are final
/// let error = GatewayError::Gateway { http_status: 503, code: 0, message: "busy".to_owned() };
/// assert!(!is_retryable(&error));
///
/// let error = GatewayError::InvalidInput("bad amount".to_owned());
/// assert!(!is_retryable(&error));
/// ```
#[must_use]
pub fn is_retryable(error: &GatewayError) -> bool {
    match error {
        GatewayError::Transport(e) => e.is_timeout() || e.is_connect(),
        GatewayError::Configuration(_)
        | GatewayError::MissingField { .. }
        | GatewayError::InvalidInput(_)
        | GatewayError::Gateway { .. }
        | GatewayError::Decode(_)
        | GatewayError::Signature { .. }
        | GatewayError::Conflict { .. }
        | GatewayError::Store(_) => false,
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(
        clippy::cast_possible_truncation,
        reason = "configured delays fit u64 milliseconds"
    )]
    pub(super) fn serialize<S: Serializer>(
        value: &Duration,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
