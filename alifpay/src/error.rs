//! Error types for the Alif gateway client.
//!
//! This module defines every error that can occur while signing requests,
//! talking to the gateway, and verifying callbacks. All errors implement the
//! standard [`std::error::Error`] trait via [`thiserror::Error`].
//!
//! # Error Categories
//!
//! - **Configuration Errors** ([`GatewayError::Configuration`]): bad or missing
//!   credential, invalid client configuration. Surfaced at construction.
//! - **Input Errors** ([`GatewayError::MissingField`], [`GatewayError::InvalidInput`]):
//!   the caller handed over an incomplete or malformed request.
//! - **Network Errors** ([`GatewayError::Transport`]): HTTP communication failures.
//! - **Gateway Errors** ([`GatewayError::Gateway`], [`GatewayError::Decode`]):
//!   the gateway answered, but not with success.
//! - **Security Errors** ([`GatewayError::Signature`], [`GatewayError::Conflict`]):
//!   forged or contradictory callbacks.
//! - **Storage Errors** ([`GatewayError::Store`]): the callback store could not
//!   record a transition.
//!
//! # Examples
//!
//! ```
//! use alifpay::error::{GatewayError, Result};
//!
//! fn require_order_id(order_id: &str) -> Result<&str> {
//!     if order_id.is_empty() {
//!         return Err(GatewayError::InvalidInput("order id cannot be empty".to_owned()));
//!     }
//!     Ok(order_id)
//! }
//! ```

use thiserror::Error;

use crate::{callback::OrderState, signing::SignableFlow};

/// Result type alias for gateway operations.
///
/// All fallible functions in this crate return this type.
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Errors that can occur when working with the Alif gateway.
///
/// # Error Recovery
///
/// - **Transient errors** ([`Transport`](Self::Transport)): retry with exponential
///   backoff, see [`crate::reliability::retry_with_backoff`]
/// - **Input errors** ([`MissingField`](Self::MissingField),
///   [`InvalidInput`](Self::InvalidInput)): fix the request and resend
/// - **Gateway rejections** ([`Gateway`](Self::Gateway)): inspect `code` and `message`;
///   never retried automatically because the rejection may be final
/// - **Security errors** ([`Signature`](Self::Signature)): reject the callback, change
///   nothing, investigate
#[must_use = "errors should be handled, propagated, or explicitly panicked"]
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Client configuration is invalid.
    ///
    /// Raised when a credential is built from an empty terminal id or password,
    /// when the password environment variable is missing, or when the TOML
    /// configuration fails validation.
    ///
    /// # Recovery
    ///
    /// Fix the configuration. This error is never transient.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A field required to build the signable string is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use alifpay::{error::GatewayError, signing::SignableFlow};
    ///
    /// let err = GatewayError::MissingField { field: "order_id", flow: SignableFlow::Payment };
    /// assert_eq!(err.to_string(), "missing field `order_id` for payment signing");
    /// ```
    #[error("missing field `{field}` for {flow} signing")]
    MissingField {
        /// Internal name of the missing field.
        field: &'static str,
        /// Flow whose field order requires it.
        flow: SignableFlow,
    },

    /// Request input failed validation (malformed amount, bad URL, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// HTTP request failed before a response was received.
    ///
    /// Wraps [`reqwest::Error`]. Common causes are timeouts (30 seconds by
    /// default), refused connections, DNS or TLS failures.
    ///
    /// # Recovery
    ///
    /// No side effect is assumed to have happened on the gateway, so the same
    /// signed envelope may be sent again.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The gateway rejected the request.
    ///
    /// Produced when either the HTTP status or the application `code` in the
    /// body is not 200. Both values are kept for diagnostics.
    ///
    /// # Examples
    ///
    /// ```
    /// use alifpay::error::GatewayError;
    ///
    /// let err = GatewayError::Gateway {
    ///     http_status: 200,
    ///     code: 500,
    ///     message: "order already exists".to_owned(),
    /// };
    /// assert_eq!(err.to_string(), "gateway error (HTTP 200, code 500): order already exists");
    /// ```
    #[error("gateway error (HTTP {http_status}, code {code}): {message}")]
    Gateway {
        /// HTTP status returned by the transport.
        http_status: u16,
        /// Application code from the response body, 0 when absent.
        code: i64,
        /// Message from the response body.
        message: String,
    },

    /// A successful HTTP response carried a body that is not gateway JSON.
    #[error("cannot decode gateway response: {0}")]
    Decode(String),

    /// Callback token does not match the recomputed token.
    ///
    /// The callback must be rejected and its status must not be trusted.
    #[error("callback signature mismatch for {flow}")]
    Signature {
        /// Callback flow that failed verification.
        flow: SignableFlow,
    },

    /// A verified callback contradicts the terminal state already recorded.
    #[error(
        "conflicting callback for order {order_id} transaction {transaction_id}: \
         {current} cannot become {attempted}"
    )]
    Conflict {
        /// Merchant order id.
        order_id: String,
        /// Gateway transaction id.
        transaction_id: String,
        /// State currently recorded.
        current: OrderState,
        /// State the callback tried to apply.
        attempted: OrderState,
    },

    /// The callback store failed to read or write state.
    #[error("callback store error: {0}")]
    Store(String),
}

impl GatewayError {
    /// Returns the HTTP status carried by a [`Gateway`](Self::Gateway) error.
    #[must_use]
    pub const fn http_status(&self) -> Option<u16> {
        match self {
            Self::Gateway { http_status, .. } => Some(*http_status),
            _ => None,
        }
    }

    /// Returns the application code carried by a [`Gateway`](Self::Gateway) error.
    #[must_use]
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Gateway { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Returns `true` for errors that must be flagged for investigation.
    #[must_use]
    pub const fn is_security_relevant(&self) -> bool {
        matches!(self, Self::Signature { .. } | Self::Conflict { .. })
    }
}
