//! Audit logging for security-relevant events.
//!
//! Signing requests, gateway rejections, callback verification outcomes, and
//! order state transitions are recorded as structured events on the `audit`
//! tracing target. Every event carries a correlation id and the terminal it
//! concerns. Free-form text is redacted before it is stored.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::signing::{SignableFlow, TOKEN_HEX_LEN};

/// Types of auditable events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// An outbound request was signed.
    RequestSigned,
    /// The gateway answered with a non-success status or code.
    GatewayRejected,
    /// A callback passed signature verification.
    CallbackVerified,
    /// A callback failed signature verification.
    SignatureRejected,
    /// A verified callback carried a status the client does not know.
    UnknownStatus,
    /// An order moved to a new state.
    TransitionApplied,
    /// A callback tried to move a finalized order to a different state.
    TransitionConflict,
}

/// Contextual details of an audit event.
///
/// Only populated fields are serialized.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuditDetails {
    /// Signing flow the event belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,
    /// Merchant order id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Gateway transaction id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// Raw or mapped status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// HTTP status of a gateway response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    /// Body-level code of a gateway response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_code: Option<i64>,
    /// Error message (sensitive data automatically redacted).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Duration of the operation in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

/// Audit log entry.
///
/// # Examples
///
/// ```
/// use alifpay::{
///     security::audit::{AuditEvent, AuditEventType, audit_log},
///     signing::SignableFlow,
/// };
///
/// let event = AuditEvent::new(AuditEventType::SignatureRejected, "T1")
///     .with_flow(SignableFlow::PaymentCallback)
///     .with_order("321123", "77")
///     .with_error("callback signature mismatch for payment callback");
///
/// audit_log(&event);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// When the event occurred.
    pub timestamp: SystemTime,
    /// What happened.
    pub event_type: AuditEventType,
    /// Terminal the event concerns.
    pub terminal_id: String,
    /// Correlation id.
    pub request_id: Uuid,
    /// Event details.
    pub details: AuditDetails,
}

impl AuditEvent {
    /// Creates an audit event with a fresh correlation id.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn new(event_type: AuditEventType, terminal_id: impl Into<String>) -> Self {
        Self {
            timestamp: SystemTime::now(),
            event_type,
            terminal_id: terminal_id.into(),
            request_id: Uuid::new_v4(),
            details: AuditDetails::default(),
        }
    }

    /// Replaces the correlation id, tying several events to one operation.
    #[must_use]
    pub const fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Adds the signing flow.
    #[must_use]
    pub fn with_flow(mut self, flow: SignableFlow) -> Self {
        self.details.flow = Some(flow.to_string());
        self
    }

    /// Adds order and transaction ids.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_order(
        mut self,
        order_id: impl Into<String>,
        transaction_id: impl Into<String>,
    ) -> Self {
        self.details.order_id = Some(order_id.into());
        self.details.transaction_id = Some(transaction_id.into());
        self
    }

    /// Adds the order id alone, for requests that have no transaction yet.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_order_id(mut self, order_id: impl Into<String>) -> Self {
        self.details.order_id = Some(order_id.into());
        self
    }

    /// Adds a status.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.details.status = Some(status.into());
        self
    }

    /// Adds the HTTP status and body code of a gateway response.
    #[must_use]
    pub const fn with_gateway_result(mut self, http_status: u16, code: i64) -> Self {
        self.details.http_status = Some(http_status);
        self.details.gateway_code = Some(code);
        self
    }

    /// Adds an error message.
    ///
    /// Sensitive data is redacted from the message, see [`redact_sensitive`].
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.details.error = Some(redact_sensitive(&error.into()));
        self
    }

    /// Adds the duration of the operation.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        reason = "duration in ms fits u64 for practical values"
    )]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.details.duration_ms = Some(duration.as_millis() as u64);
        self
    }
}

/// Logs an audit event to tracing with target "audit".
///
/// Route the target to a separate sink with a per-target filter, for example
/// `RUST_LOG=info,audit=info`.
pub fn audit_log(event: &AuditEvent) {
    tracing::info!(
        target: "audit",
        timestamp = ?event.timestamp,
        event_type = ?event.event_type,
        terminal_id = %event.terminal_id,
        request_id = %event.request_id,
        details = ?event.details,
        "AUDIT"
    );
}

/// Digit runs at least this long are treated as card numbers or phones.
const MIN_MASKED_DIGITS: usize = 7;
const VISIBLE_DIGITS: usize = 4;

/// Redacts sensitive data from free-form text.
///
/// - Runs of seven or more digits (card numbers, phone numbers, accounts)
///   keep only their last four digits: `4444333322221111` → `************1111`
/// - 64-character hex strings (signing keys and tokens) are replaced with
///   `[TOKEN]`
///
/// # Examples
///
/// ```
/// use alifpay::security::audit::redact_sensitive;
///
/// let redacted = redact_sensitive("card 4444333322221111 declined");
/// assert_eq!(redacted, "card ************1111 declined");
///
/// // Short ids and amounts stay readable.
/// assert_eq!(redact_sensitive("order 321123 amount 2.99"), "order 321123 amount 2.99");
/// ```
#[must_use]
pub fn redact_sensitive(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        if !ch.is_ascii_alphanumeric() {
            result.push(ch);
            chars.next();
            continue;
        }

        let mut end = start;
        while let Some(&(idx, c)) = chars.peek()
            && c.is_ascii_alphanumeric()
        {
            end = idx + c.len_utf8();
            chars.next();
        }
        result.push_str(&redact_word(&input[start..end]));
    }

    result
}

fn redact_word(word: &str) -> String {
    if word.len() == TOKEN_HEX_LEN && word.chars().all(|c| c.is_ascii_hexdigit()) {
        return "[TOKEN]".to_owned();
    }
    if word.len() >= MIN_MASKED_DIGITS && word.chars().all(|c| c.is_ascii_digit()) {
        return redact_identifier(word);
    }
    word.to_owned()
}

/// Masks all but the last four characters of an identifier.
///
/// Identifiers of four characters or fewer are returned unchanged.
///
/// # Examples
///
/// ```
/// use alifpay::security::audit::redact_identifier;
///
/// assert_eq!(redact_identifier("992921223100"), "********3100");
/// assert_eq!(redact_identifier("abc"), "abc");
/// ```
#[must_use]
pub fn redact_identifier(identifier: &str) -> String {
    let len = identifier.chars().count();
    if len <= VISIBLE_DIGITS {
        return identifier.to_owned();
    }

    let visible: String = identifier.chars().skip(len - VISIBLE_DIGITS).collect();
    format!("{}{visible}", "*".repeat(len - VISIBLE_DIGITS))
}

/// Convenience macro for audit logging.
///
/// # Examples
///
/// ```
/// use alifpay::{audit, security::audit::AuditEventType};
///
/// audit!(AuditEventType::CallbackVerified, "T1");
///
/// audit!(
///     AuditEventType::TransitionApplied,
///     "T1",
///     with_order("321123", "77"),
///     with_status("paid")
/// );
/// ```
#[macro_export]
macro_rules! audit {
    ($event_type:expr, $terminal_id:expr) => {
        $crate::security::audit::audit_log(
            &$crate::security::audit::AuditEvent::new($event_type, $terminal_id)
        )
    };
    ($event_type:expr, $terminal_id:expr, $($method:ident($($arg:expr),*)),+ $(,)?) => {
        $crate::security::audit::audit_log(
            &$crate::security::audit::AuditEvent::new($event_type, $terminal_id)
                $(.$method($($arg),*))+
        )
    };
}
