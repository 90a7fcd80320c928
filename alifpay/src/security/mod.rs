//! Security controls shared by the signing, gateway, and callback layers.
//!
//! # Audit Logging
//!
//! The audit module provides structured logging for security-relevant events
//! with automatic sensitive data redaction:
//!
//! ```rust
//! use alifpay::{
//!     security::audit::{AuditEvent, AuditEventType},
//!     signing::SignableFlow,
//! };
//!
//! let event = AuditEvent::new(AuditEventType::RequestSigned, "T1")
//!     .with_flow(SignableFlow::Payment)
//!     .with_order_id("321123");
//!
//! alifpay::security::audit::audit_log(&event);
//! ```
//!
//! Or use the convenience macro:
//!
//! ```rust
//! use alifpay::{audit, security::audit::AuditEventType};
//!
//! audit!(AuditEventType::CallbackVerified, "T1", with_order("321123", "77"));
//! ```
//!
//! # Security Considerations
//!
//! - Audit logs use a separate tracing target for easy filtering
//! - Card numbers, phone numbers, and signing tokens are redacted from
//!   free-form text
//! - Correlation ids tie the events of one operation together
//! - The terminal password never reaches any log

pub mod audit;

pub use audit::{
    AuditDetails, AuditEvent, AuditEventType, audit_log, redact_identifier, redact_sensitive,
};
