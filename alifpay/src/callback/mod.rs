//! Gateway callbacks: payloads, status mapping, and idempotent application.
//!
//! A callback goes through three steps:
//!
//! 1. Decode the JSON body into one of the payload types in [`models`]
//! 2. Verify it with [`CallbackVerifier`](crate::signing::CallbackVerifier),
//!    which yields a [`VerifiedCallback`] carrying a [`CallbackAction`]
//! 3. Apply it with [`OrderLedger`], which records the first terminal state and
//!    treats repeats as no-ops
//!
//! # Examples
//!
//! ```rust
//! use alifpay::{
//!     callback::{MemoryStore, OrderLedger, PaymentCallback, Transition},
//!     signing::{CallbackVerifier, Credential},
//! };
//!
//! # fn handle(body: &str) -> alifpay::Result<Transition> {
//! let verifier = CallbackVerifier::new(Credential::new("T1", "P1")?);
//! let ledger = OrderLedger::new(MemoryStore::default());
//!
//! let callback: PaymentCallback = serde_json::from_str(body)
//!     .map_err(|e| alifpay::GatewayError::Decode(e.to_string()))?;
//! let verified = verifier.verify(callback)?;
//! ledger.apply(&verified)
//! # }
//! ```

pub mod action;
pub mod ledger;
pub mod models;

pub use action::{CallbackAction, Outcome};
pub use ledger::{
    CallbackKey, CallbackStore, DEFAULT_STORE_CAPACITY, MemoryStore, OrderLedger, OrderState,
    Transition,
};
pub use models::{
    CallbackEnvelope, MarketplaceCallback, PaymentCallback, PaymentStatus, SubTransaction,
    TokenizationCallback, TokenizationCallbackPayload, TokenizationCode,
};

pub use crate::signing::VerifiedCallback;
