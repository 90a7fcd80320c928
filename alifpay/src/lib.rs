//! alifpay: Signed Client for the Alif Payment Gateway
//!
//! A Rust library for merchants integrating with the Alif payment gateway. It
//! signs outbound requests, posts them, classifies the answers, and
//! authenticates the callbacks the gateway sends back.
//!
//! # What is alifpay?
//!
//! The gateway authenticates every message with a keyed HMAC token computed
//! over a flow-specific concatenation of fields. Getting any byte of that
//! concatenation wrong produces a token the gateway rejects, or worse, a
//! callback check that accepts forgeries. alifpay provides:
//!
//! - **Two-stage HMAC-SHA256 signing**: terminal key derivation and per-message tokens
//! - **Table-driven canonicalization**: one declared field order per flow
//! - **Dual-layer response handling**: success only when HTTP status and body code are both 200
//! - **Constant-time callback verification**: forged callbacks never reach order state
//! - **Idempotent order updates**: repeated callbacks are no-ops
//!
//! # Architecture
//!
//! ```text
//!  Merchant backend                                   Alif gateway
//! ┌──────────────────────────────────────────┐       ┌───────────────┐
//! │ PaymentRequest ─► RequestAssembler ──────┼─POST─►│ /v2/          │
//! │                   (signing::Signer)      │       │ /checktxn ... │
//! │ GatewayResponse ◄─ interpret ◄───────────┼───────┤               │
//! │                                          │       │               │
//! │ OrderLedger ◄─ CallbackVerifier ◄────────┼◄─POST─┤ callback      │
//! └──────────────────────────────────────────┘       └───────────────┘
//! ```
//!
//! # Quick Start
//!
//! ## 1. Start a Payment
//!
//! ```rust,no_run
//! use alifpay::{
//!     Amount,
//!     gateway::{AlifClient, ClientConfig, PaymentRequest},
//! };
//!
//! # async fn example() -> alifpay::Result<()> {
//! // Password is read from the variable named by `password_env`
//! let config = ClientConfig::from_file("alifpay.toml")?;
//! let client = AlifClient::new(&config)?;
//!
//! let request = PaymentRequest {
//!     gate: Some("korti_milli".to_owned()),
//!     ..PaymentRequest::new(
//!         "321123",
//!         Amount::new("2.99")?,
//!         "https://shop.tj/alif/callback",
//!         "https://shop.tj/order/321123",
//!     )
//! };
//!
//! let response = client.initiate_payment(&request).await?;
//! println!("Redirect to: {:?}", response.url);
//! # Ok(())
//! # }
//! ```
//!
//! ## 2. Handle a Callback
//!
//! ```rust
//! use alifpay::{
//!     GatewayError,
//!     callback::{MemoryStore, OrderLedger, PaymentCallback, Transition},
//!     signing::{CallbackVerifier, Credential},
//! };
//!
//! # fn example(body: &[u8]) -> alifpay::Result<Transition> {
//! let verifier = CallbackVerifier::new(Credential::new("T1", "P1")?);
//! let ledger = OrderLedger::new(MemoryStore::default());
//!
//! let callback: PaymentCallback =
//!     serde_json::from_slice(body).map_err(|e| GatewayError::Decode(e.to_string()))?;
//!
//! // Fails with GatewayError::Signature on a forged token
//! let verified = verifier.verify_payment(callback)?;
//! ledger.apply(&verified)
//! # }
//! ```
//!
//! ## 3. Sign Without Sending
//!
//! ```rust
//! use alifpay::{
//!     Amount,
//!     gateway::{PaymentRequest, RequestAssembler},
//!     signing::Credential,
//! };
//!
//! # fn example() -> alifpay::Result<()> {
//! let assembler = RequestAssembler::new(Credential::new("T1", "P1")?);
//! let request =
//!     PaymentRequest::new("321123", Amount::new("2.99")?, "http://shop/cb", "http://shop/done");
//!
//! let envelope = assembler.assemble(&request)?;
//! assert_eq!(
//!     envelope.token,
//!     "74784eff67a6f4684cf32231987205894c864924fa92d47c063fa8e8c69e245a"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! # Module Organization
//!
//! - [`signing`]: credentials, canonical signable strings, the HMAC signer, callback verification
//! - [`gateway`]: request models, envelope assembly, transport, response interpretation, client
//! - [`callback`]: callback payloads, status mapping, idempotent order ledger
//! - [`amount`]: decimal amounts that keep their original text
//! - [`reliability`]: retry with exponential backoff
//! - [`security`]: structured audit logging
//! - [`error`]: error types with recovery guidance
//!
//! # Security Considerations
//!
//! - **Never hardcode the terminal password**: configuration names an
//!   environment variable instead, and the password is zeroized on drop
//! - **Verify before acting**: no order state changes on an unverified callback
//! - **HTTPS only**: plain HTTP and loopback gateways are refused unless
//!   `allow_insecure` is set for a local test gateway
//! - **No secrets in logs**: tokens and long identifiers are redacted from audit
//!   events
//!
//! # Error Handling
//!
//! All operations return [`Result<T, GatewayError>`](error::Result). Errors include
//! recovery guidance:
//!
//! ```rust
//! use alifpay::{
//!     GatewayError,
//!     gateway::{AlifClient, PaymentRequest},
//! };
//!
//! # async fn example(client: AlifClient, request: PaymentRequest) {
//! match client.initiate_payment(&request).await {
//!     Ok(response) => println!("Accepted: {}", response.message),
//!     Err(GatewayError::Gateway { http_status, code, message }) => {
//!         eprintln!("Rejected ({http_status}/{code}): {message}");
//!         // Fix the request, do not resend as is
//!     }
//!     Err(GatewayError::Transport(e)) => {
//!         eprintln!("Network error: {e}");
//!         // Already retried; check order status before starting a new payment
//!     }
//!     Err(e) => eprintln!("Other error: {e}"),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![allow(
    clippy::multiple_crate_versions,
    reason = "transitive dependencies from reqwest and wiremock"
)]

pub mod amount;
pub mod callback;
pub mod error;
pub mod gateway;
pub mod reliability;
pub mod security;
pub mod signing;

pub use amount::Amount;
pub use error::{GatewayError, Result};
