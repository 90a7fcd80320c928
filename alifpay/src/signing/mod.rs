//! Request signing and callback authentication.
//!
//! Every request sent to the gateway and every callback received from it
//! carries a `token` proving it was produced by a holder of the terminal
//! credential.
//!
//! # Token Derivation
//!
//! ```text
//! signing_key = hex(HMAC_SHA256(key = terminal_id, message = terminal_password))
//! token       = hex(HMAC_SHA256(key = signing_key, message = signable_string))
//! ```
//!
//! The signable string is the terminal id followed by the flow's fields in a
//! fixed order, see [`canonical`].
//!
//! # Key Components
//!
//! - [`Credential`]: terminal id and password, validated at construction
//! - [`Signer`]: stateless two-stage HMAC
//! - [`build_signable_string`]: table-driven canonicalization per [`SignableFlow`]
//! - [`CallbackVerifier`]: recomputes callback tokens and compares them in
//!   constant time
//!
//! # Examples
//!
//! ```rust
//! use alifpay::signing::{Credential, SignableFields, SignableFlow, Signer, build_signable_string};
//!
//! # fn example() -> alifpay::Result<()> {
//! let credential = Credential::new("T1", "P1")?;
//! let fields = SignableFields {
//!     order_id: Some("321123"),
//!     amount: Some("2.99"),
//!     callback_url: Some("http://shop/cb"),
//!     ..SignableFields::default()
//! };
//!
//! let data = build_signable_string(SignableFlow::Payment, &fields, credential.terminal_id())?;
//! let token = Signer.sign(&data, &credential);
//! assert_eq!(token.len(), 64);
//! # Ok(())
//! # }
//! ```

pub mod canonical;
pub mod credential;
pub mod signer;
pub mod verifier;

#[cfg(test)]
mod tests;

pub use canonical::{SignableField, SignableFields, SignableFlow, build_signable_string};
pub use credential::Credential;
pub use signer::{Signer, TOKEN_HEX_LEN};
pub use verifier::{CallbackVerifier, VerifiedCallback, tokens_match};
