//! Two-stage HMAC-SHA256 token derivation.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::signing::Credential;

type HmacSha256 = Hmac<Sha256>;

/// Length of a token in hex characters (SHA-256 digest, hex encoded).
pub const TOKEN_HEX_LEN: usize = 64;

/// Computes gateway tokens.
///
/// The token for a signable string `data` is
///
/// ```text
/// signing_key = hex(HMAC_SHA256(key = terminal_id, message = terminal_password))
/// token       = hex(HMAC_SHA256(key = signing_key, message = data))
/// ```
///
/// `Signer` holds no state; copies are free and every call is independent, so
/// one value can be shared across threads without synchronization.
///
/// # Examples
///
/// ```
/// use alifpay::signing::{Credential, Signer};
///
/// let credential = Credential::new("T1", "P1").unwrap();
/// let token = Signer.sign("T13211232.99http://shop/cb", &credential);
///
/// assert_eq!(token, "74784eff67a6f4684cf32231987205894c864924fa92d47c063fa8e8c69e245a");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signer;

impl Signer {
    /// Signs `data` with the credential.
    #[must_use]
    pub fn sign(&self, data: &str, credential: &Credential) -> String {
        let signing_key = Self::derive_signing_key(credential);
        hmac_sha256_hex(signing_key.as_bytes(), data.as_bytes())
    }

    /// Derives the stage-one key: the terminal password hashed with the
    /// terminal id as HMAC key.
    ///
    /// # Examples
    ///
    /// ```
    /// use alifpay::signing::{Credential, Signer};
    ///
    /// let credential = Credential::new("T1", "P1").unwrap();
    /// let key = Signer::derive_signing_key(&credential);
    /// assert_eq!(
    ///     key.as_str(),
    ///     "3fadca8b2d5cb9c2d86036f30c67b6bf91dfa1ae5bed517ef61734049df60790"
    /// );
    /// ```
    #[must_use]
    pub fn derive_signing_key(credential: &Credential) -> Zeroizing<String> {
        Zeroizing::new(hmac_sha256_hex(
            credential.terminal_id().as_bytes(),
            credential.terminal_password().as_bytes(),
        ))
    }
}

/// Returns `hex(HMAC_SHA256(key, message))` in lowercase.
#[allow(clippy::expect_used, reason = "HMAC accepts keys of any length")]
pub(crate) fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}
