//! Terminal credential.

use std::fmt;

use zeroize::Zeroizing;

use crate::error::{GatewayError, Result};

/// Terminal identity used to sign requests and verify callbacks.
///
/// The password is wiped from memory on drop and never appears in `Debug`
/// output. Construction fails fast on empty values, so a `Credential` that
/// exists is always usable for signing.
///
/// # Examples
///
/// ```
/// use alifpay::signing::Credential;
///
/// let credential = Credential::new("T1", "P1").unwrap();
/// assert_eq!(credential.terminal_id(), "T1");
/// assert!(!format!("{credential:?}").contains("P1"));
///
/// assert!(Credential::new("", "P1").is_err());
/// ```
#[derive(Clone)]
pub struct Credential {
    terminal_id: String,
    terminal_password: Zeroizing<String>,
}

impl Credential {
    /// Creates a credential from a terminal id and password.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if either value is empty or
    /// only whitespace.
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for constructors"
    )]
    pub fn new(
        terminal_id: impl Into<String>,
        terminal_password: impl Into<String>,
    ) -> Result<Self> {
        let terminal_id = terminal_id.into();
        let terminal_password = Zeroizing::new(terminal_password.into());

        if terminal_id.trim().is_empty() {
            return Err(GatewayError::Configuration("terminal id cannot be empty".to_owned()));
        }
        if terminal_password.trim().is_empty() {
            return Err(GatewayError::Configuration(
                "terminal password cannot be empty".to_owned(),
            ));
        }

        Ok(Self { terminal_id, terminal_password })
    }

    /// Creates a credential whose password is read from an environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the variable is unset, not
    /// valid Unicode, or empty.
    pub fn from_env(terminal_id: &str, password_env: &str) -> Result<Self> {
        let password = std::env::var(password_env).map_err(|e| {
            GatewayError::Configuration(format!("cannot read {password_env}: {e}"))
        })?;
        Self::new(terminal_id, password)
    }

    /// Returns the terminal id, sent as `key` in every request.
    #[must_use]
    pub fn terminal_id(&self) -> &str {
        &self.terminal_id
    }

    pub(crate) fn terminal_password(&self) -> &str {
        &self.terminal_password
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("terminal_id", &self.terminal_id)
            .field("terminal_password", &"[REDACTED]")
            .finish()
    }
}
