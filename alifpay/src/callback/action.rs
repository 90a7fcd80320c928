//! Mapping from verified callback status to what the integrator should do.
//!
//! The mapping is pure. Logging and persistence happen elsewhere, with the
//! resulting [`CallbackAction`] as input.

use std::fmt;

use crate::callback::models::{PaymentStatus, TokenizationCode};

/// Terminal result of a payment or tokenization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Payment completed.
    Paid,
    /// Card or wallet tokenized.
    Tokenized,
    /// Payment or tokenization failed.
    Failed {
        /// Reason reported by the gateway, if any.
        reason: Option<String>,
    },
}

/// What to do with an order after a verified callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Move the order to a terminal state.
    Finalize(Outcome),
    /// Leave the order in flight.
    Hold,
    /// Unrecognized status: record it, change nothing.
    Investigate(String),
}

impl CallbackAction {
    /// Action for a payment or marketplace status.
    ///
    /// # Examples
    ///
    /// ```
    /// use alifpay::callback::{CallbackAction, Outcome, PaymentStatus};
    ///
    /// assert_eq!(
    ///     CallbackAction::for_payment_status(&PaymentStatus::Ok),
    ///     CallbackAction::Finalize(Outcome::Paid)
    /// );
    /// assert_eq!(
    ///     CallbackAction::for_payment_status(&PaymentStatus::ToApprove),
    ///     CallbackAction::Hold
    /// );
    /// ```
    #[must_use]
    pub fn for_payment_status(status: &PaymentStatus) -> Self {
        match status {
            PaymentStatus::Ok => Self::Finalize(Outcome::Paid),
            PaymentStatus::Failed | PaymentStatus::Canceled => {
                Self::Finalize(Outcome::Failed { reason: Some(status.as_str().to_owned()) })
            }
            PaymentStatus::Pending | PaymentStatus::ToApprove => Self::Hold,
            PaymentStatus::Unknown(raw) => Self::Investigate(raw.clone()),
        }
    }

    /// Action for a tokenization result code.
    ///
    /// A duplicate means the instrument is already on file, which counts as
    /// tokenized.
    #[must_use]
    pub fn for_tokenization_code(code: TokenizationCode, reason: Option<&str>) -> Self {
        match code {
            TokenizationCode::Success | TokenizationCode::Duplicate => {
                Self::Finalize(Outcome::Tokenized)
            }
            TokenizationCode::Rejected => {
                Self::Finalize(Outcome::Failed { reason: reason.map(str::to_owned) })
            }
            TokenizationCode::Unknown(code) => Self::Investigate(code.to_string()),
        }
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finalize(Outcome::Paid) => f.write_str("finalize:paid"),
            Self::Finalize(Outcome::Tokenized) => f.write_str("finalize:tokenized"),
            Self::Finalize(Outcome::Failed { reason: Some(reason) }) => {
                write!(f, "finalize:failed ({reason})")
            }
            Self::Finalize(Outcome::Failed { reason: None }) => f.write_str("finalize:failed"),
            Self::Hold => f.write_str("hold"),
            Self::Investigate(raw) => write!(f, "investigate ({raw})"),
        }
    }
}
