//! Callback payloads posted by the gateway.
//!
//! These types only decode the JSON body. Nothing in them may be trusted until
//! the envelope has gone through [`CallbackVerifier`](crate::signing::CallbackVerifier).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::{
    amount::Amount,
    callback::action::CallbackAction,
    signing::{SignableFields, SignableFlow},
};

/// Payment status reported in payment and marketplace callbacks.
///
/// Any string the client does not know becomes [`PaymentStatus::Unknown`],
/// which is neither success nor failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PaymentStatus {
    /// Payment completed.
    Ok,
    /// Payment failed.
    Failed,
    /// Payment canceled by the customer or the gateway.
    Canceled,
    /// Payment still in progress.
    Pending,
    /// Payment held, waiting for approval or delivery confirmation.
    ToApprove,
    /// Status not recognized by this client, kept verbatim.
    Unknown(String),
}

impl PaymentStatus {
    /// Parses a wire status. Never fails.
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "ok" => Self::Ok,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            "pending" => Self::Pending,
            "to_approve" => Self::ToApprove,
            other => Self::Unknown(other.to_owned()),
        }
    }

    /// Returns the wire string, used verbatim when signing.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "ok",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
            Self::Pending => "pending",
            Self::ToApprove => "to_approve",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for PaymentStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PaymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Result code of a tokenization callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenizationCode {
    /// Card or wallet tokenized.
    Success,
    /// Already tokenized earlier for this customer.
    Duplicate,
    /// Tokenization rejected.
    Rejected,
    /// Code not recognized by this client.
    Unknown(i64),
}

impl TokenizationCode {
    /// Maps a wire code. Never fails.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Success,
            2 => Self::Duplicate,
            9 => Self::Rejected,
            other => Self::Unknown(other),
        }
    }

    /// Returns the wire code.
    #[must_use]
    pub const fn code(self) -> i64 {
        match self {
            Self::Success => 1,
            Self::Duplicate => 2,
            Self::Rejected => 9,
            Self::Unknown(code) => code,
        }
    }
}

/// Common view over the callback shapes.
///
/// Implemented by every callback payload so a single verifier and a single
/// ledger can handle all of them.
pub trait CallbackEnvelope {
    /// Canonicalization rule for this shape.
    const FLOW: SignableFlow;

    /// Merchant order id.
    fn order_id(&self) -> &str;

    /// Gateway transaction id.
    fn transaction_id(&self) -> &str;

    /// Token supplied by the gateway.
    fn supplied_token(&self) -> &str;

    /// Field values that take part in the signature.
    fn signable_fields(&self) -> SignableFields<'_>;

    /// Action implied by the reported status.
    ///
    /// Only meaningful once the envelope has been verified.
    fn action(&self) -> CallbackAction;
}

/// Payment callback.
///
/// ```json
/// {
///   "orderId": "2133213",
///   "transactionId": "2231223",
///   "status": "ok",
///   "token": "…",
///   "amount": 12.00,
///   "account": "…",
///   "phone": "+992921223100",
///   "transaction_type": "payment"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCallback {
    /// Merchant order id.
    #[serde(rename = "orderId", deserialize_with = "string_or_number")]
    pub order_id: String,
    /// Gateway transaction id.
    #[serde(rename = "transactionId", deserialize_with = "string_or_number")]
    pub transaction_id: String,
    /// Reported status.
    pub status: PaymentStatus,
    /// Signature supplied by the gateway.
    pub token: String,
    /// Paid amount, as sent by the gateway.
    pub amount: Amount,
    /// Customer account.
    #[serde(default)]
    pub account: Option<String>,
    /// Customer phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Transaction type label.
    #[serde(default)]
    pub transaction_type: Option<String>,
}

impl CallbackEnvelope for PaymentCallback {
    const FLOW: SignableFlow = SignableFlow::PaymentCallback;

    fn order_id(&self) -> &str {
        &self.order_id
    }

    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    fn supplied_token(&self) -> &str {
        &self.token
    }

    fn signable_fields(&self) -> SignableFields<'_> {
        SignableFields {
            order_id: Some(&self.order_id),
            transaction_id: Some(&self.transaction_id),
            status: Some(self.status.as_str()),
            amount: Some(self.amount.as_str()),
            ..SignableFields::default()
        }
    }

    fn action(&self) -> CallbackAction {
        CallbackAction::for_payment_status(&self.status)
    }
}

/// Sub-transaction of a marketplace payment, one per partner terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTransaction {
    /// Partner terminal id.
    pub terminal_id: String,
    /// Sub-transaction id.
    #[serde(deserialize_with = "string_or_number")]
    pub transaction_id: String,
    /// Sub-transaction status, as received.
    pub status: String,
}

/// Marketplace payment callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketplaceCallback {
    /// Merchant order id.
    #[serde(rename = "orderId", deserialize_with = "string_or_number")]
    pub order_id: String,
    /// Gateway transaction id of the parent payment.
    #[serde(rename = "transactionId", deserialize_with = "string_or_number")]
    pub transaction_id: String,
    /// Reported status of the parent payment.
    pub status: PaymentStatus,
    /// Signature supplied by the gateway.
    pub token: String,
    /// Total amount.
    pub amount: Amount,
    /// Customer account.
    #[serde(default)]
    pub account: Option<String>,
    /// Customer phone.
    #[serde(default)]
    pub phone: Option<String>,
    /// Transaction type label.
    #[serde(default)]
    pub transaction_type: Option<String>,
    /// Per-partner sub-transactions.
    #[serde(default)]
    pub sub_transactions: Option<Vec<SubTransaction>>,
}

impl CallbackEnvelope for MarketplaceCallback {
    const FLOW: SignableFlow = SignableFlow::MarketplaceCallback;

    fn order_id(&self) -> &str {
        &self.order_id
    }

    fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    fn supplied_token(&self) -> &str {
        &self.token
    }

    /// An absent sub-transaction list signs as empty, except on `ok` where it
    /// is required and left missing so canonicalization rejects it.
    fn signable_fields(&self) -> SignableFields<'_> {
        let sub_transactions = match (&self.sub_transactions, &self.status) {
            (Some(subs), _) => Some(subs.as_slice()),
            (None, PaymentStatus::Ok) => None,
            (None, _) => Some(&[][..]),
        };
        SignableFields {
            order_id: Some(&self.order_id),
            transaction_id: Some(&self.transaction_id),
            status: Some(self.status.as_str()),
            amount: Some(self.amount.as_str()),
            sub_transactions,
            ..SignableFields::default()
        }
    }

    fn action(&self) -> CallbackAction {
        CallbackAction::for_payment_status(&self.status)
    }
}

/// Tokenization callback.
///
/// ```json
/// {
///   "code": 1,
///   "message": "success",
///   "reason_code": "",
///   "payload": {
///     "transactionId": 42,
///     "orderId": "o-1",
///     "token": "…",
///     "account": "4444",
///     "status": "ok",
///     "transaction_type": "tokenization"
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizationCallback {
    /// Result code, see [`TokenizationCode`].
    pub code: i64,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Rejection reason.
    #[serde(default)]
    pub reason_code: Option<String>,
    /// Transaction details.
    pub payload: TokenizationCallbackPayload,
}

impl TokenizationCallback {
    /// Returns the decoded result code.
    #[must_use]
    pub const fn tokenization_code(&self) -> TokenizationCode {
        TokenizationCode::from_code(self.code)
    }
}

/// Inner payload of a [`TokenizationCallback`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenizationCallbackPayload {
    /// Gateway transaction id.
    #[serde(rename = "transactionId", deserialize_with = "string_or_number")]
    pub transaction_id: String,
    /// Merchant order id.
    #[serde(rename = "orderId", deserialize_with = "string_or_number")]
    pub order_id: String,
    /// Signature supplied by the gateway.
    pub token: String,
    /// Tokenized account (masked by the gateway).
    #[serde(default)]
    pub account: String,
    /// Status string.
    #[serde(default)]
    pub status: String,
    /// Transaction type label.
    #[serde(default)]
    pub transaction_type: Option<String>,
}

impl CallbackEnvelope for TokenizationCallback {
    const FLOW: SignableFlow = SignableFlow::TokenizationCallback;

    fn order_id(&self) -> &str {
        &self.payload.order_id
    }

    fn transaction_id(&self) -> &str {
        &self.payload.transaction_id
    }

    fn supplied_token(&self) -> &str {
        &self.payload.token
    }

    fn signable_fields(&self) -> SignableFields<'_> {
        SignableFields {
            order_id: Some(&self.payload.order_id),
            transaction_id: Some(&self.payload.transaction_id),
            status: Some(&self.payload.status),
            code: Some(self.code),
            account: Some(&self.payload.account),
            ..SignableFields::default()
        }
    }

    fn action(&self) -> CallbackAction {
        let reason = self
            .reason_code
            .as_deref()
            .filter(|r| !r.is_empty())
            .or_else(|| Some(self.message.as_str()).filter(|m| !m.is_empty()));
        CallbackAction::for_tokenization_code(self.tokenization_code(), reason)
    }
}

/// Accepts ids sent either as JSON strings or JSON integers.
pub(crate) fn string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    id_text(serde_json::Value::deserialize(deserializer)?)
}

/// Like [`string_or_number`], with `null` or an absent field as `None`.
pub(crate) fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => Ok(None),
        value => id_text(value).map(Some),
    }
}

fn id_text<E: de::Error>(value: serde_json::Value) -> Result<String, E> {
    match value {
        serde_json::Value::String(text) => Ok(text),
        serde_json::Value::Number(number) => Ok(number.to_string()),
        other => Err(E::invalid_type(
            de::Unexpected::Other(&other.to_string()),
            &"a string or integer id",
        )),
    }
}
