//! Canonical "data to sign" strings.
//!
//! Every flow signs the terminal id followed by a fixed list of field values,
//! concatenated with no separator. The order is part of the gateway contract.
//!
//! | Flow | Field order |
//! |---|---|
//! | Payment | terminal id, order id, amount, callback URL |
//! | Tokenization | terminal id, phone, gate |
//! | Marketplace payment | terminal id, order id, amount, callback URL |
//! | Confirm delivery | terminal id, transaction id, amount |
//! | Confirm VSA/MCR delivery | terminal id, parent transaction id |
//! | Check order | terminal id, order id |
//! | Payment callback | terminal id, order id, status, transaction id, amount |
//! | Tokenization callback | terminal id, order id, status, transaction id, code, account |
//! | Marketplace callback | terminal id, order id, status, transaction id, amount, subs |
//!
//! Callback orders are not published by the gateway. The leading
//! `order id, status, transaction id` follows the order in which the gateway's
//! PHP SDK feeds a callback into its token check. The trailing fields are
//! appended in payload order so that they are covered by the token too.
//!
//! Subs (marketplace sub-transactions) render as
//! `terminal_id + transaction_id + status` for each entry, in delivery order.

use std::fmt;

use crate::{
    callback::SubTransaction,
    error::{GatewayError, Result},
};

/// Selects the canonicalization rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignableFlow {
    /// Standard payment or payment through an external gateway.
    Payment,
    /// Card or wallet tokenization.
    Tokenization,
    /// Payment split across partner terminals.
    MarketplacePayment,
    /// Release of a held payment.
    ConfirmDelivery,
    /// Release of a held Visa/Mastercard marketplace payment.
    ConfirmVsaMcrDelivery,
    /// Order status lookup.
    CheckOrder,
    /// Asynchronous payment notification.
    PaymentCallback,
    /// Asynchronous tokenization notification.
    TokenizationCallback,
    /// Asynchronous marketplace payment notification.
    MarketplaceCallback,
}

/// A field that can take part in a signable string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignableField {
    /// Merchant order id.
    OrderId,
    /// Amount text.
    Amount,
    /// Merchant callback URL.
    CallbackUrl,
    /// Customer phone.
    Phone,
    /// Gate (payment method) identifier.
    Gate,
    /// Gateway transaction id.
    TransactionId,
    /// Parent transaction of a VSA/MCR marketplace payment.
    ParentTransactionId,
    /// Callback status string.
    Status,
    /// Tokenization result code.
    Code,
    /// Customer account.
    Account,
    /// Marketplace sub-transactions.
    SubTransactions,
}

impl SignableField {
    /// Internal field name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::OrderId => "order_id",
            Self::Amount => "amount",
            Self::CallbackUrl => "callback_url",
            Self::Phone => "phone",
            Self::Gate => "gate",
            Self::TransactionId => "transaction_id",
            Self::ParentTransactionId => "parent_transaction_id",
            Self::Status => "status",
            Self::Code => "code",
            Self::Account => "account",
            Self::SubTransactions => "sub_transactions",
        }
    }
}

impl SignableFlow {
    /// Fields signed after the terminal id, in order.
    ///
    /// Callback orders are inferred from the PHP SDK, not from published
    /// documentation; see the module table.
    #[must_use]
    pub const fn field_order(self) -> &'static [SignableField] {
        use SignableField::{
            Account, Amount, CallbackUrl, Code, Gate, OrderId, ParentTransactionId, Phone,
            Status, SubTransactions, TransactionId,
        };

        match self {
            Self::Payment | Self::MarketplacePayment => &[OrderId, Amount, CallbackUrl],
            Self::Tokenization => &[Phone, Gate],
            Self::ConfirmDelivery => &[TransactionId, Amount],
            Self::ConfirmVsaMcrDelivery => &[ParentTransactionId],
            Self::CheckOrder => &[OrderId],
            Self::PaymentCallback => &[OrderId, Status, TransactionId, Amount],
            Self::TokenizationCallback => &[OrderId, Status, TransactionId, Code, Account],
            Self::MarketplaceCallback => {
                &[OrderId, Status, TransactionId, Amount, SubTransactions]
            }
        }
    }

    /// Returns `true` for inbound callback flows.
    #[must_use]
    pub const fn is_callback(self) -> bool {
        matches!(
            self,
            Self::PaymentCallback | Self::TokenizationCallback | Self::MarketplaceCallback
        )
    }
}

impl fmt::Display for SignableFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Payment => "payment",
            Self::Tokenization => "tokenization",
            Self::MarketplacePayment => "marketplace payment",
            Self::ConfirmDelivery => "confirm delivery",
            Self::ConfirmVsaMcrDelivery => "confirm VSA/MCR delivery",
            Self::CheckOrder => "check order",
            Self::PaymentCallback => "payment callback",
            Self::TokenizationCallback => "tokenization callback",
            Self::MarketplaceCallback => "marketplace callback",
        })
    }
}

/// Field values available for signing.
///
/// Uniform internal names; each request or callback type fills in what it has
/// and the flow's field order decides what is required.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignableFields<'a> {
    /// Merchant order id.
    pub order_id: Option<&'a str>,
    /// Amount text, exactly as sent.
    pub amount: Option<&'a str>,
    /// Merchant callback URL.
    pub callback_url: Option<&'a str>,
    /// Customer phone.
    pub phone: Option<&'a str>,
    /// Gate identifier; an empty string is a valid value.
    pub gate: Option<&'a str>,
    /// Gateway transaction id.
    pub transaction_id: Option<&'a str>,
    /// Parent transaction id.
    pub parent_transaction_id: Option<&'a str>,
    /// Callback status string as received.
    pub status: Option<&'a str>,
    /// Tokenization result code.
    pub code: Option<i64>,
    /// Customer account.
    pub account: Option<&'a str>,
    /// Marketplace sub-transactions.
    pub sub_transactions: Option<&'a [SubTransaction]>,
}

/// Builds the signable string for `flow`.
///
/// # Errors
///
/// Returns [`GatewayError::MissingField`] naming the first required field that
/// is absent.
///
/// # Examples
///
/// ```
/// use alifpay::signing::{SignableFields, SignableFlow, build_signable_string};
///
/// let fields = SignableFields {
///     order_id: Some("321123"),
///     amount: Some("2.99"),
///     callback_url: Some("http://shop/cb"),
///     ..SignableFields::default()
/// };
///
/// let data = build_signable_string(SignableFlow::Payment, &fields, "T1").unwrap();
/// assert_eq!(data, "T13211232.99http://shop/cb");
/// ```
pub fn build_signable_string(
    flow: SignableFlow,
    fields: &SignableFields<'_>,
    terminal_id: &str,
) -> Result<String> {
    let mut data = String::from(terminal_id);

    for &field in flow.field_order() {
        let missing = || GatewayError::MissingField { field: field.name(), flow };
        match field {
            SignableField::Code => {
                let code = fields.code.ok_or_else(missing)?;
                data.push_str(&code.to_string());
            }
            SignableField::SubTransactions => {
                for sub in fields.sub_transactions.ok_or_else(missing)? {
                    data.push_str(&sub.terminal_id);
                    data.push_str(&sub.transaction_id);
                    data.push_str(&sub.status);
                }
            }
            text_field => {
                let value = text_value(fields, text_field).ok_or_else(missing)?;
                data.push_str(value);
            }
        }
    }

    Ok(data)
}

fn text_value<'a>(fields: &SignableFields<'a>, field: SignableField) -> Option<&'a str> {
    match field {
        SignableField::OrderId => fields.order_id,
        SignableField::Amount => fields.amount,
        SignableField::CallbackUrl => fields.callback_url,
        SignableField::Phone => fields.phone,
        SignableField::Gate => fields.gate,
        SignableField::TransactionId => fields.transaction_id,
        SignableField::ParentTransactionId => fields.parent_transaction_id,
        SignableField::Status => fields.status,
        SignableField::Account => fields.account,
        SignableField::Code | SignableField::SubTransactions => None,
    }
}
