//! Request models for the outbound flows.
//!
//! Each model carries the caller-supplied fields with their exact wire names.
//! The `key` and `token` fields are not part of the models: they are added by
//! [`RequestAssembler`](super::RequestAssembler).

use serde::{Deserialize, Serialize};

use crate::{
    amount::Amount,
    signing::{SignableFields, SignableFlow},
};

/// Gateway path for payment, tokenization, and marketplace requests.
pub const PAYMENT_PATH: &str = "/v2/";
/// Gateway path for delivery confirmation of held payments.
pub const CONFIRM_DELIVERY_PATH: &str = "/confirm-delivery";
/// Gateway path for delivery confirmation of Visa/Mastercard marketplace payments.
pub const CONFIRM_VSA_MCR_DELIVERY_PATH: &str = "/confirm-vsa-and-mcr-delivery";
/// Gateway path for order status checks.
pub const CHECK_ORDER_PATH: &str = "/checktxn";

/// A request that can be signed and sent to the gateway.
pub trait SignableRequest: Serialize {
    /// Canonicalization rule for this request.
    const FLOW: SignableFlow;

    /// Path relative to the gateway base URL.
    const PATH: &'static str;

    /// JSON object that receives `key` and `token`, `None` for the top level.
    const CREDENTIAL_WRAPPER: Option<&'static str> = None;

    /// Whether the request is a marketplace split payment.
    const MARKETPLACE: bool = false;

    /// Field values that take part in the signature.
    ///
    /// Empty required values are reported as absent so canonicalization
    /// rejects them.
    fn signable_fields(&self) -> SignableFields<'_>;

    /// Value of the `gate` header. Empty means not applicable.
    fn gate(&self) -> &str {
        ""
    }
}

fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Standard payment, or payment through an external gateway.
///
/// # Examples
///
/// ```
/// use alifpay::{Amount, gateway::PaymentRequest};
///
/// # fn example() -> alifpay::Result<()> {
/// let request = PaymentRequest {
///     gate: Some("korti_milli".to_owned()),
///     ..PaymentRequest::new(
///         "321123",
///         Amount::new("2.99")?,
///         "https://shop.tj/cb",
///         "https://shop.tj/done",
///     )
/// };
/// # let _ = request;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Merchant order id.
    pub order_id: String,
    /// Amount to charge.
    pub amount: Amount,
    /// URL the gateway posts the payment callback to.
    pub callback_url: String,
    /// URL the customer is sent back to.
    pub return_url: String,
    /// Customer email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Customer phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Free-form description shown to the customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Payment method, for example `korti_milli`, `wallet` or `vsa`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gate: Option<String>,
    /// Payment deadline for cash payments through the invoice gate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    /// Itemized invoice, mandatory when enabled for the terminal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoices: Option<Invoices>,
}

impl PaymentRequest {
    /// Creates a request with the mandatory fields.
    #[must_use]
    #[allow(
        clippy::impl_trait_in_params,
        reason = "impl Into<String> is idiomatic for builder methods"
    )]
    pub fn new(
        order_id: impl Into<String>,
        amount: Amount,
        callback_url: impl Into<String>,
        return_url: impl Into<String>,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            amount,
            callback_url: callback_url.into(),
            return_url: return_url.into(),
            email: None,
            phone: None,
            info: None,
            gate: None,
            deadline: None,
            invoices: None,
        }
    }
}

impl SignableRequest for PaymentRequest {
    const FLOW: SignableFlow = SignableFlow::Payment;
    const PATH: &'static str = PAYMENT_PATH;

    fn signable_fields(&self) -> SignableFields<'_> {
        SignableFields {
            order_id: non_empty(&self.order_id),
            amount: Some(self.amount.as_str()),
            callback_url: non_empty(&self.callback_url),
            ..SignableFields::default()
        }
    }

    fn gate(&self) -> &str {
        self.gate.as_deref().unwrap_or_default()
    }
}

/// Invoice attached to a [`PaymentRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoices {
    /// Invoice lines.
    pub invoices: Vec<Invoice>,
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    /// Item name.
    pub name: String,
    /// Item category.
    pub category: String,
    /// Number of units.
    pub quantity: u32,
    /// Unit price.
    pub price: Amount,
    /// VAT rate in percent.
    pub vat_percent: String,
}

/// Tokenization of a card or wallet.
///
/// The gateway expects every field, including `key` and `token`, inside a
/// `data` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizationRequest {
    /// Tokenization parameters.
    pub data: TokenizationData,
}

/// Parameters of a [`TokenizationRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizationData {
    /// Merchant order id.
    #[serde(rename = "orderId")]
    pub order_id: String,
    /// URL the gateway posts the tokenization callback to.
    #[serde(rename = "callbackURL")]
    pub callback_url: String,
    /// URL the customer is sent back to.
    #[serde(rename = "returnURL")]
    pub return_url: String,
    /// Customer phone.
    pub phone: String,
    /// Tokenization type, for example `tokenization_korti_milli`.
    pub gate: String,
    /// Merchant-side customer id.
    #[serde(rename = "clientID")]
    pub client_id: String,
}

impl SignableRequest for TokenizationRequest {
    const FLOW: SignableFlow = SignableFlow::Tokenization;
    const PATH: &'static str = PAYMENT_PATH;
    const CREDENTIAL_WRAPPER: Option<&'static str> = Some("data");

    fn signable_fields(&self) -> SignableFields<'_> {
        SignableFields {
            phone: non_empty(&self.data.phone),
            gate: Some(&self.data.gate),
            ..SignableFields::default()
        }
    }

    fn gate(&self) -> &str {
        &self.data.gate
    }
}

/// Marketplace payment split between partner terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplacePaymentRequest {
    /// Merchant order id.
    pub order_id: String,
    /// Total amount.
    pub amount: Amount,
    /// URL the gateway posts the marketplace callback to.
    pub callback_url: String,
    /// URL the customer is sent back to.
    pub return_url: String,
    /// Customer email.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Customer phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
    /// Split per partner terminal.
    #[serde(rename = "mpTerminalInfo")]
    pub mp_terminal_info: Vec<MpTerminalInfo>,
    /// Payment method, sent only as the `gate` header.
    #[serde(skip)]
    pub gate: String,
}

impl SignableRequest for MarketplacePaymentRequest {
    const FLOW: SignableFlow = SignableFlow::MarketplacePayment;
    const PATH: &'static str = PAYMENT_PATH;
    const MARKETPLACE: bool = true;

    fn signable_fields(&self) -> SignableFields<'_> {
        SignableFields {
            order_id: non_empty(&self.order_id),
            amount: Some(self.amount.as_str()),
            callback_url: non_empty(&self.callback_url),
            ..SignableFields::default()
        }
    }

    fn gate(&self) -> &str {
        &self.gate
    }
}

/// Share of a marketplace payment for one partner terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MpTerminalInfo {
    /// Partner terminal id.
    pub terminal_id: String,
    /// Partner share.
    pub amount: Amount,
    /// Payout condition configured with the gateway.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<i64>,
    /// Items sold by the partner.
    pub invoices: Vec<MarketplaceInvoice>,
}

/// Item sold by a marketplace partner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketplaceInvoice {
    /// Item name.
    pub name: String,
    /// Item category.
    pub category: String,
    /// Number of units.
    pub quantity: u32,
    /// Unit price.
    pub price: Amount,
}

/// Confirms delivery of a held payment (every payment method except VSA/MCR).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmDeliveryRequest {
    /// Gateway transaction id of the held payment.
    pub transaction_id: String,
    /// Amount to capture.
    pub amount: Amount,
}

impl SignableRequest for ConfirmDeliveryRequest {
    const FLOW: SignableFlow = SignableFlow::ConfirmDelivery;
    const PATH: &'static str = CONFIRM_DELIVERY_PATH;

    fn signable_fields(&self) -> SignableFields<'_> {
        SignableFields {
            transaction_id: non_empty(&self.transaction_id),
            amount: Some(self.amount.as_str()),
            ..SignableFields::default()
        }
    }
}

/// Confirms delivery of a Visa/Mastercard marketplace payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmVsaMcrDeliveryRequest {
    /// Gateway transaction id of the parent payment.
    pub parent_transaction_id: String,
    /// Sub-transactions to capture.
    pub extra: Vec<VsaMcrDeliveryTransaction>,
}

impl SignableRequest for ConfirmVsaMcrDeliveryRequest {
    const FLOW: SignableFlow = SignableFlow::ConfirmVsaMcrDelivery;
    const PATH: &'static str = CONFIRM_VSA_MCR_DELIVERY_PATH;

    fn signable_fields(&self) -> SignableFields<'_> {
        SignableFields {
            parent_transaction_id: non_empty(&self.parent_transaction_id),
            ..SignableFields::default()
        }
    }
}

/// Sub-transaction captured by a [`ConfirmVsaMcrDeliveryRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VsaMcrDeliveryTransaction {
    /// Sub-transaction id.
    pub transaction_id: String,
    /// Amount to capture.
    pub amount: Amount,
}

/// Asks the gateway for the current status of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOrderRequest {
    /// Merchant order id.
    #[serde(rename = "orderId")]
    pub order_id: String,
}

impl SignableRequest for CheckOrderRequest {
    const FLOW: SignableFlow = SignableFlow::CheckOrder;
    const PATH: &'static str = CHECK_ORDER_PATH;

    fn signable_fields(&self) -> SignableFields<'_> {
        SignableFields { order_id: non_empty(&self.order_id), ..SignableFields::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_request_wire_names() {
        let request = PaymentRequest {
            email: Some("a@b.tj".to_owned()),
            ..PaymentRequest::new("321123", Amount::new("2.99").unwrap(), "cb", "ret")
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["order_id"], "321123");
        assert_eq!(json["amount"], "2.99");
        assert_eq!(json["callback_url"], "cb");
        assert_eq!(json["return_url"], "ret");
        assert_eq!(json["email"], "a@b.tj");
        assert!(json.get("phone").is_none());
        assert!(json.get("gate").is_none());
    }

    #[test]
    fn test_payment_without_gate_sends_empty_gate_header() {
        let request = PaymentRequest::new("1", Amount::new("1").unwrap(), "cb", "ret");
        assert_eq!(request.gate(), "");
    }

    #[test]
    fn test_tokenization_wire_names() {
        let request = TokenizationRequest {
            data: TokenizationData {
                order_id: "o-1".to_owned(),
                callback_url: "cb".to_owned(),
                return_url: "ret".to_owned(),
                phone: "992921223100".to_owned(),
                gate: "tokenization_wallet".to_owned(),
                client_id: "c-9".to_owned(),
            },
        };

        let json = serde_json::to_value(&request).unwrap();
        let data = &json["data"];
        assert_eq!(data["orderId"], "o-1");
        assert_eq!(data["callbackURL"], "cb");
        assert_eq!(data["returnURL"], "ret");
        assert_eq!(data["clientID"], "c-9");
    }

    #[test]
    fn test_marketplace_gate_is_header_only() {
        let request = MarketplacePaymentRequest {
            order_id: "m-1".to_owned(),
            amount: Amount::new("100").unwrap(),
            callback_url: "cb".to_owned(),
            return_url: "ret".to_owned(),
            email: None,
            phone: None,
            info: None,
            mp_terminal_info: vec![MpTerminalInfo {
                terminal_id: "P1".to_owned(),
                amount: Amount::new("100").unwrap(),
                condition_id: None,
                invoices: vec![],
            }],
            gate: "vsa".to_owned(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("gate").is_none());
        assert_eq!(json["mpTerminalInfo"][0]["terminal_id"], "P1");
        assert!(json["mpTerminalInfo"][0].get("condition_id").is_none());
        assert_eq!(request.gate(), "vsa");
    }

    #[test]
    fn test_empty_required_values_are_absent() {
        let request = CheckOrderRequest { order_id: String::new() };
        assert!(request.signable_fields().order_id.is_none());

        let request = ConfirmVsaMcrDeliveryRequest {
            parent_transaction_id: String::new(),
            extra: vec![],
        };
        assert!(request.signable_fields().parent_transaction_id.is_none());
    }

    #[test]
    fn test_flows_without_gate_send_empty_gate() {
        let request = ConfirmDeliveryRequest {
            transaction_id: "t".to_owned(),
            amount: Amount::new("1").unwrap(),
        };
        assert_eq!(request.gate(), "");
        assert_eq!(CheckOrderRequest { order_id: "o".to_owned() }.gate(), "");
    }
}
