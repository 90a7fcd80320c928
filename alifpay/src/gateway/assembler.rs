//! Signed request assembly.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::{
    error::{GatewayError, Result},
    gateway::request::SignableRequest,
    security::audit::{AuditEvent, AuditEventType, audit_log},
    signing::{Credential, SignableFlow, Signer, build_signable_string},
};

/// Header carrying the payment method.
pub const GATE_HEADER: &str = "gate";
/// Header flagging marketplace split payments.
pub const MARKETPLACE_HEADER: &str = "isMarketPlace";

/// A signed request, ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct SignedEnvelope {
    /// Flow the request was signed under.
    pub flow: SignableFlow,
    /// Path relative to the gateway base URL.
    pub path: &'static str,
    /// JSON body, with `key` and `token` in place.
    pub payload: Map<String, Value>,
    /// Lowercase hex token, 64 characters.
    pub token: String,
    /// Routing headers (`gate`, `isMarketPlace`).
    pub headers: BTreeMap<String, String>,
}

impl SignedEnvelope {
    /// Serializes the payload to JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidInput`] if serialization fails.
    pub fn body(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.payload)
            .map_err(|e| GatewayError::InvalidInput(format!("cannot serialize request: {e}")))
    }
}

/// Builds signed envelopes for one terminal.
///
/// Assembly is pure: it never touches the network.
///
/// # Examples
///
/// ```
/// use alifpay::{
///     Amount,
///     gateway::{PaymentRequest, RequestAssembler},
///     signing::Credential,
/// };
///
/// # fn example() -> alifpay::Result<()> {
/// let assembler = RequestAssembler::new(Credential::new("T1", "P1")?);
/// let request =
///     PaymentRequest::new("321123", Amount::new("2.99")?, "http://shop/cb", "http://shop/done");
///
/// let envelope = assembler.assemble(&request)?;
/// assert_eq!(envelope.payload["key"], "T1");
/// assert_eq!(envelope.payload["token"], envelope.token.as_str());
/// assert_eq!(envelope.headers["gate"], "");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RequestAssembler {
    credential: Credential,
}

impl RequestAssembler {
    /// Creates an assembler signing with `credential`.
    #[must_use]
    pub const fn new(credential: Credential) -> Self {
        Self { credential }
    }

    /// Returns the terminal id used as `key`.
    #[must_use]
    pub fn terminal_id(&self) -> &str {
        self.credential.terminal_id()
    }

    /// Returns the signing credential.
    #[must_use]
    pub const fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Signs `request` and builds its envelope.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::MissingField`] if a signed field is absent or empty
    /// - [`GatewayError::InvalidInput`] if the request does not serialize to a
    ///   JSON object
    #[instrument(skip_all, fields(flow = %R::FLOW))]
    pub fn assemble<R: SignableRequest>(&self, request: &R) -> Result<SignedEnvelope> {
        let fields = request.signable_fields();
        let data = build_signable_string(R::FLOW, &fields, self.terminal_id())?;
        let token = Signer.sign(&data, &self.credential);

        let mut payload = match serde_json::to_value(request) {
            Ok(Value::Object(map)) => map,
            Ok(_) => {
                return Err(GatewayError::InvalidInput(format!(
                    "{} request must serialize to a JSON object",
                    R::FLOW
                )));
            }
            Err(e) => {
                return Err(GatewayError::InvalidInput(format!("cannot serialize request: {e}")));
            }
        };

        let target = match R::CREDENTIAL_WRAPPER {
            None => &mut payload,
            Some(wrapper) => match payload.get_mut(wrapper) {
                Some(Value::Object(inner)) => inner,
                _ => {
                    return Err(GatewayError::InvalidInput(format!(
                        "{} request has no `{wrapper}` object",
                        R::FLOW
                    )));
                }
            },
        };
        target.insert("key".to_owned(), Value::String(self.terminal_id().to_owned()));
        target.insert("token".to_owned(), Value::String(token.clone()));

        let mut headers = BTreeMap::new();
        headers.insert(GATE_HEADER.to_owned(), request.gate().to_owned());
        if R::MARKETPLACE {
            headers.insert(MARKETPLACE_HEADER.to_owned(), "true".to_owned());
        }

        debug!(path = R::PATH, "request signed");
        let mut event =
            AuditEvent::new(AuditEventType::RequestSigned, self.terminal_id()).with_flow(R::FLOW);
        if let Some(order_id) = fields.order_id {
            event = event.with_order_id(order_id);
        }
        audit_log(&event);

        Ok(SignedEnvelope { flow: R::FLOW, path: R::PATH, payload, token, headers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Amount,
        gateway::request::{
            CheckOrderRequest, ConfirmDeliveryRequest, ConfirmVsaMcrDeliveryRequest,
            MarketplacePaymentRequest, PaymentRequest, TokenizationData, TokenizationRequest,
            VsaMcrDeliveryTransaction,
        },
    };

    fn assembler() -> RequestAssembler {
        RequestAssembler::new(Credential::new("T1", "P1").unwrap())
    }

    #[test]
    fn test_payment_envelope_matches_reference_token() {
        let request =
            PaymentRequest::new("321123", Amount::new("2.99").unwrap(), "http://shop/cb", "r");

        let envelope = assembler().assemble(&request).unwrap();

        assert_eq!(
            envelope.token,
            "74784eff67a6f4684cf32231987205894c864924fa92d47c063fa8e8c69e245a"
        );
        assert_eq!(envelope.payload["key"], "T1");
        assert_eq!(envelope.payload["token"], envelope.token.as_str());
        assert_eq!(envelope.payload["amount"], "2.99");
        assert_eq!(envelope.path, "/v2/");
        assert_eq!(envelope.headers.get("gate").map(String::as_str), Some(""));
        assert!(!envelope.headers.contains_key("isMarketPlace"));
    }

    #[test]
    fn test_amount_text_is_preserved() {
        let request = PaymentRequest::new("1", Amount::new("2.90").unwrap(), "cb", "r");
        let envelope = assembler().assemble(&request).unwrap();
        assert_eq!(envelope.payload["amount"], "2.90");

        let reformatted = PaymentRequest::new("1", Amount::new("2.9").unwrap(), "cb", "r");
        assert_ne!(assembler().assemble(&reformatted).unwrap().token, envelope.token);
    }

    #[test]
    fn test_tokenization_credentials_inside_data() {
        let request = TokenizationRequest {
            data: TokenizationData {
                order_id: "o-1".to_owned(),
                callback_url: "cb".to_owned(),
                return_url: "r".to_owned(),
                phone: "992921223100".to_owned(),
                gate: "tokenization_wallet".to_owned(),
                client_id: "c".to_owned(),
            },
        };

        let envelope = assembler().assemble(&request).unwrap();

        assert!(envelope.payload.get("key").is_none());
        assert!(envelope.payload.get("token").is_none());
        assert_eq!(envelope.payload["data"]["key"], "T1");
        assert_eq!(envelope.payload["data"]["token"], envelope.token.as_str());
        assert_eq!(envelope.headers["gate"], "tokenization_wallet");
    }

    #[test]
    fn test_tokenization_with_empty_gate_signs() {
        let request = TokenizationRequest {
            data: TokenizationData {
                order_id: "o-1".to_owned(),
                callback_url: "cb".to_owned(),
                return_url: "r".to_owned(),
                phone: "992921223100".to_owned(),
                gate: String::new(),
                client_id: "c".to_owned(),
            },
        };

        let envelope = assembler().assemble(&request).unwrap();
        assert_eq!(envelope.headers["gate"], "");
    }

    #[test]
    fn test_marketplace_headers() {
        let request = MarketplacePaymentRequest {
            order_id: "m-1".to_owned(),
            amount: Amount::new("100.00").unwrap(),
            callback_url: "cb".to_owned(),
            return_url: "r".to_owned(),
            email: None,
            phone: None,
            info: None,
            mp_terminal_info: vec![],
            gate: "korti_milli".to_owned(),
        };

        let envelope = assembler().assemble(&request).unwrap();

        assert_eq!(envelope.headers["gate"], "korti_milli");
        assert_eq!(envelope.headers["isMarketPlace"], "true");
        assert!(envelope.payload.get("gate").is_none());
    }

    #[test]
    fn test_confirmations_send_empty_gate() {
        let confirm = ConfirmDeliveryRequest {
            transaction_id: "77".to_owned(),
            amount: Amount::new("2.99").unwrap(),
        };
        let envelope = assembler().assemble(&confirm).unwrap();
        assert_eq!(envelope.headers.len(), 1);
        assert_eq!(envelope.headers["gate"], "");
        assert_eq!(envelope.path, "/confirm-delivery");

        let vsa = ConfirmVsaMcrDeliveryRequest {
            parent_transaction_id: "p-1".to_owned(),
            extra: vec![VsaMcrDeliveryTransaction {
                transaction_id: "s-1".to_owned(),
                amount: Amount::new("1").unwrap(),
            }],
        };
        let envelope = assembler().assemble(&vsa).unwrap();
        assert!(!envelope.headers.contains_key("isMarketPlace"));
        assert_eq!(envelope.payload["extra"][0]["transaction_id"], "s-1");
    }

    #[test]
    fn test_missing_order_id_is_reported() {
        let request = CheckOrderRequest { order_id: String::new() };

        let err = assembler().assemble(&request).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::MissingField { field: "order_id", flow: SignableFlow::CheckOrder }
        ));
    }

    #[test]
    fn test_check_order_wire_shape() {
        let envelope =
            assembler().assemble(&CheckOrderRequest { order_id: "321123".to_owned() }).unwrap();

        assert_eq!(envelope.payload["orderId"], "321123");
        assert_eq!(envelope.path, "/checktxn");
        let body: Value = serde_json::from_slice(&envelope.body().unwrap()).unwrap();
        assert_eq!(body["key"], "T1");
    }
}
