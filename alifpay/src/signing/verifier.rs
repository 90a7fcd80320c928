//! Callback signature verification.

use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};

use crate::{
    callback::{
        CallbackAction, CallbackEnvelope, MarketplaceCallback, PaymentCallback,
        TokenizationCallback,
    },
    error::{GatewayError, Result},
    security::audit::{AuditEvent, AuditEventType, audit_log},
    signing::{Credential, SignableFields, SignableFlow, Signer, build_signable_string},
};

/// Verifies callbacks posted by the gateway.
///
/// The expected token is rebuilt from the callback fields with the same
/// canonicalization and signer used for outbound requests, then compared with
/// the supplied token in constant time. A callback that fails verification is
/// rejected as a whole: its status is never exposed.
///
/// # Examples
///
/// ```
/// use alifpay::{
///     callback::{CallbackAction, Outcome, PaymentCallback},
///     signing::{CallbackVerifier, Credential},
/// };
///
/// # fn example() -> alifpay::Result<()> {
/// let verifier = CallbackVerifier::new(Credential::new("T1", "P1")?);
///
/// let body = r#"{
///     "orderId": "321123",
///     "transactionId": "77",
///     "status": "ok",
///     "token": "forged",
///     "amount": "2.99"
/// }"#;
/// let callback: PaymentCallback = serde_json::from_str(body).unwrap();
///
/// assert!(verifier.verify(callback).is_err());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CallbackVerifier {
    credential: Credential,
}

impl CallbackVerifier {
    /// Creates a verifier for the terminal's callbacks.
    #[must_use]
    pub const fn new(credential: Credential) -> Self {
        Self { credential }
    }

    /// Verifies a decoded callback and maps its status to an action.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::MissingField`] if a field required for the signature is
    ///   absent (for example `sub_transactions` on a successful marketplace
    ///   callback)
    /// - [`GatewayError::Signature`] if the supplied token does not match
    #[instrument(
        skip_all,
        fields(
            flow = %E::FLOW,
            order_id = envelope.order_id(),
            transaction_id = envelope.transaction_id()
        )
    )]
    pub fn verify<E: CallbackEnvelope>(&self, envelope: E) -> Result<VerifiedCallback<E>> {
        self.verify_fields(E::FLOW, &envelope.signable_fields(), envelope.supplied_token())
            .inspect_err(|err| {
                if err.is_security_relevant() {
                    audit_log(
                        &AuditEvent::new(AuditEventType::SignatureRejected, self.terminal_id())
                            .with_flow(E::FLOW)
                            .with_order(envelope.order_id(), envelope.transaction_id())
                            .with_error(err.to_string()),
                    );
                }
            })?;

        let action = envelope.action();
        audit_log(
            &AuditEvent::new(AuditEventType::CallbackVerified, self.terminal_id())
                .with_flow(E::FLOW)
                .with_order(envelope.order_id(), envelope.transaction_id())
                .with_status(action.to_string()),
        );

        if let CallbackAction::Investigate(raw) = &action {
            warn!(status = %raw, "verified callback carries an unrecognized status");
            audit_log(
                &AuditEvent::new(AuditEventType::UnknownStatus, self.terminal_id())
                    .with_flow(E::FLOW)
                    .with_order(envelope.order_id(), envelope.transaction_id())
                    .with_status(raw),
            );
        }

        Ok(VerifiedCallback { envelope, action, terminal_id: self.terminal_id().to_owned() })
    }

    /// Verifies a payment callback.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub fn verify_payment(
        &self,
        callback: PaymentCallback,
    ) -> Result<VerifiedCallback<PaymentCallback>> {
        self.verify(callback)
    }

    /// Verifies a tokenization callback.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub fn verify_tokenization(
        &self,
        callback: TokenizationCallback,
    ) -> Result<VerifiedCallback<TokenizationCallback>> {
        self.verify(callback)
    }

    /// Verifies a marketplace callback.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify).
    pub fn verify_marketplace(
        &self,
        callback: MarketplaceCallback,
    ) -> Result<VerifiedCallback<MarketplaceCallback>> {
        self.verify(callback)
    }

    /// Checks `supplied_token` against the token for `fields` under `flow`.
    ///
    /// Lower-level form of [`verify`](Self::verify) for callers that decode
    /// callbacks into their own types.
    ///
    /// # Errors
    ///
    /// Same as [`verify`](Self::verify), plus [`GatewayError::InvalidInput`]
    /// if `flow` is an outbound request flow.
    pub fn verify_fields(
        &self,
        flow: SignableFlow,
        fields: &SignableFields<'_>,
        supplied_token: &str,
    ) -> Result<()> {
        if !flow.is_callback() {
            return Err(GatewayError::InvalidInput(format!("{flow} is not a callback flow")));
        }

        let data = build_signable_string(flow, fields, self.credential.terminal_id())?;
        let expected = Signer.sign(&data, &self.credential);

        if tokens_match(&expected, supplied_token) {
            debug!("callback signature verified");
            Ok(())
        } else {
            warn!(%flow, "callback signature mismatch");
            Err(GatewayError::Signature { flow })
        }
    }

    fn terminal_id(&self) -> &str {
        self.credential.terminal_id()
    }
}

/// Compares two tokens in constant time.
///
/// Tokens of different length never match.
#[must_use]
pub fn tokens_match(expected: &str, supplied: &str) -> bool {
    expected.as_bytes().ct_eq(supplied.as_bytes()).into()
}

/// A callback whose signature has been checked.
///
/// Only [`CallbackVerifier`] can build this type, so holding one proves the
/// status inside may be acted on.
#[derive(Debug, Clone)]
pub struct VerifiedCallback<E> {
    envelope: E,
    action: CallbackAction,
    terminal_id: String,
}

impl<E: CallbackEnvelope> VerifiedCallback<E> {
    /// The verified payload.
    #[must_use]
    pub const fn envelope(&self) -> &E {
        &self.envelope
    }

    /// Action implied by the verified status.
    #[must_use]
    pub const fn action(&self) -> &CallbackAction {
        &self.action
    }

    /// Callback flow.
    #[must_use]
    pub const fn flow(&self) -> SignableFlow {
        E::FLOW
    }

    /// Merchant order id.
    #[must_use]
    pub fn order_id(&self) -> &str {
        self.envelope.order_id()
    }

    /// Gateway transaction id.
    #[must_use]
    pub fn transaction_id(&self) -> &str {
        self.envelope.transaction_id()
    }

    /// Terminal whose credential verified the callback.
    #[must_use]
    pub fn terminal_id(&self) -> &str {
        &self.terminal_id
    }

    /// Returns the verified payload.
    #[must_use]
    pub fn into_envelope(self) -> E {
        self.envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Amount,
        callback::{
            MarketplaceCallback, Outcome, PaymentCallback, PaymentStatus, SubTransaction,
            TokenizationCallback, TokenizationCallbackPayload,
        },
    };

    fn credential() -> Credential {
        Credential::new("T1", "P1").unwrap()
    }

    fn signed_payment(status: &str, amount: &str) -> PaymentCallback {
        let mut callback = PaymentCallback {
            order_id: "321123".to_owned(),
            transaction_id: "77".to_owned(),
            status: PaymentStatus::parse(status),
            token: String::new(),
            amount: Amount::new(amount).unwrap(),
            account: None,
            phone: Some("+992921223100".to_owned()),
            transaction_type: None,
        };
        let data = build_signable_string(
            SignableFlow::PaymentCallback,
            &callback.signable_fields(),
            "T1",
        )
        .unwrap();
        callback.token = Signer.sign(&data, &credential());
        callback
    }

    #[test]
    fn test_verify_valid_payment_callback() {
        let verifier = CallbackVerifier::new(credential());
        let verified = verifier.verify(signed_payment("ok", "2.99")).unwrap();

        assert_eq!(verified.action(), &CallbackAction::Finalize(Outcome::Paid));
        assert_eq!(verified.order_id(), "321123");
        assert_eq!(verified.transaction_id(), "77");
        assert_eq!(verified.flow(), SignableFlow::PaymentCallback);
    }

    #[test]
    fn test_tampered_amount_is_rejected() {
        let verifier = CallbackVerifier::new(credential());
        let mut callback = signed_payment("ok", "2.99");
        callback.amount = Amount::new("299.00").unwrap();

        let err = verifier.verify(callback).unwrap_err();
        assert!(matches!(err, GatewayError::Signature { flow: SignableFlow::PaymentCallback }));
    }

    #[test]
    fn test_tampered_status_is_rejected() {
        let verifier = CallbackVerifier::new(credential());
        let mut callback = signed_payment("failed", "2.99");
        callback.status = PaymentStatus::Ok;

        assert!(matches!(verifier.verify(callback), Err(GatewayError::Signature { .. })));
    }

    #[test]
    fn test_unsigned_fields_do_not_affect_verification() {
        let verifier = CallbackVerifier::new(credential());
        let mut callback = signed_payment("ok", "2.99");
        callback.phone = Some("+992000000000".to_owned());

        assert!(verifier.verify(callback).is_ok());
    }

    #[test]
    fn test_other_terminal_cannot_forge() {
        let verifier = CallbackVerifier::new(Credential::new("T1", "other").unwrap());
        assert!(verifier.verify(signed_payment("ok", "2.99")).is_err());
    }

    #[test]
    fn test_uppercase_token_is_rejected() {
        let verifier = CallbackVerifier::new(credential());
        let mut callback = signed_payment("ok", "2.99");
        callback.token = callback.token.to_uppercase();

        assert!(verifier.verify(callback).is_err());
    }

    #[test]
    fn test_unknown_status_verifies_as_investigate() {
        let verifier = CallbackVerifier::new(credential());
        let verified = verifier.verify(signed_payment("refunded", "2.99")).unwrap();
        assert_eq!(verified.action(), &CallbackAction::Investigate("refunded".to_owned()));
    }

    #[test]
    fn test_tokenization_callback_code_is_signed() {
        let mut callback = TokenizationCallback {
            code: 9,
            message: "rejected".to_owned(),
            reason_code: Some("05".to_owned()),
            payload: TokenizationCallbackPayload {
                transaction_id: "42".to_owned(),
                order_id: "o-1".to_owned(),
                token: String::new(),
                account: "4444".to_owned(),
                status: "failed".to_owned(),
                transaction_type: None,
            },
        };
        let data = build_signable_string(
            SignableFlow::TokenizationCallback,
            &callback.signable_fields(),
            "T1",
        )
        .unwrap();
        callback.payload.token = Signer.sign(&data, &credential());

        let verifier = CallbackVerifier::new(credential());
        let verified = verifier.verify(callback.clone()).unwrap();
        assert_eq!(
            verified.action(),
            &CallbackAction::Finalize(Outcome::Failed { reason: Some("05".to_owned()) })
        );

        // Flipping the code to success must break the signature.
        callback.code = 1;
        assert!(matches!(verifier.verify(callback), Err(GatewayError::Signature { .. })));
    }

    #[test]
    fn test_marketplace_ok_without_subs_is_missing_field() {
        let callback = MarketplaceCallback {
            order_id: "m-1".to_owned(),
            transaction_id: "10".to_owned(),
            status: PaymentStatus::Ok,
            token: "whatever".to_owned(),
            amount: Amount::new("100").unwrap(),
            account: None,
            phone: None,
            transaction_type: None,
            sub_transactions: None,
        };

        let err = CallbackVerifier::new(credential()).verify(callback).unwrap_err();
        assert!(matches!(
            err,
            GatewayError::MissingField {
                field: "sub_transactions",
                flow: SignableFlow::MarketplaceCallback
            }
        ));
    }

    #[test]
    fn test_marketplace_sub_transaction_tamper_is_rejected() {
        let mut callback = MarketplaceCallback {
            order_id: "m-1".to_owned(),
            transaction_id: "10".to_owned(),
            status: PaymentStatus::Ok,
            token: String::new(),
            amount: Amount::new("100").unwrap(),
            account: None,
            phone: None,
            transaction_type: None,
            sub_transactions: Some(vec![SubTransaction {
                terminal_id: "P1".to_owned(),
                transaction_id: "11".to_owned(),
                status: "ok".to_owned(),
            }]),
        };
        let data = build_signable_string(
            SignableFlow::MarketplaceCallback,
            &callback.signable_fields(),
            "T1",
        )
        .unwrap();
        callback.token = Signer.sign(&data, &credential());

        let verifier = CallbackVerifier::new(credential());
        assert!(verifier.verify(callback.clone()).is_ok());

        if let Some(subs) = callback.sub_transactions.as_mut() {
            subs[0].terminal_id = "ATTACKER".to_owned();
        }
        assert!(verifier.verify(callback).is_err());
    }

    #[test]
    fn test_verify_fields_refuses_outbound_flows() {
        let fields = SignableFields {
            order_id: Some("321123"),
            amount: Some("2.99"),
            callback_url: Some("http://shop/cb"),
            ..SignableFields::default()
        };
        let token = Signer.sign("T13211232.99http://shop/cb", &credential());

        let err = CallbackVerifier::new(credential())
            .verify_fields(SignableFlow::Payment, &fields, &token)
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidInput(_)));
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "abcd"));
        assert!(!tokens_match("abc", ""));
    }
}
