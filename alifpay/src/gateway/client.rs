//! Gateway client.

use std::time::Instant;

use reqwest::Method;
use tracing::{info, instrument, warn};

use crate::{
    error::{GatewayError, Result},
    gateway::{
        assembler::{RequestAssembler, SignedEnvelope},
        config::ClientConfig,
        http::{HttpTransport, endpoint_url},
        request::{
            CheckOrderRequest, ConfirmDeliveryRequest, ConfirmVsaMcrDeliveryRequest,
            MarketplacePaymentRequest, PaymentRequest, SignableRequest, TokenizationRequest,
        },
        response::{GatewayResponse, OrderStatus, interpret, interpret_order_status},
        transport::{Transport, TransportRequest, TransportResponse},
    },
    reliability::{RetryPolicy, retry_with_backoff},
    security::audit::{AuditEvent, AuditEventType, audit_log},
    signing::{CallbackVerifier, Credential},
};

/// Client for the Alif payment gateway.
///
/// Each operation signs the request, posts it, and applies the dual-layer
/// success rule. Transport failures that produced no response (timeouts,
/// refused connections) are retried with the same signed body.
///
/// # Examples
///
/// ```rust,no_run
/// use alifpay::{
///     Amount,
///     gateway::{AlifClient, ClientConfig, PaymentRequest},
/// };
///
/// # async fn example() -> alifpay::Result<()> {
/// let config = ClientConfig::from_file("alifpay.toml")?;
/// let client = AlifClient::new(&config)?;
///
/// let request = PaymentRequest::new(
///     "321123",
///     Amount::new("2.99")?,
///     "https://shop.tj/alif/callback",
///     "https://shop.tj/order/321123",
/// );
/// let response = client.initiate_payment(&request).await?;
///
/// if let Some(url) = response.url {
///     println!("redirect the customer to {url}");
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AlifClient<T = HttpTransport> {
    base_url: String,
    assembler: RequestAssembler,
    transport: T,
    retry_policy: RetryPolicy,
}

impl AlifClient<HttpTransport> {
    /// Creates a client over HTTP from validated configuration.
    ///
    /// The terminal password is read from the variable named by
    /// `config.password_env`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the configuration is invalid
    /// or the password variable is unset, or [`GatewayError::Transport`] if
    /// the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let credential = config.credential()?;
        let transport = HttpTransport::with_config(&config.http)?;
        Self::with_transport(config, credential, transport)
    }
}

impl<T: Transport> AlifClient<T> {
    /// Creates a client over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if `config` is invalid.
    pub fn with_transport(
        config: &ClientConfig,
        credential: Credential,
        transport: T,
    ) -> Result<Self> {
        config.validate()?;
        if credential.terminal_id() != config.terminal_id {
            return Err(GatewayError::Configuration(format!(
                "credential terminal {} does not match configured terminal {}",
                credential.terminal_id(),
                config.terminal_id
            )));
        }

        Ok(Self {
            base_url: config.base_url.clone(),
            assembler: RequestAssembler::new(credential),
            transport,
            retry_policy: config.retry.clone(),
        })
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Returns the terminal id.
    #[must_use]
    pub fn terminal_id(&self) -> &str {
        self.assembler.terminal_id()
    }

    /// Returns the assembler, for signing without sending.
    #[must_use]
    pub const fn assembler(&self) -> &RequestAssembler {
        &self.assembler
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Builds a verifier for callbacks addressed to this terminal.
    #[must_use]
    pub fn callback_verifier(&self) -> CallbackVerifier {
        CallbackVerifier::new(self.assembler.credential().clone())
    }

    /// Starts a card or wallet payment.
    ///
    /// On success the response carries the payment page URL.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::MissingField`] if a signed field is empty
    /// - [`GatewayError::Gateway`] if either response layer is not 200
    /// - [`GatewayError::Transport`] if no response arrived after all retries
    pub async fn initiate_payment(&self, request: &PaymentRequest) -> Result<GatewayResponse> {
        self.submit(request).await
    }

    /// Starts a card tokenization.
    ///
    /// # Errors
    ///
    /// Same as [`initiate_payment`](Self::initiate_payment).
    pub async fn initiate_tokenization(
        &self,
        request: &TokenizationRequest,
    ) -> Result<GatewayResponse> {
        self.submit(request).await
    }

    /// Starts a marketplace payment split across partner terminals.
    ///
    /// # Errors
    ///
    /// Same as [`initiate_payment`](Self::initiate_payment).
    pub async fn initiate_marketplace_payment(
        &self,
        request: &MarketplacePaymentRequest,
    ) -> Result<GatewayResponse> {
        self.submit(request).await
    }

    /// Confirms delivery for a held transaction.
    ///
    /// # Errors
    ///
    /// Same as [`initiate_payment`](Self::initiate_payment).
    pub async fn confirm_delivery(
        &self,
        request: &ConfirmDeliveryRequest,
    ) -> Result<GatewayResponse> {
        self.submit(request).await
    }

    /// Confirms delivery for the sub-transactions of a VSA/MCR payment.
    ///
    /// # Errors
    ///
    /// Same as [`initiate_payment`](Self::initiate_payment).
    pub async fn confirm_vsa_mcr_delivery(
        &self,
        request: &ConfirmVsaMcrDeliveryRequest,
    ) -> Result<GatewayResponse> {
        self.submit(request).await
    }

    /// Fetches the gateway's view of an order.
    ///
    /// Unknown orders come back with status `"not found"` as
    /// [`PaymentStatus::Unknown`](crate::callback::PaymentStatus::Unknown), not
    /// as an error.
    ///
    /// # Errors
    ///
    /// - [`GatewayError::MissingField`] if `order_id` is empty
    /// - [`GatewayError::Gateway`] if the HTTP status or a present body code is not 200
    /// - [`GatewayError::Decode`] if the body is not an order status
    /// - [`GatewayError::Transport`] if no response arrived after all retries
    pub async fn check_order(&self, order_id: &str) -> Result<OrderStatus> {
        let request = CheckOrderRequest { order_id: order_id.to_owned() };
        let started = Instant::now();
        let (envelope, response) = self.dispatch(&request).await?;

        interpret_order_status(response.status, &response.body)
            .inspect_err(|e| self.audit_rejection(&envelope, Some(order_id), e, started))
    }

    async fn submit<R: SignableRequest>(&self, request: &R) -> Result<GatewayResponse> {
        let started = Instant::now();
        let order_id = request.signable_fields().order_id.map(str::to_owned);
        let (envelope, response) = self.dispatch(request).await?;

        let result = interpret(response.status, &response.body);
        match &result {
            Ok(accepted) => {
                info!(flow = %envelope.flow, code = accepted.code, "gateway accepted request");
            }
            Err(e) => self.audit_rejection(&envelope, order_id.as_deref(), e, started),
        }
        result
    }

    /// Signs and sends `request`, retrying the same body on transient failures.
    #[instrument(skip_all, fields(flow = %R::FLOW, path = R::PATH))]
    async fn dispatch<R: SignableRequest>(
        &self,
        request: &R,
    ) -> Result<(SignedEnvelope, TransportResponse)> {
        let envelope = self.assembler.assemble(request)?;
        let transport_request = TransportRequest {
            url: endpoint_url(&self.base_url, envelope.path)?,
            method: Method::POST,
            body: envelope.body()?,
            headers: envelope.headers.clone(),
        };

        let response =
            retry_with_backoff(&self.retry_policy, || self.transport.send(&transport_request))
                .await?;

        Ok((envelope, response))
    }

    fn audit_rejection(
        &self,
        envelope: &SignedEnvelope,
        order_id: Option<&str>,
        error: &GatewayError,
        started: Instant,
    ) {
        warn!(flow = %envelope.flow, error = %error, "gateway rejected request");

        let mut event = AuditEvent::new(AuditEventType::GatewayRejected, self.terminal_id())
            .with_flow(envelope.flow)
            .with_error(error.to_string())
            .with_duration(started.elapsed());
        if let (Some(http_status), Some(code)) = (error.http_status(), error.code()) {
            event = event.with_gateway_result(http_status, code);
        }
        if let Some(order_id) = order_id {
            event = event.with_order_id(order_id);
        }
        audit_log(&event);
    }
}
