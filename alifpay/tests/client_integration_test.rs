//! Integration tests for the gateway client.
//!
//! Runs every outbound flow against a local mock gateway.

use std::time::Duration;

use alifpay::{
    Amount, GatewayError,
    callback::PaymentStatus,
    gateway::{
        AlifClient, ClientConfig, ConfirmDeliveryRequest, ConfirmVsaMcrDeliveryRequest,
        HttpTransport, MarketplacePaymentRequest, MpTerminalInfo, PaymentRequest,
        TokenizationData, TokenizationRequest, VsaMcrDeliveryTransaction,
    },
    signing::Credential,
};
use serde_json::{Value, json};
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, header, method, path},
};

const REFERENCE_TOKEN: &str = "74784eff67a6f4684cf32231987205894c864924fa92d47c063fa8e8c69e245a";

fn config_for(server: &MockServer, extra: &str) -> ClientConfig {
    ClientConfig::from_toml(&format!(
        r#"
        base_url = "{}/web"
        terminal_id = "T1"
        password_env = "ALIF_TEST_PASSWORD"
        {extra}

        [http]
        allow_insecure = true
        timeout_secs = 1
        connect_timeout_secs = 1
        "#,
        server.uri()
    ))
    .expect("valid test config")
}

fn client_for(server: &MockServer) -> AlifClient {
    client_with(config_for(server, ""))
}

fn client_with(config: ClientConfig) -> AlifClient {
    let transport = HttpTransport::with_config(&config.http).expect("transport");
    AlifClient::with_transport(&config, Credential::new("T1", "P1").expect("credential"), transport)
        .expect("client")
}

fn payment() -> PaymentRequest {
    PaymentRequest::new("321123", Amount::new("2.99").unwrap(), "http://shop/cb", "http://shop/r")
}

fn ok_body() -> Value {
    json!({"code": 200, "message": "ok", "url": "https://alifpay.tj/web/pay/abc"})
}

#[tokio::test]
async fn test_payment_is_signed_and_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/v2/"))
        .and(header("content-type", "application/json"))
        .and(header("gate", "korti_milli"))
        .and(body_partial_json(json!({
            "key": "T1",
            "order_id": "321123",
            "amount": "2.99",
            "callback_url": "http://shop/cb"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let request = PaymentRequest { gate: Some("korti_milli".to_owned()), ..payment() };
    let response = client_for(&server).initiate_payment(&request).await.unwrap();

    assert_eq!(response.http_status, 200);
    assert_eq!(response.code, 200);
    assert_eq!(response.url.as_deref(), Some("https://alifpay.tj/web/pay/abc"));
}

#[tokio::test]
async fn test_payment_token_matches_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/v2/"))
        .and(body_partial_json(json!({"token": REFERENCE_TOKEN})))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client_for(&server).initiate_payment(&payment()).await.is_ok());
}

#[tokio::test]
async fn test_http_error_with_ok_body_code_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"code": 200, "message": "bad"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).initiate_payment(&payment()).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Gateway { http_status: 400, code: 200, ref message } if message == "bad"
    ));
}

#[tokio::test]
async fn test_http_ok_with_error_body_code_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 500, "message": "order already exists"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).initiate_payment(&payment()).await.unwrap_err();
    assert_eq!(err.http_status(), Some(200));
    assert_eq!(err.code(), Some(500));
}

#[tokio::test]
async fn test_both_layers_failing() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"code": 403})))
        .mount(&server)
        .await;

    let err = client_for(&server).initiate_payment(&payment()).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Gateway { http_status: 403, code: 403, ref message }
            if message == "Unknown error"
    ));
}

#[tokio::test]
async fn test_server_error_on_both_layers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"code": 500, "message": "internal error"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).initiate_payment(&payment()).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Gateway { http_status: 500, code: 500, ref message }
            if message == "internal error"
    ));
}

#[tokio::test]
async fn test_html_error_page_falls_back() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).initiate_payment(&payment()).await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Gateway { http_status: 502, code: 0, ref message }
            if message == "Unknown error"
    ));
}

#[tokio::test]
async fn test_tokenization_credentials_inside_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/v2/"))
        .and(header("gate", "tokenization_korti_milli"))
        .and(body_partial_json(json!({
            "data": {
                "key": "T1",
                "orderId": "tok-1",
                "clientID": "client-9",
                "phone": "992921223100"
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let request = TokenizationRequest {
        data: TokenizationData {
            order_id: "tok-1".to_owned(),
            callback_url: "http://shop/cb".to_owned(),
            return_url: "http://shop/r".to_owned(),
            phone: "992921223100".to_owned(),
            gate: "tokenization_korti_milli".to_owned(),
            client_id: "client-9".to_owned(),
        },
    };

    let response = client_for(&server).initiate_tokenization(&request).await.unwrap();
    assert!(response.url.is_some());

    let received = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&received[0].body).unwrap();
    assert!(body.get("key").is_none());
    assert_eq!(body["data"]["token"].as_str().map(str::len), Some(64));
}

#[tokio::test]
async fn test_marketplace_sends_routing_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/v2/"))
        .and(header("gate", "korti_milli"))
        .and(header("isMarketPlace", "true"))
        .and(body_partial_json(json!({
            "order_id": "mp-1",
            "amount": "150.00",
            "mpTerminalInfo": [{"terminal_id": "partner-1"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(1)
        .mount(&server)
        .await;

    let request = MarketplacePaymentRequest {
        order_id: "mp-1".to_owned(),
        amount: Amount::new("150.00").unwrap(),
        callback_url: "http://shop/cb".to_owned(),
        return_url: "http://shop/r".to_owned(),
        email: None,
        phone: None,
        info: None,
        mp_terminal_info: vec![MpTerminalInfo {
            terminal_id: "partner-1".to_owned(),
            amount: Amount::new("150.00").unwrap(),
            condition_id: None,
            invoices: vec![],
        }],
        gate: "korti_milli".to_owned(),
    };

    assert!(client_for(&server).initiate_marketplace_payment(&request).await.is_ok());
}

#[tokio::test]
async fn test_confirm_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/confirm-delivery"))
        .and(body_partial_json(json!({"key": "T1", "transaction_id": "900", "amount": "2.99"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200})))
        .expect(1)
        .mount(&server)
        .await;

    let request = ConfirmDeliveryRequest {
        transaction_id: "900".to_owned(),
        amount: Amount::new("2.99").unwrap(),
    };
    let response = client_for(&server).confirm_delivery(&request).await.unwrap();
    assert_eq!(response.message, "");
    assert_eq!(response.url, None);
}

#[tokio::test]
async fn test_confirm_vsa_mcr_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/confirm-vsa-and-mcr-delivery"))
        .and(body_partial_json(json!({
            "parent_transaction_id": "p-1",
            "extra": [{"transaction_id": "s-1", "amount": "1.50"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 200})))
        .expect(1)
        .mount(&server)
        .await;

    let request = ConfirmVsaMcrDeliveryRequest {
        parent_transaction_id: "p-1".to_owned(),
        extra: vec![VsaMcrDeliveryTransaction {
            transaction_id: "s-1".to_owned(),
            amount: Amount::new("1.50").unwrap(),
        }],
    };
    assert!(client_for(&server).confirm_vsa_mcr_delivery(&request).await.is_ok());
}

#[tokio::test]
async fn test_check_order_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/checktxn"))
        .and(body_partial_json(json!({"key": "T1", "orderId": "321123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "orderId": "321123",
            "transactionId": 92938922,
            "status": "ok",
            "token": "3792",
            "amount": "2.99",
            "phone": "+992931234455"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let status = client_for(&server).check_order("321123").await.unwrap();
    assert_eq!(status.order_id, "321123");
    assert_eq!(status.transaction_id.as_deref(), Some("92938922"));
    assert_eq!(status.status, PaymentStatus::Ok);
    assert_eq!(status.amount.as_ref().map(Amount::as_str), Some("2.99"));
}

#[tokio::test]
async fn test_check_order_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/web/checktxn"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"orderId": "missing", "status": "not found"})),
        )
        .mount(&server)
        .await;

    let status = client_for(&server).check_order("missing").await.unwrap();
    assert_eq!(status.status, PaymentStatus::Unknown("not found".to_owned()));
}

#[tokio::test]
async fn test_timeout_is_retried_with_same_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ok_body())
                .set_delay(Duration::from_secs(3)),
        )
        .expect(2)
        .mount(&server)
        .await;

    let config = config_for(
        &server,
        "[retry]\nmax_attempts = 2\ninitial_delay_ms = 10\nmax_delay_ms = 10",
    );
    let err = client_with(config).initiate_payment(&payment()).await.unwrap_err();

    assert!(matches!(err, GatewayError::Transport(ref e) if e.is_timeout()));
    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0].body, received[1].body);
}

#[tokio::test]
async fn test_gateway_rejection_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server).initiate_payment(&payment()).await.unwrap_err();
    assert_eq!(err.http_status(), Some(503));
}

#[tokio::test]
async fn test_missing_field_never_reaches_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ok_body()))
        .expect(0)
        .mount(&server)
        .await;

    let request = PaymentRequest { callback_url: String::new(), ..payment() };
    let err = client_for(&server).initiate_payment(&request).await.unwrap_err();
    assert!(matches!(err, GatewayError::MissingField { field: "callback_url", .. }));
}
