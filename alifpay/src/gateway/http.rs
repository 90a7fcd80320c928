//! HTTP transport implementation.
//!
//! Sends JSON bodies over HTTP/1.1 or HTTP/2 using reqwest.

use std::{sync::LazyLock, time::Duration};

use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue},
};
use tracing::{debug, instrument};
use url::Url;

use crate::{
    error::{GatewayError, Result},
    gateway::{
        config::HttpConfig,
        transport::{Transport, TransportRequest, TransportResponse},
    },
};

/// Default HTTP client with connection pooling enabled.
///
/// Using a singleton avoids recreating the client per transport instance,
/// preserving connection pooling across all default transports.
static DEFAULT_HTTP_CLIENT: LazyLock<Client> = LazyLock::new(|| {
    Client::builder()
        .pool_max_idle_per_host(100)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
});

/// Validates URL for security constraints.
///
/// Ensures the URL uses HTTPS and does not point to localhost.
fn validate_url(url: &Url) -> Result<()> {
    if url.scheme() != "https" {
        return Err(GatewayError::InvalidInput("only HTTPS URLs are allowed".to_owned()));
    }

    if let Some(host) = url.host_str()
        && (host == "localhost" || host == "127.0.0.1" || host == "::1" || host == "[::1]")
    {
        return Err(GatewayError::InvalidInput("localhost URLs are not allowed".to_owned()));
    }

    Ok(())
}

/// Rejects paths containing traversal sequences.
fn sanitize_path(path: &str) -> Result<&str> {
    if path.contains("..") || path.contains("//") {
        return Err(GatewayError::InvalidInput(
            "invalid path: traversal sequences not allowed".to_owned(),
        ));
    }
    if !path.starts_with('/') {
        return Err(GatewayError::InvalidInput("path must start with '/'".to_owned()));
    }
    Ok(path)
}

/// Joins the gateway base URL and an endpoint path.
///
/// `https://alifpay.tj/web` and `/v2/` give `https://alifpay.tj/web/v2/`.
pub(crate) fn endpoint_url(base_url: &str, path: &str) -> Result<Url> {
    let path = sanitize_path(path)?;
    let full_url = format!("{}{path}", base_url.trim_end_matches('/'));
    Url::parse(&full_url)
        .map_err(|e| GatewayError::Configuration(format!("invalid base_url {base_url}: {e}")))
}

/// Validates header name and value for CRLF injection prevention.
fn validate_header(name: &str, value: &str) -> Result<()> {
    if name.contains(['\r', '\n', '\0']) {
        return Err(GatewayError::InvalidInput(
            "invalid header name: control characters not allowed".to_owned(),
        ));
    }
    if value.contains(['\r', '\n', '\0']) {
        return Err(GatewayError::InvalidInput(
            "invalid header value: control characters not allowed".to_owned(),
        ));
    }
    Ok(())
}

fn header_map(request: &TransportRequest) -> Result<HeaderMap> {
    let mut headers = HeaderMap::with_capacity(request.headers.len() + 1);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in &request.headers {
        validate_header(name, value)?;
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| GatewayError::InvalidInput(format!("invalid header name {name}: {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| GatewayError::InvalidInput(format!("invalid header value: {e}")))?;
        headers.insert(name, value);
    }

    Ok(headers)
}

/// HTTP transport using reqwest.
///
/// Supports connection pooling and keep-alive. Every request is bounded by
/// the configured timeout.
///
/// # Examples
///
/// ```
/// use alifpay::gateway::{HttpConfig, HttpTransport};
///
/// let transport = HttpTransport::new();
///
/// let config = HttpConfig { timeout_secs: 60, ..HttpConfig::default() };
/// let transport = HttpTransport::with_config(&config).unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    allow_insecure: bool,
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport {
    /// Creates a new HTTP transport with default settings.
    ///
    /// Uses a shared client:
    /// - Pool max idle per host: 100
    /// - Timeout: 30 seconds
    /// - Connect timeout: 10 seconds
    #[must_use]
    pub fn new() -> Self {
        Self { client: DEFAULT_HTTP_CLIENT.clone(), allow_insecure: false }
    }

    /// Creates an HTTP transport with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the configuration is out of
    /// bounds, or [`GatewayError::Transport`] if the client cannot be built.
    pub fn with_config(config: &HttpConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        Ok(Self { client, allow_insecure: config.allow_insecure })
    }
}

impl Transport for HttpTransport {
    #[instrument(
        skip(self, request),
        fields(method = %request.method, url = %request.url, status = tracing::field::Empty)
    )]
    async fn send<'a>(&'a self, request: &'a TransportRequest) -> Result<TransportResponse> {
        if !self.allow_insecure {
            validate_url(&request.url)?;
        }
        let headers = header_map(request)?;

        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        tracing::Span::current().record("status", status);

        let body = response.bytes().await?.to_vec();
        debug!(bytes = body.len(), "response received");

        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use reqwest::Method;

    use super::*;

    fn post(url: &str, headers: &[(&str, &str)]) -> TransportRequest {
        TransportRequest {
            url: Url::parse(url).unwrap(),
            method: Method::POST,
            body: b"{}".to_vec(),
            headers: headers
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn test_http_transport_with_config() {
        let config = HttpConfig {
            pool_max_idle_per_host: 20,
            timeout_secs: 60,
            connect_timeout_secs: 15,
            allow_insecure: false,
        };

        let transport = HttpTransport::with_config(&config).unwrap();
        assert!(!transport.allow_insecure);
    }

    #[test]
    fn test_http_transport_rejects_invalid_config() {
        let config = HttpConfig { timeout_secs: 0, ..HttpConfig::default() };
        assert!(matches!(
            HttpTransport::with_config(&config),
            Err(GatewayError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url(&Url::parse("https://alifpay.tj/web/v2/").unwrap()).is_ok());
        assert!(validate_url(&Url::parse("http://alifpay.tj/web").unwrap()).is_err());
        assert!(validate_url(&Url::parse("https://localhost/web").unwrap()).is_err());
        assert!(validate_url(&Url::parse("https://127.0.0.1/web").unwrap()).is_err());
        assert!(validate_url(&Url::parse("file:///etc/passwd").unwrap()).is_err());
    }

    #[test]
    fn test_endpoint_url() {
        let url = endpoint_url("https://alifpay.tj/web", "/v2/").unwrap();
        assert_eq!(url.as_str(), "https://alifpay.tj/web/v2/");

        let url = endpoint_url("https://alifpay.tj/web/", "/checktxn").unwrap();
        assert_eq!(url.as_str(), "https://alifpay.tj/web/checktxn");
    }

    #[test]
    fn test_endpoint_url_rejects_traversal() {
        assert!(endpoint_url("https://alifpay.tj/web", "/../admin").is_err());
        assert!(endpoint_url("https://alifpay.tj/web", "//evil.example").is_err());
        assert!(endpoint_url("https://alifpay.tj/web", "v2/").is_err());
        assert!(matches!(
            endpoint_url("not a url", "/v2/"),
            Err(GatewayError::Configuration(_))
        ));
    }

    #[test]
    fn test_header_map_sets_json_content_type() {
        let request = post("https://alifpay.tj/web/v2/", &[("gate", "korti_milli")]);
        let headers = header_map(&request).unwrap();

        assert_eq!(headers[CONTENT_TYPE], "application/json");
        assert_eq!(headers["gate"], "korti_milli");
    }

    #[test]
    fn test_header_map_allows_empty_value() {
        let request = post("https://alifpay.tj/web/v2/", &[("gate", "")]);
        assert_eq!(header_map(&request).unwrap()["gate"], "");
    }

    #[test]
    fn test_crlf_injection_rejected() {
        assert!(validate_header("gate", "wallet\r\nX-Evil: 1").is_err());
        assert!(validate_header("ga\nte", "wallet").is_err());
        assert!(validate_header("gate", "wal\0let").is_err());

        let request = post("https://alifpay.tj/web/v2/", &[("gate", "a\r\nb")]);
        assert!(matches!(header_map(&request), Err(GatewayError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_send_rejects_plain_http_by_default() {
        let transport = HttpTransport::new();
        let result = transport.send(&post("http://alifpay.tj/web/v2/", &[])).await;
        assert!(matches!(result, Err(GatewayError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_send_rejects_localhost_by_default() {
        let transport = HttpTransport::new();
        let result = transport.send(&post("https://localhost/web/v2/", &[])).await;
        assert!(matches!(result, Err(GatewayError::InvalidInput(_))));
    }
}
