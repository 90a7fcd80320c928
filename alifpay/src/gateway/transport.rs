//! Transport abstraction.
//!
//! The transport moves bytes: it sends a signed JSON body and hands back the
//! raw status and body, whatever the status. Classification of the answer is
//! the job of [`interpret`](super::interpret).

#[allow(
    redundant_imports,
    reason = "Future needed for RPITIT despite being in Edition 2024 prelude"
)]
use std::future::Future;
use std::collections::BTreeMap;

use reqwest::Method;
use url::Url;

use crate::error::Result;

/// Outbound request handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportRequest {
    /// Absolute URL.
    pub url: Url,
    /// HTTP method.
    pub method: Method,
    /// JSON body.
    pub body: Vec<u8>,
    /// Extra headers. `Content-Type` is added by the transport.
    pub headers: BTreeMap<String, String>,
}

/// Raw response from a [`Transport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body bytes.
    pub body: Vec<u8>,
}

/// Sends requests to the gateway.
///
/// Implementations must attach `Content-Type: application/json`, bound every
/// request with a timeout, and return non-2xx responses as
/// [`TransportResponse`] rather than as errors. Only failures that prevented
/// a response (timeouts, refused connections, TLS) are errors.
///
/// # Examples
///
/// A canned transport for tests:
///
/// ```rust
/// use alifpay::{
///     Result,
///     gateway::{Transport, TransportRequest, TransportResponse},
/// };
///
/// struct Canned;
///
/// impl Transport for Canned {
///     async fn send(&self, _request: &TransportRequest) -> Result<TransportResponse> {
///         Ok(TransportResponse { status: 200, body: br#"{"code":200}"#.to_vec() })
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the raw response.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Transport`](crate::GatewayError::Transport) if no
    /// response was received, or [`GatewayError::InvalidInput`](crate::GatewayError::InvalidInput)
    /// if the request is rejected before sending.
    fn send<'a>(
        &'a self,
        request: &'a TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse>> + Send + 'a;
}
