//! Interpretation of gateway responses.
//!
//! The gateway reports failure on two independent layers: the HTTP status and
//! the application `code` in the body. A call succeeds only when both are 200.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    amount::Amount,
    callback::{
        PaymentStatus,
        models::{optional_string_or_number, string_or_number},
    },
    error::{GatewayError, Result},
};

/// Application code of a successful call.
pub const SUCCESS_CODE: i64 = 200;
const HTTP_OK: u16 = 200;
const UNKNOWN_ERROR: &str = "Unknown error";

/// Successful gateway response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    /// HTTP status, always 200.
    pub http_status: u16,
    /// Application code, always 200.
    pub code: i64,
    /// Message from the gateway.
    pub message: String,
    /// Payment page to redirect the customer to, when the flow has one.
    pub url: Option<String>,
}

/// Fields of a response body, all optional.
#[derive(Debug, Default)]
struct ResponseBody {
    code: Option<i64>,
    message: Option<String>,
    url: Option<String>,
}

impl ResponseBody {
    fn from_value(value: &Value) -> Self {
        Self {
            code: value.get("code").and_then(code_of),
            message: value.get("message").and_then(Value::as_str).map(str::to_owned),
            url: value.get("url").and_then(Value::as_str).map(str::to_owned),
        }
    }

    fn into_error(self, http_status: u16) -> GatewayError {
        GatewayError::Gateway {
            http_status,
            code: self.code.unwrap_or(0),
            message: self
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| UNKNOWN_ERROR.to_owned()),
        }
    }
}

/// Accepts `200` and `"200"`.
fn code_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

/// Classifies a raw gateway response.
///
/// # Errors
///
/// - [`GatewayError::Gateway`] if the HTTP status is not 200, whatever the
///   body, or if the body code is not 200. `code` falls back to 0 and
///   `message` to `"Unknown error"`.
/// - [`GatewayError::Decode`] if the HTTP status is 200 and the body is not a
///   JSON object
///
/// # Examples
///
/// ```
/// use alifpay::{GatewayError, gateway::interpret};
///
/// let ok = interpret(200, br#"{"code":200,"message":"ok","url":"https://pay"}"#).unwrap();
/// assert_eq!(ok.url.as_deref(), Some("https://pay"));
///
/// // HTTP success with an application rejection is still an error.
/// let err = interpret(200, br#"{"code":500,"message":"duplicate order"}"#).unwrap_err();
/// assert!(matches!(err, GatewayError::Gateway { http_status: 200, code: 500, .. }));
/// ```
pub fn interpret(http_status: u16, raw_body: &[u8]) -> Result<GatewayResponse> {
    let decoded = serde_json::from_slice::<Value>(raw_body).ok().filter(Value::is_object);

    if http_status != HTTP_OK {
        let body = decoded.as_ref().map(ResponseBody::from_value).unwrap_or_default();
        return Err(body.into_error(http_status));
    }

    let Some(value) = decoded else {
        return Err(GatewayError::Decode(format!(
            "expected a JSON object, got {} bytes",
            raw_body.len()
        )));
    };

    let body = ResponseBody::from_value(&value);
    if body.code != Some(SUCCESS_CODE) {
        return Err(body.into_error(http_status));
    }

    Ok(GatewayResponse {
        http_status,
        code: SUCCESS_CODE,
        message: body.message.unwrap_or_default(),
        url: body.url,
    })
}

/// Order status returned by the check endpoint.
///
/// This is a snapshot for reconciliation. Final state changes should come
/// from verified callbacks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStatus {
    /// Merchant order id.
    #[serde(rename = "orderId", deserialize_with = "string_or_number")]
    pub order_id: String,
    /// Gateway transaction id, absent for unknown orders.
    #[serde(
        rename = "transactionId",
        default,
        deserialize_with = "optional_string_or_number"
    )]
    pub transaction_id: Option<String>,
    /// Reported status. `"not found"` and other strings are kept as
    /// [`PaymentStatus::Unknown`].
    pub status: PaymentStatus,
    /// Paid amount.
    #[serde(default)]
    pub amount: Option<Amount>,
    /// Customer phone.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Classifies a response of the check endpoint.
///
/// Order status bodies carry no application code. When a `code` is present it
/// must be 200, like on every other endpoint.
///
/// # Errors
///
/// - [`GatewayError::Gateway`] if the HTTP status or a present `code` is not 200
/// - [`GatewayError::Decode`] if the body is not an order status
pub fn interpret_order_status(http_status: u16, raw_body: &[u8]) -> Result<OrderStatus> {
    let decoded = serde_json::from_slice::<Value>(raw_body).ok().filter(Value::is_object);

    if http_status != HTTP_OK {
        let body = decoded.as_ref().map(ResponseBody::from_value).unwrap_or_default();
        return Err(body.into_error(http_status));
    }

    let Some(value) = decoded else {
        return Err(GatewayError::Decode(format!(
            "expected a JSON object, got {} bytes",
            raw_body.len()
        )));
    };

    let body = ResponseBody::from_value(&value);
    if let Some(code) = body.code
        && code != SUCCESS_CODE
    {
        return Err(body.into_error(http_status));
    }

    serde_json::from_value(value)
        .map_err(|e| GatewayError::Decode(format!("invalid order status: {e}")))
}
