//! Outbound gateway calls.
//!
//! # Request Lifecycle
//!
//! ```text
//! PaymentRequest ─► RequestAssembler ─► SignedEnvelope ─► Transport ─► interpret
//!                   (sign, place         (body, path,      (POST)      (HTTP 200 and
//!                    key and token)       headers)                      code 200)
//! ```
//!
//! [`AlifClient`] runs the whole lifecycle. The pieces are public so that a
//! caller can sign with [`RequestAssembler`] and send through its own HTTP
//! stack, then classify the answer with [`interpret`].
//!
//! # Endpoints
//!
//! | Operation | Path | Headers |
//! |-----------|------|---------|
//! | Payment, tokenization | `/v2/` | `gate` |
//! | Marketplace payment | `/v2/` | `gate`, `isMarketPlace: true` |
//! | Delivery confirmation | `/confirm-delivery` | `gate` (empty) |
//! | VSA/MCR delivery confirmation | `/confirm-vsa-and-mcr-delivery` | `gate` (empty) |
//! | Order status | `/checktxn` | `gate` (empty) |

mod assembler;
mod client;
mod config;
mod http;
mod request;
mod response;
mod transport;

pub use assembler::{GATE_HEADER, MARKETPLACE_HEADER, RequestAssembler, SignedEnvelope};
pub use client::AlifClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL, HttpConfig};
pub use http::HttpTransport;
pub use request::{
    CHECK_ORDER_PATH, CONFIRM_DELIVERY_PATH, CONFIRM_VSA_MCR_DELIVERY_PATH, CheckOrderRequest,
    ConfirmDeliveryRequest, ConfirmVsaMcrDeliveryRequest, Invoice, Invoices, MarketplaceInvoice,
    MarketplacePaymentRequest, MpTerminalInfo, PAYMENT_PATH, PaymentRequest, SignableRequest,
    TokenizationData, TokenizationRequest, VsaMcrDeliveryTransaction,
};
pub use response::{
    GatewayResponse, OrderStatus, SUCCESS_CODE, interpret, interpret_order_status,
};
pub use transport::{Transport, TransportRequest, TransportResponse};
