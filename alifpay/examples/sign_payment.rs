//! Offline request signing example.
//!
//! Builds and signs a payment request without sending it. Useful for
//! checking a token against the gateway's documentation or another client.
//!
//! # Running this example
//!
//! ```bash
//! export ALIF_TERMINAL_PASSWORD=<terminal password>
//! cargo run --example sign_payment -- <terminal id>
//! ```

#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    reason = "examples are allowed to use println"
)]

use std::env;

use alifpay::{
    Amount,
    gateway::{PaymentRequest, RequestAssembler},
    signing::{Credential, SignableFlow, build_signable_string},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("alifpay: Request Signing Example\n");

    let terminal_id = env::args().nth(1).ok_or("usage: sign_payment <terminal id>")?;

    // Never hardcode the password; read it from the environment
    println!("1. Loading credential...");
    let credential = Credential::from_env(&terminal_id, "ALIF_TERMINAL_PASSWORD")?;
    println!("   Terminal: {}", credential.terminal_id());

    println!("\n2. Building payment request...");
    let request = PaymentRequest {
        gate: Some("korti_milli".to_owned()),
        info: Some("Order #321123".to_owned()),
        ..PaymentRequest::new(
            "321123",
            Amount::new("2.99")?,
            "https://shop.tj/alif/callback",
            "https://shop.tj/order/321123",
        )
    };

    let fields = alifpay::gateway::SignableRequest::signable_fields(&request);
    let data = build_signable_string(SignableFlow::Payment, &fields, credential.terminal_id())?;
    println!("   Signable string: {data}");

    println!("\n3. Signing...");
    let envelope = RequestAssembler::new(credential).assemble(&request)?;
    println!("   Token: {}", envelope.token);
    println!("   Path: {}", envelope.path);
    for (name, value) in &envelope.headers {
        println!("   Header {name}: {value}");
    }

    println!("\n4. Request body:");
    println!("{}", serde_json::to_string_pretty(&envelope.payload)?);

    Ok(())
}
