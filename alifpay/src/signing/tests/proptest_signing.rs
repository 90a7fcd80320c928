use proptest::prelude::*;

use crate::{
    Amount,
    callback::{CallbackEnvelope, PaymentCallback, PaymentStatus},
    signing::{
        CallbackVerifier, Credential, SignableFields, SignableFlow, Signer, build_signable_string,
    },
};

fn sign_payment(credential: &Credential, order_id: &str, amount: &str, url: &str) -> String {
    let fields = SignableFields {
        order_id: Some(order_id),
        amount: Some(amount),
        callback_url: Some(url),
        ..SignableFields::default()
    };
    let data =
        build_signable_string(SignableFlow::Payment, &fields, credential.terminal_id()).unwrap();
    Signer.sign(&data, credential)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn test_sign_is_deterministic_lowercase_hex(
        terminal_id in "[A-Za-z0-9]{1,16}",
        password in "[ -~]{1,32}",
        data in ".*",
    ) {
        prop_assume!(!password.trim().is_empty());
        let credential = Credential::new(terminal_id, password).unwrap();

        let first = Signer.sign(&data, &credential);
        let second = Signer.sign(&data, &credential);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), 64);
        prop_assert!(first.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')));
    }

    #[test]
    fn test_swapping_stage_one_orientation_changes_key(
        terminal_id in "[A-Za-z0-9]{1,16}",
        password in "[A-Za-z0-9]{1,16}",
    ) {
        prop_assume!(terminal_id != password);
        let credential = Credential::new(terminal_id.clone(), password.clone()).unwrap();
        let swapped = Credential::new(password, terminal_id).unwrap();

        let key = Signer::derive_signing_key(&credential);
        let swapped_key = Signer::derive_signing_key(&swapped);
        prop_assert_ne!(key.as_str(), swapped_key.as_str());
    }

    #[test]
    fn test_permuting_fields_changes_token(
        order_id in "[0-9]{3,10}",
        amount in "[1-9][0-9]{0,4}\\.[0-9]{2}",
        url in "https://[a-z]{3,10}\\.tj/cb",
    ) {
        let credential = Credential::new("T1", "P1").unwrap();

        let original = sign_payment(&credential, &order_id, &amount, &url);
        let permuted = sign_payment(&credential, &amount, &order_id, &url);

        prop_assert_ne!(original, permuted);
    }

    #[test]
    fn test_tampered_callback_amount_fails(
        order_id in "[0-9]{1,10}",
        transaction_id in "[0-9]{1,10}",
        cents in 1u32..1_000_000,
        delta in 1u32..1_000,
    ) {
        let credential = Credential::new("T1", "P1").unwrap();
        let amount = format!("{}.{:02}", cents / 100, cents % 100);
        let tampered = format!("{}.{:02}", (cents + delta) / 100, (cents + delta) % 100);

        let mut callback = PaymentCallback {
            order_id,
            transaction_id,
            status: PaymentStatus::Ok,
            token: String::new(),
            amount: Amount::new(amount).unwrap(),
            account: None,
            phone: None,
            transaction_type: None,
        };
        let data = build_signable_string(
            SignableFlow::PaymentCallback,
            &callback.signable_fields(),
            credential.terminal_id(),
        ).unwrap();
        callback.token = Signer.sign(&data, &credential);

        let verifier = CallbackVerifier::new(credential);
        prop_assert!(verifier.verify(callback.clone()).is_ok());

        callback.amount = Amount::new(tampered).unwrap();
        prop_assert!(verifier.verify(callback).is_err());
    }
}
