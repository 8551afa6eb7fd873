mod support;

use datatrans_core::{RejectionReason, TerminalStatus};
use proptest::prelude::*;
use support::*;

fn currency() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["CHF", "EUR", "USD", "GBP", "JPY"])
}

fn hex_key() -> impl Strategy<Value = String> {
    "[0-9a-f]{2,64}"
}

proptest! {
    #[test]
    fn valid_level_two_callback_always_verifies(
        key in hex_key(),
        amount in 0u64..10_000_000,
        currency in currency(),
        id in "[A-Za-z0-9-]{1,20}",
        tx in "[0-9]{6,18}",
    ) {
        let h = harness();
        let profile = hmac_profile(&key);
        let intent = intent(&id, amount, currency);
        let request = h.signer.build(&profile, &intent, &urls(&id)).unwrap();
        let fields = gateway_success(&request, &tx, Some(&key));
        let outcome = h.verifier.verify(&profile, &intent, &fields).unwrap();
        prop_assert_eq!(outcome.terminal_status, TerminalStatus::Success);
        prop_assert_eq!(h.audit.len(), 1);
    }

    #[test]
    fn tampering_with_signed_fields_invalidates(
        key in hex_key(),
        amount in 1u64..10_000_000,
        currency in currency(),
        tx in "[0-9]{6,18}",
        field in 0usize..4,
    ) {
        let h = harness();
        let profile = hmac_profile(&key);
        let intent = intent("p-1", amount, currency);
        let request = h.signer.build(&profile, &intent, &urls("p-1")).unwrap();
        let mut fields = gateway_success(&request, &tx, Some(&key));
        match field {
            0 => { fields.insert("merchantId".into(), "987654321".into()); }
            1 => { fields.insert("amount".into(), (amount + 1).to_string()); }
            2 => {
                let other = if currency == "CHF" { "EUR" } else { "CHF" };
                fields.insert("currency".into(), other.into());
            }
            _ => { fields.insert("uppTransactionId".into(), format!("{tx}1")); }
        }
        prop_assert_eq!(
            h.verifier.verify(&profile, &intent, &fields).unwrap_err(),
            RejectionReason::InvalidSignature
        );
    }
}
