//! Property tests for event classification and identifier extraction.
//!
//! Classification runs on attacker-reachable input only after the signature
//! check, but it must still never panic and must keep the three outcomes
//! apart for any shape the gateway could send.

use pinhook_core::{
    classify, extract_identifier, Classification, MissingIdentifier, PAYMENT_CAPTURED,
};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn classify_never_panics(body in proptest::collection::vec(any::<u8>(), 0..512)) {
        let _ = classify(&body);
    }

    #[test]
    fn unknown_event_types_are_ignored(event in "[a-z_.]{1,32}") {
        prop_assume!(event != PAYMENT_CAPTURED);
        let body = serde_json::to_vec(&json!({ "event": event, "payload": {} })).unwrap();

        prop_assert_eq!(classify(&body), Classification::Ignored { event_type: event });
    }

    #[test]
    fn any_non_empty_pin_is_extracted(pin in "\\PC{1,24}") {
        let body = serde_json::to_vec(&json!({
            "event": PAYMENT_CAPTURED,
            "payload": { "payment": { "entity": { "notes": { "pin": pin } } } }
        }))
        .unwrap();

        let Classification::Relevant(event) = classify(&body) else {
            return Err(TestCaseError::fail("captured payment should be relevant"));
        };
        let extracted = extract_identifier(&event.entity).unwrap();
        prop_assert_eq!(extracted.as_str(), pin.as_str());
    }
}

#[test]
fn empty_pin_is_missing_not_malformed() {
    let body = br#"{"event":"payment.captured","payload":{"payment":{"entity":{"notes":{"pin":""}}}}}"#;

    let Classification::Relevant(event) = classify(body) else {
        panic!("captured payment should be relevant");
    };
    assert_eq!(extract_identifier(&event.entity), Err(MissingIdentifier));
}

#[test]
fn whitespace_and_field_order_do_not_matter() {
    let body = br#"
        {
            "payload" : { "payment" : { "entity" : { "notes" : { "pin" : "ABC123" } } } },
            "event" : "payment.captured"
        }
    "#;

    let Classification::Relevant(event) = classify(body) else {
        panic!("captured payment should be relevant");
    };
    assert_eq!(event.identifier().unwrap().as_str(), "ABC123");
}
