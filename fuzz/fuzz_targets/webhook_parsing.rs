#![no_main]

//! Fuzz target for webhook payload classification.
//!
//! Feeds arbitrary bytes through classification and identifier extraction.
//! Neither may panic, and a relevant event must always carry an entity the
//! extractor can inspect.

use libfuzzer_sys::fuzz_target;
use pinhook_core::{classify, extract_identifier, Classification, PAYMENT_CAPTURED};

fuzz_target!(|data: &[u8]| {
    match classify(data) {
        Classification::Relevant(event) => {
            assert_eq!(event.event_type, PAYMENT_CAPTURED);
            if let Ok(identifier) = extract_identifier(&event.entity) {
                assert!(!identifier.as_str().is_empty());
            }
        },
        Classification::Ignored { event_type } => assert_ne!(event_type, PAYMENT_CAPTURED),
        Classification::Malformed { .. } => {},
    }
});
