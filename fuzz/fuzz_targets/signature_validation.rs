#![no_main]

//! Fuzz target for webhook signature verification.
//!
//! The first byte picks a split point; the input is divided into a body and
//! a header value. Verification must never panic and must never accept a
//! header that differs from the real digest.

use libfuzzer_sys::fuzz_target;
use pinhook_api::crypto::{sign_payload, verify_signature};
use pinhook_core::SecretString;

fuzz_target!(|data: &[u8]| {
    let Some((&split, rest)) = data.split_first() else { return };
    let split = usize::from(split).min(rest.len());
    let (body, header) = rest.split_at(split);

    let secret = SecretString::new("fuzz-secret");
    let Ok(expected) = sign_payload(body, &secret) else { return };

    if let Ok(header) = std::str::from_utf8(header) {
        let accepted = verify_signature(body, Some(header), &secret).is_authenticated();
        assert_eq!(accepted, header.eq_ignore_ascii_case(&expected));
    }

    assert!(verify_signature(body, Some(&expected), &secret).is_authenticated());
});
