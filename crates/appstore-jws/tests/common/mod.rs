//! Shared helpers for integration tests
//!
//! Certificate chains come from `appstore_jws::test_utils`. Tokens over
//! arbitrary headers are assembled through the crate's public API.

#![allow(dead_code)]

use appstore_jws::test_utils::{TestCertificate, TestChain, sign_with_header};
use appstore_jws::{Claims, SigningKey};
use serde_json::{Value, json};

/// `kid` used by [`signed`]
pub const FIXTURE_KID: &str = "FIXTURE";

/// Token signed by the chain's leaf with a standard header carrying the chain
pub fn signed(chain: &TestChain, claims: &Value) -> String {
    let header = json!({"typ": "JWT", "alg": "ES256", "kid": FIXTURE_KID, "x5c": chain.x5c()});
    compact(&chain.signing_key(FIXTURE_KID), &header, claims)
}

/// Assemble a compact token over any header and payload object
pub fn compact(key: &SigningKey, header: &Value, payload: &Value) -> String {
    sign_with_header(key, header, &as_claims(payload.clone()))
}

/// Standard base64 of arbitrary DER, as it would appear in `x5c`
pub fn base64_der(der: &[u8]) -> String {
    TestCertificate {
        der: der.to_vec(),
        key_pem: String::new(),
    }
    .base64()
}

pub fn as_claims(value: Value) -> Claims {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}
