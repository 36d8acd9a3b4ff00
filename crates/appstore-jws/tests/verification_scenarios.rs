//! End-to-end verification scenarios
//!
//! Tokens are produced the way the App Store produces them: signed by a leaf
//! certificate whose chain travels in `x5c`. Tests cover:
//! - Round trip through the signer and the verifier
//! - Payload and signature tampering
//! - Malformed structure and headers
//! - Chain link and trust anchor failures
//! - Relaxed (unverified) parsing opted into per call

mod common;

use appstore_jws::test_utils::{TestChain, self_signed_root};
use appstore_jws::{
    ChainStage, Claims, JwsError, SigningKey, TokenSigner, TokenVerifier, TrustAnchor,
    VerificationMode, VerifierConfig, codec, inspect,
};
use common::{as_claims, compact, signed};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Test: claims survive signing and verification unchanged
#[test]
fn test_end_to_end_round_trip() {
    // GIVEN: A chain whose leaf signs the token, with kid KEY1
    let fixture = TestChain::generate();
    let claims = json!({"iss": "abc", "iat": 1_700_000_000, "exp": 1_700_003_600});
    let header = json!({"typ": "JWT", "alg": "ES256", "kid": "KEY1", "x5c": fixture.x5c()});
    let token = compact(&fixture.signing_key("KEY1"), &header, &claims);

    // WHEN: The token is verified against the chain's root
    let verifier = TokenVerifier::new()
        .with_trust_anchor_pem(&fixture.root.pem())
        .unwrap();
    let decoded = verifier.verify(&token).unwrap();

    // THEN: The payload matches exactly, integers stay integers
    assert_eq!(decoded, as_claims(claims));
    assert_eq!(decoded["iat"].as_u64(), Some(1_700_000_000));
    assert!(decoded["exp"].is_number() && !decoded["exp"].is_f64());
}

/// Test: a freshly generated key's signature verifies with its public key
#[test]
fn test_signer_and_verifier_agree() {
    let key = SigningKey::generate("KEY1");
    let claims = as_claims(json!({"iss": "abc", "bid": "com.example"}));

    let token = TokenSigner::new(key.clone()).sign(&claims).unwrap();
    let decoded = TokenVerifier::new()
        .verify_with_key(&token, &key.verifying_key())
        .unwrap();

    assert_eq!(decoded, claims);
    assert_eq!(inspect(&token).unwrap().kid.as_deref(), Some("KEY1"));
}

/// Test: changing a claim invalidates the signature
///
/// Attack: replace the payload of a genuine token with a forged one
/// Defense: the signature covers `header.payload`
#[test]
fn test_payload_substitution_is_rejected() {
    // GIVEN: A genuine token
    let fixture = TestChain::generate();
    let token = signed(&fixture, &json!({"productId": "basic", "quantity": 1}));
    let parts: Vec<&str> = token.split('.').collect();

    // WHEN: The payload is swapped for an upgraded product
    let forged_payload = codec::encode(br#"{"productId":"premium","quantity":1}"#);
    let forged = format!("{}.{forged_payload}.{}", parts[0], parts[2]);
    let result = TokenVerifier::new().with_trust_anchor(fixture.trust_anchor()).verify(&forged);

    // THEN: Signature verification fails, classified as untrusted
    let err = result.unwrap_err();
    assert!(matches!(err, JwsError::SignatureVerification { .. }));
    assert!(err.is_untrusted());
    assert!(!err.is_malformed());
}

/// Test: a signature lifted from another token does not verify
#[test]
fn test_signature_transplant_is_rejected() {
    let fixture = TestChain::generate();
    let a = signed(&fixture, &json!({"n": 1}));
    let b = signed(&fixture, &json!({"n": 2}));

    let (a_input, _) = a.rsplit_once('.').unwrap();
    let (_, b_signature) = b.rsplit_once('.').unwrap();
    let forged = format!("{a_input}.{b_signature}");

    let err = TokenVerifier::new().verify(&forged).unwrap_err();
    assert!(matches!(err, JwsError::SignatureVerification { .. }));
}

/// Test: an attacker-chosen x5c with its own self-signed root is not trusted
///
/// Attack: embed a complete chain the attacker controls
/// Defense: the chain must end at the configured anchor
#[test]
fn test_attacker_chain_is_rejected_with_anchor() {
    // GIVEN: The genuine root, and a token signed through an attacker's chain
    let genuine = TestChain::generate();
    let attacker = TestChain::generate();
    let token = signed(&attacker, &json!({"transactionId": "1"}));

    // WHEN: Verified without an anchor, the chain is merely self-consistent
    assert!(TokenVerifier::new().verify(&token).is_ok());

    // THEN: With the genuine anchor, the anchor check rejects it
    let err = TokenVerifier::new()
        .with_trust_anchor(genuine.trust_anchor())
        .verify(&token)
        .unwrap_err();
    assert_eq!(err.chain_stage(), Some(ChainStage::TrustAnchor));
}

/// Test: a leaf issued by a different intermediate breaks the first link
#[test]
fn test_foreign_leaf_breaks_first_link() {
    let fixture = TestChain::generate();
    let stranger = TestChain::generate();

    let x5c = vec![
        stranger.leaf.base64(),
        fixture.intermediate.base64(),
        fixture.root.base64(),
    ];
    let header = json!({"alg": "ES256", "x5c": x5c});
    let token = compact(&stranger.signing_key("X"), &header, &json!({}));

    let err = TokenVerifier::new()
        .with_trust_anchor(fixture.trust_anchor())
        .verify(&token)
        .unwrap_err();
    assert_eq!(err.chain_stage(), Some(ChainStage::Link { index: 0 }));
}

/// Test: corrupting the leaf certificate's signature is a link failure,
/// distinguishable from an anchor failure
#[test]
fn test_corrupted_link_versus_anchor_failure() {
    let fixture = TestChain::generate();
    let mut leaf = fixture.leaf.der.clone();
    let last = leaf.len() - 1;
    leaf[last] ^= 0x80;

    let header = json!({
        "alg": "ES256",
        "x5c": [common::base64_der(&leaf), fixture.intermediate.base64(), fixture.root.base64()],
    });
    let token = compact(&fixture.signing_key("K"), &header, &json!({}));

    let link = TokenVerifier::new()
        .with_trust_anchor(fixture.trust_anchor())
        .verify(&token)
        .unwrap_err();
    let anchor = TokenVerifier::new()
        .with_trust_anchor(TrustAnchor::from_der(self_signed_root("Other").der).unwrap())
        .verify(&signed(&fixture, &json!({})))
        .unwrap_err();

    assert_eq!(link.chain_stage(), Some(ChainStage::Link { index: 0 }));
    assert_eq!(anchor.chain_stage(), Some(ChainStage::TrustAnchor));
    assert_ne!(link.chain_stage(), anchor.chain_stage());
}

/// Test: P-384 roots (as Apple's production root) anchor P-256 leaves
#[test]
fn test_p384_root_chain_verifies() {
    let fixture = TestChain::generate_with_p384_root();
    let token = signed(&fixture, &json!({"environment": "Production"}));
    let claims = TokenVerifier::new()
        .with_trust_anchor(fixture.trust_anchor())
        .verify(&token)
        .unwrap();
    assert_eq!(claims["environment"], "Production");
}

/// Test: structural problems are reported as malformed input
#[test]
fn test_malformed_inputs() {
    let fixture = TestChain::generate();
    let verifier = TokenVerifier::new();

    // Two segments
    let err = verifier.verify("eyJhbGciOiJFUzI1NiJ9.e30").unwrap_err();
    assert!(matches!(err, JwsError::MalformedToken { .. }));

    // Header without alg names the field
    let token = compact(&fixture.signing_key("K"), &json!({"x5c": fixture.x5c()}), &json!({}));
    let err = verifier.verify(&token).unwrap_err();
    assert!(err.to_string().contains("`alg`"), "{err}");

    // Header without x5c names the field
    let token = compact(&fixture.signing_key("K"), &json!({"alg": "ES256"}), &json!({}));
    let err = verifier.verify(&token).unwrap_err();
    assert!(err.to_string().contains("`x5c`"), "{err}");

    // Header that is not JSON
    let token = format!("{}.e30.c2ln", codec::encode(b"not json"));
    assert!(matches!(
        verifier.verify(&token),
        Err(JwsError::MalformedToken { .. })
    ));
}

/// Test: non-ES256 algorithms are refused before any chain work
#[test]
fn test_algorithm_confusion() {
    let fixture = TestChain::generate();
    for alg in ["HS256", "none", "RS256", "ES384"] {
        let header = json!({"alg": alg, "x5c": fixture.x5c()});
        let token = compact(&fixture.signing_key("K"), &header, &json!({}));
        let err = TokenVerifier::new().verify(&token).unwrap_err();
        assert_eq!(
            err,
            JwsError::UnsupportedAlgorithm {
                algorithm: alg.to_string()
            }
        );
    }
}

/// Test: oversized chains are refused before decoding
#[test]
fn test_chain_length_bound() {
    let fixture = TestChain::generate();
    let mut x5c = fixture.x5c();
    x5c.extend(std::iter::repeat_n("garbage".to_string(), 3));
    let header = json!({"alg": "ES256", "x5c": x5c});
    let token = compact(&fixture.signing_key("K"), &header, &json!({}));

    let err = TokenVerifier::new().verify(&token).unwrap_err();
    assert_eq!(err.chain_stage(), Some(ChainStage::Length));

    let relaxed_bound = TokenVerifier::new().with_max_chain_length(8);
    let err = relaxed_bound.verify(&token).unwrap_err();
    assert_eq!(err.chain_stage(), Some(ChainStage::Parse { index: 3 }));
}

/// Test: relaxed parsing is opt-in per call and never leaks into other calls
#[test]
fn test_unverified_mode_is_scoped() {
    let fixture = TestChain::generate();
    let token = signed(&fixture, &json!({"transactionId": "42"}));
    let parts: Vec<&str> = token.split('.').collect();
    let forged = format!(
        "{}.{}.{}",
        parts[0],
        codec::encode(br#"{"transactionId":"43"}"#),
        parts[2]
    );

    let verifier = TokenVerifier::new().with_trust_anchor(fixture.trust_anchor());

    let relaxed = verifier
        .verify_with(&forged, None, VerificationMode::Unverified)
        .unwrap();
    assert_eq!(relaxed["transactionId"], "43");

    // The same verifier stays strict
    assert!(verifier.verify(&forged).is_err());
    assert!(verifier.verify(&token).is_ok());
}

/// Test: a verifier built from configuration behaves like one built in code
#[test]
fn test_config_built_verifier() {
    let fixture = TestChain::generate();
    let config: VerifierConfig = serde_json::from_value(json!({
        "mode": "strict",
        "max_chain_length": 3,
        "trust_anchor": fixture.root.pem(),
    }))
    .unwrap();

    let verifier = TokenVerifier::from_config(&config).unwrap();
    let claims = verifier.verify(&signed(&fixture, &json!({"a": true}))).unwrap();
    assert_eq!(claims, as_claims(json!({"a": true})));

    let other = TestChain::generate();
    assert!(verifier.verify(&signed(&other, &json!({}))).is_err());
}

/// Test: verify_as maps the payload into a caller type
#[test]
fn test_typed_payload() {
    #[derive(serde::Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RenewalInfo {
        auto_renew_status: u8,
        product_id: String,
    }

    let fixture = TestChain::generate();
    let token = signed(&fixture, &json!({"autoRenewStatus": 1, "productId": "monthly"}));
    let info: RenewalInfo = TokenVerifier::new().verify_as(&token).unwrap();
    assert_eq!(info.auto_renew_status, 1);
    assert_eq!(info.product_id, "monthly");

    let _: Claims = TokenVerifier::new().verify_as(&token).unwrap();
}
