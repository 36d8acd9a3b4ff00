//! Throwaway certificate chains for tests
//!
//! Available to this crate's unit tests and, with the `test-utils` feature, to
//! downstream crates. Everything here panics on failure and must never be used
//! outside tests.

use rcgen::{
    BasicConstraints, CertificateParams, DnType, IsCa, KeyPair, PKCS_ECDSA_P256_SHA256,
    PKCS_ECDSA_P384_SHA384, SignatureAlgorithm,
};

use crate::{
    Certificate, Claims, ES256, HEADER_ALG, HEADER_KID, HEADER_TYP, HEADER_X5C, JWT_TYPE,
    SigningKey, TrustAnchor, codec, signature::Es256Signature,
};

/// Subject key ID embedded in tokens built by [`TestChain::sign`]
pub const TEST_KEY_ID: &str = "TESTKEY001";

/// A generated certificate and the PKCS#8 PEM of its private key
#[derive(Debug, Clone)]
pub struct TestCertificate {
    /// DER encoding
    pub der: Vec<u8>,
    /// PKCS#8 PEM private key
    pub key_pem: String,
}

impl TestCertificate {
    /// Standard base64 as it appears in `x5c`
    #[must_use]
    pub fn base64(&self) -> String {
        codec::encode_standard(&self.der)
    }

    /// PEM `CERTIFICATE` block
    ///
    /// # Panics
    /// Panics if the certificate does not decode.
    #[must_use]
    pub fn pem(&self) -> String {
        Certificate::from_der(self.der.clone())
            .and_then(|cert| cert.to_pem())
            .expect("certificate encodes as PEM")
    }
}

/// Leaf, intermediate and self-signed root, each signed by the next
#[derive(Debug, Clone)]
pub struct TestChain {
    /// End-entity certificate holding the P-256 token signing key
    pub leaf: TestCertificate,
    /// CA certificate that issued the leaf
    pub intermediate: TestCertificate,
    /// Self-signed CA certificate that issued the intermediate
    pub root: TestCertificate,
}

impl TestChain {
    /// Generate a P-256 chain
    ///
    /// # Panics
    /// Panics if certificate generation fails.
    #[must_use]
    pub fn generate() -> Self {
        Self::generate_with_root_algorithm(&PKCS_ECDSA_P256_SHA256)
    }

    /// Generate a chain whose root key is P-384, like Apple's production root
    ///
    /// # Panics
    /// Panics if certificate generation fails.
    #[must_use]
    pub fn generate_with_p384_root() -> Self {
        Self::generate_with_root_algorithm(&PKCS_ECDSA_P384_SHA384)
    }

    fn generate_with_root_algorithm(root_alg: &'static SignatureAlgorithm) -> Self {
        let root_key = KeyPair::generate_for(root_alg).expect("root key");
        let root_cert = ca_params("Test Root CA")
            .self_signed(&root_key)
            .expect("self-signed root");

        let intermediate_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("key");
        let intermediate_cert = ca_params("Test Intermediate CA")
            .signed_by(&intermediate_key, &root_cert, &root_key)
            .expect("intermediate");

        let leaf_key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("key");
        let leaf_cert = leaf_params("Test Leaf")
            .signed_by(&leaf_key, &intermediate_cert, &intermediate_key)
            .expect("leaf");

        Self {
            leaf: TestCertificate {
                der: leaf_cert.der().to_vec(),
                key_pem: leaf_key.serialize_pem(),
            },
            intermediate: TestCertificate {
                der: intermediate_cert.der().to_vec(),
                key_pem: intermediate_key.serialize_pem(),
            },
            root: TestCertificate {
                der: root_cert.der().to_vec(),
                key_pem: root_key.serialize_pem(),
            },
        }
    }

    /// `x5c` header value, leaf first
    #[must_use]
    pub fn x5c(&self) -> Vec<String> {
        vec![
            self.leaf.base64(),
            self.intermediate.base64(),
            self.root.base64(),
        ]
    }

    /// The root as a trust anchor
    ///
    /// # Panics
    /// Panics if the root does not decode.
    #[must_use]
    pub fn trust_anchor(&self) -> TrustAnchor {
        TrustAnchor::from_der(self.root.der.clone()).expect("root decodes")
    }

    /// The leaf's private key
    ///
    /// # Panics
    /// Panics if the PEM does not decode.
    #[must_use]
    pub fn signing_key(&self, key_id: &str) -> SigningKey {
        SigningKey::from_pem(&self.leaf.key_pem, key_id).expect("leaf key decodes")
    }

    /// Sign `claims` with the leaf key and embed this chain in `x5c`
    ///
    /// # Panics
    /// Panics if signing fails.
    #[must_use]
    pub fn sign(&self, claims: &Claims) -> String {
        let header = serde_json::json!({
            HEADER_TYP: JWT_TYPE,
            HEADER_ALG: ES256,
            HEADER_KID: TEST_KEY_ID,
            HEADER_X5C: self.x5c(),
        });
        sign_with_header(&self.signing_key(TEST_KEY_ID), &header, claims)
    }
}

/// Build a compact token over an arbitrary header
///
/// Lets tests produce headers no well-behaved signer would emit.
///
/// # Panics
/// Panics if serialization or signing fails.
#[must_use]
pub fn sign_with_header(key: &SigningKey, header: &serde_json::Value, claims: &Claims) -> String {
    let header = codec::encode(serde_json::to_vec(header).expect("header serializes"));
    let payload = codec::encode(serde_json::to_vec(claims).expect("claims serialize"));
    let signing_input = format!("{header}.{payload}");
    let signature: Es256Signature = key
        .sign_bytes(signing_input.as_bytes())
        .expect("signing succeeds");
    format!("{signing_input}.{}", codec::encode(signature.to_raw()))
}

/// A self-signed P-256 CA unrelated to any [`TestChain`]
///
/// # Panics
/// Panics if certificate generation fails.
#[must_use]
pub fn self_signed_root(common_name: &str) -> TestCertificate {
    let key = KeyPair::generate_for(&PKCS_ECDSA_P256_SHA256).expect("key");
    let cert = ca_params(common_name).self_signed(&key).expect("self-signed");
    TestCertificate {
        der: cert.der().to_vec(),
        key_pem: key.serialize_pem(),
    }
}

/// Claims shaped like a signed App Store transaction
#[must_use]
pub fn sample_transaction_claims() -> Claims {
    let value = serde_json::json!({
        "transactionId": "2000000123456789",
        "originalTransactionId": "2000000123456789",
        "bundleId": "com.example.app",
        "productId": "com.example.app.premium",
        "purchaseDate": 1_700_000_000_000_i64,
        "environment": "Sandbox",
    });
    match value {
        serde_json::Value::Object(map) => map,
        _ => Claims::new(),
    }
}

fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = leaf_params(common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params
}

fn leaf_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).expect("empty SAN list");
    params
        .distinguished_name
        .push(DnType::CommonName, common_name);
    params
}
