//! # appstore-jws - ES256 Compact JWS for the App Store Server API
//!
//! Signing and verification of compact JWS tokens (RFC 7515) using ECDSA P-256
//! with SHA-256, together with the `x5c` certificate-chain check that
//! authenticates the signer of inbound payloads.
//!
//! ## Core Features
//!
//! - **ES256 only** - a single algorithm profile, no algorithm agility
//! - **Fixed-width signatures** - lossless DER ⇄ raw `R‖S` conversion
//! - **Chain validation** - leaf → intermediate → root, optionally pinned to a trust anchor
//! - **Explicit verification mode** - relaxed parsing is opt-in per call, never process-wide
//!
//! ## Architecture
//!
//! - `codec` - base64url with padding normalization
//! - `signature` - DER SEQUENCE OF INTEGER ⇄ fixed-width `R‖S`
//! - `certificate` - certificate decoding (PEM / DER / base64) and issuer keys
//! - `chain` - certificate-chain validation
//! - `types` - headers, claims, signing keys, verification mode
//! - `signer` - token creation
//! - `verifier` - token verification
//! - `claims` - App Store Server API bearer-token claims
//! - `notification` - signed V2 notification envelopes
//! - `config` - serde-backed verifier configuration
//! - `test_utils` - throwaway certificate chains (feature: `test-utils`)
//!
//! ## Example
//!
//! ```no_run
//! use appstore_jws::{SigningKey, TokenSigner, TokenVerifier, VerificationMode};
//!
//! # fn run(p8_pem: &str, received: &str, apple_root_pem: &str) -> appstore_jws::Result<()> {
//! let key = SigningKey::from_pem(p8_pem, "2X9R4HXF34")?;
//! let signer = TokenSigner::new(key);
//! let mut claims = appstore_jws::Claims::new();
//! claims.insert("iss".into(), "57246542-96fe-1a63-e053-0824d011072a".into());
//! let bearer = signer.sign(&claims)?;
//!
//! let verifier = TokenVerifier::new().with_trust_anchor_pem(apple_root_pem)?;
//! let payload = verifier.verify(received)?;
//! # let _ = (bearer, payload, VerificationMode::Strict);
//! # Ok(())
//! # }
//! ```

pub mod certificate;
pub mod chain;
pub mod claims;
pub mod codec;
pub mod config;
pub mod errors;
pub mod notification;
pub mod signature;
pub mod signer;
pub mod types;
pub mod verifier;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// Re-export core types for convenience
pub use certificate::{Certificate, TrustAnchor};
pub use chain::CertificateChainValidator;
pub use claims::ApiTokenClaims;
pub use config::{VerifierConfig, VerifierConfigBuilder};
pub use errors::*;
pub use notification::{DecodedNotification, decode_notification};
pub use signer::TokenSigner;
pub use types::*;
pub use verifier::{TokenVerifier, inspect};

/// Result type used throughout the crate
pub type Result<T> = std::result::Result<T, JwsError>;

/// JWS `typ` header value
pub const JWT_TYPE: &str = "JWT";

/// The only supported JWS algorithm
pub const ES256: &str = "ES256";

/// Byte width of each of `R` and `S` for P-256
pub const P256_COMPONENT_WIDTH: usize = 32;

/// Length of a raw ES256 signature (`R‖S`)
pub const ES256_SIGNATURE_LENGTH: usize = 2 * P256_COMPONENT_WIDTH;

/// Header field names
pub const HEADER_TYP: &str = "typ";
/// Algorithm header field
pub const HEADER_ALG: &str = "alg";
/// Key identifier header field
pub const HEADER_KID: &str = "kid";
/// Certificate chain header field
pub const HEADER_X5C: &str = "x5c";

/// Header fields a verifier refuses to proceed without, in reporting order
pub const REQUIRED_VERIFY_HEADERS: [&str; 2] = [HEADER_ALG, HEADER_X5C];

/// Default upper bound on the number of certificates accepted in `x5c`
pub const DEFAULT_MAX_CHAIN_LENGTH: usize = 4;
