//! Token creation
//!
//! Produces `base64url(header).base64url(payload).base64url(R‖S)` with the
//! fixed `{"typ":"JWT","alg":"ES256","kid":...}` header.

use serde::Serialize;
use tracing::debug;

use crate::{ApiTokenClaims, Claims, JwsError, Result, SigningHeader, SigningKey, codec};

/// Signs compact ES256 tokens with one key
#[derive(Debug, Clone)]
pub struct TokenSigner {
    key: SigningKey,
}

impl TokenSigner {
    /// Signer using `key`; its identifier becomes the `kid` header
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// The signing key
    #[must_use]
    pub fn key(&self) -> &SigningKey {
        &self.key
    }

    /// Sign a claims object
    ///
    /// # Errors
    /// Returns [`JwsError::SigningFailed`] if the signing primitive fails.
    pub fn sign(&self, claims: &Claims) -> Result<String> {
        self.sign_claims(claims)
    }

    /// Sign any value that serializes to a JSON object
    ///
    /// # Errors
    /// Returns [`JwsError::SigningFailed`] if `claims` does not serialize or
    /// the signing primitive fails.
    pub fn sign_claims<T: Serialize + ?Sized>(&self, claims: &T) -> Result<String> {
        let header = SigningHeader::new(self.key.key_id());
        let header_json = serde_json::to_vec(&header).map_err(JwsError::signing_failed)?;
        let payload_json = serde_json::to_vec(claims).map_err(JwsError::signing_failed)?;

        let signing_input = format!("{}.{}", codec::encode(header_json), codec::encode(payload_json));
        let signature = self.key.sign_bytes(signing_input.as_bytes())?;

        debug!(kid = %self.key.key_id(), "Signed ES256 token");

        Ok(format!("{signing_input}.{}", codec::encode(signature.to_raw())))
    }

    /// Sign an App Store Server API bearer token issued now
    ///
    /// # Errors
    /// Returns [`JwsError::SigningFailed`] if the signing primitive fails.
    pub fn sign_api_token(&self, claims: &ApiTokenClaims) -> Result<String> {
        self.sign(&claims.to_claims())
    }
}
