//! Token verification
//!
//! Verification is all-or-nothing. A token is split and decoded, its header
//! must name `ES256` and carry an `x5c` chain, the chain must validate (and
//! reach the trust anchor when one is configured), and the signature over
//! `header.payload` must verify with the leaf certificate's key. Only then is
//! the payload returned.

use p256::ecdsa::{Signature, VerifyingKey, signature::Verifier};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    CertificateChainValidator, Claims, CompactToken, ES256, HEADER_ALG, JwsError,
    P256_COMPONENT_WIDTH, REQUIRED_VERIFY_HEADERS, Result, TokenHeader, TrustAnchor,
    VerificationMode, VerifierConfig, codec, signature,
};

/// Verifies compact ES256 tokens carrying an `x5c` chain
#[derive(Debug, Clone, Default)]
pub struct TokenVerifier {
    trust_anchor: Option<TrustAnchor>,
    mode: VerificationMode,
    chain: CertificateChainValidator,
}

impl TokenVerifier {
    /// Strict verifier without a trust anchor
    ///
    /// Without an anchor only the chain's internal consistency is checked.
    /// Callers that need to know Apple signed the token must add one.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration
    ///
    /// # Errors
    /// Returns [`JwsError::Configuration`] if the configuration is invalid.
    pub fn from_config(config: &VerifierConfig) -> Result<Self> {
        Ok(Self {
            trust_anchor: config.decoded_trust_anchor()?,
            mode: config.mode,
            chain: CertificateChainValidator::with_max_length(config.max_chain_length),
        })
    }

    /// Require chains to end at `anchor`
    #[must_use]
    pub fn with_trust_anchor(mut self, anchor: TrustAnchor) -> Self {
        self.trust_anchor = Some(anchor);
        self
    }

    /// Require chains to end at the certificate in `pem`
    ///
    /// Accepts PEM or a bare base64 DER body.
    ///
    /// # Errors
    /// Returns an error if the certificate does not decode.
    pub fn with_trust_anchor_pem(self, pem: &str) -> Result<Self> {
        Ok(self.with_trust_anchor(TrustAnchor::from_pem(pem)?))
    }

    /// Set the default verification mode
    #[must_use]
    pub fn with_mode(mut self, mode: VerificationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the largest accepted `x5c` chain
    #[must_use]
    pub fn with_max_chain_length(mut self, max_length: usize) -> Self {
        self.chain = CertificateChainValidator::with_max_length(max_length);
        self
    }

    /// Configured trust anchor
    #[must_use]
    pub fn trust_anchor(&self) -> Option<&TrustAnchor> {
        self.trust_anchor.as_ref()
    }

    /// Configured verification mode
    #[must_use]
    pub fn mode(&self) -> VerificationMode {
        self.mode
    }

    /// Verify `token` with the configured anchor and mode
    ///
    /// # Errors
    /// Returns the first failing check's error; see [`JwsError`].
    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.verify_with(token, self.trust_anchor.as_ref(), self.mode)
    }

    /// Verify `token` with the configured anchor and an explicit mode
    ///
    /// # Errors
    /// See [`TokenVerifier::verify`].
    pub fn verify_with_mode(&self, token: &str, mode: VerificationMode) -> Result<Claims> {
        self.verify_with(token, self.trust_anchor.as_ref(), mode)
    }

    /// Verify `token` and deserialize its payload
    ///
    /// # Errors
    /// See [`TokenVerifier::verify`]. A payload that does not match `T` is
    /// [`JwsError::MalformedToken`].
    pub fn verify_as<T: DeserializeOwned>(&self, token: &str) -> Result<T> {
        let claims = self.verify(token)?;
        serde_json::from_value(serde_json::Value::Object(claims))
            .map_err(|e| JwsError::malformed_token(format!("unexpected payload shape: {e}")))
    }

    /// Verify `token` with an explicit anchor and mode
    ///
    /// # Errors
    /// See [`TokenVerifier::verify`].
    pub fn verify_with(
        &self,
        token: &str,
        anchor: Option<&TrustAnchor>,
        mode: VerificationMode,
    ) -> Result<Claims> {
        let parsed = ParsedToken::parse(token)?;

        if !mode.is_strict() {
            warn!(
                mode = %mode,
                "Returning token payload without header, chain or signature checks"
            );
            return Ok(parsed.payload);
        }

        let header = parsed.required_header()?;
        check_algorithm(&header.alg)?;

        let leaf = self.chain.validate_x5c(&header.x5c, anchor)?;
        let key = leaf.p256_public_key().map_err(|e| JwsError::SignatureVerification {
            reason: format!("leaf certificate: {e}"),
        })?;

        parsed.verify_signature(&key)?;

        debug!(
            kid = header.kid.as_deref().unwrap_or_default(),
            chain_length = header.x5c.len(),
            anchored = anchor.is_some(),
            "Token verified"
        );
        Ok(parsed.payload)
    }

    /// Verify `token` against a known public key, ignoring any `x5c`
    ///
    /// # Errors
    /// Returns decoding, algorithm and signature errors as
    /// [`TokenVerifier::verify`] does.
    pub fn verify_with_key(&self, token: &str, key: &VerifyingKey) -> Result<Claims> {
        let parsed = ParsedToken::parse(token)?;

        let alg = parsed
            .header
            .get(HEADER_ALG)
            .ok_or_else(|| JwsError::malformed_token(missing_field(HEADER_ALG)))?;
        let alg = alg.as_str().ok_or_else(|| {
            JwsError::malformed_token(format!("header field `{HEADER_ALG}` is not a string: {alg}"))
        })?;
        check_algorithm(alg)?;

        parsed.verify_signature(key)?;
        debug!("Token verified with supplied key");
        Ok(parsed.payload)
    }
}

/// Decode a token's header without any trust decision
///
/// # Errors
/// Returns [`JwsError::MalformedToken`] if the token does not have three
/// segments or the header is not valid.
pub fn inspect(token: &str) -> Result<TokenHeader> {
    let parts = CompactToken::split(token)?;
    let bytes = decode_segment("header", parts.header())?;
    serde_json::from_slice(&bytes).map_err(|e| JwsError::malformed_token(format!("header: {e}")))
}

/// Token decoded through step three: segments split, decoded and parsed
struct ParsedToken<'a> {
    parts: CompactToken<'a>,
    header: Claims,
    payload: Claims,
    signature: Vec<u8>,
}

impl<'a> ParsedToken<'a> {
    fn parse(token: &'a str) -> Result<Self> {
        let parts = CompactToken::split(token)?;

        let header = decode_segment("header", parts.header())?;
        let payload = decode_segment("payload", parts.payload())?;
        let signature = decode_segment("signature", parts.signature())?;

        Ok(Self {
            parts,
            header: parse_object("header", &header)?,
            payload: parse_object("payload", &payload)?,
            signature,
        })
    }

    fn required_header(&self) -> Result<TokenHeader> {
        if let Some(field) = REQUIRED_VERIFY_HEADERS
            .iter()
            .find(|field| !self.header.contains_key(**field))
        {
            return Err(JwsError::malformed_token(missing_field(field)));
        }

        serde_json::from_value(serde_json::Value::Object(self.header.clone()))
            .map_err(|e| JwsError::malformed_token(format!("header: {e}")))
    }

    fn verify_signature(&self, key: &VerifyingKey) -> Result<()> {
        let der = signature::raw_to_der(&self.signature, P256_COMPONENT_WIDTH)?;
        let sig = Signature::from_der(&der).map_err(|e| JwsError::SignatureVerification {
            reason: format!("signature scalars out of range: {e}"),
        })?;

        key.verify(self.parts.signing_input().as_bytes(), &sig)
            .map_err(|_| JwsError::SignatureVerification {
                reason: "ECDSA P-256 signature does not match header.payload".to_string(),
            })
    }
}

fn decode_segment(name: &str, segment: &str) -> Result<Vec<u8>> {
    let bytes = codec::decode(segment)
        .map_err(|e| JwsError::malformed_token(format!("{name} segment: {e}")))?;
    if bytes.is_empty() {
        return Err(JwsError::malformed_token(format!("{name} segment is empty")));
    }
    Ok(bytes)
}

fn parse_object(name: &str, bytes: &[u8]) -> Result<Claims> {
    serde_json::from_slice(bytes)
        .map_err(|e| JwsError::malformed_token(format!("{name} is not a JSON object: {e}")))
}

fn check_algorithm(alg: &str) -> Result<()> {
    if alg == ES256 {
        Ok(())
    } else {
        Err(JwsError::UnsupportedAlgorithm {
            algorithm: alg.to_string(),
        })
    }
}

fn missing_field(field: &str) -> String {
    format!("missing required header field `{field}`")
}
