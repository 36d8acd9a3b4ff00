//! Error types for signing and verification
//!
//! Every failure is terminal for the call that produced it. Variants are split
//! so callers can tell attacker-controlled garbage (`is_malformed`) apart from
//! well-formed input that failed a trust decision (`is_untrusted`).

use std::fmt;

use thiserror::Error;

/// Errors produced by the signing and verification core
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwsError {
    /// base64url input is not valid after repadding
    #[error("base64url decoding failed: {reason}")]
    Decode {
        /// Underlying decoder message
        reason: String,
    },

    /// Wrong segment count, undecodable segment, invalid JSON or missing header
    #[error("malformed token: {reason}")]
    MalformedToken {
        /// What was wrong with the token
        reason: String,
    },

    /// Header algorithm is not ES256
    #[error("unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm {
        /// Algorithm named in the header
        algorithm: String,
    },

    /// DER structure or raw signature length violates the ES256 encoding rules
    #[error("malformed signature: {reason}")]
    MalformedSignature {
        /// Which encoding invariant was violated
        reason: String,
    },

    /// A certificate could not be decoded or carries an unusable key
    #[error("invalid certificate: {reason}")]
    InvalidCertificate {
        /// What was wrong with the certificate
        reason: String,
    },

    /// A chain link or the trust anchor check failed
    #[error("certificate chain validation failed at {stage}: {reason}")]
    ChainValidation {
        /// Where in the chain the failure happened
        stage: ChainStage,
        /// Underlying reason
        reason: String,
    },

    /// The ECDSA signature over `header.payload` does not verify
    #[error("signature verification failed: {reason}")]
    SignatureVerification {
        /// Underlying reason
        reason: String,
    },

    /// The signing primitive rejected the key or failed internally
    #[error("signing failed: {reason}")]
    SigningFailed {
        /// Underlying reason
        reason: String,
    },

    /// A notification envelope is not a JSON object with a `signedPayload`
    #[error("malformed notification: {reason}")]
    MalformedNotification {
        /// What was wrong with the envelope
        reason: String,
    },

    /// Configuration is inconsistent
    #[error("configuration error: {reason}")]
    Configuration {
        /// What was wrong
        reason: String,
    },
}

/// Position in the certificate chain where validation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainStage {
    /// The chain has too few or too many certificates
    Length,
    /// The certificate at `index` could not be decoded
    Parse {
        /// Zero-based position in the chain (leaf is 0)
        index: usize,
    },
    /// `chain[index]` is not signed by `chain[index + 1]`
    Link {
        /// Zero-based position of the subject certificate
        index: usize,
    },
    /// The last certificate is not signed by the supplied trust anchor
    TrustAnchor,
}

impl fmt::Display for ChainStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length => write!(f, "chain length"),
            Self::Parse { index } => write!(f, "certificate {index}"),
            Self::Link { index } => write!(f, "link {index} -> {}", index + 1),
            Self::TrustAnchor => write!(f, "trust anchor"),
        }
    }
}

impl JwsError {
    pub(crate) fn malformed_token(reason: impl Into<String>) -> Self {
        Self::MalformedToken {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed_signature(reason: impl Into<String>) -> Self {
        Self::MalformedSignature {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_certificate(reason: impl Into<String>) -> Self {
        Self::InvalidCertificate {
            reason: reason.into(),
        }
    }

    pub(crate) fn chain(stage: ChainStage, reason: impl Into<String>) -> Self {
        Self::ChainValidation {
            stage,
            reason: reason.into(),
        }
    }

    pub(crate) fn signing_failed(reason: impl fmt::Display) -> Self {
        Self::SigningFailed {
            reason: reason.to_string(),
        }
    }

    /// Input could not be parsed into a structurally valid token
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Decode { .. }
                | Self::MalformedToken { .. }
                | Self::UnsupportedAlgorithm { .. }
                | Self::MalformedSignature { .. }
                | Self::MalformedNotification { .. }
                | Self::InvalidCertificate { .. }
                | Self::ChainValidation {
                    stage: ChainStage::Length | ChainStage::Parse { .. },
                    ..
                }
        )
    }

    /// Input was well formed but failed a trust decision
    #[must_use]
    pub fn is_untrusted(&self) -> bool {
        matches!(
            self,
            Self::SignatureVerification { .. }
                | Self::ChainValidation {
                    stage: ChainStage::Link { .. } | ChainStage::TrustAnchor,
                    ..
                }
        )
    }

    /// Chain stage for chain validation failures
    #[must_use]
    pub fn chain_stage(&self) -> Option<ChainStage> {
        match self {
            Self::ChainValidation { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
