//! Verifier configuration
//!
//! A serde-friendly description of a [`TokenVerifier`](crate::TokenVerifier),
//! so the trust anchor and chain bounds can live in a config file instead of
//! code.

use serde::{Deserialize, Serialize};

use crate::{
    DEFAULT_MAX_CHAIN_LENGTH, JwsError, Result, TrustAnchor, VerificationMode,
    chain::MIN_CHAIN_LENGTH,
};

/// Verifier settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifierConfig {
    /// Whether cryptographic checks run
    #[serde(default)]
    pub mode: VerificationMode,

    /// Largest `x5c` chain accepted
    #[serde(default = "default_max_chain_length")]
    pub max_chain_length: usize,

    /// Root certificate as PEM or bare base64 DER
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_anchor: Option<String>,
}

fn default_max_chain_length() -> usize {
    DEFAULT_MAX_CHAIN_LENGTH
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            mode: VerificationMode::Strict,
            max_chain_length: default_max_chain_length(),
            trust_anchor: None,
        }
    }
}

impl VerifierConfig {
    /// Create a builder
    #[must_use]
    pub fn builder() -> VerifierConfigBuilder {
        VerifierConfigBuilder::default()
    }

    /// Check bounds and decode the trust anchor
    ///
    /// # Errors
    /// Returns [`JwsError::Configuration`] if `max_chain_length` is below 2 or
    /// the trust anchor does not decode.
    pub fn validate(&self) -> Result<()> {
        self.decoded_trust_anchor().map(|_| ())
    }

    /// Decoded trust anchor, if one is configured
    ///
    /// # Errors
    /// Same as [`VerifierConfig::validate`].
    pub fn decoded_trust_anchor(&self) -> Result<Option<TrustAnchor>> {
        if self.max_chain_length < MIN_CHAIN_LENGTH {
            return Err(JwsError::Configuration {
                reason: format!(
                    "max_chain_length must be at least {MIN_CHAIN_LENGTH}, got {}",
                    self.max_chain_length
                ),
            });
        }

        self.trust_anchor
            .as_deref()
            .map(|text| {
                TrustAnchor::from_pem(text).map_err(|e| JwsError::Configuration {
                    reason: format!("trust_anchor: {e}"),
                })
            })
            .transpose()
    }
}

/// Builder for [`VerifierConfig`]
#[derive(Debug, Default)]
pub struct VerifierConfigBuilder {
    mode: Option<VerificationMode>,
    max_chain_length: Option<usize>,
    trust_anchor: Option<String>,
}

impl VerifierConfigBuilder {
    /// Set the verification mode
    #[must_use]
    pub fn mode(mut self, mode: VerificationMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Set the largest accepted chain
    #[must_use]
    pub fn max_chain_length(mut self, max_chain_length: usize) -> Self {
        self.max_chain_length = Some(max_chain_length);
        self
    }

    /// Set the trust anchor from PEM or bare base64 DER
    #[must_use]
    pub fn trust_anchor(mut self, pem: impl Into<String>) -> Self {
        self.trust_anchor = Some(pem.into());
        self
    }

    /// Build and validate
    ///
    /// # Errors
    /// See [`VerifierConfig::validate`].
    pub fn build(self) -> Result<VerifierConfig> {
        let config = VerifierConfig {
            mode: self.mode.unwrap_or_default(),
            max_chain_length: self.max_chain_length.unwrap_or(DEFAULT_MAX_CHAIN_LENGTH),
            trust_anchor: self.trust_anchor,
        };
        config.validate()?;
        Ok(config)
    }
}
