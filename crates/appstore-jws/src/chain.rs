//! Certificate-chain validation
//!
//! A chain is an ordered list, leaf first. Every certificate must be signed by
//! the key of the certificate after it, and when a trust anchor is supplied the
//! last certificate must be signed by the anchor's key. Only signatures are
//! checked: validity periods, revocation, names and extensions are not.

use tracing::{debug, trace};

use crate::{
    Certificate, ChainStage, DEFAULT_MAX_CHAIN_LENGTH, JwsError, Result, TrustAnchor,
};

/// Smallest chain the validator accepts
pub const MIN_CHAIN_LENGTH: usize = 2;

/// Validates `x5c` certificate chains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CertificateChainValidator {
    max_length: usize,
}

impl Default for CertificateChainValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl CertificateChainValidator {
    /// Validator accepting up to [`DEFAULT_MAX_CHAIN_LENGTH`] certificates
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_length: DEFAULT_MAX_CHAIN_LENGTH,
        }
    }

    /// Validator accepting up to `max_length` certificates
    ///
    /// Values below [`MIN_CHAIN_LENGTH`] are raised to it.
    #[must_use]
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(MIN_CHAIN_LENGTH),
        }
    }

    /// Largest accepted chain
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Decode and validate an `x5c` header value, returning the leaf
    ///
    /// The length bound is checked before any entry is decoded.
    ///
    /// # Errors
    /// Returns [`JwsError::ChainValidation`] with the stage that failed.
    pub fn validate_x5c(
        &self,
        x5c: &[String],
        anchor: Option<&TrustAnchor>,
    ) -> Result<Certificate> {
        self.decode_and_check(x5c, anchor).inspect_err(log_rejection)
    }

    /// Validate an already decoded chain
    ///
    /// # Errors
    /// Returns [`JwsError::ChainValidation`] at the first failing stage:
    /// [`ChainStage::Length`], then [`ChainStage::Link`] in leaf-to-root order,
    /// then [`ChainStage::TrustAnchor`].
    pub fn validate(&self, chain: &[Certificate], anchor: Option<&TrustAnchor>) -> Result<()> {
        self.check(chain, anchor).inspect_err(log_rejection)
    }

    fn decode_and_check(
        &self,
        x5c: &[String],
        anchor: Option<&TrustAnchor>,
    ) -> Result<Certificate> {
        self.check_length(x5c.len())?;

        let chain = x5c
            .iter()
            .enumerate()
            .map(|(index, encoded)| {
                Certificate::from_base64(encoded).map_err(|e| {
                    JwsError::chain(ChainStage::Parse { index }, error_reason(&e))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.check(&chain, anchor)?;

        chain
            .into_iter()
            .next()
            .ok_or_else(|| JwsError::chain(ChainStage::Length, "chain is empty"))
    }

    fn check(&self, chain: &[Certificate], anchor: Option<&TrustAnchor>) -> Result<()> {
        self.check_length(chain.len())?;

        for (index, pair) in chain.windows(2).enumerate() {
            let (subject, issuer) = (&pair[0], &pair[1]);
            trace!(
                index,
                subject = %subject.subject(),
                issuer = %issuer.subject(),
                "Checking chain link"
            );
            subject
                .check_issued_by(issuer)
                .map_err(|reason| JwsError::chain(ChainStage::Link { index }, reason))?;
        }

        match (anchor, chain.last()) {
            (Some(anchor), Some(last)) => {
                last.check_issued_by(anchor.certificate()).map_err(|reason| {
                    JwsError::chain(
                        ChainStage::TrustAnchor,
                        format!(
                            "{} is not signed by anchor {}: {reason}",
                            last.subject(),
                            anchor.certificate().subject()
                        ),
                    )
                })?;
                debug!(length = chain.len(), "Certificate chain anchored");
            }
            _ => debug!(
                length = chain.len(),
                "Certificate chain internally consistent, no trust anchor supplied"
            ),
        }

        Ok(())
    }

    fn check_length(&self, length: usize) -> Result<()> {
        if (MIN_CHAIN_LENGTH..=self.max_length).contains(&length) {
            Ok(())
        } else {
            Err(JwsError::chain(
                ChainStage::Length,
                format!(
                    "chain has {length} certificates, expected {MIN_CHAIN_LENGTH}..={}",
                    self.max_length
                ),
            ))
        }
    }
}

fn log_rejection(err: &JwsError) {
    if let Some(stage) = err.chain_stage() {
        debug!(%stage, error = %err, "Certificate chain rejected");
    }
}

/// Inner reason of a certificate error without its variant prefix
fn error_reason(err: &JwsError) -> String {
    match err {
        JwsError::InvalidCertificate { reason } | JwsError::Decode { reason } => reason.clone(),
        other => other.to_string(),
    }
}
