//! X.509 certificate decoding and issuer keys
//!
//! Certificates arrive in three shapes: standard base64 DER inside an `x5c`
//! header, PEM text from configuration, and raw DER. All of them end up as a
//! [`Certificate`], which keeps the original DER bytes alongside the decoded
//! structure so the signed `tbsCertificate` bytes can be hashed exactly as they
//! were issued.

use std::fmt;

use const_oid::{
    ObjectIdentifier,
    db::rfc5912::{ECDSA_WITH_SHA_256, ECDSA_WITH_SHA_384},
};
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use sha2::{Digest, Sha256, Sha384};
use x509_cert::der::{
    Decode, DecodePem, Encode, EncodePem, Header, Reader, SliceReader, pem::LineEnding,
    referenced::OwnedToRef,
};

use crate::{JwsError, Result, codec, signature};

/// Start of any PEM encapsulation boundary
const PEM_PREFIX: &str = "-----BEGIN ";

/// A decoded X.509 certificate together with its DER encoding
#[derive(Clone, PartialEq, Eq)]
pub struct Certificate {
    der: Vec<u8>,
    tbs: Vec<u8>,
    inner: x509_cert::Certificate,
}

impl Certificate {
    /// Decode a DER-encoded certificate
    ///
    /// # Errors
    /// Returns [`JwsError::InvalidCertificate`] if the bytes are not a DER
    /// certificate.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self> {
        let der = der.into();
        let inner = x509_cert::Certificate::from_der(&der)
            .map_err(|e| JwsError::invalid_certificate(format!("DER decoding failed: {e}")))?;
        let tbs = tbs_bytes(&der)
            .map_err(|e| JwsError::invalid_certificate(format!("tbsCertificate: {e}")))?;

        Ok(Self { der, tbs, inner })
    }

    /// Decode the standard base64 form used by `x5c` entries
    ///
    /// # Errors
    /// Returns [`JwsError::Decode`] for invalid base64 and
    /// [`JwsError::InvalidCertificate`] for invalid DER.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        Self::from_der(codec::decode_standard(encoded)?)
    }

    /// Decode a PEM `CERTIFICATE` block
    ///
    /// Surrounding whitespace is ignored. The label must be `CERTIFICATE`.
    ///
    /// # Errors
    /// Returns [`JwsError::InvalidCertificate`] for missing or mislabelled
    /// armor and for an invalid body.
    pub fn from_pem(pem: &str) -> Result<Self> {
        let inner = x509_cert::Certificate::from_pem(pem.trim())
            .map_err(|e| JwsError::invalid_certificate(format!("PEM decoding failed: {e}")))?;
        let der = inner
            .to_der()
            .map_err(|e| JwsError::invalid_certificate(format!("DER encoding failed: {e}")))?;
        let tbs = tbs_bytes(&der)
            .map_err(|e| JwsError::invalid_certificate(format!("tbsCertificate: {e}")))?;

        Ok(Self { der, tbs, inner })
    }

    /// Decode PEM armor or a bare base64 body, whichever `text` holds
    ///
    /// A bare body is what Apple distributes in some configuration snippets;
    /// it is treated exactly like the inside of a PEM block.
    ///
    /// # Errors
    /// See [`Certificate::from_pem`] and [`Certificate::from_base64`].
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim_start().starts_with(PEM_PREFIX) {
            Self::from_pem(text)
        } else {
            Self::from_base64(text)
        }
    }

    /// Original DER encoding
    #[must_use]
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// PEM encoding with 64-column lines
    ///
    /// # Errors
    /// Returns [`JwsError::InvalidCertificate`] if the certificate cannot be
    /// re-encoded.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(LineEnding::LF)
            .map_err(|e| JwsError::invalid_certificate(format!("PEM encoding failed: {e}")))
    }

    /// Subject distinguished name in RFC 4514 form
    #[must_use]
    pub fn subject(&self) -> String {
        self.inner.tbs_certificate.subject.to_string()
    }

    /// Issuer distinguished name in RFC 4514 form
    #[must_use]
    pub fn issuer(&self) -> String {
        self.inner.tbs_certificate.issuer.to_string()
    }

    /// Algorithm the issuer used to sign this certificate
    #[must_use]
    pub fn signature_algorithm(&self) -> ObjectIdentifier {
        self.inner.signature_algorithm.oid
    }

    /// The subject's public key as a P-256 verifying key
    ///
    /// # Errors
    /// Returns [`JwsError::InvalidCertificate`] if the key is not on P-256.
    pub fn p256_public_key(&self) -> Result<p256::ecdsa::VerifyingKey> {
        match self.subject_key()? {
            SubjectKey::P256(key) => Ok(key),
            SubjectKey::P384(_) => Err(JwsError::invalid_certificate(
                "subject key is P-384, ES256 requires P-256",
            )),
        }
    }

    /// Whether `issuer`'s key verifies this certificate's signature
    #[must_use]
    pub fn is_issued_by(&self, issuer: &Certificate) -> bool {
        self.check_issued_by(issuer).is_ok()
    }

    /// Verify this certificate's signature with `issuer`'s public key
    ///
    /// Only the signature is checked. Names, validity periods and extensions
    /// are not consulted.
    pub(crate) fn check_issued_by(&self, issuer: &Certificate) -> std::result::Result<(), String> {
        let key = issuer.subject_key().map_err(|e| e.to_string())?;

        let oid = self.signature_algorithm();
        let digest = match oid {
            ECDSA_WITH_SHA_256 => Sha256::digest(&self.tbs).to_vec(),
            ECDSA_WITH_SHA_384 => Sha384::digest(&self.tbs).to_vec(),
            other => return Err(format!("unsupported certificate signature algorithm {other}")),
        };

        let der = self
            .inner
            .signature
            .as_bytes()
            .ok_or_else(|| "signature BIT STRING has unused bits".to_string())?;

        key.verify_prehash(&digest, der)
    }

    fn subject_key(&self) -> Result<SubjectKey> {
        let spki = self
            .inner
            .tbs_certificate
            .subject_public_key_info
            .owned_to_ref();

        if let Ok(key) = p256::ecdsa::VerifyingKey::try_from(spki.clone()) {
            return Ok(SubjectKey::P256(key));
        }
        p384::ecdsa::VerifyingKey::try_from(spki)
            .map(SubjectKey::P384)
            .map_err(|e| {
                JwsError::invalid_certificate(format!("subject key is neither P-256 nor P-384: {e}"))
            })
    }
}

impl fmt::Debug for Certificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Certificate")
            .field("subject", &self.subject())
            .field("issuer", &self.issuer())
            .field("der_len", &self.der.len())
            .finish()
    }
}

/// Certificate whose key terminates a chain
///
/// The last certificate of an `x5c` chain must be signed by this key. Passing
/// Apple's self-signed root here accepts chains that end in that same root.
#[derive(Clone, PartialEq, Eq)]
pub struct TrustAnchor(Certificate);

impl TrustAnchor {
    /// Wrap an already decoded certificate
    #[must_use]
    pub fn new(certificate: Certificate) -> Self {
        Self(certificate)
    }

    /// Decode from PEM or a bare base64 body
    ///
    /// # Errors
    /// See [`Certificate::parse`].
    pub fn from_pem(pem: &str) -> Result<Self> {
        Certificate::parse(pem).map(Self)
    }

    /// Decode from DER
    ///
    /// # Errors
    /// See [`Certificate::from_der`].
    pub fn from_der(der: impl Into<Vec<u8>>) -> Result<Self> {
        Certificate::from_der(der).map(Self)
    }

    /// The anchor certificate
    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.0
    }
}

impl From<Certificate> for TrustAnchor {
    fn from(certificate: Certificate) -> Self {
        Self(certificate)
    }
}

impl fmt::Debug for TrustAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TrustAnchor").field(&self.0.subject()).finish()
    }
}

/// Public key of a certificate's subject, usable to verify what it issued
enum SubjectKey {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
}

impl SubjectKey {
    fn verify_prehash(&self, digest: &[u8], der: &[u8]) -> std::result::Result<(), String> {
        match self {
            Self::P256(key) => {
                let raw = signature::der_to_raw(der, 32).map_err(|e| e.to_string())?;
                let sig = p256::ecdsa::Signature::from_slice(&raw).map_err(|e| e.to_string())?;
                key.verify_prehash(digest, &sig).map_err(|e| e.to_string())
            }
            Self::P384(key) => {
                let raw = signature::der_to_raw(der, 48).map_err(|e| e.to_string())?;
                let sig = p384::ecdsa::Signature::from_slice(&raw).map_err(|e| e.to_string())?;
                key.verify_prehash(digest, &sig).map_err(|e| e.to_string())
            }
        }
    }
}

/// Slice the `tbsCertificate` TLV out of a certificate's DER encoding
fn tbs_bytes(der: &[u8]) -> x509_cert::der::Result<Vec<u8>> {
    let mut reader = SliceReader::new(der)?;
    Header::decode(&mut reader)?;
    Ok(reader.tlv_bytes()?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TestChain, self_signed_root};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_der_keeps_original_bytes() {
        let chain = TestChain::generate();
        let cert = Certificate::from_der(chain.leaf.der.clone()).unwrap();
        assert_eq!(cert.der(), chain.leaf.der.as_slice());
        assert!(cert.subject().contains("Test Leaf"));
        assert!(cert.issuer().contains("Test Intermediate"));
        assert_eq!(cert.signature_algorithm(), ECDSA_WITH_SHA_256);
    }

    #[test]
    fn test_pem_and_bare_base64_decode_identically() {
        let chain = TestChain::generate();
        let cert = Certificate::from_der(chain.root.der.clone()).unwrap();

        let pem = cert.to_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----\n"));
        assert!(pem.lines().all(|line| line.len() <= 64));

        let from_pem = Certificate::parse(&pem).unwrap();
        let bare = codec::encode_standard(&chain.root.der);
        let from_bare = Certificate::parse(&bare).unwrap();

        assert_eq!(from_pem, cert);
        assert_eq!(from_bare, cert);
    }

    #[test]
    fn test_pem_with_surrounding_whitespace() {
        let chain = TestChain::generate();
        let cert = Certificate::from_der(chain.root.der.clone()).unwrap();
        let text = format!("\n  {}\n\n", cert.to_pem().unwrap());
        assert_eq!(Certificate::from_pem(&text).unwrap(), cert);
        assert_eq!(TrustAnchor::from_pem(&text).unwrap().certificate(), &cert);
    }

    #[test]
    fn test_pem_label_must_be_certificate() {
        let chain = TestChain::generate();
        let pem = Certificate::from_der(chain.root.der.clone())
            .unwrap()
            .to_pem()
            .unwrap()
            .replace("CERTIFICATE", "PUBLIC KEY");

        assert!(matches!(
            Certificate::from_pem(&pem),
            Err(JwsError::InvalidCertificate { .. })
        ));
        assert!(matches!(
            Certificate::parse(&pem),
            Err(JwsError::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn test_pem_rejects_mismatched_boundaries() {
        let chain = TestChain::generate();
        let pem = Certificate::from_der(chain.root.der.clone())
            .unwrap()
            .to_pem()
            .unwrap()
            .replace("-----END CERTIFICATE-----", "-----END X509 CRL-----");

        assert!(matches!(
            Certificate::from_pem(&pem),
            Err(JwsError::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            Certificate::from_der(vec![0x30, 0x03, 0x02, 0x01, 0x01]),
            Err(JwsError::InvalidCertificate { .. })
        ));
        assert!(matches!(
            Certificate::from_base64("not base64!"),
            Err(JwsError::Decode { .. })
        ));
        assert!(matches!(
            Certificate::from_pem("-----BEGIN CERTIFICATE-----\nAAAA"),
            Err(JwsError::InvalidCertificate { .. })
        ));
    }

    #[test]
    fn test_issuer_relationships() {
        let chain = TestChain::generate();
        let leaf = Certificate::from_der(chain.leaf.der.clone()).unwrap();
        let intermediate = Certificate::from_der(chain.intermediate.der.clone()).unwrap();
        let root = Certificate::from_der(chain.root.der.clone()).unwrap();

        assert!(leaf.is_issued_by(&intermediate));
        assert!(intermediate.is_issued_by(&root));
        assert!(root.is_issued_by(&root));

        assert!(!leaf.is_issued_by(&root));
        assert!(!root.is_issued_by(&intermediate));
    }

    #[test]
    fn test_p384_issuer() {
        let chain = TestChain::generate_with_p384_root();
        let intermediate = Certificate::from_der(chain.intermediate.der.clone()).unwrap();
        let root = Certificate::from_der(chain.root.der.clone()).unwrap();

        assert_eq!(intermediate.signature_algorithm(), ECDSA_WITH_SHA_384);
        assert!(intermediate.is_issued_by(&root));
        assert!(root.p256_public_key().is_err());
    }

    #[test]
    fn test_leaf_public_key_matches_signing_key() {
        let chain = TestChain::generate();
        let leaf = Certificate::from_der(chain.leaf.der.clone()).unwrap();
        let key = chain.signing_key("KID");
        assert_eq!(leaf.p256_public_key().unwrap(), key.verifying_key());
    }

    #[test]
    fn test_foreign_root_does_not_issue() {
        let chain = TestChain::generate();
        let root = Certificate::from_der(chain.root.der.clone()).unwrap();
        let foreign = Certificate::from_der(self_signed_root("Foreign Root").der).unwrap();
        assert!(!root.is_issued_by(&foreign));

        let anchor = TrustAnchor::from(foreign.clone());
        assert_eq!(anchor.certificate(), &foreign);
    }
}
