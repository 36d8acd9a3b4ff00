//! ECDSA signature encoding conversions
//!
//! Signing libraries produce (and verifiers expect) the ASN.1 DER form
//!
//! ```text
//! SEQUENCE { INTEGER r, INTEGER s }
//! ```
//!
//! while the JWS compact serialization (RFC 7518 §3.4) carries the fixed-width
//! concatenation `R‖S`, each component left-padded to the curve's byte width.
//! The functions here convert between the two without any big-integer
//! arithmetic: components are handled as big-endian byte strings whose width is
//! bounded by [`MAX_COMPONENT_WIDTH`], so every DER length fits in the
//! short (single byte) form.

use crate::{ES256_SIGNATURE_LENGTH, JwsError, P256_COMPONENT_WIDTH, Result};

/// Universal tag of a constructed SEQUENCE (`0x20 | 0x10`)
const SEQUENCE_TAG: u8 = 0x30;

/// Universal tag of an INTEGER
const INTEGER_TAG: u8 = 0x02;

/// Largest component width whose DER encoding keeps short-form lengths
///
/// Two INTEGER TLVs of `2 + width + 1` bytes each must fit in 127 bytes.
pub const MAX_COMPONENT_WIDTH: usize = 60;

/// Convert a DER `SEQUENCE { r, s }` into fixed-width `R‖S`
///
/// Leading sign bytes and redundant zero bytes are stripped from each INTEGER
/// before it is left-padded to `width` bytes.
///
/// # Errors
/// Returns [`JwsError::MalformedSignature`] when the tag or declared length is
/// wrong, when the sequence does not hold exactly two INTEGERs, or when an
/// INTEGER's magnitude exceeds `width` bytes.
pub fn der_to_raw(der: &[u8], width: usize) -> Result<Vec<u8>> {
    check_width(width)?;

    let [tag, declared, content @ ..] = der else {
        return Err(JwsError::malformed_signature(format!(
            "DER signature is {} bytes, too short for a SEQUENCE header",
            der.len()
        )));
    };

    if *tag != SEQUENCE_TAG {
        return Err(JwsError::malformed_signature(format!(
            "expected SEQUENCE tag 0x{SEQUENCE_TAG:02x}, found 0x{tag:02x}"
        )));
    }

    if declared & 0x80 != 0 || usize::from(*declared) != content.len() {
        return Err(JwsError::malformed_signature(format!(
            "SEQUENCE declares {declared} content bytes but {} follow",
            content.len()
        )));
    }

    let mut raw = vec![0u8; 2 * width];
    let mut rest = content;
    let mut count = 0usize;

    while !rest.is_empty() {
        let (magnitude, tail) = read_integer(rest)?;

        if count == 2 {
            return Err(JwsError::malformed_signature(
                "SEQUENCE holds more than two INTEGERs",
            ));
        }

        if magnitude.len() > width {
            return Err(JwsError::malformed_signature(format!(
                "INTEGER magnitude is {} bytes, exceeds component width {width}",
                magnitude.len()
            )));
        }

        let end = (count + 1) * width;
        raw[end - magnitude.len()..end].copy_from_slice(magnitude);

        count += 1;
        rest = tail;
    }

    if count != 2 {
        return Err(JwsError::malformed_signature(format!(
            "SEQUENCE holds {count} INTEGERs, expected 2"
        )));
    }

    Ok(raw)
}

/// Convert fixed-width `R‖S` into a minimal DER `SEQUENCE { r, s }`
///
/// # Errors
/// Returns [`JwsError::MalformedSignature`] unless `raw` is exactly
/// `2 * width` bytes.
pub fn raw_to_der(raw: &[u8], width: usize) -> Result<Vec<u8>> {
    check_width(width)?;

    if raw.len() != 2 * width {
        return Err(JwsError::malformed_signature(format!(
            "raw signature is {} bytes, expected {}",
            raw.len(),
            2 * width
        )));
    }

    let (r, s) = raw.split_at(width);

    let mut content = Vec::with_capacity(2 * (width + 3));
    write_integer(&mut content, r);
    write_integer(&mut content, s);

    let mut der = Vec::with_capacity(content.len() + 2);
    der.push(SEQUENCE_TAG);
    der.push(content.len() as u8);
    der.extend_from_slice(&content);
    Ok(der)
}

/// Read one INTEGER TLV, returning its minimal unsigned magnitude and the tail
fn read_integer(input: &[u8]) -> Result<(&[u8], &[u8])> {
    let [tag, length, body @ ..] = input else {
        return Err(JwsError::malformed_signature("truncated INTEGER header"));
    };

    if *tag != INTEGER_TAG {
        return Err(JwsError::malformed_signature(format!(
            "expected INTEGER tag 0x{INTEGER_TAG:02x}, found 0x{tag:02x}"
        )));
    }

    if length & 0x80 != 0 {
        return Err(JwsError::malformed_signature(
            "long-form INTEGER length is not valid for ECDSA components",
        ));
    }

    let length = usize::from(*length);
    if length == 0 {
        return Err(JwsError::malformed_signature("empty INTEGER"));
    }
    if length > body.len() {
        return Err(JwsError::malformed_signature(format!(
            "INTEGER declares {length} bytes but {} remain",
            body.len()
        )));
    }

    let (content, tail) = body.split_at(length);
    Ok((strip_leading_zeros(content), tail))
}

/// Append `component` as a minimal non-negative INTEGER TLV
fn write_integer(out: &mut Vec<u8>, component: &[u8]) {
    let magnitude = strip_leading_zeros(component);
    // Zero encodes as a single 0x00; a set top bit needs a sign byte.
    let sign_byte = magnitude.first().is_none_or(|first| first & 0x80 != 0);

    out.push(INTEGER_TAG);
    out.push((magnitude.len() + usize::from(sign_byte)) as u8);
    if sign_byte {
        out.push(0x00);
    }
    out.extend_from_slice(magnitude);
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    let first = bytes
        .iter()
        .position(|&b| b != 0)
        .unwrap_or(bytes.len());
    &bytes[first..]
}

fn check_width(width: usize) -> Result<()> {
    if width == 0 || width > MAX_COMPONENT_WIDTH {
        return Err(JwsError::malformed_signature(format!(
            "component width {width} outside 1..={MAX_COMPONENT_WIDTH}"
        )));
    }
    Ok(())
}

/// ES256 signature held as two fixed-width 32-byte components
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Es256Signature {
    r: [u8; P256_COMPONENT_WIDTH],
    s: [u8; P256_COMPONENT_WIDTH],
}

impl Es256Signature {
    /// Build from big-endian, zero-padded components
    #[must_use]
    pub fn new(r: [u8; P256_COMPONENT_WIDTH], s: [u8; P256_COMPONENT_WIDTH]) -> Self {
        Self { r, s }
    }

    /// Parse the 64-byte compact form
    ///
    /// # Errors
    /// Returns [`JwsError::MalformedSignature`] unless `raw` is exactly 64 bytes.
    pub fn from_raw(raw: &[u8]) -> Result<Self> {
        if raw.len() != ES256_SIGNATURE_LENGTH {
            return Err(JwsError::malformed_signature(format!(
                "raw signature is {} bytes, expected {ES256_SIGNATURE_LENGTH}",
                raw.len()
            )));
        }
        let mut r = [0u8; P256_COMPONENT_WIDTH];
        let mut s = [0u8; P256_COMPONENT_WIDTH];
        r.copy_from_slice(&raw[..P256_COMPONENT_WIDTH]);
        s.copy_from_slice(&raw[P256_COMPONENT_WIDTH..]);
        Ok(Self { r, s })
    }

    /// Parse a DER `SEQUENCE { r, s }`
    ///
    /// # Errors
    /// See [`der_to_raw`].
    pub fn from_der(der: &[u8]) -> Result<Self> {
        Self::from_raw(&der_to_raw(der, P256_COMPONENT_WIDTH)?)
    }

    /// `R‖S`, 64 bytes
    #[must_use]
    pub fn to_raw(&self) -> [u8; ES256_SIGNATURE_LENGTH] {
        let mut raw = [0u8; ES256_SIGNATURE_LENGTH];
        raw[..P256_COMPONENT_WIDTH].copy_from_slice(&self.r);
        raw[P256_COMPONENT_WIDTH..].copy_from_slice(&self.s);
        raw
    }

    /// Minimal DER encoding
    #[must_use]
    pub fn to_der(&self) -> Vec<u8> {
        let mut content = Vec::with_capacity(2 * (P256_COMPONENT_WIDTH + 3));
        write_integer(&mut content, &self.r);
        write_integer(&mut content, &self.s);

        let mut der = Vec::with_capacity(content.len() + 2);
        der.push(SEQUENCE_TAG);
        der.push(content.len() as u8);
        der.extend_from_slice(&content);
        der
    }

    /// The `r` component
    #[must_use]
    pub fn r(&self) -> &[u8; P256_COMPONENT_WIDTH] {
        &self.r
    }

    /// The `s` component
    #[must_use]
    pub fn s(&self) -> &[u8; P256_COMPONENT_WIDTH] {
        &self.s
    }
}

impl std::fmt::Debug for Es256Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Es256Signature")
            .field("raw", &crate::codec::encode(self.to_raw()))
            .finish()
    }
}
