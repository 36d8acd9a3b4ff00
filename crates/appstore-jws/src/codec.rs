//! base64url codec with padding normalization
//!
//! Encoding always emits the unpadded URL-safe alphabet. Decoding accepts
//! unpadded input: the URL-safe characters are mapped back to the standard
//! alphabet and the input is re-padded to a multiple of four before decoding.

use base64::{
    Engine as _,
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
};

use crate::{JwsError, Result};

/// Encode bytes as unpadded base64url
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode base64url, tolerating missing `=` padding
///
/// # Errors
/// Returns [`JwsError::Decode`] if the input is not valid base64 after repadding.
pub fn decode(input: &str) -> Result<Vec<u8>> {
    let mut normalized: String = input
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let remainder = normalized.len() % 4;
    if remainder != 0 {
        normalized.extend(std::iter::repeat_n('=', 4 - remainder));
    }

    STANDARD.decode(normalized).map_err(|e| JwsError::Decode {
        reason: e.to_string(),
    })
}

/// Decode standard (padded) base64 as used by `x5c` entries and PEM bodies
///
/// ASCII whitespace is ignored so wrapped PEM bodies decode directly.
pub(crate) fn decode_standard(input: &str) -> Result<Vec<u8>> {
    let compact: String = input.split_ascii_whitespace().collect();
    STANDARD.decode(compact).map_err(|e| JwsError::Decode {
        reason: e.to_string(),
    })
}

/// Encode bytes as standard padded base64
pub(crate) fn encode_standard(bytes: impl AsRef<[u8]>) -> String {
    STANDARD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_strips_padding_and_substitutes_alphabet() {
        // 0xfb 0xff encodes to "+/8=" in the standard alphabet
        assert_eq!(encode([0xfb, 0xff]), "-_8");
        assert_eq!(encode(b"a"), "YQ");
        assert_eq!(encode(b""), "");
        assert!(!encode(b"any carnal pleas").contains('='));
    }

    #[test]
    fn test_decode_repads() {
        assert_eq!(decode("YQ").unwrap(), b"a");
        assert_eq!(decode("YWI").unwrap(), b"ab");
        assert_eq!(decode("YWJj").unwrap(), b"abc");
        assert_eq!(decode("-_8").unwrap(), vec![0xfb, 0xff]);
    }

    #[test]
    fn test_decode_accepts_already_padded_input() {
        assert_eq!(decode("YQ==").unwrap(), b"a");
    }

    #[test]
    fn test_decode_rejects_invalid_input() {
        assert!(matches!(decode("Y"), Err(JwsError::Decode { .. })));
        assert!(matches!(decode("a$bc"), Err(JwsError::Decode { .. })));
        assert!(matches!(decode("YQ=x"), Err(JwsError::Decode { .. })));
    }

    #[test]
    fn test_json_header_round_trip() {
        let header = br#"{"typ":"JWT","alg":"ES256","kid":"KEY1"}"#;
        let encoded = encode(header);
        assert_eq!(decode(&encoded).unwrap(), header);
    }

    #[test]
    fn test_decode_standard_ignores_line_wrapping() {
        assert_eq!(decode_standard("YW\nJj\r\n").unwrap(), b"abc");
        assert_eq!(encode_standard([0xfb, 0xff]), "+/8=");
    }
}
