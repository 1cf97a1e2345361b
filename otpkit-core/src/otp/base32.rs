//! RFC 4648 Base32 codec for exchanging keys with humans
//!
//! Keys are shown to (or typed by) their owner as Base32 text. Decoding is
//! case-insensitive and accepts optional trailing `=` padding, but is
//! otherwise strict: any symbol outside the alphabet, a data symbol after
//! padding, or a symbol count that cannot end on a byte boundary is rejected.

use std::sync::OnceLock;

use data_encoding::{Encoding, BASE32_NOPAD};

use crate::error::OtpError;

const PADDING: char = '=';

/// Unpadded RFC 4648 alphabet that also accepts lowercase symbols and
/// non-zero bits in the final symbol
fn encoding() -> &'static Encoding {
    static ENCODING: OnceLock<Encoding> = OnceLock::new();
    ENCODING.get_or_init(|| {
        let mut spec = BASE32_NOPAD.specification();
        spec.translate.from.push_str("abcdefghijklmnopqrstuvwxyz");
        spec.translate.to.push_str("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        spec.check_trailing_bits = false;
        spec.encoding().unwrap_or_else(|_| BASE32_NOPAD.clone())
    })
}

/// Encode bytes as Base32, optionally padded with `=` to a multiple of 8
pub fn encode(bytes: &[u8], padding: bool) -> String {
    let mut out = encoding().encode(bytes);

    if padding {
        while out.len() % 8 != 0 {
            out.push(PADDING);
        }
    }

    out
}

/// Encode bytes as unpadded Base32
pub fn encode_unpadded(bytes: &[u8]) -> String {
    encode(bytes, false)
}

/// Decode Base32 text into bytes
///
/// # Errors
///
/// Returns `OtpError::InvalidEncoding` for symbols outside the alphabet,
/// `=` followed by data, or a data-symbol count of 1, 3 or 6 modulo 8.
pub fn decode(text: &str) -> Result<Vec<u8>, OtpError> {
    let data = text.trim_end_matches(PADDING);

    // 8 symbols hold 5 bytes; these residues cannot end on a byte boundary
    if matches!(data.len() % 8, 1 | 3 | 6) || data.contains(PADDING) {
        return Err(OtpError::InvalidEncoding);
    }

    encoding()
        .decode(data.as_bytes())
        .map_err(|_| OtpError::InvalidEncoding)
}
