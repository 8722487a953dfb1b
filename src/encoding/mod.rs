//! Byte-level input decoding.
//!
//! Documents handed to [`crate::Document::parse_bytes`] may arrive in any
//! encoding `encoding_rs` knows. Detection follows XML 1.0 Appendix F:
//!
//! 1. A byte order mark wins and is stripped.
//! 2. Otherwise the `encoding="..."` pseudo-attribute of an ASCII-compatible
//!    XML declaration is used.
//! 3. Otherwise the input must be UTF-8.
//!
//! The result is always a UTF-8 `String`, which is what the parser consumes.

use encoding_rs::{Encoding, UTF_8};

/// An error that occurs while decoding raw input bytes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    /// The declared encoding label is not known to `encoding_rs`.
    #[error("unsupported encoding: {0}")]
    Unsupported(String),
    /// The bytes are not valid in the detected encoding.
    #[error("malformed byte sequence for encoding {0}")]
    Malformed(&'static str),
    /// A UTF-8 byte order mark contradicts the declared encoding.
    #[error("UTF-8 byte order mark present but encoding declared as '{0}'")]
    BomMismatch(String),
}

/// Decodes raw XML bytes into a UTF-8 string.
///
/// # Errors
///
/// Returns `EncodingError` if the declared encoding is unknown, contradicts
/// the byte order mark, or the bytes are malformed for the detected encoding.
///
/// # Examples
///
/// ```
/// use xmlsplice::encoding::decode_to_utf8;
///
/// let latin1 = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r>\xE9</r>";
/// let text = decode_to_utf8(latin1).unwrap();
/// assert!(text.ends_with("<r>\u{e9}</r>"));
/// ```
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, EncodingError> {
    let declared = declared_encoding(bytes);

    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        if encoding == UTF_8 {
            if let Some(label) = declared.as_deref() {
                let is_utf8 = Encoding::for_label(label.as_bytes()) == Some(UTF_8);
                if !is_utf8 {
                    return Err(EncodingError::BomMismatch(label.to_string()));
                }
            }
        }
        return decode_with(encoding, &bytes[bom_len..]);
    }

    let encoding = match declared {
        Some(label) => Encoding::for_label(label.as_bytes())
            .ok_or(EncodingError::Unsupported(label))?,
        None => UTF_8,
    };
    decode_with(encoding, bytes)
}

fn decode_with(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, EncodingError> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(EncodingError::Malformed(encoding.name()));
    }
    Ok(text.into_owned())
}

/// Reads the `encoding` pseudo-attribute of a leading XML declaration,
/// treating the bytes as ASCII. UTF-16 input (with its BOM) never matches
/// here, which is fine because the BOM decides its encoding.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let scan = &bytes[..bytes.len().min(256)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let decl_end = scan.windows(2).position(|w| w == b"?>")?;
    let decl = &scan[..decl_end];

    let needle = b"encoding";
    let pos = decl.windows(needle.len()).position(|w| w == needle)?;
    let rest = trim_ascii_start(&decl[pos + needle.len()..]);
    let rest = trim_ascii_start(rest.strip_prefix(b"=")?);
    let (&quote, rest) = rest.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let end = rest.iter().position(|&b| b == quote)?;
    let label = &rest[..end];
    label
        .is_ascii()
        .then(|| String::from_utf8_lossy(label).into_owned())
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
        .count();
    &bytes[skip..]
}
