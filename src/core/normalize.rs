//! Content normalization (spec §4.8).
//!
//! "Normalized" file bytes: raw bytes with encoding auto-detected (prefer
//! UTF-8/16/32 by BOM, fall back to an XML `encoding="..."` attribute, else
//! ASCII), BOM stripped where appropriate, `\r\n` collapsed to `\n`.
//! Content hash is the MD5 of the UTF-8 encoding of that normalized text.
//!
//! All byte-order-mark handling is encapsulated behind [`read_and_normalize`]
//! per the design note in spec §9 ("do not scatter byte-order-mark logic").

use encoding_rs::Encoding;
use md5::{Digest, Md5};

/// The encoding a buffer was detected to be in, before normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedEncoding {
    Utf8,
    Utf16Le,
    Utf16Be,
    Utf32Le,
    Utf32Be,
    Ascii,
}

/// Detect encoding and return normalized `\n`-only UTF-8 text.
pub fn read_and_normalize(bytes: &[u8]) -> (String, DetectedEncoding) {
    let (text, encoding) = decode(bytes);
    (normalize_newlines(&text), encoding)
}

fn decode(bytes: &[u8]) -> (String, DetectedEncoding) {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        let text = String::from_utf8_lossy(&bytes[3..]).into_owned();
        return (text, DetectedEncoding::Utf8);
    }
    if bytes.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
        return (decode_utf32(&bytes[4..], false), DetectedEncoding::Utf32Le);
    }
    if bytes.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
        return (decode_utf32(&bytes[4..], true), DetectedEncoding::Utf32Be);
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        return (decode_utf16(&bytes[2..], false), DetectedEncoding::Utf16Le);
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        return (decode_utf16(&bytes[2..], true), DetectedEncoding::Utf16Be);
    }

    // No BOM: try a plain UTF-8 decode first.
    if let Ok(text) = std::str::from_utf8(bytes) {
        return (text.to_string(), DetectedEncoding::Utf8);
    }

    // Fall back to an XML `encoding="..."` declaration, if present, in the
    // lossily-decoded head of the buffer. `Encoding::for_label` resolves any
    // WHATWG-recognized label (legacy code pages included, not just the
    // UTF variants this crate otherwise hand-rolls), matching real-world TS
    // and source files that declare e.g. `windows-1252` or `shift_jis`.
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]).into_owned();
    if let Some(label) = xml_declared_encoding(&head) {
        if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
            let (decoded, _, _had_errors) = encoding.decode(bytes);
            let detected = if encoding == encoding_rs::UTF_16LE {
                DetectedEncoding::Utf16Le
            } else if encoding == encoding_rs::UTF_16BE {
                DetectedEncoding::Utf16Be
            } else {
                DetectedEncoding::Ascii
            };
            return (decoded.into_owned(), detected);
        }
    }

    (String::from_utf8_lossy(bytes).into_owned(), DetectedEncoding::Ascii)
}

fn xml_declared_encoding(head: &str) -> Option<String> {
    let idx = head.find("encoding=")?;
    let rest = &head[idx + "encoding=".len()..];
    let quote = rest.chars().next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let rest = &rest[1..];
    let end = rest.find(quote)?;
    Some(rest[..end].to_string())
}

fn decode_utf16(bytes: &[u8], big_endian: bool) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| {
            if big_endian {
                u16::from_be_bytes([c[0], c[1]])
            } else {
                u16::from_le_bytes([c[0], c[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

fn decode_utf32(bytes: &[u8], big_endian: bool) -> String {
    bytes
        .chunks_exact(4)
        .filter_map(|c| {
            let v = if big_endian {
                u32::from_be_bytes([c[0], c[1], c[2], c[3]])
            } else {
                u32::from_le_bytes([c[0], c[1], c[2], c[3]])
            };
            char::from_u32(v)
        })
        .collect()
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n")
}

/// MD5 hex digest of the UTF-8 bytes of `text`.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Tiny hex-encoding helper so the crate doesn't need a second dependency
/// just for turning a digest into a hex string.
mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        let mut out = String::with_capacity(bytes.as_ref().len() * 2);
        for b in bytes.as_ref() {
            out.push_str(&format!("{:02x}", b));
        }
        out
    }
}
