//! Character encoding detection and decoding.
//!
//! Valid UTF-8 (which includes plain ASCII) is taken as-is. Anything else
//! goes through chardetng's statistical guess and is decoded with
//! encoding_rs, substituting U+FFFD for undecodable bytes.

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Best-guess encoding of `bytes`.
pub fn detect_encoding(bytes: &[u8]) -> &'static Encoding {
    if std::str::from_utf8(bytes).is_ok() {
        return UTF_8;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, false)
}

/// Whether `encoding` needs no conversion to UTF-8.
pub fn is_utf8(encoding: &'static Encoding) -> bool {
    encoding == UTF_8
}

/// Decode `bytes` with `encoding`, replacing malformed sequences.
pub fn decode_lossy<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Cow<'a, str> {
    let (text, _had_errors) = encoding.decode_without_bom_handling(bytes);
    text
}

/// Decode `bytes` using the detected encoding.
pub fn decode_detected(bytes: &[u8]) -> Cow<'_, str> {
    decode_lossy(bytes, detect_encoding(bytes))
}

/// Count the non-ASCII characters a single-byte encoding produced.
///
/// Each high byte is decoded on its own; bytes that only make sense as part
/// of a multi-byte sequence are skipped.
pub fn count_substitutions(bytes: &[u8], encoding: &'static Encoding) -> BTreeMap<char, usize> {
    let mut counts = BTreeMap::new();
    for &byte in bytes.iter().filter(|b| **b >= 0x80) {
        let buf = [byte];
        let (text, had_errors) = encoding.decode_without_bom_handling(&buf);
        if had_errors {
            continue;
        }
        let mut chars = text.chars();
        if let (Some(ch), None) = (chars.next(), chars.next()) {
            *counts.entry(ch).or_insert(0) += 1;
        }
    }
    counts
}
