//! URL codec and path parsing.
//!
//! This module provides the percent-encoding codec used for route paths and
//! deep links, plus [`parse_url_with_query_params`] which splits a deep-link
//! URL into a clean path and its query parameters.
//!
//! The codec is deliberately conservative about already-encoded input:
//!
//! - [`encode_path`] percent-encodes **everything** except unreserved
//!   characters, including the `%` of existing `%xx` sequences. An encoded
//!   string therefore survives a round trip through [`decode`] bit-for-bit,
//!   even when the original contained percent-escapes (see the tests for the
//!   `content://...id%3Dvalue` case).
//! - [`decode`] peels encoding layers until the result no longer looks like
//!   encoder output, which makes double-encoded URIs (a common artifact of
//!   intent forwarding) come out clean.
//!
//! # Example
//!
//! ```
//! use navigator_core::url::{encode_path, decode, parse_url_with_query_params};
//!
//! let s = "content://provider/document/id%3Dvalue";
//! let encoded = encode_path(s);
//! assert!(encoded.contains("%253D"));
//! assert_eq!(decode(&encoded), s);
//!
//! let (path, query) = parse_url_with_query_params("artist/invite?token=XYZ789&draft");
//! assert_eq!(path, "artist/invite");
//! assert_eq!(query.get_str("token"), Some("XYZ789"));
//! assert_eq!(query.get_str("draft"), Some("true"));
//! ```

use crate::params::Params;

/// Return `true` for characters that are never percent-encoded.
fn is_unreserved(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')
}

/// Percent-encode a path component.
///
/// Everything except unreserved characters (`A-Z a-z 0-9 - _ . ~`) is
/// encoded as the `%XX` form of each UTF-8 byte. Existing `%xx` sequences are
/// **double-encoded** (`%` itself becomes `%25`) so that [`decode`] restores
/// the original string exactly.
pub fn encode_path(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if is_unreserved(c) {
            out.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                out.push('%');
                out.push(str_hex(byte >> 4));
                out.push(str_hex(byte & 0x0F));
            }
        }
    }
    out
}

fn str_hex(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('0')
}

/// Decode a percent-encoded string.
///
/// Runs [`decode_once`] repeatedly until the result stops looking like
/// encoder output — that is, until it contains a character outside the
/// encoded alphabet (unreserved, `+`, or a valid `%xx` triplet) or a pass
/// makes no progress. `+` decodes to a space; malformed `%` sequences are
/// preserved literally.
///
/// A string made up *entirely* of the encoded alphabet is treated as
/// still-encoded and gets another pass; double-encoded URIs rely on this.
pub fn decode(s: &str) -> String {
    let mut current = decode_once(s);
    // Cap the peeling: real-world input never nests more than a few layers.
    for _ in 0..8 {
        if !is_encoded_form(&current) {
            break;
        }
        let next = decode_once(&current);
        if next == current {
            break;
        }
        current = next;
    }
    current
}

/// Decode exactly one layer of percent-encoding.
///
/// `%xx` becomes the corresponding byte, `+` becomes a space, and malformed
/// `%` sequences (non-hex or truncated) are copied through untouched. Decoded
/// bytes are reassembled as UTF-8; invalid sequences fall back lossily.
pub fn decode_once(s: &str) -> String {
    let mut bytes = Vec::with_capacity(s.len());
    let raw = s.as_bytes();
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'%' => {
                if i + 2 < raw.len() {
                    let hi = (raw[i + 1] as char).to_digit(16);
                    let lo = (raw[i + 2] as char).to_digit(16);
                    if let (Some(hi), Some(lo)) = (hi, lo) {
                        bytes.push(((hi << 4) | lo) as u8);
                        i += 3;
                        continue;
                    }
                }
                // Malformed escape: keep the '%' literally.
                bytes.push(b'%');
                i += 1;
            }
            b'+' => {
                bytes.push(b' ');
                i += 1;
            }
            b => {
                bytes.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Check whether a string consists solely of the encoded alphabet:
/// unreserved characters, `+`, and valid `%xx` triplets.
fn is_encoded_form(s: &str) -> bool {
    let raw = s.as_bytes();
    if !raw.iter().any(|&b| b == b'%' || b == b'+') {
        return false;
    }
    let mut i = 0;
    while i < raw.len() {
        match raw[i] {
            b'%' => {
                if i + 2 >= raw.len()
                    || !(raw[i + 1] as char).is_ascii_hexdigit()
                    || !(raw[i + 2] as char).is_ascii_hexdigit()
                {
                    return false;
                }
                i += 3;
            }
            b'+' => i += 1,
            b => {
                if !is_unreserved(b as char) {
                    return false;
                }
                i += 1;
            }
        }
    }
    true
}

/// Split a deep-link URL into `(clean_path, query_params)`.
///
/// The path is everything before the first `?`, trimmed of trailing `/`.
/// Query pairs are split on `&`; a key without a value (`?flag`) becomes
/// `flag=true`. Keys and values are decoded **once** — nested encodings in
/// query values are preserved for the consumer to interpret.
pub fn parse_url_with_query_params(url: &str) -> (String, Params) {
    let (path, query) = match url.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (url, None),
    };

    let clean_path = path.trim_end_matches('/').to_string();

    let mut params = Params::new();
    if let Some(query) = query {
        for pair in query.split('&') {
            if pair.is_empty() {
                continue;
            }
            match pair.split_once('=') {
                Some((key, value)) => {
                    params.insert(decode_once(key), decode_once(value));
                }
                None => {
                    // Value-less key: `?flag` means `flag=true`.
                    params.insert(decode_once(pair), "true");
                }
            }
        }
    }

    (clean_path, params)
}

// ============================================================================
// Tests
// ============================================================================
