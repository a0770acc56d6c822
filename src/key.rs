//! Key generator (§4.C).
//!
//! Derives the canonical storage key from a request target, and the
//! variant composite key from a root key plus the request headers selected
//! by a stored `Vary` list.

use http::HeaderMap;
use percent_encoding::percent_decode_str;
use url::Url;

use crate::error::{CacheError, Result};

/// The plain-key string for a root (or non-varying) entry:
/// `scheme://host:port/path?query`, normalized.
pub fn canonical_key(uri: &http::Uri) -> Result<String> {
    // `http::Uri` doesn't normalize case/percent-encoding/dot-segments for
    // us; round-trip through `url::Url`, which does.
    let raw = uri.to_string();
    let url = Url::parse(&raw).or_else(|_| {
        // Relative URIs (path-only, as seen server-side) get a dummy
        // authority so `Url` can still normalize the path.
        Url::parse(&format!("http://cache.invalid{raw}"))
    })?;
    Ok(canonicalize_url(&url))
}

fn canonicalize_url(url: &Url) -> String {
    let scheme = url.scheme().to_ascii_lowercase();
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    let port = url.port_or_known_default().unwrap_or(default_port(&scheme));
    let path = normalize_percent_encoding(url.path());
    let mut key = format!("{scheme}://{host}:{port}{path}");
    if let Some(q) = url.query() {
        key.push('?');
        key.push_str(&normalize_percent_encoding(q));
    }
    key
}

fn default_port(scheme: &str) -> u16 {
    match scheme {
        "https" => 443,
        _ => 80,
    }
}

/// Re-encodes any percent-escape in `s` using uppercase hex digits, per
/// RFC 3986 §2.1's "should be normalized to uppercase" guidance.
fn normalize_percent_encoding(s: &str) -> String {
    use std::fmt::Write as _;
    let decoded = percent_decode_str(s);
    let mut out = String::new();
    for byte in decoded.into_iter() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~' | b'/' | b'%') {
            out.push(byte as char);
        } else {
            let _ = write!(out, "%{byte:02X}");
        }
    }
    out
}

/// Computes the variant key for a request given the `field_names` a root
/// entry's `Vary` header named (already lower-cased and sorted by the
/// caller, typically [`crate::headers::parse_vary`]'s output).
///
/// Per §4.C: sort field names case-insensitively (caller's responsibility,
/// matched here defensively), concatenate each request header's value(s)
/// as sent, percent-encode `&` and `=`, and join as `name=value` pairs with
/// `&`.
pub fn variant_key(field_names: &[Box<str>], request_headers: &HeaderMap) -> String {
    let mut names: Vec<&str> = field_names.iter().map(|f| f.as_ref()).collect();
    names.sort_unstable();
    names
        .into_iter()
        .map(|name| {
            let value = request_headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}={}", escape(name), escape(&value))
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn escape(s: &str) -> String {
    s.replace('%', "%25").replace('&', "%26").replace('=', "%3D")
}

/// The composite storage key for a variant child: `"{" variant_key "}" root_key`.
pub fn composite_key(root_key: &str, variant_key: &str) -> String {
    format!("{{{variant_key}}}{root_key}")
}

/// Resolves an absolute or relative reference (as seen in `Location` /
/// `Content-Location`) against the request's own URI, returning its
/// canonical key and whether it shares the request's origin.
pub fn resolve_reference(request_uri: &http::Uri, reference: &str) -> Result<(String, bool)> {
    let base = Url::parse(&request_uri.to_string())
        .or_else(|_| Url::parse(&format!("http://cache.invalid{request_uri}")))
        .map_err(CacheError::from)?;
    let resolved = base.join(reference).map_err(CacheError::from)?;
    let same_origin = resolved.scheme() == base.scheme()
        && resolved.host_str() == base.host_str()
        && resolved.port_or_known_default() == base.port_or_known_default();
    Ok((canonicalize_url(&resolved), same_origin))
}
