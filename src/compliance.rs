//! Protocol compliance pre-filter (§4.L).

use http::{HeaderMap, Method, Version};

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::headers::ETag;

fn is_unsafe_method(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

fn has_weak_etag_list(value: &str) -> bool {
    value.split(',').any(|tok| {
        let tok = tok.trim();
        tok != "*" && ETag::parse(tok).map(|e| e.weak).unwrap_or(false)
    })
}

fn header_count(headers: &HeaderMap, name: &str) -> usize {
    headers.get_all(name).iter().count()
}

/// §4.L: rejects fatally non-compliant requests before any cache lookup
/// happens.
pub fn prefilter(method: &Method, headers: &HeaderMap, config: &CacheConfig) -> Result<()> {
    if headers.contains_key("range") {
        if let Some(if_range) = headers.get("if-range").and_then(|v| v.to_str().ok()) {
            if ETag::parse(if_range.trim()).map(|e| e.weak).unwrap_or(false) {
                return Err(CacheError::ProtocolRejected(
                    "weak ETag in If-Range alongside Range is fatally non-compliant".into(),
                ));
            }
        }
    }

    if is_unsafe_method(method) && !config.allow_weak_etag_on_unsafe {
        if let Some(if_match) = headers.get("if-match").and_then(|v| v.to_str().ok()) {
            if if_match.trim() != "*" && has_weak_etag_list(if_match) {
                return Err(CacheError::ProtocolRejected(
                    "weak ETag in If-Match on an unsafe method is fatally non-compliant".into(),
                ));
            }
        }
    }

    for name in ["if-match", "if-none-match"] {
        if header_count(headers, name) > 1 {
            // Multiple headers with the same name are equivalent to one
            // comma-joined value per RFC 9110 §5.3; only a genuinely
            // uncoalescable combination (a bare `*` alongside anything
            // else) is fatal.
            let joined: Vec<String> = headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .map(|s| s.to_string())
                .collect();
            if joined.iter().any(|v| v.trim() == "*") && joined.len() > 1 {
                return Err(CacheError::ProtocolRejected(format!(
                    "multiple {name} headers including a wildcard cannot be coalesced"
                )));
            }
        }
    }

    Ok(())
}

/// Normalizes the HTTP version to 1.1: 1.0 is upgraded, any other 1.x is
/// downgraded. Versions outside the 1.x family (h2, h3) pass through
/// unchanged — they are framing concerns the transport owns, not this
/// cache's.
pub fn normalize_version(version: Version) -> Version {
    match version {
        Version::HTTP_09 | Version::HTTP_10 => Version::HTTP_11,
        other => other,
    }
}
