//! Header & date utilities (§4.B).

use http::{HeaderMap, HeaderValue};
use std::time::SystemTime;

/// An HTTP entity tag, distinguishing strong and weak comparison per
/// RFC 9110 §8.8.3.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ETag {
    pub weak: bool,
    pub opaque: Box<str>,
}

impl ETag {
    pub fn parse(raw: &str) -> Option<ETag> {
        let raw = raw.trim();
        let (weak, rest) = match raw.strip_prefix("W/") {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let rest = rest.trim();
        if rest.len() < 2 || !rest.starts_with('"') || !rest.ends_with('"') {
            return None;
        }
        Some(ETag { weak, opaque: rest[1..rest.len() - 1].into() })
    }

    /// Strong comparison: RFC 9110 §8.8.3.2 — both strong and byte-identical.
    pub fn strong_eq(&self, other: &ETag) -> bool {
        !self.weak && !other.weak && self.opaque == other.opaque
    }

    /// Weak comparison: opaque-tags equal regardless of strength.
    pub fn weak_eq(&self, other: &ETag) -> bool {
        self.opaque == other.opaque
    }

    pub fn render(&self) -> String {
        if self.weak {
            format!("W/\"{}\"", self.opaque)
        } else {
            format!("\"{}\"", self.opaque)
        }
    }
}

/// Parses an HTTP-date value (IMF-fixdate, RFC 850, or asctime form) via
/// `httpdate`, which implements all three per RFC 9110 §5.6.7.
pub fn parse_http_date(raw: &str) -> Option<SystemTime> {
    httpdate::parse_http_date(raw.trim()).ok()
}

pub fn format_http_date(t: SystemTime) -> String {
    httpdate::fmt_http_date(t)
}

pub fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

pub fn header_date(headers: &HeaderMap, name: &str) -> Option<SystemTime> {
    header_str(headers, name).and_then(parse_http_date)
}

/// Parses the comma-separated list in a `Vary` header into canonical
/// (lower-cased, trimmed) field names. `Vary: *` is represented by the
/// literal `"*"` entry; callers check for it explicitly.
pub fn parse_vary(headers: &HeaderMap) -> Vec<Box<str>> {
    let Some(raw) = header_str(headers, "vary") else {
        return Vec::new();
    };
    let mut names: Vec<Box<str>> = raw
        .split(',')
        .map(|f| f.trim().to_ascii_lowercase())
        .filter(|f| !f.is_empty())
        .map(String::into_boxed_str)
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

pub fn vary_is_star(headers: &HeaderMap) -> bool {
    header_str(headers, "vary").map(|v| v.split(',').any(|f| f.trim() == "*")).unwrap_or(false)
}

/// Headers that must never be copied from a 304 response onto the stored
/// entry's headers; they describe the transport hop or the entity body,
/// neither of which the 304 carries (§4.I).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

const CONTENT_CLASS_PREFIX: &str = "content-";

pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

pub fn is_content_class(name: &str) -> bool {
    name.len() > CONTENT_CLASS_PREFIX.len()
        && name[..CONTENT_CLASS_PREFIX.len()].eq_ignore_ascii_case(CONTENT_CLASS_PREFIX)
}

/// `Warning: 113` text for a heuristically-chosen freshness lifetime over
/// 24 hours on a response itself over 24 hours old (§11 "supplemented
/// features").
pub const WARNING_113_HEURISTIC_EXPIRATION: &str = r#"113 - "rfc7234 5.5.4""#;
/// `Warning: 112` text for a response served while disconnected from the
/// origin, i.e. `stale-if-error`.
pub const WARNING_112_DISCONNECTED_OPERATION: &str = r#"112 - "rfc7234 5.5.3""#;

/// Drops any `Warning` header whose code is in the 1xx range. Those only
/// ever describe the specific response that carried them, so they must not
/// survive onto a later exchange for the same stored entry (§4.I "on
/// update").
pub fn strip_1xx_warnings(headers: &mut Vec<(String, String)>) {
    headers.retain(|(name, value)| {
        !name.eq_ignore_ascii_case("warning") || !value.trim_start().starts_with('1')
    });
}

/// Builds a `HeaderValue`, returning `None` rather than erroring on
/// characters a header value can't carry (callers treat this as "drop the
/// header" for synthesized headers like `Age`).
pub fn header_value(s: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(s).ok()
}
