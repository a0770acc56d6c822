//! Cache entry model (§3, §4.D).
//!
//! An entry is immutable once published; storage replaces it atomically
//! rather than mutating it in place (§5 "entries are immutable").

use std::time::SystemTime;

use http::{Method, StatusCode};

use crate::resource::Resource;

/// Ordered mapping from a variant key string to the storage key of the
/// concrete variant entry. Non-empty only on a root entry with `Vary`.
pub type VariantMap = Vec<(String, String)>;

/// The stored representation of a response plus the metadata §3 requires.
///
/// A `CacheEntry` is either a **root** (non-empty `variant_map`, no
/// `vary_fields` of its own to resolve against — it names the fields others
/// must match), a **variant child** (empty `variant_map`, stored at a
/// composite key), or **plain** (no `Vary` involved at all; empty
/// `variant_map`).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub request_method: Method,
    /// Canonical request target this entry was stored under (§4.C).
    pub request_uri: String,
    pub status: StatusCode,
    /// Ordered, multiplicity-preserving header list. Field-name comparisons
    /// elsewhere are case-insensitive; storage here keeps the original case
    /// as received.
    pub response_headers: Vec<(String, String)>,
    /// Absent for entries produced purely by invalidation bookkeeping;
    /// present for anything actually serveable. A 304-merged entry inherits
    /// the prior entry's resource unchanged (§4.I).
    pub resource: Option<Resource>,
    pub request_date: SystemTime,
    pub response_date: SystemTime,
    /// Field names this entry's `Vary` header named, lower-cased and
    /// sorted. Empty unless this is a root entry.
    pub vary_fields: Vec<Box<str>>,
    pub variant_map: VariantMap,
}

impl CacheEntry {
    pub fn is_root(&self) -> bool {
        !self.vary_fields.is_empty()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> {
        self.response_headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn remove_header(&mut self, name: &str) {
        self.response_headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
    }

    pub fn set_header(&mut self, name: &str, value: String) {
        self.remove_header(name);
        self.response_headers.push((name.to_string(), value));
    }

    pub fn body_len(&self) -> u64 {
        self.resource.as_ref().map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resource::{MemoryResourceFactory, ResourceFactory};

    fn entry() -> CacheEntry {
        let resource = MemoryResourceFactory.create("k", b"A", 1024).unwrap();
        CacheEntry {
            request_method: Method::GET,
            request_uri: "http://example.com:80/x".into(),
            status: StatusCode::OK,
            response_headers: vec![
                ("ETag".into(), "\"v1\"".into()),
                ("Cache-Control".into(), "max-age=60".into()),
            ],
            resource: Some(resource),
            request_date: SystemTime::now(),
            response_date: SystemTime::now(),
            vary_fields: Vec::new(),
            variant_map: Vec::new(),
        }
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let e = entry();
        assert_eq!(e.header("etag"), Some("\"v1\""));
    }

    #[test]
    fn plain_entry_is_not_root() {
        assert!(!entry().is_root());
    }

    #[test]
    fn set_header_replaces_existing() {
        let mut e = entry();
        e.set_header("ETag", "\"v2\"".to_string());
        assert_eq!(e.header("etag"), Some("\"v2\""));
        assert_eq!(e.headers_named("etag").count(), 1);
    }
}
