//! Variant resolver (§4.J): selects a variant from a root entry's
//! `variant_map`, and maintains that map when a new variant is stored.

use http::HeaderMap;

use crate::entry::CacheEntry;
use crate::key::{composite_key, variant_key};

/// Outcome of resolving a request against a (possibly absent) root entry.
pub enum Resolution {
    /// No root entry exists at all; this is a plain MISS.
    NoRoot,
    /// A root exists and names this request's variant key, resolved to a
    /// composite storage key.
    Hit(String),
    /// A root exists but has no entry for this request's variant key yet.
    RootMiss,
}

/// §4.J LOOKUP: given the root entry (if any) and the request headers,
/// compute which variant (if any) this request resolves to.
pub fn resolve(root: Option<&CacheEntry>, request_headers: &HeaderMap) -> Resolution {
    let Some(root) = root else {
        return Resolution::NoRoot;
    };
    if root.vary_fields.is_empty() {
        // Not actually a root (shouldn't happen for a `Vary`-bearing
        // lookup caller, but defensively treat as a direct miss).
        return Resolution::RootMiss;
    }
    let vkey = variant_key(&root.vary_fields, request_headers);
    match root.variant_map.iter().find(|(k, _)| *k == vkey) {
        Some((_, composite)) => Resolution::Hit(composite.clone()),
        None => Resolution::RootMiss,
    }
}

/// §4.J STORE: folds a newly stored variant into the root's `variant_map`,
/// creating the root if it didn't exist. Returns `(root_entry,
/// variant_composite_key)`. Call sites replace the stored root via
/// `Storage::atomic_update` so concurrent variant stores don't race.
pub fn fold_variant(
    root_key: &str,
    existing_root: Option<CacheEntry>,
    vary_fields: Vec<Box<str>>,
    request_headers: &HeaderMap,
    template: &CacheEntry,
) -> (CacheEntry, String) {
    let vkey = variant_key(&vary_fields, request_headers);
    let ckey = composite_key(root_key, &vkey);

    let mut variant_map = existing_root.map(|e| e.variant_map).unwrap_or_default();
    variant_map.retain(|(k, _)| *k != vkey);
    variant_map.push((vkey, ckey.clone()));

    let root = CacheEntry {
        request_method: template.request_method.clone(),
        request_uri: root_key.to_string(),
        status: template.status,
        response_headers: template.response_headers.clone(),
        resource: None,
        request_date: template.request_date,
        response_date: template.response_date,
        vary_fields,
        variant_map,
    };
    (root, ckey)
}

#[cfg(test)]
mod test {
    use super::*;
    use http::{Method, StatusCode};
    use std::time::SystemTime;

    fn template() -> CacheEntry {
        CacheEntry {
            request_method: Method::GET,
            request_uri: "http://example.com:80/y".into(),
            status: StatusCode::OK,
            response_headers: vec![("Vary".into(), "Accept-Encoding".into())],
            resource: None,
            request_date: SystemTime::now(),
            response_date: SystemTime::now(),
            vary_fields: Vec::new(),
            variant_map: Vec::new(),
        }
    }

    #[test]
    fn no_root_is_a_plain_miss() {
        let headers = HeaderMap::new();
        assert!(matches!(resolve(None, &headers), Resolution::NoRoot));
    }

    #[test]
    fn fold_then_resolve_roundtrips() {
        let mut headers = HeaderMap::new();
        headers.insert("accept-encoding", "gzip".parse().unwrap());
        let (root, ckey) = fold_variant(
            "http://example.com:80/y",
            None,
            vec!["accept-encoding".into()],
            &headers,
            &template(),
        );
        match resolve(Some(&root), &headers) {
            Resolution::Hit(k) => assert_eq!(k, ckey),
            _ => panic!("expected hit"),
        }
    }

    #[test]
    fn distinct_headers_miss_until_their_own_variant_is_stored() {
        let mut gzip = HeaderMap::new();
        gzip.insert("accept-encoding", "gzip".parse().unwrap());
        let (root, _) = fold_variant("k", None, vec!["accept-encoding".into()], &gzip, &template());

        let mut br = HeaderMap::new();
        br.insert("accept-encoding", "br".parse().unwrap());
        assert!(matches!(resolve(Some(&root), &br), Resolution::RootMiss));
    }
}
