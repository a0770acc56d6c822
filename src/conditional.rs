//! Conditional request builder & 304 merger (§4.I).

use std::time::SystemTime;

use http::{request, response, HeaderValue};

use crate::entry::CacheEntry;
use crate::headers::{is_content_class, is_hop_by_hop};

/// Adds `If-None-Match`/`If-Modified-Since` to `parts` from a stored entry.
/// Both may be added if the entry carries both validators (§4.I).
pub fn build_conditional(parts: &mut request::Parts, entry: &CacheEntry) {
    if let Some(etag) = entry.header("etag") {
        if let Ok(value) = HeaderValue::from_str(etag) {
            parts.headers.insert("if-none-match", value);
        }
    }
    if let Some(last_modified) = entry.header("last-modified") {
        if let Ok(value) = HeaderValue::from_str(last_modified) {
            parts.headers.insert("if-modified-since", value);
        }
    }
}

/// Merges a 304 response onto the stored entry per §4.I: response headers
/// override, except hop-by-hop and `content-*` headers which are preserved
/// from the stored entry. The resource is inherited unchanged; both dates
/// restart from the new exchange.
pub fn merge_304(
    stored: &CacheEntry,
    fresh: &response::Parts,
    request_date: SystemTime,
    response_date: SystemTime,
) -> CacheEntry {
    let mut headers: Vec<(String, String)> = stored
        .response_headers
        .iter()
        .filter(|(name, _)| is_hop_by_hop(name) || is_content_class(name))
        .cloned()
        .collect();

    for (name, value) in fresh.headers.iter() {
        let name = name.as_str();
        if is_hop_by_hop(name) || is_content_class(name) {
            continue;
        }
        if let Ok(value) = value.to_str() {
            headers.push((name.to_string(), value.to_string()));
        }
    }

    CacheEntry {
        request_method: stored.request_method.clone(),
        request_uri: stored.request_uri.clone(),
        status: stored.status,
        response_headers: headers,
        resource: stored.resource.clone(),
        request_date,
        response_date,
        vary_fields: stored.vary_fields.clone(),
        variant_map: stored.variant_map.clone(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resource::{MemoryResourceFactory, ResourceFactory};
    use http::{Method, Request, Response, StatusCode};

    fn stored() -> CacheEntry {
        CacheEntry {
            request_method: Method::GET,
            request_uri: "http://example.com:80/x".into(),
            status: StatusCode::OK,
            response_headers: vec![
                ("ETag".into(), "\"v1\"".into()),
                ("Content-Type".into(), "text/plain".into()),
                ("X-Custom".into(), "old".into()),
            ],
            resource: Some(MemoryResourceFactory.create("k", b"A", 1024).unwrap()),
            request_date: SystemTime::now(),
            response_date: SystemTime::now(),
            vary_fields: Vec::new(),
            variant_map: Vec::new(),
        }
    }

    #[test]
    fn build_conditional_adds_both_validators() {
        let mut entry = stored();
        entry.set_header("Last-Modified", "Sun, 06 Nov 1994 08:49:37 GMT".to_string());
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        build_conditional(&mut parts, &entry);
        assert_eq!(parts.headers.get("if-none-match").unwrap(), "\"v1\"");
        assert_eq!(parts.headers.get("if-modified-since").unwrap(), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn merge_overrides_headers_but_keeps_content_class() {
        let stored = stored();
        let (fresh, _) = Response::builder()
            .status(304)
            .header("X-Custom", "new")
            .header("Cache-Control", "max-age=120")
            .body(())
            .unwrap()
            .into_parts();
        let merged = merge_304(&stored, &fresh, SystemTime::now(), SystemTime::now());
        assert_eq!(merged.header("content-type"), Some("text/plain"));
        assert_eq!(merged.header("x-custom"), Some("new"));
        assert_eq!(merged.header("cache-control"), Some("max-age=120"));
        assert_eq!(merged.body_len(), 1);
    }
}
