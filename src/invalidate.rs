//! Invalidator (§4.K).

use std::time::SystemTime;

use http::{HeaderMap, Method, StatusCode, Uri};
use log::debug;

use crate::config::CacheConfig;
use crate::error::Result;
use crate::headers::{header_date, parse_http_date};
use crate::key::{canonical_key, resolve_reference};
use crate::storage::Storage;

fn is_unsafe_method(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::DELETE | Method::PATCH)
}

/// §4.K.1: on an unsafe method with a successful response, remove the root
/// entry for the request URI and all its variant children atomically
/// (single `atomic_update` transforming root -> none, plus child removals
/// observed from the same snapshot).
pub async fn invalidate_unsafe_method(storage: &dyn Storage, method: &Method, request_uri: &Uri, status: StatusCode) -> Result<()> {
    if !is_unsafe_method(method) {
        return Ok(());
    }
    if !status.is_success() && !status.is_redirection() {
        return Ok(());
    }
    let key = canonical_key(request_uri)?;
    invalidate_root_and_variants(storage, &key).await
}

async fn invalidate_root_and_variants(storage: &dyn Storage, key: &str) -> Result<()> {
    let mut children = Vec::new();
    storage
        .atomic_update(key, &|current| {
            if let Some(entry) = &current {
                children = entry.variant_map.iter().map(|(_, k)| k.clone()).collect();
            }
            None
        })
        .await?;
    for child in children {
        storage.remove(&child).await?;
    }
    debug!("invalidated root and variants for {key}");
    Ok(())
}

/// §4.K.2/3: on a successful response with `Location`/`Content-Location`,
/// invalidate the entry those headers name, same-origin only unless
/// configured otherwise. §4.K.3's exchange-level refinement (only flush if
/// the response's `Date`/`ETag` indicate it's actually newer/different) is
/// folded in when the referenced entry's own `ETag`/`Date` are available.
pub async fn invalidate_response_uri(
    storage: &dyn Storage,
    request_uri: &Uri,
    response_headers: &HeaderMap,
    status: StatusCode,
    config: &CacheConfig,
) -> Result<()> {
    if !(status.is_success() || status.is_redirection()) {
        return Ok(());
    }

    let response_date = header_date(response_headers, "date");
    let response_etag = response_headers.get("etag").and_then(|v| v.to_str().ok());

    for header_name in ["location", "content-location"] {
        let Some(reference) = response_headers.get(header_name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        let Ok((key, same_origin)) = resolve_reference(request_uri, reference) else {
            continue;
        };
        if !same_origin && !config.invalidate_cross_origin {
            continue;
        }

        if let (Some(response_date), Some(response_etag)) = (response_date, response_etag) {
            // §4.K.3: only flush if strictly older, or a different ETag;
            // ties keep the entry.
            if let Some(existing) = storage.get(&key).await? {
                let existing_date = header_date_or_response(&existing.response_headers, existing.response_date);
                let existing_etag = existing
                    .response_headers
                    .iter()
                    .find(|(n, _)| n.eq_ignore_ascii_case("etag"))
                    .map(|(_, v)| v.as_str());
                let is_older = existing_date < response_date;
                let different_etag = existing_etag != Some(response_etag);
                if !is_older && !different_etag {
                    continue;
                }
            } else {
                continue;
            }
        }

        invalidate_root_and_variants(storage, &key).await?;
    }
    Ok(())
}

fn header_date_or_response(headers: &[(String, String)], fallback: SystemTime) -> SystemTime {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case("date"))
        .and_then(|(_, v)| parse_http_date(v))
        .unwrap_or(fallback)
}
