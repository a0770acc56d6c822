//! Suitability checker (§4.H): request + candidate entry -> HIT / REVALIDATE
//! / MISS / UNCACHEABLE_METHOD.

use std::time::Duration;

use http::Method;

use crate::cache_control::RequestCacheControl;
use crate::config::{CacheConfig, CacheMode};
use crate::validity::{self, AgeInfo};

/// Methods this cache ever considers storing/serving a full-body response
/// for (§4.H: "GET, HEAD, and safely cacheable 206 ranges on GET" — ranges
/// are out of scope per spec.md §9, so in practice GET/HEAD).
pub fn is_cacheable_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suitability {
    Hit,
    Revalidate,
    Miss,
    UncacheableMethod,
}

/// Evaluates suitability for a request against a candidate entry's
/// freshness. `age` is `None` when there is no candidate (plain MISS path).
pub fn classify(
    method: &Method,
    request_cc: &RequestCacheControl,
    age: Option<AgeInfo>,
    entry_forbids_stale: bool,
    config: &CacheConfig,
    mode: CacheMode,
) -> Suitability {
    if !is_cacheable_method(method) {
        return Suitability::UncacheableMethod;
    }

    let Some(age) = age else {
        return Suitability::Miss;
    };

    match mode {
        CacheMode::NoStore | CacheMode::Reload => return Suitability::Miss,
        CacheMode::NoCache => return Suitability::Revalidate,
        CacheMode::ForceCache | CacheMode::OnlyIfCached | CacheMode::IgnoreRules => {
            return Suitability::Hit;
        }
        CacheMode::Default => {}
    }

    if request_cc.no_cache {
        return Suitability::Revalidate;
    }
    if request_cc.max_age == Some(0) {
        return Suitability::Revalidate;
    }
    if let Some(request_max_age) = request_cc.max_age {
        if age.current_age > Duration::from_secs(request_max_age) {
            return Suitability::Revalidate;
        }
    }
    if let Some(min_fresh) = request_cc.min_fresh {
        if age.remaining_freshness() < Duration::from_secs(min_fresh) {
            return Suitability::Revalidate;
        }
    }

    if age.is_fresh() {
        return Suitability::Hit;
    }

    // Stale: must-revalidate/proxy-revalidate defeats max-stale entirely
    // per RFC 9111 §4.2.4, regardless of the request's own directives —
    // the open-question decision recorded in DESIGN.md.
    if entry_forbids_stale {
        return Suitability::Revalidate;
    }

    if let Some(max_stale) = request_cc.max_stale {
        let within = match max_stale {
            None => true,
            Some(bound) => age.staleness() <= Duration::from_secs(bound),
        };
        if within {
            return Suitability::Hit;
        }
    }

    Suitability::Revalidate
}
