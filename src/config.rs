//! Configuration (§6 "Configuration options", §10.C of `SPEC_FULL.md`).
//!
//! Plain `Clone` struct with a `Default` impl, public fields with doc
//! comments — the shape `http-cache`'s `HttpCacheOptions` uses, minus the
//! closures that belong to a client-middleware layer rather than this core.

use std::time::Duration;

/// Global, crate-wide cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Refuse to store bodies larger than this (§4.E).
    pub max_object_size: u64,
    /// Upper bound on resident entries; eviction policy beyond this is left
    /// to the storage backend (§4.F).
    pub max_cache_entries: usize,
    /// Allow heuristic freshness when no explicit lifetime is given (§4.G).
    pub heuristic_caching_enabled: bool,
    /// Fraction of `Date - Last-Modified` used as the heuristic lifetime.
    pub heuristic_coefficient: f64,
    /// Heuristic lifetime used when `Last-Modified` is absent.
    pub heuristic_default_lifetime: Duration,
    /// Upper bound ever applied to a heuristic lifetime, explicit or not.
    pub heuristic_max_lifetime: Duration,
    /// Whether this cache is shared (enables `s-maxage` / `private`
    /// semantics per RFC 9111 §4.2.1, §3.5).
    pub shared_cache: bool,
    /// Relax §4.L's rejection of a weak `ETag` in `If-Match` on an unsafe
    /// method.
    pub allow_weak_etag_on_unsafe: bool,
    /// Core/max worker counts for the async revalidation pool (§4.M).
    pub asynchronous_workers_core: usize,
    pub asynchronous_workers_max: usize,
    /// Whether `Content-Location`/`Location` invalidation (§4.K) is allowed
    /// to cross origins. Defaults to `false` per the open-question decision
    /// recorded in `DESIGN.md`.
    pub invalidate_cross_origin: bool,
    /// A hard cap applied on top of any server-specified freshness
    /// lifetime, mirroring `HttpCacheOptions::max_ttl`. Primarily useful
    /// together with a `CacheMode` that ignores server directives.
    pub max_ttl: Option<Duration>,
    /// Stamp `x-cache`/`x-cache-lookup` response headers reporting
    /// [`crate::HitOrMiss`], matching `HttpCacheOptions::cache_status_headers`.
    pub cache_status_headers: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_object_size: 10 * 1024 * 1024,
            max_cache_entries: 10_000,
            heuristic_caching_enabled: true,
            heuristic_coefficient: 0.1,
            heuristic_default_lifetime: Duration::from_secs(0),
            heuristic_max_lifetime: Duration::from_secs(7 * 24 * 3600),
            shared_cache: false,
            allow_weak_etag_on_unsafe: false,
            asynchronous_workers_core: 1,
            asynchronous_workers_max: 4,
            invalidate_cross_origin: false,
            max_ttl: None,
            cache_status_headers: true,
        }
    }
}

/// Per-request overrides of the recognized request `Cache-Control` options
/// (§6 "Request cache-control options"), for callers that want to pass
/// these without round-tripping through an actual header value.
#[derive(Debug, Clone, Default)]
pub struct RequestCacheOverrides {
    pub max_age: Option<u64>,
    pub min_fresh: Option<u64>,
    pub max_stale: Option<Option<u64>>,
    pub no_cache: bool,
    pub no_store: bool,
    pub only_if_cached: bool,
    pub stale_if_error: Option<u64>,
}

impl RequestCacheOverrides {
    /// Folds these overrides onto a parsed request `Cache-Control`, callers'
    /// overrides winning whenever set. Mirrors how `HttpCacheOptions`
    /// per-call closures override the cache-wide default.
    pub fn apply(&self, mut cc: crate::cache_control::RequestCacheControl) -> crate::cache_control::RequestCacheControl {
        if let Some(v) = self.max_age {
            cc.max_age = Some(v);
        }
        if let Some(v) = self.min_fresh {
            cc.min_fresh = Some(v);
        }
        if let Some(v) = self.max_stale {
            cc.max_stale = Some(v);
        }
        if self.no_cache {
            cc.no_cache = true;
        }
        if self.no_store {
            cc.no_store = true;
        }
        if self.only_if_cached {
            cc.only_if_cached = true;
        }
        if let Some(v) = self.stale_if_error {
            cc.stale_if_error = Some(v);
        }
        cc
    }
}

/// Cache-mode overrides (supplemented feature, `SPEC_FULL.md` §11), matching
/// `http-cache`'s `CacheMode` and the make-fetch-happen convention it cites.
/// These compose with, but never replace, the RFC 9111 state machine of
/// §4.N — a mode only adjusts which branch of CLASSIFY is forced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Standard RFC 9111 behavior.
    #[default]
    Default,
    /// Never read or write the cache.
    NoStore,
    /// Bypass cache on read, but still write the response.
    Reload,
    /// Always revalidate a stored entry if one exists.
    NoCache,
    /// Use any stored entry regardless of staleness; only go to the
    /// transport on a true miss.
    ForceCache,
    /// Like `ForceCache`, but fail locally with 504 rather than ever
    /// calling the transport.
    OnlyIfCached,
    /// Cache every cacheable-method 2xx response regardless of response
    /// `Cache-Control`, and serve stored entries regardless of staleness.
    IgnoreRules,
}
