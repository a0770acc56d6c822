//! Validity policy (§4.G): freshness lifetime, current age, staleness.

use std::time::{Duration, SystemTime};

use crate::cache_control::ResponseCacheControl;
use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::headers::parse_http_date;

/// Status codes §3 lists as heuristically cacheable absent an explicit
/// lifetime.
const HEURISTICALLY_CACHEABLE_STATUSES: &[u16] =
    &[200, 203, 204, 206, 300, 301, 308, 404, 405, 410, 414, 501];

pub fn is_heuristically_cacheable_status(status: u16) -> bool {
    HEURISTICALLY_CACHEABLE_STATUSES.contains(&status)
}

/// The age/freshness arithmetic for one entry as of `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgeInfo {
    pub current_age: Duration,
    pub freshness_lifetime: Duration,
}

impl AgeInfo {
    pub fn is_fresh(&self) -> bool {
        self.current_age < self.freshness_lifetime
    }

    /// Staleness already accrued beyond the freshness lifetime, zero if
    /// still fresh.
    pub fn staleness(&self) -> Duration {
        self.current_age.saturating_sub(self.freshness_lifetime)
    }

    pub fn remaining_freshness(&self) -> Duration {
        self.freshness_lifetime.saturating_sub(self.current_age)
    }
}

fn headers_get<'a>(entry: &'a CacheEntry, name: &str) -> Option<&'a str> {
    entry.header(name)
}

fn header_date_in(entry: &CacheEntry, name: &str) -> Option<SystemTime> {
    headers_get(entry, name).and_then(parse_http_date)
}

/// `apparent_age`, `response_delay`, `corrected_age_at_receipt` (§3).
fn corrected_age_at_receipt(entry: &CacheEntry, age_header: Option<Duration>) -> Duration {
    let date_header = header_date_in(entry, "date").unwrap_or(entry.response_date);
    let apparent_age = entry
        .response_date
        .duration_since(date_header)
        .unwrap_or(Duration::ZERO);
    let age_header = age_header.unwrap_or(Duration::ZERO);
    let corrected = apparent_age.max(age_header);
    let response_delay = entry
        .response_date
        .duration_since(entry.request_date)
        .unwrap_or(Duration::ZERO);
    corrected + response_delay
}

fn parse_age_header(entry: &CacheEntry) -> Option<Duration> {
    headers_get(entry, "age").and_then(|v| v.trim().parse::<u64>().ok()).map(Duration::from_secs)
}

pub fn current_age(entry: &CacheEntry, now: SystemTime) -> Duration {
    let corrected = corrected_age_at_receipt(entry, parse_age_header(entry));
    let resident = now.duration_since(entry.response_date).unwrap_or(Duration::ZERO);
    corrected + resident
}

/// Freshness lifetime per §3's derivation, including the heuristic
/// fallback. `cc` is the entry's own response `Cache-Control`.
pub fn freshness_lifetime(
    entry: &CacheEntry,
    cc: &ResponseCacheControl,
    config: &CacheConfig,
) -> Duration {
    let explicit = if config.shared_cache {
        cc.s_maxage.or(cc.max_age)
    } else {
        cc.max_age
    };
    let mut lifetime = if let Some(secs) = explicit {
        Duration::from_secs(secs)
    } else if let Some(expires) = headers_get(entry, "expires").and_then(parse_http_date) {
        let date = header_date_in(entry, "date").unwrap_or(entry.response_date);
        expires.duration_since(date).unwrap_or(Duration::ZERO)
    } else if config.heuristic_caching_enabled
        && is_heuristically_cacheable_status(entry.status.as_u16())
    {
        heuristic_lifetime(entry, config)
    } else {
        Duration::ZERO
    };
    if let Some(max_ttl) = config.max_ttl {
        lifetime = lifetime.min(max_ttl);
    }
    lifetime
}

fn heuristic_lifetime(entry: &CacheEntry, config: &CacheConfig) -> Duration {
    let date = header_date_in(entry, "date").unwrap_or(entry.response_date);
    let lifetime = match header_date_in(entry, "last-modified") {
        Some(last_modified) if last_modified <= date => {
            let age = date.duration_since(last_modified).unwrap_or(Duration::ZERO);
            age.mul_f64(config.heuristic_coefficient.clamp(0.0, 1.0))
        }
        _ => config.heuristic_default_lifetime,
    };
    lifetime.min(config.heuristic_max_lifetime)
}

/// Whether the entry was served with an explicit lifetime (not heuristic),
/// used by callers that need to warn (113) only on the heuristic path.
pub fn has_explicit_lifetime(cc: &ResponseCacheControl, entry: &CacheEntry, shared_cache: bool) -> bool {
    let explicit_cc = if shared_cache { cc.s_maxage.or(cc.max_age) } else { cc.max_age };
    explicit_cc.is_some() || headers_get(entry, "expires").is_some()
}

pub fn age_info(entry: &CacheEntry, cc: &ResponseCacheControl, config: &CacheConfig, now: SystemTime) -> AgeInfo {
    AgeInfo {
        current_age: current_age(entry, now),
        freshness_lifetime: freshness_lifetime(entry, cc, config),
    }
}

/// `stale-while-revalidate`'s window (response-direction value, RFC 5861).
pub fn swr_window(cc: &ResponseCacheControl) -> Duration {
    cc.stale_while_revalidate.map(Duration::from_secs).unwrap_or(Duration::ZERO)
}

/// `stale-if-error`'s window: request directive wins if present (the
/// request can only ever relax, never tighten, a server-absent directive is
/// filled by the request's own), else the response's.
pub fn sie_window(
    request_cc: &crate::cache_control::RequestCacheControl,
    response_cc: &ResponseCacheControl,
) -> Option<Duration> {
    request_cc
        .stale_if_error
        .or(response_cc.stale_if_error)
        .map(Duration::from_secs)
}

/// Whether serving stale is categorically forbidden regardless of SWR/SIE
/// windows: `must-revalidate`, or `proxy-revalidate` on a shared cache.
pub fn forbids_stale(cc: &ResponseCacheControl, shared_cache: bool) -> bool {
    cc.must_revalidate || (shared_cache && cc.proxy_revalidate)
}

/// Whether a `Warning: 113` belongs on a response served from this entry:
/// a heuristically-chosen freshness lifetime over 24 hours, on a response
/// itself over 24 hours old (§11 "supplemented features").
pub fn heuristic_warning_applies(age: &AgeInfo, has_explicit_lifetime: bool) -> bool {
    let day = Duration::from_secs(24 * 3600);
    age.current_age > day && !has_explicit_lifetime && age.freshness_lifetime > day
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resource::{MemoryResourceFactory, ResourceFactory};
    use http::{Method, StatusCode};

    fn entry_with_headers(headers: Vec<(&str, &str)>, request_date: SystemTime, response_date: SystemTime) -> CacheEntry {
        CacheEntry {
            request_method: Method::GET,
            request_uri: "http://example.com:80/x".into(),
            status: StatusCode::OK,
            response_headers: headers.into_iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            resource: Some(MemoryResourceFactory.create("k", b"A", 1024).unwrap()),
            request_date,
            response_date,
            vary_fields: Vec::new(),
            variant_map: Vec::new(),
        }
    }

    #[test]
    fn explicit_max_age_wins_over_expires() {
        let now = SystemTime::now();
        let entry = entry_with_headers(
            vec![("Cache-Control", "max-age=60"), ("Expires", &crate::headers::format_http_date(now))],
            now,
            now,
        );
        let cc = ResponseCacheControl::parse("max-age=60");
        let lifetime = freshness_lifetime(&entry, &cc, &CacheConfig::default());
        assert_eq!(lifetime, Duration::from_secs(60));
    }

    #[test]
    fn s_maxage_wins_on_shared_cache() {
        let now = SystemTime::now();
        let entry = entry_with_headers(vec![], now, now);
        let cc = ResponseCacheControl::parse("max-age=60, s-maxage=300");
        let mut config = CacheConfig::default();
        config.shared_cache = true;
        let lifetime = freshness_lifetime(&entry, &cc, &config);
        assert_eq!(lifetime, Duration::from_secs(300));
    }

    #[test]
    fn current_age_accounts_for_resident_time() {
        let response_date = SystemTime::now() - Duration::from_secs(5);
        let entry = entry_with_headers(
            vec![("Date", &crate::headers::format_http_date(response_date))],
            response_date,
            response_date,
        );
        let age = current_age(&entry, response_date + Duration::from_secs(1));
        assert_eq!(age, Duration::from_secs(1));
    }

    #[test]
    fn heuristic_lifetime_is_fraction_of_last_modified_age() {
        let now = SystemTime::now();
        let last_modified = now - Duration::from_secs(1000);
        let entry = entry_with_headers(
            vec![
                ("Date", &crate::headers::format_http_date(now)),
                ("Last-Modified", &crate::headers::format_http_date(last_modified)),
            ],
            now,
            now,
        );
        let cc = ResponseCacheControl::default();
        let lifetime = freshness_lifetime(&entry, &cc, &CacheConfig::default());
        assert_eq!(lifetime, Duration::from_secs(100));
    }

    #[test]
    fn must_revalidate_forbids_stale() {
        let cc = ResponseCacheControl::parse("must-revalidate");
        assert!(forbids_stale(&cc, false));
        assert!(!forbids_stale(&ResponseCacheControl::default(), false));
    }

    #[test]
    fn heuristic_warning_requires_day_old_response_and_lifetime() {
        let stale_heuristic = AgeInfo { current_age: Duration::from_secs(25 * 3600), freshness_lifetime: Duration::from_secs(48 * 3600) };
        assert!(heuristic_warning_applies(&stale_heuristic, false));
        assert!(!heuristic_warning_applies(&stale_heuristic, true));

        let young = AgeInfo { current_age: Duration::from_secs(60), freshness_lifetime: Duration::from_secs(48 * 3600) };
        assert!(!heuristic_warning_applies(&young, false));
    }
}
