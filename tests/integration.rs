//! End-to-end scenarios exercised against an in-process fake `Transport`,
//! the same role `http-cache-tower-server`'s mock `tower::Service` plays in
//! the teacher's own integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};

use http_cache_core::resource::MemoryResourceFactory;
use http_cache_core::storage::InMemoryStorage;
use http_cache_core::{Cache, CacheConfig, CacheMode, CacheResponseStatus, RequestCacheOverrides, Result, Transport};

struct FakeTransport {
    calls: Arc<AtomicUsize>,
    responder: Mutex<Box<dyn FnMut(&Request<Bytes>) -> Result<Response<Bytes>> + Send>>,
}

#[async_trait::async_trait]
impl Transport for FakeTransport {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (self.responder.lock().unwrap())(&request)
    }
}

fn new_cache(
    responder: impl FnMut(&Request<Bytes>) -> Result<Response<Bytes>> + Send + 'static,
) -> (Cache<InMemoryStorage, MemoryResourceFactory, FakeTransport>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = Cache::new(
        InMemoryStorage::new(),
        MemoryResourceFactory,
        FakeTransport { calls: calls.clone(), responder: Mutex::new(Box::new(responder)) },
        CacheConfig::default(),
    );
    (cache, calls)
}

fn get(uri: &str) -> Request<Bytes> {
    Request::builder().method(Method::GET).uri(uri).body(Bytes::new()).unwrap()
}

/// Scenario 1: simple hit. Store `/x` with `max-age=60`; one second later a
/// GET returns HIT with the original body and `Age: 1`.
#[tokio::test]
async fn simple_hit_reports_age() {
    let (cache, calls) = new_cache(|_req| {
        Ok(Response::builder().status(200).header("cache-control", "max-age=60").body(Bytes::from_static(b"A")).unwrap())
    });

    let (_resp, ctx) = cache.execute(get("http://example.com/x"), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(ctx.cache_response_status, CacheResponseStatus::CacheMiss);

    tokio::time::sleep(Duration::from_secs(1)).await;

    let (resp, ctx) = cache.execute(get("http://example.com/x"), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(ctx.cache_response_status, CacheResponseStatus::CacheHit);
    assert_eq!(resp.body(), &Bytes::from_static(b"A"));
    assert_eq!(resp.headers().get("age").unwrap(), "1");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Scenario 2: revalidation with 304. The origin is asked to revalidate a
/// `max-age=0` entry, returns 304 with a new `max-age=120`, and the merged
/// entry then serves as a HIT without a further transport round trip.
#[tokio::test]
async fn revalidation_with_304_merges_new_max_age() {
    let first_call = Arc::new(AtomicUsize::new(0));
    let first_call_inner = first_call.clone();
    let (cache, calls) = new_cache(move |req| {
        if req.headers().get("if-none-match").is_some() {
            assert_eq!(req.headers().get("if-none-match").unwrap(), "\"v1\"");
            Ok(Response::builder().status(304).header("cache-control", "max-age=120").body(Bytes::new()).unwrap())
        } else {
            first_call_inner.fetch_add(1, Ordering::SeqCst);
            Ok(Response::builder()
                .status(200)
                .header("etag", "\"v1\"")
                .header("cache-control", "max-age=0")
                .body(Bytes::from_static(b"A"))
                .unwrap())
        }
    });

    cache.execute(get("http://example.com/x"), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();

    let (resp, ctx) = cache.execute(get("http://example.com/x"), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(ctx.cache_response_status, CacheResponseStatus::Validated);
    assert_eq!(resp.body(), &Bytes::from_static(b"A"));
    assert_eq!(resp.headers().get("cache-control").unwrap(), "max-age=120");

    let (resp2, ctx2) = cache.execute(get("http://example.com/x"), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(ctx2.cache_response_status, CacheResponseStatus::CacheHit);
    assert_eq!(resp2.body(), &Bytes::from_static(b"A"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(first_call.load(Ordering::SeqCst), 1);
}

/// Scenario 3: `Vary`-based variant selection across gzip/identity/br.
#[tokio::test]
async fn vary_selects_the_matching_variant() {
    let (cache, _calls) = new_cache(|req| {
        let encoding = req.headers().get("accept-encoding").and_then(|v| v.to_str().ok()).unwrap_or("");
        let body = match encoding {
            "gzip" => Bytes::from_static(b"G"),
            "identity" => Bytes::from_static(b"I"),
            _ => Bytes::from_static(b"OTHER"),
        };
        Ok(Response::builder()
            .status(200)
            .header("cache-control", "max-age=60")
            .header("vary", "accept-encoding")
            .body(body)
            .unwrap())
    });

    let gzip_req = || Request::builder().method(Method::GET).uri("http://example.com/y").header("accept-encoding", "gzip").body(Bytes::new()).unwrap();
    let identity_req = || Request::builder().method(Method::GET).uri("http://example.com/y").header("accept-encoding", "identity").body(Bytes::new()).unwrap();
    let br_req = || Request::builder().method(Method::GET).uri("http://example.com/y").header("accept-encoding", "br").body(Bytes::new()).unwrap();

    cache.execute(gzip_req(), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    cache.execute(identity_req(), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();

    let (resp_gzip, ctx_gzip) = cache.execute(gzip_req(), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(ctx_gzip.cache_response_status, CacheResponseStatus::CacheHit);
    assert_eq!(resp_gzip.body(), &Bytes::from_static(b"G"));

    let (resp_identity, ctx_identity) = cache.execute(identity_req(), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(ctx_identity.cache_response_status, CacheResponseStatus::CacheHit);
    assert_eq!(resp_identity.body(), &Bytes::from_static(b"I"));

    let (_resp_br, ctx_br) = cache.execute(br_req(), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(ctx_br.cache_response_status, CacheResponseStatus::CacheMiss);
}

/// Scenario 4: invalidation on PUT via `Content-Location`.
#[tokio::test]
async fn put_with_content_location_invalidates_stored_get() {
    let (cache, _calls) = new_cache(|req| {
        if req.method() == Method::GET {
            Ok(Response::builder().status(200).header("cache-control", "max-age=60").body(Bytes::from_static(b"Z")).unwrap())
        } else {
            Ok(Response::builder().status(200).header("content-location", "/z").body(Bytes::new()).unwrap())
        }
    });

    cache.execute(get("http://example.com/z"), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();

    let put = Request::builder().method(Method::PUT).uri("http://example.com/z").body(Bytes::new()).unwrap();
    cache.execute(put, RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();

    let (_resp, ctx) = cache.execute(get("http://example.com/z"), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(ctx.cache_response_status, CacheResponseStatus::CacheMiss);
}

/// Scenario 5: `stale-while-revalidate` serves the stored body immediately
/// once past `max-age` but within the SWR window, without calling the
/// transport again synchronously. `Date` is backdated on the stored
/// response rather than sleeping, so "t=15s" is simulated instantly.
#[tokio::test]
async fn stale_while_revalidate_serves_stale_body_then_refreshes_in_background() {
    let backdated = httpdate::fmt_http_date(std::time::SystemTime::now() - Duration::from_secs(15));
    let (cache, calls) = new_cache(move |_req| {
        Ok(Response::builder()
            .status(200)
            .header("date", backdated.clone())
            .header("cache-control", "max-age=10, stale-while-revalidate=60")
            .body(Bytes::from_static(b"A"))
            .unwrap())
    });

    cache.execute(get("http://example.com/x"), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let (resp, ctx) = cache.execute(get("http://example.com/x"), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(ctx.cache_response_status, CacheResponseStatus::CacheModuleResponse);
    assert_eq!(resp.body(), &Bytes::from_static(b"A"));

    // A concurrent stale GET collapses onto the same in-flight revalidation
    // rather than scheduling a second one (§4.M).
    let (resp2, ctx2) = cache.execute(get("http://example.com/x"), RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();
    assert_eq!(ctx2.cache_response_status, CacheResponseStatus::CacheModuleResponse);
    assert_eq!(resp2.body(), &Bytes::from_static(b"A"));

    // Serving stale under SWR never calls the transport synchronously.
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Exactly one background revalidation actually runs, despite two
    // overlapping stale-serving requests.
    cache.revalidator.close(Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

/// Scenario 6: `only-if-cached` against an unknown URI synthesizes a local
/// 504 without ever calling the transport.
#[tokio::test]
async fn only_if_cached_miss_is_synthesized_locally() {
    let (cache, calls) = new_cache(|_req| Ok(Response::builder().status(200).body(Bytes::new()).unwrap()));

    let req = Request::builder()
        .method(Method::GET)
        .uri("http://example.com/nope")
        .header("cache-control", "only-if-cached")
        .body(Bytes::new())
        .unwrap();
    let (resp, ctx) = cache.execute(req, RequestCacheOverrides::default(), CacheMode::Default).await.unwrap();

    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(ctx.cache_response_status, CacheResponseStatus::CacheModuleResponse);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}
