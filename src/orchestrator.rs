//! Execution orchestrator (§4.N): the top-level state machine tying
//! §4.A-§4.M together around one request.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::Bytes;
use http::{HeaderName, HeaderValue, Request, Response, StatusCode, Uri};
use log::{debug, trace, warn};

use crate::cache_control::{RequestCacheControl, ResponseCacheControl};
use crate::compliance;
use crate::conditional;
use crate::config::{CacheConfig, CacheMode, RequestCacheOverrides};
use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::headers::{
    header_str, parse_vary, vary_is_star, strip_1xx_warnings,
    WARNING_112_DISCONNECTED_OPERATION, WARNING_113_HEURISTIC_EXPIRATION,
};
use crate::invalidate;
use crate::key::canonical_key;
use crate::resource::ResourceFactory;
use crate::revalidator::AsyncRevalidator;
use crate::storage::Storage;
use crate::suitability::{self, Suitability};
use crate::validity::{self, AgeInfo};
use crate::variant::{self, Resolution};

/// Classification surfaced to the caller on return (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheResponseStatus {
    CacheHit,
    CacheMiss,
    /// Synthesized entirely by the cache (local 400/504, or a stale entry
    /// served under `stale-while-revalidate` while revalidation proceeds in
    /// the background).
    CacheModuleResponse,
    /// Served after a successful revalidation (304 merge, or a transport
    /// round-trip the cache itself initiated).
    Validated,
    Failure,
}

/// Everything §6 says the caller gets back alongside the response.
#[derive(Debug, Clone)]
pub struct CacheExecutionContext {
    pub cache_response_status: CacheResponseStatus,
    pub request_cache_control: RequestCacheControl,
    pub response_cache_control: Option<ResponseCacheControl>,
    pub entry: Option<Arc<CacheEntry>>,
    /// Whether a stored entry existed for this request at LOOKUP time,
    /// regardless of whether it then needed revalidation. Backs the
    /// `x-cache-lookup` header (§11 "supplemented features").
    pub lookup_hit: bool,
}

/// The external transport collaborator (§1 "Explicitly OUT of scope", §6
/// "Contract consumed from the transport").
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: Request<Bytes>) -> Result<Response<Bytes>>;
}

/// Ties §4.A-§4.M together around one request. Collaborators are held
/// behind `Arc` so a background revalidation task spawned onto the
/// `AsyncRevalidator` can own a cheap clone of each and drive a real
/// transport round trip after the method that scheduled it has returned.
pub struct Cache<S, R, T> {
    pub storage: Arc<S>,
    pub resources: Arc<R>,
    pub transport: Arc<T>,
    pub config: CacheConfig,
    pub revalidator: AsyncRevalidator,
}

const CACHEABLE_STATUSES: &[u16] = &[200, 203, 204, 206, 300, 301, 404, 405, 410, 414, 501];

fn is_cacheable_response_status(status: StatusCode, response_cc: &ResponseCacheControl, has_expires: bool) -> bool {
    CACHEABLE_STATUSES.contains(&status.as_u16())
        || response_cc.max_age.is_some()
        || response_cc.s_maxage.is_some()
        || has_expires
}

impl<S, R, T> Cache<S, R, T>
where
    S: Storage + 'static,
    R: ResourceFactory + 'static,
    T: Transport + 'static,
{
    pub fn new(storage: S, resources: R, transport: T, config: CacheConfig) -> Self {
        let revalidator = AsyncRevalidator::new(config.asynchronous_workers_core, config.asynchronous_workers_max);
        Self { storage: Arc::new(storage), resources: Arc::new(resources), transport: Arc::new(transport), config, revalidator }
    }

    /// §4.N's full state machine: `PRE_CHECK -> LOOKUP -> CLASSIFY ->
    /// {HIT, REVALIDATE, MISS, UNCACHEABLE} -> TRANSPORT -> STORE_OR_MERGE
    /// -> INVALIDATE -> RETURN`. Stamps `x-cache`/`x-cache-lookup` on the
    /// way out when `CacheConfig::cache_status_headers` is set.
    pub async fn execute(
        &self,
        request: Request<Bytes>,
        overrides: RequestCacheOverrides,
        mode: CacheMode,
    ) -> Result<(Response<Bytes>, CacheExecutionContext)> {
        let (response, ctx) = self.execute_inner(request, overrides, mode).await?;
        let response = if self.config.cache_status_headers {
            stamp_cache_status_headers(response, &ctx)
        } else {
            response
        };
        Ok((response, ctx))
    }

    async fn execute_inner(
        &self,
        mut request: Request<Bytes>,
        overrides: RequestCacheOverrides,
        mode: CacheMode,
    ) -> Result<(Response<Bytes>, CacheExecutionContext)> {
        // PRE_CHECK
        if let Err(CacheError::ProtocolRejected(reason)) =
            compliance::prefilter(request.method(), request.headers(), &self.config)
        {
            debug!("protocol pre-filter rejected request: {reason}");
            return Ok((local_response(StatusCode::BAD_REQUEST), failure_context(&request, &overrides)));
        }
        *request.version_mut() = compliance::normalize_version(request.version());
        let request_uri = request.uri().clone();

        let request_cc = overrides.apply(
            header_str(request.headers(), "cache-control")
                .map(RequestCacheControl::parse)
                .unwrap_or_default(),
        );

        if request_cc.no_store || matches!(mode, CacheMode::NoStore) {
            trace!("no-store: bypassing cache entirely");
            let response = self.transport.execute(request).await?;
            return Ok((
                response,
                CacheExecutionContext {
                    cache_response_status: CacheResponseStatus::CacheMiss,
                    request_cache_control: request_cc,
                    response_cache_control: None,
                    entry: None,
                    lookup_hit: false,
                },
            ));
        }

        let root_key = canonical_key(request.uri())?;

        // LOOKUP
        let root_entry = self.storage.get(&root_key).await?;
        let (candidate_key, candidate) = match &root_entry {
            Some(root) if root.is_root() => match variant::resolve(Some(root), request.headers()) {
                Resolution::Hit(composite) => {
                    let child = self.storage.get(&composite).await?;
                    (Some(composite), child)
                }
                Resolution::RootMiss | Resolution::NoRoot => (None, None),
            },
            Some(plain) => (Some(root_key.clone()), Some(plain.clone())),
            None => (None, None),
        };

        // CLASSIFY
        let (response_cc, age) = match &candidate {
            Some(entry) => {
                let cc = entry.header("cache-control").map(ResponseCacheControl::parse).unwrap_or_default();
                let age = validity::age_info(entry, &cc, &self.config, SystemTime::now());
                (Some(cc), Some(age))
            }
            None => (None, None),
        };
        let forbids_stale = response_cc
            .as_ref()
            .map(|cc| validity::forbids_stale(cc, self.config.shared_cache))
            .unwrap_or(false);

        let suitability = suitability::classify(
            request.method(),
            &request_cc,
            age,
            forbids_stale,
            &self.config,
            mode,
        );

        if request_cc.only_if_cached && !matches!(suitability, Suitability::Hit) {
            trace!("only-if-cached miss: synthesizing local 504");
            return Ok((
                local_response(StatusCode::GATEWAY_TIMEOUT),
                CacheExecutionContext {
                    cache_response_status: CacheResponseStatus::CacheModuleResponse,
                    request_cache_control: request_cc,
                    response_cache_control: response_cc,
                    lookup_hit: candidate.is_some(),
                    entry: candidate,
                },
            ));
        }

        match suitability {
            Suitability::Hit => {
                let entry = candidate.expect("HIT implies a candidate entry");
                let age = age.expect("HIT implies age info");
                let warnings = response_warnings(&entry, response_cc.as_ref(), &age, self.config.shared_cache);
                let response = build_response(&entry, &age, &warnings)?;
                Ok((
                    response,
                    CacheExecutionContext {
                        cache_response_status: CacheResponseStatus::CacheHit,
                        request_cache_control: request_cc,
                        response_cache_control: response_cc,
                        entry: Some(entry),
                        lookup_hit: true,
                    },
                ))
            }
            Suitability::Revalidate => {
                let storage_key = candidate_key.clone().expect("REVALIDATE implies a resolved storage key");
                self.revalidate(request, request_uri, storage_key, request_cc, response_cc, candidate.unwrap(), age, forbids_stale).await
            }
            Suitability::Miss | Suitability::UncacheableMethod => {
                let lookup_hit = candidate.is_some();
                self.miss(request, request_uri, request_cc, mode, lookup_hit).await
            }
        }
    }

    /// Schedules revalidation of `entry` to run out-of-band, collapsing
    /// repeat requests for the same `storage_key` while one is already in
    /// flight (§4.M). The spawned task clones `storage`/`resources`/
    /// `transport` (cheap, since they're already held behind `Arc`) and
    /// drives a real conditional request against the transport, then
    /// merges or stores the result the same way a foreground REVALIDATE
    /// would.
    fn schedule_background_revalidation(&self, storage_key: String, entry: Arc<CacheEntry>) {
        let id = entry.request_uri.clone();
        let storage = self.storage.clone();
        let resources = self.resources.clone();
        let transport = self.transport.clone();
        let config = self.config.clone();
        self.revalidator.schedule(
            id,
            Duration::ZERO,
            background_revalidate(storage, resources, transport, config, storage_key, entry),
        );
    }

    async fn revalidate(
        &self,
        mut request: Request<Bytes>,
        uri: Uri,
        storage_key: String,
        request_cc: RequestCacheControl,
        response_cc: Option<ResponseCacheControl>,
        entry: Arc<CacheEntry>,
        age: Option<AgeInfo>,
        forbids_stale: bool,
    ) -> Result<(Response<Bytes>, CacheExecutionContext)> {
        // §4.M/§4.N: a stale entry still within its `stale-while-revalidate`
        // window is served immediately, with the actual revalidation kicked
        // off in the background rather than performed synchronously here.
        if let (Some(window), Some(age)) = (
            response_cc.as_ref().map(validity::swr_window).filter(|w| !w.is_zero()),
            age,
        ) {
            if !age.is_fresh() && age.staleness() <= window && !forbids_stale {
                self.schedule_background_revalidation(storage_key, entry.clone());
                let warnings = response_warnings(&entry, response_cc.as_ref(), &age, self.config.shared_cache);
                let response = build_response(&entry, &age, &warnings)?;
                return Ok((
                    response,
                    CacheExecutionContext {
                        cache_response_status: CacheResponseStatus::CacheModuleResponse,
                        request_cache_control: request_cc,
                        response_cache_control: response_cc,
                        entry: Some(entry),
                        lookup_hit: true,
                    },
                ));
            }
        }

        let (mut parts, body) = request.into_parts();
        conditional::build_conditional(&mut parts, &entry);
        request = Request::from_parts(parts, body);

        let request_date = SystemTime::now();
        match self.transport.execute(request).await {
            Ok(response) if response.status() == StatusCode::NOT_MODIFIED => {
                let response_date = SystemTime::now();
                let (fresh_parts, _) = response.into_parts();
                let merged = conditional::merge_304(&entry, &fresh_parts, request_date, response_date);
                self.storage.put(storage_key, merged.clone()).await?;
                let merged = Arc::new(merged);
                let merged_cc = merged.header("cache-control").map(ResponseCacheControl::parse).unwrap_or_default();
                let age = validity::age_info(&merged, &merged_cc, &self.config, SystemTime::now());
                let warnings = response_warnings(&merged, Some(&merged_cc), &age, self.config.shared_cache);
                let out = build_response(&merged, &age, &warnings)?;
                Ok((
                    out,
                    CacheExecutionContext {
                        cache_response_status: CacheResponseStatus::Validated,
                        request_cache_control: request_cc,
                        response_cache_control: response_cc,
                        entry: Some(merged),
                        lookup_hit: true,
                    },
                ))
            }
            Ok(response) if response.status().is_server_error() => {
                if let Some(out) = stale_if_error_response(&entry, response_cc.as_ref(), &request_cc, age, self.config.shared_cache)? {
                    warn!("revalidation returned {}, serving stale under stale-if-error", response.status());
                    return Ok((
                        out,
                        CacheExecutionContext {
                            cache_response_status: CacheResponseStatus::CacheModuleResponse,
                            request_cache_control: request_cc,
                            response_cache_control: response_cc,
                            entry: Some(entry),
                            lookup_hit: true,
                        },
                    ));
                }
                self.store_fresh(response, uri, entry.request_method.clone(), request_cc, Some((entry, age)), true, CacheMode::Default).await
            }
            Ok(response) => self.store_fresh(response, uri, entry.request_method.clone(), request_cc, Some((entry, age)), true, CacheMode::Default).await,
            Err(e) => {
                if let Some(out) = stale_if_error_response(&entry, response_cc.as_ref(), &request_cc, age, self.config.shared_cache)? {
                    warn!("transport failure during revalidation, serving stale under stale-if-error: {e}");
                    return Ok((
                        out,
                        CacheExecutionContext {
                            cache_response_status: CacheResponseStatus::CacheModuleResponse,
                            request_cache_control: request_cc,
                            response_cache_control: response_cc,
                            entry: Some(entry),
                            lookup_hit: true,
                        },
                    ));
                }
                Err(e)
            }
        }
    }

    async fn miss(
        &self,
        request: Request<Bytes>,
        uri: Uri,
        request_cc: RequestCacheControl,
        mode: CacheMode,
        lookup_hit: bool,
    ) -> Result<(Response<Bytes>, CacheExecutionContext)> {
        let method = request.method().clone();
        let response = self.transport.execute(request).await?;
        self.store_fresh(response, uri, method, request_cc, None, lookup_hit, mode).await
    }

    /// STORE_OR_MERGE + INVALIDATE for a fresh transport response, whether
    /// it arrived via the plain MISS path or as a 200 instead of a 304 on
    /// REVALIDATE. `uri` is the request's own (pre-redirect) target.
    async fn store_fresh(
        &self,
        response: Response<Bytes>,
        uri: Uri,
        method: http::Method,
        request_cc: RequestCacheControl,
        prior: Option<(Arc<CacheEntry>, Option<AgeInfo>)>,
        lookup_hit: bool,
        mode: CacheMode,
    ) -> Result<(Response<Bytes>, CacheExecutionContext)> {
        let (parts, body) = response.into_parts();

        invalidate::invalidate_unsafe_method(self.storage.as_ref(), &method, &uri, parts.status).await?;
        invalidate::invalidate_response_uri(self.storage.as_ref(), &uri, &parts.headers, parts.status, &self.config).await?;

        let response_cc = header_str(&parts.headers, "cache-control").map(ResponseCacheControl::parse).unwrap_or_default();
        let has_expires = parts.headers.contains_key("expires");
        let cacheable_method = suitability::is_cacheable_method(&method);
        // `IgnoreRules` caches every cacheable-method 2xx response regardless
        // of what the response's own `Cache-Control` says (§11 "supplemented
        // features"); it still honors the request's own `no-store`.
        let storable = !request_cc.no_store
            && cacheable_method
            && if matches!(mode, CacheMode::IgnoreRules) {
                parts.status.is_success()
            } else {
                !response_cc.forbids_storage(self.config.shared_cache)
                    && is_cacheable_response_status(parts.status, &response_cc, has_expires)
            };

        let mut response_headers: Vec<(String, String)> = parts
            .headers
            .iter()
            .filter_map(|(n, v)| v.to_str().ok().map(|v| (n.as_str().to_string(), v.to_string())))
            .collect();
        strip_1xx_warnings(&mut response_headers);

        let mut entry_opt = None;
        if storable {
            match self.resources.create(&uri.to_string(), &body, self.config.max_object_size) {
                Ok(resource) => {
                    let now = SystemTime::now();
                    let request_date = prior.as_ref().map(|(e, _)| e.request_date).unwrap_or(now);
                    let base = CacheEntry {
                        request_method: method.clone(),
                        request_uri: canonical_key(&uri)?,
                        status: parts.status,
                        response_headers,
                        resource: Some(resource),
                        request_date,
                        response_date: now,
                        vary_fields: Vec::new(),
                        variant_map: Vec::new(),
                    };

                    if vary_is_star(&parts.headers) {
                        self.storage.remove(&base.request_uri).await?;
                    } else {
                        let vary_fields = parse_vary(&parts.headers);
                        if vary_fields.is_empty() {
                            self.storage.put(base.request_uri.clone(), base.clone()).await?;
                            entry_opt = Some(Arc::new(base));
                        } else {
                            let root_key = base.request_uri.clone();
                            let existing_root = self.storage.get(&root_key).await?;
                            let (root, composite) = variant::fold_variant(
                                &root_key,
                                existing_root.as_deref().cloned(),
                                vary_fields,
                                &parts.headers,
                                &base,
                            );
                            self.storage
                                .atomic_update(&root_key, &move |_| Some(root.clone()))
                                .await?;
                            self.storage.put(composite, base.clone()).await?;
                            entry_opt = Some(Arc::new(base));
                        }
                    }
                }
                Err(CacheError::ResourceTooLarge { size, max }) => {
                    debug!("response body of {size} bytes exceeds max_object_size {max}; bypassing store");
                }
                Err(e) => return Err(e),
            }
        }

        let status = if prior.is_some() {
            CacheResponseStatus::Validated
        } else if storable {
            CacheResponseStatus::CacheMiss
        } else {
            CacheResponseStatus::CacheMiss
        };

        let out = Response::from_parts(parts, body);
        Ok((
            out,
            CacheExecutionContext {
                cache_response_status: status,
                request_cache_control: request_cc,
                response_cache_control: Some(response_cc),
                entry: entry_opt,
                lookup_hit,
            },
        ))
    }
}

/// The task body spawned by [`Cache::schedule_background_revalidation`]:
/// replays a conditional request against the transport out-of-band and
/// updates `storage_key` in place, either via a 304 merge or by storing a
/// wholly fresh response. Failures (transport error, non-cacheable
/// refresh, oversized body) are logged and leave the stale entry as-is for
/// the next caller to pick up (§4.M / §5's "abandoned on close()").
async fn background_revalidate<S, R, T>(
    storage: Arc<S>,
    resources: Arc<R>,
    transport: Arc<T>,
    config: CacheConfig,
    storage_key: String,
    entry: Arc<CacheEntry>,
) where
    S: Storage + 'static,
    R: ResourceFactory + 'static,
    T: Transport + 'static,
{
    let uri: Uri = match entry.request_uri.parse() {
        Ok(uri) => uri,
        Err(e) => {
            warn!("background revalidation: stored key {} is not a valid uri: {e}", entry.request_uri);
            return;
        }
    };
    let (mut parts, _) = Request::builder().method(entry.request_method.clone()).uri(uri).body(()).expect("stored method/uri were already valid").into_parts();
    conditional::build_conditional(&mut parts, &entry);
    let request = Request::from_parts(parts, Bytes::new());

    let request_date = SystemTime::now();
    let response = match transport.execute(request).await {
        Ok(response) => response,
        Err(e) => {
            warn!("background revalidation transport call failed: {e}");
            return;
        }
    };

    if response.status() == StatusCode::NOT_MODIFIED {
        let response_date = SystemTime::now();
        let (fresh_parts, _) = response.into_parts();
        let merged = conditional::merge_304(&entry, &fresh_parts, request_date, response_date);
        if let Err(e) = storage.put(storage_key, merged).await {
            warn!("background revalidation: failed to store merged 304: {e}");
        }
        return;
    }

    let (parts, body) = response.into_parts();
    let response_cc = header_str(&parts.headers, "cache-control").map(ResponseCacheControl::parse).unwrap_or_default();
    let has_expires = parts.headers.contains_key("expires");
    if response_cc.forbids_storage(config.shared_cache) || !is_cacheable_response_status(parts.status, &response_cc, has_expires) {
        debug!("background revalidation response is not cacheable; leaving stale entry in place");
        return;
    }

    let mut response_headers: Vec<(String, String)> = parts
        .headers
        .iter()
        .filter_map(|(n, v)| v.to_str().ok().map(|v| (n.as_str().to_string(), v.to_string())))
        .collect();
    strip_1xx_warnings(&mut response_headers);

    match resources.create(&entry.request_uri, &body, config.max_object_size) {
        Ok(resource) => {
            let fresh_entry = CacheEntry {
                request_method: entry.request_method.clone(),
                request_uri: entry.request_uri.clone(),
                status: parts.status,
                response_headers,
                resource: Some(resource),
                request_date,
                response_date: SystemTime::now(),
                vary_fields: entry.vary_fields.clone(),
                variant_map: entry.variant_map.clone(),
            };
            if let Err(e) = storage.put(storage_key, fresh_entry).await {
                warn!("background revalidation: failed to store refreshed entry: {e}");
            }
        }
        Err(CacheError::ResourceTooLarge { size, max }) => {
            debug!("background revalidation response of {size} bytes exceeds max_object_size {max}; leaving stale entry in place");
        }
        Err(e) => {
            warn!("background revalidation: resource creation failed: {e}");
        }
    }
}

/// Builds the caller-facing response from a stored entry, adding the
/// synthesized `Age` header (§3) and any `extra_warnings` (§11
/// "supplemented features": 113 heuristic-expiration, 112
/// disconnected-operation).
fn build_response(entry: &CacheEntry, age: &AgeInfo, extra_warnings: &[&str]) -> Result<Response<Bytes>> {
    let mut builder = Response::builder().status(entry.status);
    for (name, value) in &entry.response_headers {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name.as_str()), HeaderValue::from_str(value)) {
            builder = builder.header(name, value);
        }
    }
    builder = builder.header("age", age.current_age.as_secs().to_string());
    for warning in extra_warnings {
        builder = builder.header("warning", *warning);
    }
    let body = entry
        .resource
        .as_ref()
        .map(|r| r.read_to_bytes())
        .transpose()?
        .unwrap_or_default();
    Ok(builder.body(body)?)
}

/// Builds the stale-served response for `entry` if `stale-if-error`
/// applies (§4.N), shared by the transport-error and server-error
/// revalidation branches. Returns `Ok(None)` when the window doesn't apply
/// (caller should propagate/store the real response instead).
fn stale_if_error_response(
    entry: &CacheEntry,
    response_cc: Option<&ResponseCacheControl>,
    request_cc: &RequestCacheControl,
    age: Option<AgeInfo>,
    shared_cache: bool,
) -> Result<Option<Response<Bytes>>> {
    let Some(sie) = response_cc.and_then(|cc| validity::sie_window(request_cc, cc)) else {
        return Ok(None);
    };
    let Some(age) = age else {
        return Ok(None);
    };
    if age.staleness() > sie {
        return Ok(None);
    }
    let mut warnings = response_warnings(entry, response_cc, &age, shared_cache);
    warnings.push(WARNING_112_DISCONNECTED_OPERATION);
    Ok(Some(build_response(entry, &age, &warnings)?))
}

/// Extra `Warning` header values to stamp onto a response served from
/// `entry` (§11 "supplemented features"): currently just 113
/// heuristic-expiration; 112 disconnected-operation is added separately by
/// the stale-if-error caller.
fn response_warnings(
    entry: &CacheEntry,
    response_cc: Option<&ResponseCacheControl>,
    age: &AgeInfo,
    shared_cache: bool,
) -> Vec<&'static str> {
    let explicit = response_cc.map(|cc| validity::has_explicit_lifetime(cc, entry, shared_cache)).unwrap_or(false);
    if validity::heuristic_warning_applies(age, explicit) {
        vec![WARNING_113_HEURISTIC_EXPIRATION]
    } else {
        Vec::new()
    }
}

fn local_response(status: StatusCode) -> Response<Bytes> {
    Response::builder().status(status).body(Bytes::new()).expect("static local response is always valid")
}

/// Stamps `x-cache`/`x-cache-lookup` per [`crate::HitOrMiss`], mirroring
/// `http-cache`'s `cache_status`/`cache_lookup_status` on `HttpResponse`.
fn stamp_cache_status_headers(mut response: Response<Bytes>, ctx: &CacheExecutionContext) -> Response<Bytes> {
    use crate::{HitOrMiss, X_CACHE, X_CACHE_LOOKUP};
    let served_from_cache = matches!(
        ctx.cache_response_status,
        CacheResponseStatus::CacheHit | CacheResponseStatus::CacheModuleResponse
    );
    let x_cache = if served_from_cache { HitOrMiss::Hit } else { HitOrMiss::Miss };
    let x_cache_lookup = if ctx.lookup_hit { HitOrMiss::Hit } else { HitOrMiss::Miss };
    if let (Ok(name), Ok(value)) = (HeaderName::try_from(X_CACHE), HeaderValue::from_str(&x_cache.to_string())) {
        response.headers_mut().insert(name, value);
    }
    if let (Ok(name), Ok(value)) = (HeaderName::try_from(X_CACHE_LOOKUP), HeaderValue::from_str(&x_cache_lookup.to_string())) {
        response.headers_mut().insert(name, value);
    }
    response
}

fn failure_context(request: &Request<Bytes>, overrides: &RequestCacheOverrides) -> CacheExecutionContext {
    let cc = overrides.apply(
        header_str(request.headers(), "cache-control").map(RequestCacheControl::parse).unwrap_or_default(),
    );
    CacheExecutionContext {
        cache_response_status: CacheResponseStatus::Failure,
        request_cache_control: cc,
        response_cache_control: None,
        entry: None,
        lookup_hit: false,
    }
}

/// A helper to stamp the request URI used for a response onto its
/// `http::response::Parts` extensions, since `http::Response` itself
/// doesn't retain the URI that produced it. Transport implementations
/// should call this before returning, or `Cache::execute` falls back to
/// re-deriving the key from the *request's* URI (correct for same-URI
/// round trips, which is the common case).
pub fn stamp_request_uri(mut response: Response<Bytes>, uri: Uri) -> Response<Bytes> {
    response.extensions_mut().insert(uri);
    response
}
