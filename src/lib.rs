#![forbid(unsafe_code)]
#![warn(future_incompatible, nonstandard_style, unused_import_braces)]
//! An RFC 9111 compliant HTTP caching core.
//!
//! This crate implements the protocol-accurate parts of HTTP caching that sit
//! between an HTTP client engine and arbitrary origin servers: the
//! cache-control state machine, freshness/age arithmetic, conditional
//! revalidation, `Vary`-based variant selection, request collapsing for
//! asynchronous revalidation, and storage-level invalidation. The HTTP
//! transport itself, multipart body encoding, authentication, and
//! metrics/tracing wrappers are explicitly out of scope and are consumed (or
//! supplied) through the [`Transport`] and [`Storage`] collaborator traits.
//!
//! The entry point is [`Cache::execute`], which drives the
//! `PRE_CHECK -> LOOKUP -> CLASSIFY -> {HIT, REVALIDATE, MISS, UNCACHEABLE}
//! -> TRANSPORT -> STORE_OR_MERGE -> INVALIDATE -> RETURN` state machine
//! around one request.
//!
//! ```
//! use bytes::Bytes;
//! use http::{Method, Request, Response};
//! use http_cache_core::{Cache, CacheConfig, CacheMode, RequestCacheOverrides, Result, Transport};
//! use http_cache_core::storage::InMemoryStorage;
//! use http_cache_core::resource::MemoryResourceFactory;
//!
//! struct Origin;
//!
//! #[async_trait::async_trait]
//! impl Transport for Origin {
//!     async fn execute(&self, _request: Request<Bytes>) -> Result<Response<Bytes>> {
//!         Ok(Response::builder()
//!             .status(200)
//!             .header("cache-control", "max-age=60")
//!             .body(Bytes::from_static(b"hello"))?)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<()> {
//! let cache = Cache::new(InMemoryStorage::new(), MemoryResourceFactory, Origin, CacheConfig::default());
//! let request = Request::builder().method(Method::GET).uri("http://example.com/").body(Bytes::new())?;
//! let (_response, ctx) = cache.execute(request, RequestCacheOverrides::default(), CacheMode::Default).await?;
//! assert_eq!(ctx.cache_response_status, http_cache_core::CacheResponseStatus::CacheMiss);
//! # Ok(())
//! # }
//! ```

pub mod cache_control;
pub mod compliance;
pub mod conditional;
pub mod config;
pub mod entry;
pub mod error;
pub mod headers;
pub mod invalidate;
pub mod key;
pub mod managers;
pub mod orchestrator;
pub mod resource;
pub mod revalidator;
pub mod storage;
pub mod suitability;
pub mod validity;
pub mod variant;

pub use cache_control::{RequestCacheControl, ResponseCacheControl};
pub use config::{CacheConfig, CacheMode, RequestCacheOverrides};
pub use entry::CacheEntry;
pub use error::{CacheError, Result};
pub use orchestrator::{Cache, CacheExecutionContext, CacheResponseStatus, Transport};
pub use resource::{Resource, ResourceFactory};
pub use revalidator::AsyncRevalidator;
pub use storage::{ManagedStorage, Storage, UpdateOutcome};

/// `x-cache` response header: `HIT` if the response was served from the
/// cache, `MISS` if the transport was called (§11 "supplemented features").
pub const X_CACHE: &str = "x-cache";
/// `x-cache-lookup` response header: `HIT` if an entry existed in storage
/// for this request at all (even if it then had to be revalidated), `MISS`
/// otherwise.
pub const X_CACHE_LOOKUP: &str = "x-cache-lookup";

/// The value written into [`X_CACHE`] / [`X_CACHE_LOOKUP`], matching the
/// teacher's `HitOrMiss` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitOrMiss {
    /// A matching entry was found (storage lookup) or served (response).
    Hit,
    /// No matching entry was found, or the transport had to be called.
    Miss,
}

impl std::fmt::Display for HitOrMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            HitOrMiss::Hit => "HIT",
            HitOrMiss::Miss => "MISS",
        })
    }
}
