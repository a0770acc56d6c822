//! Error taxonomy for the cache core.

use miette::Diagnostic;
use thiserror::Error;

/// A `Result` typedef to use with the [`CacheError`] type.
pub type Result<T> = std::result::Result<T, CacheError>;

/// Errors the cache core can raise. The orchestrator (§4.N) catches these at
/// its boundary and turns them into either a synthesized local response or a
/// transparent bypass; callers never see storage internals leak through.
#[derive(Error, Diagnostic, Debug)]
pub enum CacheError {
    /// Request is fatally non-compliant per the protocol pre-filter
    /// (§4.L) and must be rejected with a local 400.
    #[error("request rejected by protocol compliance pre-filter: {0}")]
    #[diagnostic(code(http_cache_core::protocol_rejected))]
    ProtocolRejected(String),

    /// The storage backend has been closed; operations on it fail until a
    /// new one is constructed (§4.F "managed" contract).
    #[error("cache storage is disabled or closed")]
    #[diagnostic(code(http_cache_core::cache_disabled))]
    CacheDisabled,

    /// A transient storage backend failure. Reads are downgraded to a
    /// MISS, writes are logged and dropped, per §7.
    #[error("storage I/O error: {0}")]
    #[diagnostic(code(http_cache_core::storage_io))]
    StorageIo(String),

    /// The response body exceeds `max_object_size`; the store is skipped
    /// but the body still streams through to the caller.
    #[error("response body of {size} bytes exceeds max_object_size of {max} bytes")]
    #[diagnostic(code(http_cache_core::resource_too_large))]
    ResourceTooLarge {
        /// Size the body actually was.
        size: u64,
        /// Configured ceiling it exceeded.
        max: u64,
    },

    /// The origin was unreachable through the transport collaborator. If
    /// `stale-if-error` applies the stored entry is served instead;
    /// otherwise this surfaces to the caller.
    #[error("transport failure: {0}")]
    #[diagnostic(code(http_cache_core::transport_failure))]
    TransportFailure(String),

    /// `only-if-cached` was requested and no usable entry was found; a
    /// local 504 is synthesized.
    #[error("only-if-cached: no cached response available")]
    #[diagnostic(code(http_cache_core::only_if_cached_miss))]
    OnlyIfCachedMiss,

    /// Error building or reading an `http` request/response.
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::http))]
    Http(#[from] http::Error),

    /// Error parsing an HTTP status code.
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::invalid_status_code))]
    InvalidStatusCode(#[from] http::status::InvalidStatusCode),

    /// Error converting a header value to a `str`.
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::header_to_str))]
    HeaderToStr(#[from] http::header::ToStrError),

    /// Error parsing an HTTP method.
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::invalid_method))]
    InvalidMethod(#[from] http::method::InvalidMethod),

    /// Error parsing a URI.
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::invalid_uri))]
    InvalidUri(#[from] http::uri::InvalidUri),

    /// Error parsing a URL during key canonicalization.
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::invalid_url))]
    InvalidUrl(#[from] url::ParseError),

    /// Error parsing a header value.
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::invalid_header_value))]
    InvalidHeaderValue(#[from] http::header::InvalidHeaderValue),

    /// Error parsing a header name.
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::invalid_header_name))]
    InvalidHeaderName(#[from] http::header::InvalidHeaderName),

    /// Error from the disk-durable storage backend.
    #[cfg(feature = "storage-disk")]
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::cacache))]
    CaCache(#[from] cacache::Error),

    /// Error (de)serializing a stored entry for a durable backend.
    #[cfg(any(feature = "storage-disk", feature = "storage-moka"))]
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::postcard))]
    Postcard(#[from] postcard::Error),

    /// I/O error from a file-backed resource.
    #[error(transparent)]
    #[diagnostic(code(http_cache_core::io))]
    Io(#[from] std::io::Error),
}

impl CacheError {
    /// True for errors that the orchestrator should downgrade to a MISS
    /// rather than surface to the caller (§7 `STORAGE_IO`).
    pub fn is_storage_io(&self) -> bool {
        matches!(self, CacheError::StorageIo(_))
    }
}
