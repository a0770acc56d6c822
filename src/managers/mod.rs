//! Durable [`Storage`](crate::storage::Storage) backends (§11 "supplemented
//! features": `storage-disk` and `storage-moka`).
//!
//! Both backends serialize a private DTO rather than `CacheEntry` directly,
//! the same split the teacher's `managers/cacache.rs` and `managers/moka.rs`
//! draw between their wire `Store` struct and the in-memory `HttpResponse`.

#[cfg(any(feature = "storage-disk", feature = "storage-moka"))]
mod wire;

#[cfg(feature = "storage-disk")]
pub mod disk;

#[cfg(feature = "storage-moka")]
pub mod bounded;

#[cfg(feature = "storage-disk")]
pub use disk::DiskStorage;

#[cfg(feature = "storage-moka")]
pub use bounded::MokaStorage;
