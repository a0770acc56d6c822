//! Resource factory & resource (§4.E).
//!
//! A `Resource` is an opaque, reference-counted handle to a stored response
//! body. Two backings are provided: in-memory (bytes held directly) and
//! file-backed (spooled to a temp file, unlinked on last drop) — the same
//! buffered/file split the teacher's `body.rs` draws between its
//! `StreamingBody` variants, generalized here to the storage-facing
//! contract §4.E specifies rather than an `http_body::Body` impl.

use std::fs::File;
use std::io::{self, Cursor, Read, Write as _};
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{CacheError, Result};

/// A readable view over a resource's bytes. Holding one keeps the
/// underlying resource alive even if storage removes the entry that
/// referenced it (§5 "reader obtains a stream that holds a resource
/// ownership token for its lifetime").
pub enum ResourceReader {
    Memory(Cursor<Bytes>),
    File(File),
}

impl Read for ResourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            ResourceReader::Memory(c) => c.read(buf),
            ResourceReader::File(f) => f.read(buf),
        }
    }
}

#[derive(Debug)]
enum Inner {
    Memory(Bytes),
    File { path: std::path::PathBuf, len: u64, _guard: tempfile::TempPath },
}

impl Drop for Inner {
    fn drop(&mut self) {
        // `TempPath`'s own `Drop` unlinks the file; nothing else to do.
    }
}

/// A handle to a stored body. Cheap to clone (`Arc`); the body is released
/// when the last clone is dropped, which is also when `ResourceFactory`'s
/// explicit `dispose` takes effect for callers that prefer not to wait on
/// scope exit.
#[derive(Debug, Clone)]
pub struct Resource(Arc<Inner>);

impl Resource {
    pub fn len(&self) -> u64 {
        match &*self.0 {
            Inner::Memory(b) => b.len() as u64,
            Inner::File { len, .. } => *len,
        }
    }

    pub fn open(&self) -> Result<ResourceReader> {
        match &*self.0 {
            Inner::Memory(b) => Ok(ResourceReader::Memory(Cursor::new(b.clone()))),
            Inner::File { path, .. } => Ok(ResourceReader::File(File::open(path)?)),
        }
    }

    /// Number of live handles (including this one) sharing the underlying
    /// body. A managed storage's disposal queue uses this to tell whether
    /// any reader token is still open on a resource it replaced.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }

    pub fn read_to_bytes(&self) -> Result<Bytes> {
        match &*self.0 {
            Inner::Memory(b) => Ok(b.clone()),
            Inner::File { .. } => {
                let mut buf = Vec::with_capacity(self.len() as usize);
                self.open()?.read_to_end(&mut buf)?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

/// Where a newly-created resource's bytes should live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceBacking {
    Memory,
    File,
}

/// Allocates and disposes resources, enforcing `max_object_size` without
/// ever publishing a partially-stored body (§4.E contract).
pub trait ResourceFactory: Send + Sync {
    fn create(&self, key: &str, bytes: &[u8], max_bytes: u64) -> Result<Resource>;

    /// Drops the handle. With the `Arc`-backed `Resource` above this is
    /// equivalent to letting the last clone go out of scope; kept as an
    /// explicit method so callers (and storage backends) don't need to
    /// know that detail.
    fn dispose(&self, _resource: Resource) {}
}

/// Default in-memory backing: the body is copied into an `Arc<Bytes>`-like
/// handle; `dispose` just drops the reference.
#[derive(Debug, Default, Clone, Copy)]
pub struct MemoryResourceFactory;

impl ResourceFactory for MemoryResourceFactory {
    fn create(&self, key: &str, bytes: &[u8], max_bytes: u64) -> Result<Resource> {
        if bytes.len() as u64 > max_bytes {
            return Err(CacheError::ResourceTooLarge { size: bytes.len() as u64, max: max_bytes });
        }
        let _ = key;
        Ok(Resource(Arc::new(Inner::Memory(Bytes::copy_from_slice(bytes)))))
    }
}

/// File-backed resource factory: spools bodies to a temp file under `dir`,
/// unlinked when the last `Resource` clone drops.
#[derive(Debug, Clone)]
pub struct FileResourceFactory {
    pub dir: std::path::PathBuf,
}

impl Default for FileResourceFactory {
    fn default() -> Self {
        Self { dir: std::env::temp_dir() }
    }
}

impl ResourceFactory for FileResourceFactory {
    fn create(&self, key: &str, bytes: &[u8], max_bytes: u64) -> Result<Resource> {
        if bytes.len() as u64 > max_bytes {
            return Err(CacheError::ResourceTooLarge { size: bytes.len() as u64, max: max_bytes });
        }
        let _ = key;
        let mut file = tempfile::NamedTempFile::new_in(&self.dir)?;
        file.write_all(bytes)?;
        file.flush()?;
        let len = bytes.len() as u64;
        let (_file, path) = file.into_parts();
        Ok(Resource(Arc::new(Inner::File { path: path.to_path_buf(), len, _guard: path })))
    }
}
