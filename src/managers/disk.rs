//! `storage-disk`: disk-durable storage via `cacache`.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entry::CacheEntry;
use crate::error::Result;
use crate::resource::{FileResourceFactory, ResourceFactory};
use crate::storage::{Storage, UpdateOutcome};

use super::wire::StoredEntry;

/// Disk-durable [`Storage`] backed by [`cacache`], content-addressed under
/// `path`. Bodies are recreated through `R` on read rather than served
/// straight out of cacache's own blob store, so callers can still choose a
/// [`crate::resource::MemoryResourceFactory`] if they'd rather keep bodies
/// resident once loaded.
pub struct DiskStorage<R = FileResourceFactory> {
    path: PathBuf,
    factory: R,
}

impl DiskStorage<FileResourceFactory> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), factory: FileResourceFactory::default() }
    }
}

impl<R: ResourceFactory> DiskStorage<R> {
    pub fn with_resource_factory(path: impl Into<PathBuf>, factory: R) -> Self {
        Self { path: path.into(), factory }
    }

    /// Clears every entry cacache knows about under `path`.
    pub async fn clear(&self) -> Result<()> {
        cacache::clear(&self.path).await?;
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Option<CacheEntry>> {
        let bytes = match cacache::read(&self.path, key).await {
            Ok(bytes) => bytes,
            Err(_) => return Ok(None),
        };
        let stored: StoredEntry = postcard::from_bytes(&bytes)?;
        Ok(Some(stored.into_entry(&self.factory, key)?))
    }

    async fn write(&self, key: &str, entry: &CacheEntry) -> Result<()> {
        let stored = StoredEntry::from_entry(entry)?;
        let bytes = postcard::to_allocvec(&stored)?;
        cacache::write(&self.path, key, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl<R: ResourceFactory> Storage for DiskStorage<R> {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>> {
        Ok(self.read(key).await?.map(Arc::new))
    }

    async fn put(&self, key: String, entry: CacheEntry) -> Result<()> {
        self.write(&key, &entry).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        cacache::remove(&self.path, key).await?;
        Ok(())
    }

    /// cacache has no native compare-and-swap, so this is a plain
    /// read-transform-write rather than the in-memory backend's shard-lock
    /// CAS; the teacher's own cacache manager never attempts one either.
    async fn atomic_update(
        &self,
        key: &str,
        transform: &(dyn Fn(Option<Arc<CacheEntry>>) -> Option<CacheEntry> + Send + Sync),
    ) -> Result<UpdateOutcome> {
        let current = self.get(key).await?;
        match transform(current) {
            Some(new_entry) => {
                self.write(key, &new_entry).await?;
                Ok(UpdateOutcome::Published(Arc::new(new_entry)))
            }
            None => {
                self.remove(key).await?;
                Ok(UpdateOutcome::Removed)
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resource::MemoryResourceFactory;
    use http::{Method, StatusCode};
    use std::time::SystemTime;

    fn entry(uri: &str) -> CacheEntry {
        CacheEntry {
            request_method: Method::GET,
            request_uri: uri.to_string(),
            status: StatusCode::OK,
            response_headers: vec![("etag".into(), "\"v1\"".into())],
            resource: Some(MemoryResourceFactory.create("k", b"hello", 1024).unwrap()),
            request_date: SystemTime::now(),
            response_date: SystemTime::now(),
            vary_fields: Vec::new(),
            variant_map: Vec::new(),
        }
    }

    #[tokio::test]
    async fn put_then_get_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::with_resource_factory(dir.path(), MemoryResourceFactory);
        storage.put("k".into(), entry("http://example.com/x")).await.unwrap();

        let got = storage.get("k").await.unwrap().unwrap();
        assert_eq!(got.request_uri, "http://example.com/x");
        assert_eq!(got.header("etag"), Some("\"v1\""));
        assert_eq!(got.resource.as_ref().unwrap().read_to_bytes().unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn remove_clears_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::with_resource_factory(dir.path(), MemoryResourceFactory);
        storage.put("k".into(), entry("http://example.com/x")).await.unwrap();
        storage.remove("k").await.unwrap();
        assert!(storage.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn atomic_update_on_vacant_key_inserts() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DiskStorage::with_resource_factory(dir.path(), MemoryResourceFactory);
        let outcome = storage
            .atomic_update("k", &|cur: Option<Arc<CacheEntry>>| {
                assert!(cur.is_none());
                Some(entry("http://example.com/x"))
            })
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Published(_)));
    }
}
