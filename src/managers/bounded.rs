//! `storage-moka`: bounded in-memory storage via `moka::future::Cache`.

use std::sync::Arc;

use async_trait::async_trait;
use moka::future::Cache;

use crate::entry::CacheEntry;
use crate::error::Result;
use crate::resource::{MemoryResourceFactory, ResourceFactory};
use crate::storage::{Storage, UpdateOutcome};

use super::wire::StoredEntry;

/// Size-bounded storage backed by [`moka::future::Cache`], evicting by
/// entry count per `max_cache_entries` (§4.F). Entries are held as
/// serialized bytes rather than live `Resource` handles, so this backend
/// loses everything across a restart but never needs to track disposal the
/// way [`crate::storage::ManagedStorage`] does for the in-memory backend.
pub struct MokaStorage<R = MemoryResourceFactory> {
    cache: Cache<String, Arc<Vec<u8>>>,
    factory: R,
}

impl MokaStorage<MemoryResourceFactory> {
    pub fn new(max_cache_entries: u64) -> Self {
        Self { cache: Cache::new(max_cache_entries), factory: MemoryResourceFactory }
    }
}

impl<R: ResourceFactory> MokaStorage<R> {
    pub fn with_resource_factory(cache: Cache<String, Arc<Vec<u8>>>, factory: R) -> Self {
        Self { cache, factory }
    }

    pub async fn clear(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}

#[async_trait]
impl<R: ResourceFactory> Storage for MokaStorage<R> {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>> {
        let Some(bytes) = self.cache.get(key).await else {
            return Ok(None);
        };
        let stored: StoredEntry = postcard::from_bytes(&bytes)?;
        Ok(Some(Arc::new(stored.into_entry(&self.factory, key)?)))
    }

    async fn put(&self, key: String, entry: CacheEntry) -> Result<()> {
        let stored = StoredEntry::from_entry(&entry)?;
        let bytes = postcard::to_allocvec(&stored)?;
        self.cache.insert(key, Arc::new(bytes)).await;
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.cache.invalidate(key).await;
        self.cache.run_pending_tasks().await;
        Ok(())
    }

    async fn atomic_update(
        &self,
        key: &str,
        transform: &(dyn Fn(Option<Arc<CacheEntry>>) -> Option<CacheEntry> + Send + Sync),
    ) -> Result<UpdateOutcome> {
        let current = self.get(key).await?;
        match transform(current) {
            Some(new_entry) => {
                self.put(key.to_string(), new_entry.clone()).await?;
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
    async fn put_then_get_round_trips() {
        let storage = MokaStorage::new(100);
        storage.put("k".into(), entry("http://example.com/x")).await.unwrap();
        let got = storage.get("k").await.unwrap().unwrap();
        assert_eq!(got.request_uri, "http://example.com/x");
        assert_eq!(got.resource.as_ref().unwrap().read_to_bytes().unwrap().as_ref(), b"hello");
    }

    #[tokio::test]
    async fn entry_count_stays_within_capacity() {
        let storage = MokaStorage::new(1);
        storage.put("a".into(), entry("http://example.com/a")).await.unwrap();
        storage.put("b".into(), entry("http://example.com/b")).await.unwrap();
        storage.cache.run_pending_tasks().await;
        assert!(storage.cache.entry_count() <= 1);
    }

    #[tokio::test]
    async fn remove_clears_the_entry() {
        let storage = MokaStorage::new(10);
        storage.put("k".into(), entry("http://example.com/x")).await.unwrap();
        storage.remove("k").await.unwrap();
        assert!(storage.get("k").await.unwrap().is_none());
    }
}
