//! Storage abstraction (§4.F).
//!
//! `DashMap` gives per-shard locking, so `InMemoryStorage::atomic_update`
//! holding a shard's `Entry` for the duration of `transform` is a true
//! compare-and-publish: no other writer for the same key can observe or
//! replace the value mid-transform. This is the same sharded-lock trade the
//! teacher's `Cargo.toml` stack reaches for (`dashmap` is already a direct
//! dependency) instead of a hand-rolled atomic-pointer CAS loop.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use dashmap::mapref::entry::Entry as DashEntry;
use dashmap::DashMap;
use log::{debug, warn};

use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};

/// Outcome of an [`Storage::atomic_update`] call.
#[derive(Debug, Clone)]
pub enum UpdateOutcome {
    /// The transform published a new entry.
    Published(Arc<CacheEntry>),
    /// The transform removed the entry (returned `None`).
    Removed,
}

/// §4.F's storage contract. Implementors must provide the atomic-update
/// semantics the variant-map invariants (§4.J, §5) depend on.
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>>;

    async fn put(&self, key: String, entry: CacheEntry) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;

    /// Loads the current entry (if any), applies `transform`, and publishes
    /// the result. `transform` must be pure with respect to anything but
    /// its input, since a backend that *does* need to retry (unlike the
    /// in-memory one below) may invoke it more than once.
    async fn atomic_update(
        &self,
        key: &str,
        transform: &(dyn Fn(Option<Arc<CacheEntry>>) -> Option<CacheEntry> + Send + Sync),
    ) -> Result<UpdateOutcome>;
}

/// The in-memory storage backend (§4.F, §2's "in-memory" column).
#[derive(Default)]
pub struct InMemoryStorage {
    map: DashMap<String, Arc<CacheEntry>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }
}

#[async_trait::async_trait]
impl Storage for InMemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>> {
        Ok(self.map.get(key).map(|e| e.clone()))
    }

    async fn put(&self, key: String, entry: CacheEntry) -> Result<()> {
        self.map.insert(key, Arc::new(entry));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    async fn atomic_update(
        &self,
        key: &str,
        transform: &(dyn Fn(Option<Arc<CacheEntry>>) -> Option<CacheEntry> + Send + Sync),
    ) -> Result<UpdateOutcome> {
        match self.map.entry(key.to_string()) {
            DashEntry::Occupied(mut occupied) => {
                let current = Some(occupied.get().clone());
                match transform(current) {
                    Some(new_entry) => {
                        let published = Arc::new(new_entry);
                        occupied.insert(published.clone());
                        Ok(UpdateOutcome::Published(published))
                    }
                    None => {
                        occupied.remove();
                        Ok(UpdateOutcome::Removed)
                    }
                }
            }
            DashEntry::Vacant(vacant) => match transform(None) {
                Some(new_entry) => {
                    let published = Arc::new(new_entry);
                    vacant.insert(published.clone());
                    Ok(UpdateOutcome::Published(published))
                }
                None => Ok(UpdateOutcome::Removed),
            },
        }
    }
}

/// Wraps any [`Storage`] with the "managed" lifecycle §4.F describes:
/// soft-tracked disposal of replaced/removed resources, and a `close()` that
/// makes all further operations fail with [`CacheError::CacheDisabled`].
pub struct ManagedStorage<S> {
    inner: S,
    active: AtomicBool,
    disposed: Mutex<VecDeque<crate::resource::Resource>>,
}

impl<S: Storage> ManagedStorage<S> {
    pub fn new(inner: S) -> Self {
        Self { inner, active: AtomicBool::new(true), disposed: Mutex::new(VecDeque::new()) }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.active.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(CacheError::CacheDisabled)
        }
    }

    /// Enqueues a soft reference to a resource that a transform just
    /// replaced or removed. The resource itself stays alive as long as any
    /// reader's token (a cloned `Resource`) outlives this queue entry;
    /// `reap` only drops queue entries once they're the queue's own last
    /// reference.
    fn track_disposed(&self, entry: &CacheEntry) {
        if let Some(resource) = &entry.resource {
            self.disposed.lock().unwrap().push_back(resource.clone());
        }
    }

    /// Releases any queued resource whose only remaining strong reference
    /// is this queue's own, i.e. no reader token is still open on it.
    pub fn reap(&self) {
        let mut queue = self.disposed.lock().unwrap();
        queue.retain(|r| r.strong_count() > 1);
    }

    /// Disposes every resource this store still knows about and marks it
    /// inactive; subsequent operations fail with `CACHE_DISABLED`.
    pub fn close(&self) {
        self.active.store(false, Ordering::Release);
        self.disposed.lock().unwrap().clear();
        debug!("managed storage closed");
    }
}

#[async_trait::async_trait]
impl<S: Storage> Storage for ManagedStorage<S> {
    async fn get(&self, key: &str) -> Result<Option<Arc<CacheEntry>>> {
        self.ensure_active()?;
        match self.inner.get(key).await {
            Ok(v) => Ok(v),
            Err(e) if e.is_storage_io() => {
                warn!("storage read failed, downgrading to MISS: {e}");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn put(&self, key: String, entry: CacheEntry) -> Result<()> {
        self.ensure_active()?;
        self.inner.put(key, entry).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.ensure_active()?;
        if let Some(old) = self.inner.get(key).await? {
            self.track_disposed(&old);
        }
        self.inner.remove(key).await
    }

    async fn atomic_update(
        &self,
        key: &str,
        transform: &(dyn Fn(Option<Arc<CacheEntry>>) -> Option<CacheEntry> + Send + Sync),
    ) -> Result<UpdateOutcome> {
        self.ensure_active()?;
        let before = self.inner.get(key).await?;
        let outcome = self.inner.atomic_update(key, transform).await?;
        if let Some(before) = before {
            self.track_disposed(&before);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::resource::{MemoryResourceFactory, ResourceFactory};
    use http::{Method, StatusCode};
    use std::time::SystemTime;

    fn sample(uri: &str) -> CacheEntry {
        CacheEntry {
            request_method: Method::GET,
            request_uri: uri.to_string(),
            status: StatusCode::OK,
            response_headers: Vec::new(),
            resource: Some(MemoryResourceFactory.create("k", b"A", 1024).unwrap()),
            request_date: SystemTime::now(),
            response_date: SystemTime::now(),
            vary_fields: Vec::new(),
            variant_map: Vec::new(),
        }
    }

    #[tokio::test]
    async fn put_then_get_observes_the_same_entry() {
        let storage = InMemoryStorage::new();
        storage.put("k".into(), sample("k")).await.unwrap();
        let got = storage.get("k").await.unwrap().unwrap();
        assert_eq!(got.request_uri, "k");
    }

    #[tokio::test]
    async fn atomic_update_on_vacant_key_inserts() {
        let storage = InMemoryStorage::new();
        let outcome = storage
            .atomic_update("k", &|cur: Option<Arc<CacheEntry>>| {
                assert!(cur.is_none());
                Some(sample("k"))
            })
            .await
            .unwrap();
        assert!(matches!(outcome, UpdateOutcome::Published(_)));
    }

    #[tokio::test]
    async fn atomic_update_returning_none_removes() {
        let storage = InMemoryStorage::new();
        storage.put("k".into(), sample("k")).await.unwrap();
        let outcome = storage.atomic_update("k", &|_| None).await.unwrap();
        assert!(matches!(outcome, UpdateOutcome::Removed));
        assert!(storage.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn managed_storage_rejects_operations_after_close() {
        let managed = ManagedStorage::new(InMemoryStorage::new());
        managed.close();
        let err = managed.get("k").await.unwrap_err();
        assert!(matches!(err, CacheError::CacheDisabled));
    }
}
