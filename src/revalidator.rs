//! Async revalidator (§4.M): bounded-concurrency scheduler with per-key
//! request collapsing.

use std::collections::HashSet;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

#[derive(Default)]
struct Inflight(Mutex<HashSet<String>>);

impl Inflight {
    fn try_claim(&self, id: &str) -> bool {
        self.0.lock().unwrap().insert(id.to_string())
    }

    fn release(&self, id: &str) {
        self.0.lock().unwrap().remove(id);
    }
}

/// A bounded-concurrency scheduler for §4.N's "serve stale, revalidate in
/// the background" path. `(root_key, variant_key)` pairs are collapsed into
/// a single in-flight task id by the caller (typically the composite
/// storage key already identifies this uniquely).
pub struct AsyncRevalidator {
    inflight: Arc<Inflight>,
    semaphore: Arc<Semaphore>,
    closed: Arc<AtomicBool>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl AsyncRevalidator {
    /// `core` sizes the bounded pool; `max` is accepted for configuration
    /// symmetry with `asynchronous_workers_max` but this scheduler (unlike
    /// a thread pool) only needs one concurrency ceiling, so `max` acts as
    /// the effective cap when larger than `core`.
    pub fn new(core: usize, max: usize) -> Self {
        let capacity = core.max(max).max(1);
        Self {
            inflight: Arc::new(Inflight::default()),
            semaphore: Arc::new(Semaphore::new(capacity)),
            closed: Arc::new(AtomicBool::new(false)),
            handles: Mutex::new(Vec::new()),
        }
    }

    /// Schedules `task` to run after `delay`, identified by `id`. Returns
    /// `true` if actually scheduled; `false` if collapsed into an existing
    /// in-flight task, or rejected because the scheduler is closed or
    /// saturated (in which case `id` is NOT added to the in-flight set, so
    /// a later request can retry).
    pub fn schedule<F>(&self, id: String, delay: Duration, task: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            trace!("revalidation scheduling rejected: scheduler closed ({id})");
            return false;
        }
        if !self.inflight.try_claim(&id) {
            trace!("revalidation collapsed onto existing in-flight task ({id})");
            return false;
        }
        let permit = match self.semaphore.clone().try_acquire_owned() {
            Ok(permit) => permit,
            Err(_) => {
                warn!("revalidation pool saturated, not scheduling ({id})");
                self.inflight.release(&id);
                return false;
            }
        };

        let inflight = self.inflight.clone();
        let scheduled_id = id.clone();
        let handle = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            task.await;
            let _permit = permit;
            inflight.release(&scheduled_id);
            debug!("revalidation completed ({scheduled_id})");
        });
        self.handles.lock().unwrap().push(handle);
        true
    }

    /// Removes `id` from the in-flight set without running anything;
    /// exposed for callers that complete a revalidation through some path
    /// other than the spawned task itself (e.g. a synchronous short-circuit).
    pub fn mark_complete(&self, id: &str) {
        self.inflight.release(id);
    }

    pub fn is_scheduled(&self, id: &str) -> bool {
        self.inflight.0.lock().unwrap().contains(id)
    }

    /// Rejects new schedules and awaits outstanding tasks up to `deadline`.
    pub async fn close(&self, deadline: Duration) {
        self.closed.store(true, Ordering::Release);
        let handles: Vec<_> = std::mem::take(&mut *self.handles.lock().unwrap());
        let joined = tokio::time::timeout(deadline, futures::future::join_all(handles)).await;
        if joined.is_err() {
            warn!("async revalidator close() deadline elapsed with tasks still outstanding");
        }
    }
}
