//! Per-entity mutual exclusion.
//!
//! Each task, checklist and worker id maps to its own async mutex, created on first
//! use and dropped again when the last holder or waiter releases it. Holding
//! an [`EntityLock`] serializes the whole load-validate-persist sequence for
//! that entity; different entities never block each other.
//!
//! Lock order is always task before checklist.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Identity of a guarded entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Task(Uuid),
    Checklist(Uuid),
    Worker(Uuid),
}

/// Registry of per-entity mutexes.
#[derive(Debug, Default)]
pub struct EntityGuard {
    locks: DashMap<EntityKey, Arc<Mutex<()>>>,
}

impl EntityGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: EntityKey) -> EntityLock<'_> {
        let mutex = self
            .locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let held = match mutex.clone().try_lock_owned() {
            Ok(held) => held,
            Err(_) => {
                debug!(?key, "entity busy, waiting for lock");
                mutex.clone().lock_owned().await
            }
        };

        EntityLock {
            held: Some(held),
            mutex,
            key,
            guard: self,
        }
    }

    /// Number of entities with a live mutex (held or awaited).
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive access to one entity. Released on drop.
pub struct EntityLock<'a> {
    held: Option<OwnedMutexGuard<()>>,
    mutex: Arc<Mutex<()>>,
    key: EntityKey,
    guard: &'a EntityGuard,
}

impl EntityLock<'_> {
    pub fn key(&self) -> EntityKey {
        self.key
    }
}

impl Drop for EntityLock<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        // Two references left (the map's and ours) means nobody is waiting.
        self.guard
            .locks
            .remove_if(&self.key, |_, m| Arc::ptr_eq(m, &self.mutex) && Arc::strong_count(m) == 2);
    }
}
