// Tracker Store - Concurrent entity_id -> EntityTracker map
// Get-or-create is atomic per key; entries live for the process lifetime

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::indicators::{EntityTracker, IndicatorError};

/// Handle to one entity's tracker. The mutex makes a fast+slow update atomic.
pub type SharedTracker = Arc<Mutex<EntityTracker>>;

/// Statistics snapshot from the tracker store
#[derive(Debug, Clone)]
pub struct TrackerStoreStats {
    pub trackers: usize,
    pub ready_trackers: usize,
    pub trackers_created: u64,
    pub lookups: u64,
}

impl fmt::Display for TrackerStoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TrackerStore(trackers={}, ready={}, created={}, lookups={})",
            self.trackers, self.ready_trackers, self.trackers_created, self.lookups
        )
    }
}

/// Thread-safe store of per-entity trackers
pub struct TrackerStore<K> {
    trackers: DashMap<K, SharedTracker>,

    trackers_created: AtomicU64,
    lookups: AtomicU64,
}

impl<K> TrackerStore<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            trackers: DashMap::new(),
            trackers_created: AtomicU64::new(0),
            lookups: AtomicU64::new(0),
        }
    }

    /// Return the tracker for `entity_id`, creating it with the given windows
    /// if absent.
    ///
    /// The windows only matter on creation; an existing tracker keeps its own
    /// configuration. Construction runs while the key's shard is locked, so
    /// racing callers for one key all receive the same tracker.
    pub fn get_or_create(
        &self,
        entity_id: &K,
        fast_window: usize,
        slow_window: usize,
    ) -> Result<SharedTracker, IndicatorError> {
        self.lookups.fetch_add(1, Ordering::Relaxed);

        if let Some(existing) = self.trackers.get(entity_id) {
            return Ok(Arc::clone(existing.value()));
        }

        match self.trackers.entry(entity_id.clone()) {
            Entry::Occupied(entry) => Ok(Arc::clone(entry.get())),
            Entry::Vacant(entry) => {
                let tracker = Arc::new(Mutex::new(EntityTracker::new(fast_window, slow_window)?));
                entry.insert(Arc::clone(&tracker));
                self.trackers_created.fetch_add(1, Ordering::Relaxed);
                debug!(
                    entity = ?entity_id,
                    fast_window = fast_window,
                    slow_window = slow_window,
                    "Tracker created"
                );
                Ok(tracker)
            }
        }
    }

    pub fn get(&self, entity_id: &K) -> Option<SharedTracker> {
        self.trackers.get(entity_id).map(|entry| Arc::clone(entry.value()))
    }

    pub fn contains(&self, entity_id: &K) -> bool {
        self.trackers.contains_key(entity_id)
    }

    pub fn len(&self) -> usize {
        self.trackers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }

    /// Number of trackers whose indicators are both ready
    pub fn ready_count(&self) -> usize {
        self.snapshot()
            .iter()
            .filter(|(_, tracker)| tracker.lock().is_ready())
            .count()
    }

    /// Clone out every `(entity_id, tracker)` pair. No shard lock is held once
    /// this returns, so callers may lock trackers freely.
    pub fn snapshot(&self) -> Vec<(K, SharedTracker)> {
        self.trackers
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect()
    }

    pub fn get_stats(&self) -> TrackerStoreStats {
        TrackerStoreStats {
            trackers: self.len(),
            ready_trackers: self.ready_count(),
            trackers_created: self.trackers_created.load(Ordering::Relaxed),
            lookups: self.lookups.load(Ordering::Relaxed),
        }
    }
}

impl<K> Default for TrackerStore<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> fmt::Display for TrackerStore<K>
where
    K: Eq + Hash + Clone + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get_stats())
    }
}
