//! Element-handle cache (per session) and work-order result cache (shared).

use std::{
    collections::HashMap,
    sync::{
        Mutex, PoisonError,
        atomic::{AtomicU64, Ordering},
    },
    time::Instant,
};

use {
    portalbot_browser::{ElementHandle, Selector},
    serde::Serialize,
};

use crate::model::WorkOrder;

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub key: String,
    pub value: T,
    pub inserted_at: Instant,
}

impl<T> CacheEntry<T> {
    fn new(key: String, value: T) -> Self {
        Self {
            key,
            value,
            inserted_at: Instant::now(),
        }
    }
}

/// Handles resolved during one session, keyed by selector.
///
/// Entries may go stale when the page re-renders; callers probe before reuse
/// and invalidate on failure.
#[derive(Debug, Default)]
pub struct ElementCache {
    entries: HashMap<String, CacheEntry<ElementHandle>>,
}

impl ElementCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, selector: &Selector) -> Option<ElementHandle> {
        self.entries
            .get(&selector.to_string())
            .map(|e| e.value.clone())
    }

    pub fn insert(&mut self, handle: ElementHandle) {
        let key = handle.selector().to_string();
        self.entries.insert(key.clone(), CacheEntry::new(key, handle));
    }

    pub fn invalidate(&mut self, selector: &Selector) -> bool {
        self.entries.remove(&selector.to_string()).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Last fetched snapshot per work-order id, shared by all sessions.
///
/// Entries are dropped only by explicit eviction.
#[derive(Debug, Default)]
pub struct ResultCache {
    entries: Mutex<HashMap<String, CacheEntry<WorkOrder>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<WorkOrder> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(id) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            },
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            },
        }
    }

    pub fn insert(&self, order: WorkOrder) {
        let key = order.id.clone();
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone(), CacheEntry::new(key, order));
    }

    pub fn evict(&self, id: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .is_some()
    }

    /// Drop every entry, returning how many there were.
    pub fn evict_all(&self) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self
                .entries
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}
