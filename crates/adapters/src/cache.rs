// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Distributed cache seam.
//!
//! Backends accept a native TTL but are only expected to honor it
//! approximately; the application layer re-validates entry age.

use itn_core::Clock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Opaque string cache scoped to one namespace
pub trait CacheBackend: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str, ttl_secs: u64);
    fn remove(&self, key: &str);
    /// Drop every entry in this namespace.
    fn clear(&self);
}

struct Slot {
    value: String,
    expires_at: i64,
}

/// Process-local backend.
///
/// Expired entries are only evicted by [`MemoryCacheBackend::purge_expired`],
/// which mirrors the lazy eviction of shared caches under memory pressure.
#[derive(Clone)]
pub struct MemoryCacheBackend<C: Clock> {
    clock: C,
    slots: Arc<Mutex<HashMap<String, Slot>>>,
}

impl<C: Clock> MemoryCacheBackend<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, slots: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Evict entries whose native TTL elapsed; returns how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.epoch_secs();
        let mut slots = self.slots.lock();
        let before = slots.len();
        slots.retain(|_, slot| slot.expires_at > now);
        before - slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.slots.lock().contains_key(key)
    }
}

impl<C: Clock> CacheBackend for MemoryCacheBackend<C> {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.lock().get(key).map(|slot| slot.value.clone())
    }

    fn set(&self, key: &str, value: &str, ttl_secs: u64) {
        let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        let expires_at = self.clock.epoch_secs().saturating_add(ttl);
        self.slots.lock().insert(key.to_string(), Slot { value: value.to_string(), expires_at });
    }

    fn remove(&self, key: &str) {
        self.slots.lock().remove(key);
    }

    fn clear(&self) {
        self.slots.lock().clear();
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
