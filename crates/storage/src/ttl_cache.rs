// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TTL cache with application-level expiry.
//!
//! Every value is stored inside a `{cached_at, ttl, data}` envelope and its
//! age is checked on read, so a backend that evicts late (or never) cannot
//! serve stale data. Entries that fail to decode are deleted on sight.

use itn_adapters::CacheBackend;
use itn_core::Clock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    cached_at: i64,
    ttl: u64,
    data: T,
}

#[derive(Clone)]
pub struct TtlCache<C: Clock> {
    backend: Arc<dyn CacheBackend>,
    clock: C,
}

impl<C: Clock> TtlCache<C> {
    pub fn new(backend: Arc<dyn CacheBackend>, clock: C) -> Self {
        Self { backend, clock }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.backend.get(key)?;
        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(key, error = %e, "malformed cache entry, deleting");
                self.backend.remove(key);
                return None;
            }
        };
        let age = self.clock.epoch_secs() - entry.cached_at;
        if age > i64::try_from(entry.ttl).unwrap_or(i64::MAX) {
            tracing::trace!(key, age, ttl = entry.ttl, "cache entry expired");
            self.backend.remove(key);
            return None;
        }
        Some(entry.data)
    }

    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl_secs: u64) {
        let entry = CacheEntry { cached_at: self.clock.epoch_secs(), ttl: ttl_secs, data: value };
        match serde_json::to_string(&entry) {
            Ok(raw) => self.backend.set(key, &raw, ttl_secs),
            Err(e) => tracing::warn!(key, error = %e, "cache value not serializable, skipped"),
        }
    }

    pub fn invalidate(&self, key: &str) {
        self.backend.remove(key);
    }

    pub fn clear(&self) {
        self.backend.clear();
    }
}

#[cfg(test)]
#[path = "ttl_cache_tests.rs"]
mod tests;
