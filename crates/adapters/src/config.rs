// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key-value configuration store with user and instance namespaces.
//!
//! Values are plain strings; booleans are `'0'`/`'1'` and numbers are
//! decimal. Reads never fail, writes may (the file store persists on every
//! write).

use itn_core::UserId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors from store writes
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// External configuration store
pub trait ConfigStore: Send + Sync {
    fn get_user_value(&self, user: &UserId, key: &str) -> Option<String>;
    fn set_user_value(&self, user: &UserId, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete_user_value(&self, user: &UserId, key: &str) -> Result<(), StoreError>;

    fn get_app_value(&self, key: &str) -> Option<String>;
    fn set_app_value(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn delete_app_value(&self, key: &str) -> Result<(), StoreError>;

    /// Every user with at least one stored value.
    fn users(&self) -> Vec<UserId>;

    /// Pick up changes written by other processes.
    fn reload(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Current on-disk schema version
pub const CURRENT_STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreState {
    #[serde(rename = "v", default)]
    version: u32,
    #[serde(default)]
    app: BTreeMap<String, String>,
    #[serde(default)]
    users: BTreeMap<UserId, BTreeMap<String, String>>,
}

impl StoreState {
    fn get_user(&self, user: &UserId, key: &str) -> Option<String> {
        self.users.get(user).and_then(|values| values.get(key)).cloned()
    }

    fn set_user(&mut self, user: &UserId, key: &str, value: &str) {
        self.users.entry(user.clone()).or_default().insert(key.to_string(), value.to_string());
    }

    fn delete_user(&mut self, user: &UserId, key: &str) {
        if let Some(values) = self.users.get_mut(user) {
            values.remove(key);
            if values.is_empty() {
                self.users.remove(user);
            }
        }
    }
}

/// In-memory store
#[derive(Clone, Default)]
pub struct MemoryConfigStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get_user_value(&self, user: &UserId, key: &str) -> Option<String> {
        self.state.lock().get_user(user, key)
    }

    fn set_user_value(&self, user: &UserId, key: &str, value: &str) -> Result<(), StoreError> {
        self.state.lock().set_user(user, key, value);
        Ok(())
    }

    fn delete_user_value(&self, user: &UserId, key: &str) -> Result<(), StoreError> {
        self.state.lock().delete_user(user, key);
        Ok(())
    }

    fn get_app_value(&self, key: &str) -> Option<String> {
        self.state.lock().app.get(key).cloned()
    }

    fn set_app_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.state.lock().app.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete_app_value(&self, key: &str) -> Result<(), StoreError> {
        self.state.lock().app.remove(key);
        Ok(())
    }

    fn users(&self) -> Vec<UserId> {
        self.state.lock().users.keys().cloned().collect()
    }
}

/// JSON-file-backed store.
///
/// The whole file is rewritten atomically (temp file + rename) on every
/// write. A file that fails to parse is moved aside to `.bak` and the store
/// starts empty.
pub struct FileConfigStore {
    path: PathBuf,
    state: Mutex<StoreState>,
}

impl FileConfigStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let state = load(&path)?;
        Ok(Self { path, state: Mutex::new(state) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, state: &StoreState) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut snapshot = state.clone();
        snapshot.version = CURRENT_STORE_VERSION;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&snapshot)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Apply `f` to a copy, persist it, then swap it in. A failed write
    /// leaves the in-memory state untouched.
    fn mutate(&self, f: impl FnOnce(&mut StoreState)) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let mut next = state.clone();
        f(&mut next);
        self.persist(&next)?;
        *state = next;
        Ok(())
    }
}

fn load(path: &Path) -> Result<StoreState, StoreError> {
    match fs::read(path) {
        Ok(bytes) => match serde_json::from_slice::<StoreState>(&bytes) {
            Ok(state) => Ok(state),
            Err(e) => {
                let bak = path.with_extension("bak");
                tracing::warn!(
                    path = %path.display(),
                    backup = %bak.display(),
                    error = %e,
                    "config store unreadable, starting empty"
                );
                fs::rename(path, &bak)?;
                Ok(StoreState::default())
            }
        },
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoreState::default()),
        Err(e) => Err(e.into()),
    }
}

impl ConfigStore for FileConfigStore {
    fn get_user_value(&self, user: &UserId, key: &str) -> Option<String> {
        self.state.lock().get_user(user, key)
    }

    fn set_user_value(&self, user: &UserId, key: &str, value: &str) -> Result<(), StoreError> {
        self.mutate(|s| s.set_user(user, key, value))
    }

    fn delete_user_value(&self, user: &UserId, key: &str) -> Result<(), StoreError> {
        self.mutate(|s| s.delete_user(user, key))
    }

    fn get_app_value(&self, key: &str) -> Option<String> {
        self.state.lock().app.get(key).cloned()
    }

    fn set_app_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.mutate(|s| {
            s.app.insert(key.to_string(), value.to_string());
        })
    }

    fn delete_app_value(&self, key: &str) -> Result<(), StoreError> {
        self.mutate(|s| {
            s.app.remove(key);
        })
    }

    fn users(&self) -> Vec<UserId> {
        self.state.lock().users.keys().cloned().collect()
    }

    /// Re-read the file. A missing file keeps the current state.
    fn reload(&self) -> Result<(), StoreError> {
        if !self.path.exists() {
            return Ok(());
        }
        let fresh = load(&self.path)?;
        *self.state.lock() = fresh;
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
