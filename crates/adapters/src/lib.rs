// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the collaborators the watcher talks to: iTop, the
//! notification sink, the configuration store, and the shared cache.

pub mod cache;
pub mod config;
pub mod notify;
pub mod remote;

pub use cache::{CacheBackend, MemoryCacheBackend};
pub use config::{ConfigStore, FileConfigStore, MemoryConfigStore, StoreError};
pub use notify::{DesktopNotificationSink, Notification, NotificationSink, NotifyError};
pub use remote::{Credential, HttpRemoteClient, RemoteClient, RemoteError};

#[cfg(any(test, feature = "test-support"))]
pub use notify::FakeNotificationSink;
#[cfg(any(test, feature = "test-support"))]
pub use remote::FakeRemoteClient;
