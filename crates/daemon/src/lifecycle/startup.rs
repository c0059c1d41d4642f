// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::sync::Arc;

use fs2::FileExt;
use itn_adapters::{DesktopNotificationSink, FileConfigStore, HttpRemoteClient, MemoryCacheBackend};
use itn_core::SystemClock;
use itn_engine::{JobDeps, JobRunner};
use itn_storage::ConfigRepository;
use tracing::info;

use super::{Config, Daemon, LifecycleError};

/// Start the daemon
pub fn startup(
    config: &Config,
) -> Result<Daemon<HttpRemoteClient, DesktopNotificationSink, SystemClock>, LifecycleError> {
    match startup_inner(config) {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // A failed lock means the PID file belongs to the running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

fn startup_inner(
    config: &Config,
) -> Result<Daemon<HttpRemoteClient, DesktopNotificationSink, SystemClock>, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST
    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Open the config store
    let store = Arc::new(FileConfigStore::open(&config.store_path)?);
    let repo = ConfigRepository::new(store);
    let Some(url) = repo.itop_url() else {
        return Err(LifecycleError::NotConfigured);
    };
    let tz = repo.timezone();

    // 4. Set up adapters
    let clock = SystemClock;
    let deps = JobDeps {
        remote: HttpRemoteClient::new(&url, config.http_timeout)?,
        sink: DesktopNotificationSink::new(),
        config: repo.clone(),
        cache: Arc::new(MemoryCacheBackend::new(clock.clone())),
    };
    let runner = Arc::new(JobRunner::new(deps, clock));

    info!(
        url = %url,
        timezone = tz.name(),
        users = repo.users().len(),
        store = %config.store_path.display(),
        "daemon started"
    );
    Ok(Daemon::new(config.clone(), repo, runner, Some(lock_file)))
}

/// Remove the PID file left by a failed startup.
fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
