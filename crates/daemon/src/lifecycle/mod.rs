// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, the polling loop, shutdown.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use itn_adapters::{
    DesktopNotificationSink, HttpRemoteClient, NotificationSink, RemoteClient, RemoteError,
    StoreError,
};
use itn_core::{Clock, SystemClock};
use itn_engine::{AgentJob, JobRunner, PortalJob, RunSummary};
use itn_storage::ConfigRepository;
use thiserror::Error;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Daemon runner with concrete adapter types
pub type DaemonRuntime = JobRunner<HttpRemoteClient, DesktopNotificationSink, SystemClock>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/itn)
    pub state_dir: PathBuf,
    /// Path to the JSON config store
    pub store_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Directory for rolling daemon logs
    pub log_dir: PathBuf,
    /// Time between polling passes
    pub tick: Duration,
    /// Per-request timeout for iTop calls
    pub http_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Uses fixed paths under `~/.local/state/itn/` (or `$XDG_STATE_HOME/itn/`).
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::at(crate::env::state_dir()?))
    }

    /// Configuration rooted at `state_dir`, timings from the environment.
    pub fn at(state_dir: PathBuf) -> Self {
        Self {
            store_path: state_dir.join("config.json"),
            lock_path: state_dir.join("daemon.pid"),
            log_dir: state_dir.join("logs"),
            tick: crate::env::tick_interval(),
            http_timeout: crate::env::http_timeout(),
            state_dir,
        }
    }
}

/// Results of one polling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub agent: RunSummary,
    pub portal: RunSummary,
}

/// Running daemon: the two jobs plus the resources held for their lifetime.
pub struct Daemon<R, N, C: Clock> {
    pub config: Config,
    repo: ConfigRepository,
    agent: AgentJob<R, N, C>,
    portal: PortalJob<R, N, C>,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: Option<File>,
    /// When daemon started
    pub start_time: Instant,
}

impl<R, N, C> Daemon<R, N, C>
where
    R: RemoteClient,
    N: NotificationSink,
    C: Clock,
{
    pub fn new(
        config: Config,
        repo: ConfigRepository,
        runner: Arc<JobRunner<R, N, C>>,
        lock_file: Option<File>,
    ) -> Self {
        Self {
            config,
            repo,
            agent: AgentJob::new(Arc::clone(&runner)),
            portal: PortalJob::new(runner),
            lock_file,
            start_time: Instant::now(),
        }
    }

    /// One polling pass: refresh the store, then the agent job, then the
    /// portal job.
    pub async fn tick(&self) -> TickSummary {
        if let Err(e) = self.repo.reload() {
            warn!(error = %e, "config store reload failed, using last known state");
        }
        let agent = self.agent.run().await;
        let portal = self.portal.run().await;
        TickSummary { agent, portal }
    }

    /// Poll every `config.tick` until `shutdown` resolves.
    ///
    /// A pass in progress is finished before shutting down; missed ticks are
    /// skipped rather than replayed.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let mut interval = tokio::time::interval(self.config.tick);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);
        info!(tick_secs = self.config.tick.as_secs(), "polling started");
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// Shutdown the daemon gracefully.
    pub fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!(uptime_secs = self.start_time.elapsed().as_secs(), "Shutting down daemon...");

        if self.lock_file.is_some() && self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }
        // Lock file is released when dropped
        self.lock_file = None;

        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("iTop URL is not configured (app setting `itop_url`)")]
    NotConfigured,

    #[error("Config store error: {0}")]
    Store(#[from] StoreError),

    #[error("Remote client error: {0}")]
    Remote(#[from] RemoteError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
