// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user polling gate.
//!
//! Gates are evaluated in a fixed order and the first failing one decides.
//! Nothing is remembered between ticks except the watermark itself.

use crate::directory::Directory;
use itn_adapters::RemoteClient;
use itn_core::{Clock, JobKind, UserId};
use itn_storage::ConfigRepository;
use std::sync::Arc;

/// Why a user was not processed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotificationsDisabled,
    NoIdentity,
    PortalOnly,
    AgentOptOut,
    NotDue,
}

itn_core::simple_display! {
    SkipReason {
        NotificationsDisabled => "notifications disabled",
        NoIdentity => "no remote identity",
        PortalOnly => "portal-only account",
        AgentOptOut => "opted out of agent notifications",
        NotDue => "interval not elapsed",
    }
}

pub struct UserScheduler<R, C: Clock> {
    config: ConfigRepository,
    directory: Arc<Directory<R, C>>,
    clock: C,
}

impl<R: RemoteClient, C: Clock> UserScheduler<R, C> {
    pub fn new(config: ConfigRepository, directory: Arc<Directory<R, C>>, clock: C) -> Self {
        Self { config, directory, clock }
    }

    pub async fn should_process(
        &self,
        user: &UserId,
        kind: JobKind,
        admin_default_interval_secs: u64,
    ) -> bool {
        self.gate(user, kind, admin_default_interval_secs).await.is_ok()
    }

    /// Evaluate every gate for `user`, returning the first that fails.
    pub async fn gate(
        &self,
        user: &UserId,
        kind: JobKind,
        admin_default_interval_secs: u64,
    ) -> Result<(), SkipReason> {
        if !self.config.notifications_enabled(user) {
            return Err(SkipReason::NotificationsDisabled);
        }
        let Some(identity) = self.config.identity(user) else {
            return Err(SkipReason::NoIdentity);
        };

        if kind == JobKind::Agent {
            if self.config.agent_notifications_opted_out(user) {
                return Err(SkipReason::AgentOptOut);
            }
            if let Some((credential, _)) = self.config.credential(user) {
                match self.directory.is_portal_only(user, &credential, &identity).await {
                    Ok(true) => return Err(SkipReason::PortalOnly),
                    Ok(false) => {}
                    // the run itself will surface the failure
                    Err(e) => tracing::debug!(%user, error = %e, "profile lookup failed"),
                }
            }
        }

        let interval = self
            .config
            .check_interval_override_secs(user)
            .unwrap_or(admin_default_interval_secs) as i64;
        let Some(watermark) = self.config.watermark(user, kind, &self.config.timezone()) else {
            return Ok(());
        };
        if self.clock.epoch_secs() - watermark >= interval {
            Ok(())
        } else {
            Err(SkipReason::NotDue)
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
