// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed access to the configuration store.
//!
//! Every logical setting has an explicit getter (and, where the watcher
//! writes it, a setter). Absent or unparseable values read as `None` or the
//! documented default; only writes can fail.

use itn_adapters::{ConfigStore, Credential, StoreError};
use itn_core::{
    enabled_types, AdminPolicy, DeadlineKind, DeadlineScope, EscalationLevel, JobKind,
    NotificationType, RemoteIdentity, RemoteTimezone, UserId,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// User-namespace keys.
mod user_key {
    pub const NOTIFICATIONS_ENABLED: &str = "notifications_enabled";
    pub const PERSON_ID: &str = "person_id";
    pub const REMOTE_USER_ID: &str = "remote_user_id";
    pub const DISPLAY_NAME: &str = "remote_display_name";
    pub const CHECK_INTERVAL: &str = "check_interval";
    pub const AGENT_OPT_OUT: &str = "agent_notifications_disabled";
    pub const DISABLED_PORTAL: &str = "disabled_portal_notifications";
    pub const DISABLED_AGENT: &str = "disabled_agent_notifications";
    pub const TOKEN: &str = "token";
    pub const LAST_PORTAL_CHECK: &str = "last_portal_check";
    pub const LAST_AGENT_CHECK: &str = "last_agent_check";
}

/// Instance-namespace keys.
mod app_key {
    pub const ITOP_URL: &str = "itop_url";
    pub const APPLICATION_TOKEN: &str = "application_token";
    pub const TIMEZONE: &str = "timezone";
    pub const DEFAULT_CHECK_INTERVAL: &str = "default_check_interval";
    pub const TICKET_CLASSES: &str = "ticket_classes";
    pub const CACHE_TTL_PERSON_NAME: &str = "cache_ttl_person_name";
    pub const CACHE_TTL_PROFILE: &str = "cache_ttl_profile";
    pub const POLICY_PREFIX: &str = "notification_policy_";
}

/// Default per-user polling interval when the admin set none (minutes).
pub const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 5;
pub const DEFAULT_PERSON_NAME_TTL_SECS: u64 = 3600;
pub const DEFAULT_PROFILE_TTL_SECS: u64 = 1800;
pub const DEFAULT_TICKET_CLASSES: &[&str] = &["UserRequest", "Incident"];

fn watermark_key(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Portal => user_key::LAST_PORTAL_CHECK,
        JobKind::Agent => user_key::LAST_AGENT_CHECK,
    }
}

fn opt_out_key(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Portal => user_key::DISABLED_PORTAL,
        JobKind::Agent => user_key::DISABLED_AGENT,
    }
}

fn ledger_key(kind: DeadlineKind, scope: DeadlineScope) -> String {
    format!("deadline_levels_{kind}_{scope}")
}

fn ledger_keys() -> impl Iterator<Item = String> {
    [DeadlineKind::Tto, DeadlineKind::Ttr].into_iter().flat_map(|kind| {
        [DeadlineScope::Mine, DeadlineScope::TeamUnassigned]
            .into_iter()
            .map(move |scope| ledger_key(kind, scope))
    })
}

fn parse_bool(raw: Option<String>) -> bool {
    raw.is_some_and(|v| v.trim() == "1")
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Typed wrapper over a [`ConfigStore`].
#[derive(Clone)]
pub struct ConfigRepository {
    store: Arc<dyn ConfigStore>,
}

impl ConfigRepository {
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self { store }
    }

    pub fn users(&self) -> Vec<UserId> {
        self.store.users()
    }

    /// Re-read the backing store.
    pub fn reload(&self) -> Result<(), StoreError> {
        self.store.reload()
    }

    fn user(&self, user: &UserId, key: &str) -> Option<String> {
        self.store.get_user_value(user, key)
    }

    fn app(&self, key: &str) -> Option<String> {
        self.store.get_app_value(key)
    }

    fn app_u64(&self, key: &str) -> Option<u64> {
        self.app(key).and_then(|v| v.trim().parse().ok())
    }

    // ── User settings ───────────────────────────────────────────────────

    pub fn notifications_enabled(&self, user: &UserId) -> bool {
        parse_bool(self.user(user, user_key::NOTIFICATIONS_ENABLED))
    }

    pub fn set_notifications_enabled(&self, user: &UserId, enabled: bool) -> Result<(), StoreError> {
        self.store.set_user_value(user, user_key::NOTIFICATIONS_ENABLED, bool_str(enabled))
    }

    /// Bound remote identity; `None` until a person id is stored.
    pub fn identity(&self, user: &UserId) -> Option<RemoteIdentity> {
        let person_id = non_blank(self.user(user, user_key::PERSON_ID))?;
        if itn_core::PersonId::is_unset(&person_id) {
            return None;
        }
        Some(RemoteIdentity {
            person_id: person_id.into(),
            user_id: non_blank(self.user(user, user_key::REMOTE_USER_ID)),
            display_name: non_blank(self.user(user, user_key::DISPLAY_NAME)),
        })
    }

    pub fn set_identity(&self, user: &UserId, identity: &RemoteIdentity) -> Result<(), StoreError> {
        self.store.set_user_value(user, user_key::PERSON_ID, identity.person_id.as_str())?;
        match &identity.user_id {
            Some(id) => self.store.set_user_value(user, user_key::REMOTE_USER_ID, id)?,
            None => self.store.delete_user_value(user, user_key::REMOTE_USER_ID)?,
        }
        match &identity.display_name {
            Some(name) => self.store.set_user_value(user, user_key::DISPLAY_NAME, name),
            None => self.store.delete_user_value(user, user_key::DISPLAY_NAME),
        }
    }

    /// Per-user interval override in seconds (stored in minutes).
    pub fn check_interval_override_secs(&self, user: &UserId) -> Option<u64> {
        self.user(user, user_key::CHECK_INTERVAL)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|minutes| *minutes > 0)
            .map(|minutes| minutes * 60)
    }

    pub fn set_check_interval_minutes(&self, user: &UserId, minutes: u64) -> Result<(), StoreError> {
        self.store.set_user_value(user, user_key::CHECK_INTERVAL, &minutes.to_string())
    }

    /// Global opt-out from every agent notification.
    pub fn agent_notifications_opted_out(&self, user: &UserId) -> bool {
        parse_bool(self.user(user, user_key::AGENT_OPT_OUT))
    }

    pub fn set_agent_notifications_opted_out(
        &self,
        user: &UserId,
        opted_out: bool,
    ) -> Result<(), StoreError> {
        self.store.set_user_value(user, user_key::AGENT_OPT_OUT, bool_str(opted_out))
    }

    /// Types the user disabled for one audience.
    ///
    /// Stored as a JSON array of type names; unknown names are ignored.
    pub fn opted_out_types(&self, user: &UserId, kind: JobKind) -> BTreeSet<NotificationType> {
        let Some(raw) = self.user(user, opt_out_key(kind)) else {
            return BTreeSet::new();
        };
        match serde_json::from_str::<Vec<String>>(&raw) {
            Ok(names) => names.iter().filter_map(|n| NotificationType::parse(n)).collect(),
            Err(e) => {
                tracing::warn!(%user, %kind, error = %e, "unreadable opt-out list, ignoring");
                BTreeSet::new()
            }
        }
    }

    pub fn set_opted_out_types(
        &self,
        user: &UserId,
        kind: JobKind,
        types: &BTreeSet<NotificationType>,
    ) -> Result<(), StoreError> {
        let names: Vec<String> = types.iter().map(ToString::to_string).collect();
        self.store.set_user_value(user, opt_out_key(kind), &serde_json::to_string(&names)?)
    }

    /// Admin policy merged with the user's opt-outs.
    pub fn enabled_types(&self, user: &UserId, kind: JobKind) -> BTreeSet<NotificationType> {
        enabled_types(kind, &self.admin_policies(), &self.opted_out_types(user, kind))
    }

    // ── Credentials ─────────────────────────────────────────────────────

    pub fn user_token(&self, user: &UserId) -> Option<String> {
        non_blank(self.user(user, user_key::TOKEN))
    }

    pub fn set_user_token(&self, user: &UserId, token: &str) -> Result<(), StoreError> {
        self.store.set_user_value(user, user_key::TOKEN, token)
    }

    pub fn wipe_user_token(&self, user: &UserId) -> Result<(), StoreError> {
        self.store.delete_user_value(user, user_key::TOKEN)
    }

    /// Credential used for a user's queries: personal token, else the
    /// instance application token.
    pub fn credential(&self, user: &UserId) -> Option<(Credential, CredentialSource)> {
        if let Some(token) = self.user_token(user) {
            return Some((Credential::new(token), CredentialSource::User));
        }
        self.application_token().map(|t| (Credential::new(t), CredentialSource::Application))
    }

    // ── Watermarks ──────────────────────────────────────────────────────

    /// Last processed instant in epoch seconds.
    ///
    /// Legacy values stored as remote-local datetimes are converted with `tz`.
    pub fn watermark(&self, user: &UserId, kind: JobKind, tz: &RemoteTimezone) -> Option<i64> {
        let raw = non_blank(self.user(user, watermark_key(kind)))?;
        if let Ok(secs) = raw.parse::<i64>() {
            return Some(secs);
        }
        match tz.parse_strict(&raw) {
            Some(dt) => Some(dt.timestamp()),
            None => {
                tracing::warn!(%user, %kind, value = %raw, "unreadable watermark, treating as unset");
                None
            }
        }
    }

    pub fn set_watermark(&self, user: &UserId, kind: JobKind, epoch_secs: i64) -> Result<(), StoreError> {
        self.store.set_user_value(user, watermark_key(kind), &epoch_secs.to_string())
    }

    // ── Deadline ledger ─────────────────────────────────────────────────

    /// Last escalation level signaled per ticket.
    pub fn signaled_levels(
        &self,
        user: &UserId,
        kind: DeadlineKind,
        scope: DeadlineScope,
    ) -> BTreeMap<String, EscalationLevel> {
        let Some(raw) = self.user(user, &ledger_key(kind, scope)) else {
            return BTreeMap::new();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!(%user, %kind, %scope, error = %e, "unreadable deadline ledger, resetting");
            BTreeMap::new()
        })
    }

    pub fn set_signaled_levels(
        &self,
        user: &UserId,
        kind: DeadlineKind,
        scope: DeadlineScope,
        levels: &BTreeMap<String, EscalationLevel>,
    ) -> Result<(), StoreError> {
        let key = ledger_key(kind, scope);
        if levels.is_empty() {
            return self.store.delete_user_value(user, &key);
        }
        self.store.set_user_value(user, &key, &serde_json::to_string(levels)?)
    }

    /// Administrative reset: forget watermarks and deadline ledgers so the
    /// next run starts from the lookback floor.
    pub fn reset_user(&self, user: &UserId) -> Result<(), StoreError> {
        self.store.delete_user_value(user, user_key::LAST_PORTAL_CHECK)?;
        self.store.delete_user_value(user, user_key::LAST_AGENT_CHECK)?;
        for key in ledger_keys() {
            self.store.delete_user_value(user, &key)?;
        }
        Ok(())
    }

    // ── Instance settings ───────────────────────────────────────────────

    pub fn itop_url(&self) -> Option<String> {
        non_blank(self.app(app_key::ITOP_URL)).map(|u| u.trim_end_matches('/').to_string())
    }

    pub fn application_token(&self) -> Option<String> {
        non_blank(self.app(app_key::APPLICATION_TOKEN))
    }

    pub fn timezone_name(&self) -> Option<String> {
        non_blank(self.app(app_key::TIMEZONE))
    }

    /// Configured remote timezone, UTC when unset or unknown.
    pub fn timezone(&self) -> RemoteTimezone {
        let name = self.timezone_name();
        let (tz, valid) = RemoteTimezone::resolve(name.as_deref());
        if !valid {
            tracing::debug!(timezone = ?name, "unknown timezone, using UTC");
        }
        tz
    }

    /// Admin default polling interval in seconds (stored in minutes).
    pub fn default_check_interval_secs(&self) -> u64 {
        self.app_u64(app_key::DEFAULT_CHECK_INTERVAL)
            .filter(|minutes| *minutes > 0)
            .unwrap_or(DEFAULT_CHECK_INTERVAL_MINUTES)
            * 60
    }

    pub fn ticket_classes(&self) -> Vec<String> {
        let configured: Vec<String> = self
            .app(app_key::TICKET_CLASSES)
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        if configured.is_empty() {
            DEFAULT_TICKET_CLASSES.iter().map(|c| c.to_string()).collect()
        } else {
            configured
        }
    }

    pub fn person_name_ttl_secs(&self) -> u64 {
        self.app_u64(app_key::CACHE_TTL_PERSON_NAME).unwrap_or(DEFAULT_PERSON_NAME_TTL_SECS)
    }

    pub fn profile_ttl_secs(&self) -> u64 {
        self.app_u64(app_key::CACHE_TTL_PROFILE).unwrap_or(DEFAULT_PROFILE_TTL_SECS)
    }

    pub fn admin_policy(&self, notification: NotificationType) -> AdminPolicy {
        self.app(&format!("{}{notification}", app_key::POLICY_PREFIX))
            .and_then(|v| AdminPolicy::parse(&v))
            .unwrap_or_default()
    }

    pub fn admin_policies(&self) -> BTreeMap<NotificationType, AdminPolicy> {
        NotificationType::PORTAL
            .iter()
            .chain(NotificationType::AGENT)
            .map(|t| (*t, self.admin_policy(*t)))
            .collect()
    }

    pub fn set_admin_policy(
        &self,
        notification: NotificationType,
        policy: AdminPolicy,
    ) -> Result<(), StoreError> {
        self.store.set_app_value(
            &format!("{}{notification}", app_key::POLICY_PREFIX),
            &policy.to_string(),
        )
    }

    pub fn set_app_value(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.store.set_app_value(key, value)
    }
}

/// Where a user's credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    User,
    Application,
}

#[cfg(test)]
#[path = "repository_tests.rs"]
mod tests;
