// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user state resolved once at the start of that user's run.

use itn_adapters::Credential;
use itn_core::{JobKind, NotificationType, RemoteIdentity, RemoteTimezone, UserId};
use itn_storage::CredentialSource;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct UserContext {
    pub user: UserId,
    pub kind: JobKind,
    pub identity: RemoteIdentity,
    pub credential: Credential,
    pub credential_source: CredentialSource,
    pub tz: RemoteTimezone,
    /// Notification types this user receives for `kind`.
    pub enabled: BTreeSet<NotificationType>,
}

impl UserContext {
    pub fn is_enabled(&self, notification: NotificationType) -> bool {
        self.enabled.contains(&notification)
    }
}

/// Change window `(since, until]` in epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub since: i64,
    pub until: i64,
}

impl Window {
    pub fn contains(&self, epoch_secs: i64) -> bool {
        self.since < epoch_secs && epoch_secs <= self.until
    }
}
