// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user notification policy: identity binding and enabled types.

use crate::id::PersonId;
use crate::subject::{JobKind, NotificationType};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Admin-level state of one notification type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPolicy {
    /// Never sent, regardless of user preference.
    Disabled,
    /// Always sent, user opt-outs are ignored.
    Forced,
    /// Sent unless the user opted out.
    #[default]
    UserChoice,
}

crate::simple_display! {
    AdminPolicy {
        Disabled => "disabled",
        Forced => "forced",
        UserChoice => "user_choice",
    }
}

impl AdminPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "disabled" => Some(Self::Disabled),
            "forced" => Some(Self::Forced),
            "user_choice" => Some(Self::UserChoice),
            _ => None,
        }
    }
}

/// Merge the admin state with the user's opt-out for a single type.
pub fn effective_policy(admin: AdminPolicy, user_opted_out: bool) -> bool {
    match admin {
        AdminPolicy::Disabled => false,
        AdminPolicy::Forced => true,
        AdminPolicy::UserChoice => !user_opted_out,
    }
}

/// Compute the enabled set for one audience.
///
/// Types missing from `admin` default to [`AdminPolicy::UserChoice`].
pub fn enabled_types(
    kind: JobKind,
    admin: &BTreeMap<NotificationType, AdminPolicy>,
    opted_out: &BTreeSet<NotificationType>,
) -> BTreeSet<NotificationType> {
    NotificationType::for_job(kind)
        .iter()
        .copied()
        .filter(|t| {
            effective_policy(admin.get(t).copied().unwrap_or_default(), opted_out.contains(t))
        })
        .collect()
}

/// The remote identity a host user is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteIdentity {
    /// iTop `Person` key; the binding itself.
    pub person_id: PersonId,
    /// iTop `User` (login account) key, used to match change-log actors.
    pub user_id: Option<String>,
    /// Display name as iTop records it in `userinfo`.
    pub display_name: Option<String>,
}

impl RemoteIdentity {
    pub fn new(person_id: impl Into<PersonId>) -> Self {
        Self { person_id: person_id.into(), user_id: None, display_name: None }
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
