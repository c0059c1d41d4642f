// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attribute-level change records read from iTop's change log.

use crate::id::PersonId;
use crate::policy::RemoteIdentity;
use serde::{Deserialize, Serialize};

/// One attribute mutation on one remote object.
///
/// Records are transient: built from a change-log response, consumed by a
/// detection step, and dropped at the end of the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// Ticket key (`objkey`).
    pub objkey: String,
    /// Ticket class (`objclass`), e.g. `UserRequest`.
    pub objclass: String,
    /// Attribute code (`attcode`), e.g. `status` or `public_log`.
    pub attcode: String,
    pub oldvalue: String,
    pub newvalue: String,
    /// Remote-local `YYYY-MM-DD HH:MM:SS` string.
    pub date: String,
    /// Remote account key of the actor; `None` for system-generated changes.
    pub user_id: Option<String>,
    /// Actor display name as recorded by iTop.
    pub userinfo: String,
}

crate::builder! {
    pub struct ChangeRecordBuilder => ChangeRecord {
        into {
            objkey: String = "1",
            objclass: String = "UserRequest",
            attcode: String = "status",
            oldvalue: String = "new",
            newvalue: String = "assigned",
            date: String = "2025-11-05 12:00:00",
            userinfo: String = "Someone Else",
        }
        option {
            user_id: String = Some("99".to_string()),
        }
    }
}

impl ChangeRecord {
    /// True for writes that did not change the value.
    pub fn is_noop(&self) -> bool {
        self.oldvalue == self.newvalue
    }

    /// True when iTop recorded no human actor.
    pub fn is_system(&self) -> bool {
        self.user_id.as_deref().map_or(true, PersonId::is_unset)
    }

    /// True when the actor is the given remote identity.
    pub fn is_by(&self, identity: &RemoteIdentity) -> bool {
        if let (Some(actor), Some(own)) = (self.user_id.as_deref(), identity.user_id.as_deref()) {
            if !PersonId::is_unset(actor) && actor.trim() == own.trim() {
                return true;
            }
        }
        match identity.display_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => self.userinfo.trim() == name,
            _ => false,
        }
    }

    /// Numeric ticket key; iTop keys are positive integers.
    pub fn ticket_key(&self) -> Option<u64> {
        self.objkey.trim().parse().ok()
    }
}

#[cfg(test)]
#[path = "change_tests.rs"]
mod tests;
