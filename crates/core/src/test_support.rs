// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{ChangeRecord, RemoteIdentity};

// ── Proptest strategies ─────────────────────────────────────────────────

pub mod strategies {
    use crate::{ChangeRecord, EscalationLevel};
    use proptest::prelude::*;

    pub fn arb_escalation_level() -> impl Strategy<Value = EscalationLevel> {
        prop_oneof![
            Just(EscalationLevel::Hours24),
            Just(EscalationLevel::Hours12),
            Just(EscalationLevel::Hours4),
            Just(EscalationLevel::Hours1),
        ]
    }

    /// Scalar change on a small value alphabet so no-ops are common.
    pub fn arb_change_record() -> impl Strategy<Value = ChangeRecord> {
        (1u32..50, "[0-3]", "[0-3]", proptest::option::of("[0-9]{1,2}")).prop_map(
            |(key, old, new, actor)| ChangeRecord {
                objkey: key.to_string(),
                objclass: "UserRequest".to_string(),
                attcode: "priority".to_string(),
                oldvalue: old,
                newvalue: new,
                date: "2025-11-05 12:00:00".to_string(),
                user_id: actor,
                userinfo: String::new(),
            },
        )
    }
}

// ── Record factories ────────────────────────────────────────────────────

/// Scalar attribute change by a given actor.
pub fn scalar_change(
    ticket: &str,
    attcode: &str,
    old: &str,
    new: &str,
    date: &str,
    actor: Option<&str>,
) -> ChangeRecord {
    ChangeRecord {
        objkey: ticket.to_string(),
        objclass: "UserRequest".to_string(),
        attcode: attcode.to_string(),
        oldvalue: old.to_string(),
        newvalue: new.to_string(),
        date: date.to_string(),
        user_id: actor.map(str::to_string),
        userinfo: actor.map(|a| format!("User {a}")).unwrap_or_default(),
    }
}

/// Case-log entry (`public_log` / `private_log`) by a given actor.
pub fn log_entry(ticket: &str, attcode: &str, index: u32, date: &str, actor: Option<&str>) -> ChangeRecord {
    scalar_change(ticket, attcode, "", &index.to_string(), date, actor)
}

/// Identity whose remote account key is `user_id` and display name `User {user_id}`.
pub fn identity(person_id: &str, user_id: &str) -> RemoteIdentity {
    RemoteIdentity {
        person_id: person_id.into(),
        user_id: Some(user_id.to_string()),
        display_name: Some(format!("User {user_id}")),
    }
}
