// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::runner::AgentJob;
use crate::test_helpers::*;
use itn_core::test_support::{log_entry, scalar_change};
use itn_core::{AdminPolicy, JobKind, RemoteTimezone, MAX_NOTIFICATIONS_PER_RUN};
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Alice: person 17, account 5, owning ticket 42, last checked at 22:00.
fn alice(h: &Harness) -> itn_core::UserId {
    let alice = h.enroll("alice", "17", "5");
    h.tickets("WHERE agent_id = 17", vec![("42", ticket("17", "3", "assigned"))]);
    h.set_watermark(&alice, JobKind::Agent, T_22_00);
    alice
}

async fn run(h: &Harness) -> crate::RunSummary {
    AgentJob::new(Arc::new(h.runner())).run().await
}

#[tokio::test]
async fn reassignment_is_notified_once_and_watermark_advances() {
    let h = Harness::new();
    let alice = alice(&h);
    h.scalar_changes(&[scalar_change("42", "agent_id", "9", "17", "2025-11-05 22:40:21", Some("99"))]);

    let summary = run(&h).await;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.sent, 1);
    let calls = h.sink.calls_for("ticket_reassigned");
    assert_eq!(calls.len(), 1);
    let params = calls[0].parameters();
    assert_eq!(params["old_agent_id"], "9");
    assert_eq!(params["ticket_id"], "42");
    assert_eq!(params["ticket_ref"], "R-000000");
    assert_eq!(calls[0].at().timestamp(), T_22_40_21);
    assert!(h.sink.calls_for("ticket_assigned").is_empty());
    assert_eq!(
        h.config.watermark(&alice, JobKind::Agent, &RemoteTimezone::default()),
        Some(T_23_00)
    );
}

#[tokio::test]
async fn assignment_from_empty_slot() {
    let h = Harness::new();
    alice(&h);
    h.scalar_changes(&[scalar_change("42", "agent_id", "0", "17", "2025-11-05 22:40:21", Some("99"))]);
    run(&h).await;
    assert_eq!(h.sink.calls_for("ticket_assigned").len(), 1);
    assert!(h.sink.calls_for("ticket_reassigned").is_empty());
}

#[tokio::test]
async fn self_assignment_is_not_notified() {
    let h = Harness::new();
    alice(&h);
    h.scalar_changes(&[scalar_change("42", "agent_id", "9", "17", "2025-11-05 22:40:21", Some("5"))]);
    let summary = run(&h).await;
    assert_eq!(summary.sent, 0);
    assert!(h.sink.calls().is_empty());
}

#[tokio::test]
async fn assignment_to_someone_else_is_ignored() {
    let h = Harness::new();
    alice(&h);
    h.scalar_changes(&[scalar_change("42", "agent_id", "17", "9", "2025-11-05 22:40:21", Some("99"))]);
    run(&h).await;
    assert!(h.sink.calls().is_empty());
}

#[tokio::test]
async fn rerun_over_the_same_window_reuses_keys() {
    let h = Harness::new();
    let alice = alice(&h);
    h.scalar_changes(&[scalar_change("42", "agent_id", "9", "17", "2025-11-05 22:40:21", Some("99"))]);
    run(&h).await;
    h.set_watermark(&alice, JobKind::Agent, T_22_00);
    run(&h).await;
    let keys = h.sink.object_keys();
    assert_eq!(keys.len(), 2);
    assert_eq!(keys[0], keys[1]);
}

#[tokio::test]
async fn comments_by_others_only() {
    let h = Harness::new();
    alice(&h);
    h.log_changes(&[
        log_entry("42", "public_log", 1, "2025-11-05 22:10:00", Some("99")),
        log_entry("42", "private_log", 2, "2025-11-05 22:20:00", Some("98")),
        log_entry("42", "public_log", 3, "2025-11-05 22:30:00", None),
        log_entry("42", "private_log", 4, "2025-11-05 22:40:00", Some("5")),
    ]);

    run(&h).await;

    let calls = h.sink.calls_for("ticket_comment");
    let seen: Vec<(&str, &str)> = calls
        .iter()
        .map(|n| (n.parameters()["log_type"].as_str(), n.parameters()["author"].as_str()))
        .collect();
    assert_eq!(seen, vec![("public", "User 99"), ("private", "User 98")]);
}

#[tokio::test]
async fn sla_flags_flipping_to_true() {
    let h = Harness::new();
    alice(&h);
    h.scalar_changes(&[
        scalar_change("42", "sla_tto_passed", "1", "1", "2025-11-05 22:10:00", None),
        scalar_change("42", "sla_ttr_passed", "0", "1", "2025-11-05 22:20:00", None),
        scalar_change("42", "sla_tto_passed", "yes", "no", "2025-11-05 22:30:00", None),
    ]);
    run(&h).await;
    let calls = h.sink.calls_for("ticket_sla_breach");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].parameters()["sla_type"], "ttr");
}

#[tokio::test]
async fn priority_raised_to_critical() {
    let h = Harness::new();
    alice(&h);
    h.scalar_changes(&[
        scalar_change("42", "priority", "3", "1", "2025-11-05 22:10:00", Some("99")),
        scalar_change("42", "priority", "1", "2", "2025-11-05 22:20:00", Some("99")),
        scalar_change("42", "priority", "1", "1", "2025-11-05 22:30:00", Some("99")),
    ]);
    run(&h).await;
    let calls = h.sink.calls_for("ticket_priority_critical");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].parameters()["old_priority"], "3");
}

#[tokio::test]
async fn run_stops_at_the_notification_cap() {
    let h = Harness::new();
    let alice = h.enroll("alice", "17", "5");
    h.set_watermark(&alice, JobKind::Agent, T_22_00);
    let tickets: Vec<(String, serde_json::Value)> =
        (100..125).map(|id| (id.to_string(), ticket("17", "3", "assigned"))).collect();
    h.remote.objects("UserRequest", "WHERE agent_id = 17", tickets);
    let changes: Vec<_> = (100..125)
        .map(|id| {
            let date = format!("2025-11-05 22:{:02}:00", id - 90);
            scalar_change(&id.to_string(), "priority", "3", "1", &date, Some("99"))
        })
        .collect();
    h.scalar_changes(&changes);
    h.log_changes(&[log_entry("100", "public_log", 1, "2025-11-05 22:59:00", Some("99"))]);

    let summary = run(&h).await;

    assert_eq!(summary.sent, MAX_NOTIFICATIONS_PER_RUN);
    assert_eq!(h.sink.calls_for("ticket_priority_critical").len(), MAX_NOTIFICATIONS_PER_RUN);
    assert!(h.sink.calls_for("ticket_comment").is_empty());
    // the comment step never ran, so its change log was never fetched
    assert!(h.remote.calls_for(crate::query::CASELOG_CHANGE_CLASS).is_empty());
    assert_eq!(
        h.config.watermark(&alice, JobKind::Agent, &RemoteTimezone::default()),
        Some(T_23_00)
    );
}

#[tokio::test]
async fn failing_sink_attempts_stop_at_the_cap() {
    let h = Harness::new();
    let alice = h.enroll("alice", "17", "5");
    h.set_watermark(&alice, JobKind::Agent, T_22_00);
    let tickets: Vec<(String, serde_json::Value)> =
        (100..140).map(|id| (id.to_string(), ticket("17", "3", "assigned"))).collect();
    h.remote.objects("UserRequest", "WHERE agent_id = 17", tickets);
    let changes: Vec<_> = (100..140)
        .map(|id| {
            let date = format!("2025-11-05 22:{:02}:00", id - 99);
            scalar_change(&id.to_string(), "priority", "3", "1", &date, Some("99"))
        })
        .collect();
    h.scalar_changes(&changes);
    h.sink.set_failing(true);

    let summary = run(&h).await;

    assert_eq!(summary.sent, 0);
    assert_eq!(summary.send_failures, MAX_NOTIFICATIONS_PER_RUN);
    assert!(h.remote.calls_for(crate::query::CASELOG_CHANGE_CLASS).is_empty());
}

#[tokio::test]
async fn empty_comment_entries_are_ignored() {
    let h = Harness::new();
    alice(&h);
    let mut blank = log_entry("42", "public_log", 1, "2025-11-05 22:10:00", Some("99"));
    blank.oldvalue = String::new();
    blank.newvalue = String::new();
    h.log_changes(&[blank]);

    let summary = run(&h).await;

    assert_eq!(summary.sent, 0);
    assert!(h.sink.calls_for("ticket_comment").is_empty());
}

#[tokio::test]
async fn opted_out_types_are_not_fetched_or_sent() {
    let h = Harness::new();
    let alice = alice(&h);
    h.config
        .set_opted_out_types(&alice, JobKind::Agent, &BTreeSet::from([NotificationType::TicketComment]))
        .unwrap();
    h.log_changes(&[log_entry("42", "public_log", 1, "2025-11-05 22:10:00", Some("99"))]);
    run(&h).await;
    assert!(h.sink.calls().is_empty());
    assert!(h.remote.calls_for(crate::query::CASELOG_CHANGE_CLASS).is_empty());
}

#[tokio::test]
async fn forced_policy_overrides_opt_out() {
    let h = Harness::new();
    let alice = alice(&h);
    h.config.set_admin_policy(NotificationType::TicketComment, AdminPolicy::Forced).unwrap();
    h.config
        .set_opted_out_types(&alice, JobKind::Agent, &BTreeSet::from([NotificationType::TicketComment]))
        .unwrap();
    h.log_changes(&[log_entry("42", "public_log", 1, "2025-11-05 22:10:00", Some("99"))]);
    run(&h).await;
    assert_eq!(h.sink.calls_for("ticket_comment").len(), 1);
}

#[tokio::test]
async fn deadline_warning_for_own_ticket() {
    let h = Harness::new();
    let alice = alice(&h);
    let deadline = RemoteTimezone::default().format_epoch(T_23_00 + 23 * 3600 + 1800);
    h.tickets("tto_escalation_deadline", vec![("42", json!({ "tto_escalation_deadline": deadline.clone() }))]);

    run(&h).await;

    let calls = h.sink.calls_for("ticket_tto_warning");
    assert_eq!(calls.len(), 1);
    let params = calls[0].parameters();
    assert_eq!(params["level"], "24h");
    assert_eq!(params["scope"], "mine");
    assert_eq!(params["deadline"], deadline);
    assert_eq!(params["ticket_ref"], "R-000000");
    assert_eq!(calls[0].at().timestamp(), T_23_00 - 1800);
    assert!(h.raw_user_value(&alice, "deadline_levels_tto_mine").is_some());

    // same window again: nothing new
    h.set_watermark(&alice, JobKind::Agent, T_22_00);
    h.sink.clear();
    run(&h).await;
    assert!(h.sink.calls_for("ticket_tto_warning").is_empty());
}

#[tokio::test]
async fn ticket_routed_to_team_while_unassigned() {
    let h = Harness::new();
    let alice = alice(&h);
    h.remote.objects("Team", "l.person_id = 17", vec![("3".to_string(), json!({ "name": "Support" }))]);
    h.tickets(
        "WHERE team_id IN (3)",
        vec![("50", ticket("0", "3", "new")), ("51", ticket("9", "3", "assigned"))],
    );
    h.scalar_changes(&[
        scalar_change("50", "team_id", "1", "3", "2025-11-05 22:10:00", Some("99")),
        scalar_change("51", "team_id", "1", "3", "2025-11-05 22:20:00", Some("99")),
        scalar_change("50", "team_id", "3", "4", "2025-11-05 22:30:00", Some("99")),
    ]);

    let summary = run(&h).await;

    assert_eq!(summary.failed, 0);
    let calls = h.sink.calls_for("team_unassigned_new");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].parameters()["ticket_id"], "50");
    assert_eq!(calls[0].parameters()["team_id"], "3");
    assert!(h.raw_user_value(&alice, "deadline_levels_tto_team_unassigned").is_none());
}

#[tokio::test]
async fn no_tickets_still_advances_watermark() {
    let h = Harness::new();
    let alice = h.enroll("alice", "17", "5");
    h.set_watermark(&alice, JobKind::Agent, T_22_00);
    let summary = run(&h).await;
    assert_eq!(summary.processed, 1);
    assert!(h.remote.calls_for(crate::query::SCALAR_CHANGE_CLASS).is_empty());
    assert_eq!(
        h.config.watermark(&alice, JobKind::Agent, &RemoteTimezone::default()),
        Some(T_23_00)
    );
}

#[test]
fn truthy_sla_flags() {
    assert!(is_truthy("1"));
    assert!(is_truthy(" Yes "));
    assert!(is_truthy("true"));
    assert!(!is_truthy("0"));
    assert!(!is_truthy(""));
    assert!(!is_truthy("no"));
}
