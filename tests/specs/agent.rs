// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent job scenarios
//!
//! An agent owns tickets; the job reports who moved work onto them.

use crate::prelude::*;
use std::time::Duration;

/// Alice: person 17, account 5, owner of ticket 42, last checked at 22:00.
fn alice(world: &World) -> UserId {
    let alice = world.enroll("alice", "17", "5");
    world.tickets("WHERE agent_id = 17", vec![("42", ticket("17", "assigned"))]);
    world.repo.set_watermark(&alice, JobKind::Agent, T_22_00).unwrap();
    alice
}

#[tokio::test]
async fn reassignment_is_delivered_once_across_runs() {
    let world = World::new();
    let alice = alice(&world);
    world.scalar_changes(vec![scalar("42", "agent_id", "9", "17", "2025-11-05 22:40:21", "99")]);

    let first = world.run_agent().await;

    assert_eq!(first.sent, 1);
    let calls = world.sink.calls_for("ticket_reassigned");
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].user_id(), "alice");
    assert_eq!(calls[0].parameters()["old_agent_id"], "9");
    assert_eq!(calls[0].parameters()["ticket_ref"], "R-000042");
    assert_eq!(world.watermark(&alice, JobKind::Agent), Some(T_23_00));

    // too early: the user's interval has not elapsed
    let early = world.run_agent().await;
    assert_eq!(early.skipped, 1);

    // due again, but the change now sits behind the watermark
    world.advance(Duration::from_secs(300));
    let second = world.run_agent().await;
    assert_eq!(second.processed, 1);
    assert_eq!(second.sent, 0);
    assert_eq!(world.sink.calls().len(), 1);
    assert_eq!(world.watermark(&alice, JobKind::Agent), Some(T_23_00 + 300));
}

#[tokio::test]
async fn admin_disabled_type_overrides_user_choice() {
    let world = World::new();
    alice(&world);
    world.repo.set_admin_policy(NotificationType::TicketAssigned, AdminPolicy::Disabled).unwrap();
    world.scalar_changes(vec![scalar("42", "agent_id", "9", "17", "2025-11-05 22:40:21", "99")]);

    let summary = world.run_agent().await;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.sent, 0);
    assert!(world.sink.calls().is_empty());
}

#[tokio::test]
async fn comments_are_reported_with_their_log() {
    let world = World::new();
    alice(&world);
    world.log_changes(vec![
        log("42", "public_log", "Rebooted it", "2025-11-05 22:10:00", "99"),
        log("42", "private_log", "Again?", "2025-11-05 22:20:00", "98"),
        log("42", "public_log", "On my way", "2025-11-05 22:30:00", "5"),
    ]);

    world.run_agent().await;

    let logs: Vec<(String, String)> = world
        .sink
        .calls_for("ticket_comment")
        .iter()
        .map(|n| (n.parameters()["log_type"].clone(), n.parameters()["author"].clone()))
        .collect();
    similar_asserts::assert_eq!(
        logs,
        vec![("public".to_string(), "User 99".to_string()), ("private".to_string(), "User 98".to_string())]
    );
}

#[tokio::test]
async fn jobs_keep_separate_watermarks() {
    let world = World::new();
    let alice = alice(&world);

    world.run_agent().await;

    assert_eq!(world.watermark(&alice, JobKind::Agent), Some(T_23_00));
    assert_eq!(world.watermark(&alice, JobKind::Portal), None);

    world.run_portal().await;
    assert_eq!(world.watermark(&alice, JobKind::Portal), Some(T_23_00));
}
