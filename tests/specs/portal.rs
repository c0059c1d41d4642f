// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Portal job scenarios
//!
//! A caller follows their own requests.

use crate::prelude::*;
use std::collections::BTreeSet;

/// Bob: person 31, account 6, caller on ticket 42, last checked at 22:00.
fn bob(world: &World) -> UserId {
    let bob = world.enroll("bob", "31", "6");
    world.tickets("WHERE caller_id = 31", vec![("42", ticket("9", "assigned"))]);
    world.repo.set_watermark(&bob, JobKind::Portal, T_22_00).unwrap();
    bob
}

#[tokio::test]
async fn caller_hears_about_resolution_and_replies() {
    let world = World::new();
    let bob = bob(&world);
    world.scalar_changes(vec![scalar("42", "status", "assigned", "resolved", "2025-11-05 22:40:21", "99")]);
    world.log_changes(vec![
        log("42", "public_log", "Replaced the toner", "2025-11-05 22:35:00", "99"),
        log("42", "public_log", "Thanks!", "2025-11-05 22:50:00", "6"),
    ]);

    let summary = world.run_portal().await;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.sent, 2);
    let resolved = world.sink.calls_for("ticket_resolved");
    assert_eq!(resolved.len(), 1);
    assert_eq!(resolved[0].user_id(), "bob");
    assert_eq!(resolved[0].parameters()["new_status"], "resolved");
    assert!(world.sink.calls_for("ticket_status_changed").is_empty());
    let replies = world.sink.calls_for("agent_responded");
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].parameters()["author"], "User 99");
    assert_eq!(world.watermark(&bob, JobKind::Portal), Some(T_23_00));
}

#[tokio::test]
async fn opted_out_caller_gets_nothing_for_that_type() {
    let world = World::new();
    let bob = bob(&world);
    world
        .repo
        .set_opted_out_types(&bob, JobKind::Portal, &BTreeSet::from([NotificationType::TicketResolved]))
        .unwrap();
    world.scalar_changes(vec![scalar("42", "status", "assigned", "resolved", "2025-11-05 22:40:21", "99")]);

    let summary = world.run_portal().await;

    assert_eq!(summary.sent, 0);
    assert!(world.sink.calls().is_empty());
}

#[tokio::test]
async fn disabled_user_is_skipped() {
    let world = World::new();
    let bob = bob(&world);
    world.repo.set_notifications_enabled(&bob, false).unwrap();

    let summary = world.run_portal().await;

    assert_eq!(summary.skipped, 1);
    assert!(world.remote.calls().is_empty());
    assert_eq!(world.watermark(&bob, JobKind::Portal), Some(T_22_00));
}
