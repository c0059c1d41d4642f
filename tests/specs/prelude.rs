// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared world for scenario specs.

use std::sync::Arc;
use std::time::Duration;

pub use itn_adapters::{FakeNotificationSink, FakeRemoteClient, MemoryCacheBackend, MemoryConfigStore};
pub use itn_core::{AdminPolicy, FakeClock, JobKind, NotificationType, RemoteIdentity, RemoteTimezone, UserId};
pub use itn_engine::query::{CASELOG_CHANGE_CLASS, SCALAR_CHANGE_CLASS};
pub use itn_engine::{AgentJob, JobDeps, JobRunner, PortalJob, RunSummary};
pub use itn_storage::ConfigRepository;
pub use serde_json::{json, Value};

/// 2025-11-05 22:00:00 UTC
pub const T_22_00: i64 = 1_762_380_000;
/// 2025-11-05 23:00:00 UTC
pub const T_23_00: i64 = 1_762_383_600;

type Runner = JobRunner<FakeRemoteClient, FakeNotificationSink, FakeClock>;

pub struct World {
    pub remote: FakeRemoteClient,
    pub sink: FakeNotificationSink,
    pub repo: ConfigRepository,
    pub clock: FakeClock,
    runner: Arc<Runner>,
}

impl World {
    pub fn new() -> Self {
        let clock = FakeClock::at_epoch(T_23_00);
        let remote = FakeRemoteClient::new();
        let sink = FakeNotificationSink::new();
        let repo = ConfigRepository::new(Arc::new(MemoryConfigStore::new()));
        let runner = Arc::new(JobRunner::new(
            JobDeps {
                remote: remote.clone(),
                sink: sink.clone(),
                config: repo.clone(),
                cache: Arc::new(MemoryCacheBackend::new(clock.clone())),
            },
            clock.clone(),
        ));
        Self { remote, sink, repo, clock, runner }
    }

    /// Enabled user bound to a person and account, holding a personal token.
    pub fn enroll(&self, name: &str, person: &str, account: &str) -> UserId {
        let user = UserId::new(name);
        self.repo.set_notifications_enabled(&user, true).unwrap();
        self.repo
            .set_identity(
                &user,
                &RemoteIdentity {
                    person_id: person.into(),
                    user_id: Some(account.to_string()),
                    display_name: Some(format!("User {account}")),
                },
            )
            .unwrap();
        self.repo.set_user_token(&user, "token").unwrap();
        user
    }

    pub fn tickets(&self, key_contains: &str, tickets: Vec<(&str, Value)>) {
        let objects = tickets.into_iter().map(|(id, fields)| (id.to_string(), fields)).collect();
        self.remote.objects("UserRequest", key_contains, objects);
    }

    pub fn scalar_changes(&self, changes: Vec<Value>) {
        let objects = changes.into_iter().enumerate().map(|(i, c)| ((1000 + i).to_string(), c)).collect();
        self.remote.objects(SCALAR_CHANGE_CLASS, "", objects);
    }

    pub fn log_changes(&self, entries: Vec<Value>) {
        let objects = entries.into_iter().enumerate().map(|(i, c)| ((2000 + i).to_string(), c)).collect();
        self.remote.objects(CASELOG_CHANGE_CLASS, "", objects);
    }

    pub fn watermark(&self, user: &UserId, kind: JobKind) -> Option<i64> {
        self.repo.watermark(user, kind, &RemoteTimezone::default())
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub async fn run_agent(&self) -> RunSummary {
        AgentJob::new(Arc::clone(&self.runner)).run().await
    }

    pub async fn run_portal(&self) -> RunSummary {
        PortalJob::new(Arc::clone(&self.runner)).run().await
    }
}

pub fn ticket(agent_id: &str, status: &str) -> Value {
    json!({
        "ref": "R-000042",
        "title": "Printer on fire",
        "status": status,
        "agent_id": agent_id,
        "team_id": "3",
        "priority": "3",
    })
}

pub fn scalar(ticket: &str, attcode: &str, old: &str, new: &str, date: &str, actor: &str) -> Value {
    json!({
        "objkey": ticket,
        "objclass": "UserRequest",
        "attcode": attcode,
        "oldvalue": old,
        "newvalue": new,
        "date": date,
        "userinfo": format!("User {actor}"),
        "user_id": actor,
    })
}

pub fn log(ticket: &str, attcode: &str, text: &str, date: &str, actor: &str) -> Value {
    json!({
        "objkey": ticket,
        "objclass": "UserRequest",
        "attcode": attcode,
        "lastentry": text,
        "date": date,
        "userinfo": format!("User {actor}"),
        "user_id": actor,
    })
}
