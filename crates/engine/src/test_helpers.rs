// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for engine tests.

use crate::context::UserContext;
use crate::query::{CASELOG_CHANGE_CLASS, SCALAR_CHANGE_CLASS};
use crate::runner::{JobDeps, JobRunner};
use itn_adapters::{
    ConfigStore, FakeNotificationSink, FakeRemoteClient, MemoryCacheBackend, MemoryConfigStore,
};
use itn_core::{ChangeRecord, FakeClock, JobKind, RemoteIdentity, UserId};
use itn_storage::ConfigRepository;
use serde_json::{json, Value};
use std::sync::Arc;

/// 2025-11-05 22:00:00 UTC
pub(crate) const T_22_00: i64 = 1_762_380_000;
/// 2025-11-05 22:40:21 UTC
pub(crate) const T_22_40_21: i64 = 1_762_382_421;
/// 2025-11-05 23:00:00 UTC; the harness clock starts here.
pub(crate) const T_23_00: i64 = 1_762_383_600;

pub(crate) type TestRunner = JobRunner<FakeRemoteClient, FakeNotificationSink, FakeClock>;

pub(crate) struct Harness {
    pub remote: FakeRemoteClient,
    pub sink: FakeNotificationSink,
    pub store: MemoryConfigStore,
    pub cache: MemoryCacheBackend<FakeClock>,
    pub clock: FakeClock,
    pub config: ConfigRepository,
}

impl Harness {
    pub fn new() -> Self {
        let clock = FakeClock::at_epoch(T_23_00);
        let store = MemoryConfigStore::new();
        Self {
            remote: FakeRemoteClient::new(),
            sink: FakeNotificationSink::new(),
            cache: MemoryCacheBackend::new(clock.clone()),
            config: ConfigRepository::new(Arc::new(store.clone())),
            store,
            clock,
        }
    }

    pub fn runner(&self) -> TestRunner {
        JobRunner::new(
            JobDeps {
                remote: self.remote.clone(),
                sink: self.sink.clone(),
                config: self.config.clone(),
                cache: Arc::new(self.cache.clone()),
            },
            self.clock.clone(),
        )
    }

    /// Enabled user bound to iTop person `person`, account `account`, with a
    /// personal token.
    pub fn enroll(&self, user: &str, person: &str, account: &str) -> UserId {
        let user = UserId::new(user);
        let identity = RemoteIdentity {
            person_id: person.into(),
            user_id: Some(account.to_string()),
            display_name: Some(format!("User {account}")),
        };
        self.config.set_notifications_enabled(&user, true).unwrap();
        self.config.set_identity(&user, &identity).unwrap();
        self.config.set_user_token(&user, "token").unwrap();
        user
    }

    pub fn ctx(&self, user: &UserId, kind: JobKind) -> UserContext {
        let (credential, credential_source) = self.config.credential(user).unwrap();
        UserContext {
            user: user.clone(),
            kind,
            identity: self.config.identity(user).unwrap(),
            credential,
            credential_source,
            tz: self.config.timezone(),
            enabled: self.config.enabled_types(user, kind),
        }
    }

    /// Respond to every scalar change-log query with `changes`.
    pub fn scalar_changes(&self, changes: &[ChangeRecord]) {
        let objects = changes
            .iter()
            .enumerate()
            .map(|(i, c)| ((1000 + i).to_string(), change_fields(c)))
            .collect();
        self.remote.objects(SCALAR_CHANGE_CLASS, "", objects);
    }

    /// Respond to every case-log change query with `entries`.
    pub fn log_changes(&self, entries: &[ChangeRecord]) {
        let objects = entries
            .iter()
            .enumerate()
            .map(|(i, c)| ((2000 + i).to_string(), log_fields(c)))
            .collect();
        self.remote.objects(CASELOG_CHANGE_CLASS, "", objects);
    }

    /// `UserRequest` tickets for queries whose key contains `key_contains`.
    pub fn tickets(&self, key_contains: &str, tickets: Vec<(&str, Value)>) {
        let objects = tickets.into_iter().map(|(id, fields)| (id.to_string(), fields)).collect();
        self.remote.objects("UserRequest", key_contains, objects);
    }

    pub fn set_watermark(&self, user: &UserId, kind: JobKind, epoch: i64) {
        self.config.set_watermark(user, kind, epoch).unwrap();
    }

    pub fn raw_user_value(&self, user: &UserId, key: &str) -> Option<String> {
        self.store.get_user_value(user, key)
    }
}

pub(crate) fn ticket(agent_id: &str, team_id: &str, status: &str) -> Value {
    json!({
        "ref": "R-000000",
        "title": "Printer on fire",
        "status": status,
        "agent_id": agent_id,
        "team_id": team_id,
        "priority": "3",
    })
}

pub(crate) fn change_fields(c: &ChangeRecord) -> Value {
    json!({
        "objkey": c.objkey,
        "objclass": c.objclass,
        "attcode": c.attcode,
        "oldvalue": c.oldvalue,
        "newvalue": c.newvalue,
        "date": c.date,
        "userinfo": c.userinfo,
        "user_id": c.user_id,
    })
}

pub(crate) fn log_fields(c: &ChangeRecord) -> Value {
    json!({
        "objkey": c.objkey,
        "objclass": c.objclass,
        "attcode": c.attcode,
        "lastentry": c.newvalue,
        "date": c.date,
        "userinfo": c.userinfo,
        "user_id": c.user_id,
    })
}
