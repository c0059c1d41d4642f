// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification events and their idempotency keys.

use crate::id::UserId;
use crate::subject::SubjectType;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Hex characters of the timestamp digest kept in the key.
const TIMESTAMP_HASH_LEN: usize = 16;

/// One notification about to be handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub user: UserId,
    pub subject: SubjectType,
    pub ticket_id: String,
    pub ticket_class: String,
    /// Remote timestamp of the triggering change, as received.
    pub timestamp: String,
    /// Extra subject parameters (agent names, levels, log type, ...).
    pub params: BTreeMap<String, String>,
}

impl NotificationEvent {
    pub fn new(
        user: UserId,
        subject: SubjectType,
        ticket_id: impl Into<String>,
        ticket_class: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            user,
            subject,
            ticket_id: ticket_id.into(),
            ticket_class: ticket_class.into(),
            timestamp: timestamp.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<String>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// `{ticket_id}:{subject}:{sha256(timestamp)[..16]}`.
    ///
    /// Depends only on the triggering change, so re-running over the same
    /// change log yields the same key and the sink drops the duplicate.
    pub fn idempotency_key(&self) -> String {
        idempotency_key(&self.ticket_id, self.subject, &self.timestamp)
    }
}

pub fn idempotency_key(ticket_id: &str, subject: SubjectType, timestamp: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(timestamp.as_bytes()));
    format!("{}:{}:{}", ticket_id, subject, &digest[..TIMESTAMP_HASH_LEN])
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
