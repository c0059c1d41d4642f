// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification sink seam.
//!
//! The sink owns final delivery and deduplicates on the notification's
//! object `(type, key)` pair; callers only build the notification.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use itn_core::UserId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;

/// Errors from notify operations
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("incomplete notification: missing {0}")]
    Incomplete(&'static str),
}

/// A notification under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    app: String,
    user: String,
    datetime: DateTime<Utc>,
    object_type: String,
    object_key: String,
    subject: String,
    params: BTreeMap<String, String>,
}

impl Notification {
    pub fn new() -> Self {
        Self {
            app: String::new(),
            user: String::new(),
            datetime: DateTime::<Utc>::default(),
            object_type: String::new(),
            object_key: String::new(),
            subject: String::new(),
            params: BTreeMap::new(),
        }
    }

    itn_core::setters! {
        into { app: String, subject: String }
        set { datetime: DateTime<Utc>, params: BTreeMap<String, String> }
    }

    pub fn user(mut self, user: &UserId) -> Self {
        self.user = user.to_string();
        self
    }

    /// Object reference the sink deduplicates on.
    pub fn object(mut self, object_type: impl Into<String>, object_key: impl Into<String>) -> Self {
        self.object_type = object_type.into();
        self.object_key = object_key.into();
        self
    }

    pub fn app_id(&self) -> &str {
        &self.app
    }

    pub fn user_id(&self) -> &str {
        &self.user
    }

    pub fn at(&self) -> DateTime<Utc> {
        self.datetime
    }

    pub fn object_type(&self) -> &str {
        &self.object_type
    }

    pub fn object_key(&self) -> &str {
        &self.object_key
    }

    pub fn subject_type(&self) -> &str {
        &self.subject
    }

    pub fn parameters(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Reject notifications the sink could not route or deduplicate.
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.app.is_empty() {
            return Err(NotifyError::Incomplete("app"));
        }
        if self.user.is_empty() {
            return Err(NotifyError::Incomplete("user"));
        }
        if self.object_type.is_empty() || self.object_key.is_empty() {
            return Err(NotifyError::Incomplete("object"));
        }
        if self.subject.is_empty() {
            return Err(NotifyError::Incomplete("subject"));
        }
        Ok(())
    }
}

impl Default for Notification {
    fn default() -> Self {
        Self::new()
    }
}

/// Adapter for delivering notifications
#[async_trait]
pub trait NotificationSink: Clone + Send + Sync + 'static {
    /// Start a new notification.
    fn create_notification(&self) -> Notification {
        Notification::new()
    }

    /// Deliver a notification; duplicates of an already-delivered object are dropped.
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}

/// Number of delivered object keys remembered for deduplication.
const DESKTOP_DEDUP_CAPACITY: usize = 10_000;

#[derive(Default)]
struct SeenKeys {
    set: HashSet<(String, String, String)>,
    order: VecDeque<(String, String, String)>,
}

impl SeenKeys {
    /// Returns false when the key was already present.
    fn insert(&mut self, key: (String, String, String)) -> bool {
        if self.set.contains(&key) {
            return false;
        }
        if self.order.len() >= DESKTOP_DEDUP_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.set.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.set.insert(key);
        true
    }
}

/// Desktop notification sink using notify-rust.
///
/// Remembers the last delivered object keys per user so a re-run over the
/// same change log does not pop the same notification twice.
#[derive(Clone, Default)]
pub struct DesktopNotificationSink {
    seen: Arc<Mutex<SeenKeys>>,
}

impl DesktopNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Human-readable title and body for a notification.
pub fn render(notification: &Notification) -> (String, String) {
    let params = notification.parameters();
    let ticket = params
        .get("ticket_ref")
        .or_else(|| params.get("ticket_id"))
        .cloned()
        .unwrap_or_else(|| notification.object_key().to_string());
    let get = |key: &str| params.get(key).map(String::as_str).unwrap_or("");
    let body = match notification.subject_type() {
        "ticket_status_changed" => format!("Status changed to {}", get("new_status")),
        "ticket_resolved" => "Your ticket has been resolved".to_string(),
        "agent_assigned" => format!("Now handled by {}", get("new_agent")),
        "agent_responded" => format!("{} replied", get("author")),
        "ticket_assigned" => "Assigned to you".to_string(),
        "ticket_reassigned" => "Reassigned to you".to_string(),
        "team_unassigned_new" => "New unassigned ticket for your team".to_string(),
        "ticket_tto_warning" => format!("Time to own expires in {}", get("level")),
        "ticket_ttr_warning" => format!("Time to resolve expires in {}", get("level")),
        "ticket_sla_breach" => format!("SLA {} breached", get("sla_type").to_uppercase()),
        "ticket_priority_critical" => "Priority raised to critical".to_string(),
        "ticket_comment" => format!("New {} comment by {}", get("log_type"), get("author")),
        other => other.to_string(),
    };
    (format!("iTop {}", ticket), body)
}

#[async_trait]
impl NotificationSink for DesktopNotificationSink {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        notification.validate()?;
        let key = (
            notification.user_id().to_string(),
            notification.object_type().to_string(),
            notification.object_key().to_string(),
        );
        if !self.seen.lock().insert(key) {
            tracing::debug!(
                user = notification.user_id(),
                object = notification.object_key(),
                "duplicate notification dropped"
            );
            return Ok(());
        }

        let (title, message) = render(&notification);
        // notify_rust::Notification::show() blocks; keep it off the async runtime.
        tokio::task::spawn_blocking(move || {
            match notify_rust::Notification::new().summary(&title).body(&message).show() {
                Ok(_) => {
                    tracing::info!(%title, "desktop notification sent");
                }
                Err(e) => {
                    tracing::warn!(%title, error = %e, "desktop notification failed");
                }
            }
        });
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{Notification, NotificationSink, NotifyError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeSinkState {
        calls: Vec<Notification>,
        fail: bool,
    }

    /// Recording sink for tests; keeps every call, duplicates included.
    #[derive(Clone, Default)]
    pub struct FakeNotificationSink {
        inner: Arc<Mutex<FakeSinkState>>,
    }

    impl FakeNotificationSink {
        pub fn new() -> Self {
            Self::default()
        }

        /// All notifications handed to the sink.
        pub fn calls(&self) -> Vec<Notification> {
            self.inner.lock().calls.clone()
        }

        /// Object keys of every call, in order.
        pub fn object_keys(&self) -> Vec<String> {
            self.inner.lock().calls.iter().map(|n| n.object_key().to_string()).collect()
        }

        /// Calls for one subject type.
        pub fn calls_for(&self, subject: &str) -> Vec<Notification> {
            self.inner.lock().calls.iter().filter(|n| n.subject_type() == subject).cloned().collect()
        }

        /// Make subsequent deliveries fail.
        pub fn set_failing(&self, fail: bool) {
            self.inner.lock().fail = fail;
        }

        pub fn clear(&self) {
            self.inner.lock().calls.clear();
        }
    }

    #[async_trait]
    impl NotificationSink for FakeNotificationSink {
        async fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
            notification.validate()?;
            let mut inner = self.inner.lock();
            if inner.fail {
                return Err(NotifyError::SendFailed("fake sink failure".to_string()));
            }
            inner.calls.push(notification);
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotificationSink;

#[cfg(test)]
#[path = "notify_tests.rs"]
mod tests;
