// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Turns detected events into sink notifications.

use crate::context::UserContext;
use itn_adapters::NotificationSink;
use itn_core::{ChangeRecord, Clock, NotificationBudget, NotificationEvent};

/// App id notifications are filed under.
pub const APP_ID: &str = "integration_itop";

/// Object type carried by every notification; the key is the event's
/// idempotency key.
pub const OBJECT_TYPE: &str = "ticket";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    /// The user caused the change.
    Suppressed,
    BudgetExhausted,
    /// The sink rejected it; logged, not retried.
    Failed,
}

pub struct NotificationDispatcher<N, C: Clock> {
    sink: N,
    clock: C,
}

impl<N: NotificationSink, C: Clock> NotificationDispatcher<N, C> {
    pub fn new(sink: N, clock: C) -> Self {
        Self { sink, clock }
    }

    /// Hand one event to the sink.
    ///
    /// `source` is the change that triggered the event, if any; events caused
    /// by the user themselves are dropped. Every send attempt consumes
    /// budget, failed ones included.
    pub async fn dispatch(
        &self,
        ctx: &UserContext,
        budget: &mut NotificationBudget,
        event: NotificationEvent,
        source: Option<&ChangeRecord>,
    ) -> DispatchOutcome {
        if source.is_some_and(|change| change.is_by(&ctx.identity)) {
            tracing::debug!(
                user = %ctx.user,
                subject = %event.subject,
                ticket = %event.ticket_id,
                "own change, not notifying"
            );
            return DispatchOutcome::Suppressed;
        }
        if budget.is_exhausted() {
            tracing::debug!(user = %ctx.user, subject = %event.subject, "notification budget exhausted");
            return DispatchOutcome::BudgetExhausted;
        }

        let key = event.idempotency_key();
        let at = ctx.tz.normalize(&event.timestamp, self.clock.utc_now());
        let mut params = event.params.clone();
        params.insert("ticket_id".to_string(), event.ticket_id.clone());
        params.insert("ticket_class".to_string(), event.ticket_class.clone());
        params.insert("timestamp".to_string(), event.timestamp.clone());

        let notification = self
            .sink
            .create_notification()
            .app(APP_ID)
            .user(&event.user)
            .datetime(at)
            .object(OBJECT_TYPE, key.as_str())
            .subject(event.subject.to_string())
            .params(params);

        budget.consume(1);
        match self.sink.notify(notification).await {
            Ok(()) => {
                tracing::info!(
                    user = %ctx.user,
                    subject = %event.subject,
                    ticket = %event.ticket_id,
                    key = %key,
                    "notification sent"
                );
                DispatchOutcome::Sent
            }
            Err(e) => {
                tracing::warn!(
                    user = %ctx.user,
                    subject = %event.subject,
                    ticket = %event.ticket_id,
                    error = %e,
                    "notification failed"
                );
                DispatchOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
