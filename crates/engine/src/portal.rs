// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Portal detection steps: what happened to the tickets a user submitted.

use crate::context::{UserContext, Window};
use crate::error::JobError;
use crate::runner::{change_event, index, ticket_ids, JobRunner, Tally};
use itn_adapters::{NotificationSink, RemoteClient};
use itn_core::{ChangeRecord, Clock, NotificationBudget, NotificationType, SubjectType};

const RESOLVED: &str = "resolved";

/// Scalar attributes watched on the user's requests.
fn portal_attributes(ctx: &UserContext) -> Vec<&'static str> {
    let mut attributes = Vec::new();
    if ctx.is_enabled(NotificationType::TicketStatusChanged)
        || ctx.is_enabled(NotificationType::TicketResolved)
    {
        attributes.push("status");
    }
    if ctx.is_enabled(NotificationType::AgentAssigned) {
        attributes.push("agent_id");
    }
    attributes
}

/// Subject for a status transition, if the user wants it.
///
/// A move to `resolved` is only ever reported as resolved.
fn status_subject(ctx: &UserContext, change: &ChangeRecord) -> Option<SubjectType> {
    if change.newvalue == RESOLVED {
        ctx.is_enabled(NotificationType::TicketResolved).then_some(SubjectType::TicketResolved)
    } else {
        ctx.is_enabled(NotificationType::TicketStatusChanged)
            .then_some(SubjectType::TicketStatusChanged)
    }
}

impl<R, N, C> JobRunner<R, N, C>
where
    R: RemoteClient,
    N: NotificationSink,
    C: Clock,
{
    pub(crate) async fn portal_steps(
        &self,
        ctx: &UserContext,
        window: Window,
        budget: &mut NotificationBudget,
        tally: &mut Tally,
    ) -> Result<(), JobError> {
        let tickets = self.directory.tickets_for_caller(ctx).await?;
        if tickets.is_empty() {
            tracing::debug!(user = %ctx.user, "no trackable tickets");
            return Ok(());
        }
        let ids = ticket_ids(&tickets);
        let changes = self.detector.get_changes(ctx, &ids, window, &portal_attributes(ctx)).await?;
        let by_id = index(&tickets);

        // status transitions
        for change in changes.iter().filter(|c| c.attcode == "status" && !c.is_noop()) {
            let Some(subject) = status_subject(ctx, change) else {
                continue;
            };
            let ticket = by_id.get(change.objkey.as_str()).copied();
            let mut event =
                change_event(ctx, subject, change, ticket).with_param("new_status", &change.newvalue);
            if subject == SubjectType::TicketStatusChanged {
                event = event.with_param("old_status", &change.oldvalue);
            }
            if !self.emit(ctx, budget, tally, event, Some(change)).await {
                return Ok(());
            }
        }

        // agent assignment
        if ctx.is_enabled(NotificationType::AgentAssigned) && !budget.is_exhausted() {
            for change in changes.iter().filter(|c| c.attcode == "agent_id" && !c.is_noop()) {
                let old_agent = self.agent_name(ctx, &change.oldvalue).await?;
                let new_agent = self.agent_name(ctx, &change.newvalue).await?;
                let event = change_event(
                    ctx,
                    SubjectType::AgentAssigned,
                    change,
                    by_id.get(change.objkey.as_str()).copied(),
                )
                .with_param("old_agent_id", &change.oldvalue)
                .with_param("new_agent_id", &change.newvalue)
                .with_param("old_agent", old_agent)
                .with_param("new_agent", new_agent);
                if !self.emit(ctx, budget, tally, event, Some(change)).await {
                    return Ok(());
                }
            }
        }

        // agent responses
        if ctx.is_enabled(NotificationType::AgentResponded) && !budget.is_exhausted() {
            let responses = self.detector.get_changes(ctx, &ids, window, &["public_log"]).await?;
            for change in responses.iter().filter(|c| !c.is_system() && !c.is_noop()) {
                let event = change_event(
                    ctx,
                    SubjectType::AgentResponded,
                    change,
                    by_id.get(change.objkey.as_str()).copied(),
                )
                .with_param("author", &change.userinfo);
                if !self.emit(ctx, budget, tally, event, Some(change)).await {
                    return Ok(());
                }
            }
        } else if budget.is_exhausted() {
            tracing::debug!(user = %ctx.user, "budget exhausted, skipping remaining steps");
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "portal_tests.rs"]
mod tests;
