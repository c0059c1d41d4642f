// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent detection steps.
//!
//! Steps run in a fixed order against one shared budget; once it is spent
//! the remaining steps are skipped.

use crate::context::{UserContext, Window};
use crate::directory::Ticket;
use crate::error::JobError;
use crate::runner::{change_event, index, ticket_ids, with_ticket, JobRunner, Tally};
use itn_adapters::{NotificationSink, RemoteClient};
use itn_core::{
    ChangeRecord, Clock, DeadlineKind, DeadlineScope, NotificationBudget, NotificationEvent,
    NotificationType, PersonId, SubjectType,
};
use std::collections::BTreeMap;

const CRITICAL_PRIORITY: &str = "1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AgentStep {
    Assignment,
    TeamUnassigned,
    Deadlines,
    SlaBreach,
    PriorityCritical,
    Comments,
}

const AGENT_STEPS: [AgentStep; 6] = [
    AgentStep::Assignment,
    AgentStep::TeamUnassigned,
    AgentStep::Deadlines,
    AgentStep::SlaBreach,
    AgentStep::PriorityCritical,
    AgentStep::Comments,
];

/// Deadline checks, in order.
const DEADLINE_CHECKS: [(DeadlineKind, DeadlineScope, SubjectType); 3] = [
    (DeadlineKind::Tto, DeadlineScope::Mine, SubjectType::TicketTtoWarning),
    (DeadlineKind::Tto, DeadlineScope::TeamUnassigned, SubjectType::TicketTtoWarning),
    (DeadlineKind::Ttr, DeadlineScope::Mine, SubjectType::TicketTtrWarning),
];

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "yes" | "true")
}

/// Scalar attributes watched on the agent's own tickets.
fn own_attributes(ctx: &UserContext) -> Vec<&'static str> {
    let mut attributes = Vec::new();
    if ctx.is_enabled(NotificationType::TicketAssigned) {
        attributes.push("agent_id");
    }
    if ctx.is_enabled(NotificationType::TicketSlaBreach) {
        attributes.extend([DeadlineKind::Tto.passed_field(), DeadlineKind::Ttr.passed_field()]);
    }
    if ctx.is_enabled(NotificationType::TicketPriorityCritical) {
        attributes.push("priority");
    }
    attributes
}

/// Tickets discovered before the steps run.
///
/// Change logs are fetched by the steps themselves, so a step skipped for
/// budget costs no remote query.
struct AgentScan {
    mine: Vec<Ticket>,
    teams: Vec<String>,
    team_tickets: Vec<Ticket>,
    own_changes: Option<Vec<ChangeRecord>>,
}

impl AgentScan {
    fn ticket(&self, id: &str) -> Option<&Ticket> {
        self.mine.iter().chain(&self.team_tickets).find(|t| t.id == id)
    }

    fn own_changes(&self) -> &[ChangeRecord] {
        self.own_changes.as_deref().unwrap_or_default()
    }
}

impl<R, N, C> JobRunner<R, N, C>
where
    R: RemoteClient,
    N: NotificationSink,
    C: Clock,
{
    pub(crate) async fn agent_steps(
        &self,
        ctx: &UserContext,
        window: Window,
        budget: &mut NotificationBudget,
        tally: &mut Tally,
    ) -> Result<(), JobError> {
        let mine = self.directory.tickets_for_agent(ctx).await?;
        let teams = self.directory.teams(ctx).await?;
        let team_tickets = self.directory.tickets_for_teams(ctx, &teams).await?;
        if mine.is_empty() && team_tickets.is_empty() {
            tracing::debug!(user = %ctx.user, "no trackable tickets");
            return Ok(());
        }

        let mut scan = AgentScan { mine, teams, team_tickets, own_changes: None };

        for step in AGENT_STEPS {
            if budget.is_exhausted() {
                tracing::debug!(user = %ctx.user, ?step, "budget exhausted, skipping remaining steps");
                break;
            }
            match step {
                AgentStep::Assignment => {
                    if ctx.is_enabled(NotificationType::TicketAssigned) {
                        self.fetch_own_changes(ctx, &mut scan, window).await?;
                        self.assignment_step(ctx, &scan, budget, tally).await;
                    }
                }
                AgentStep::TeamUnassigned => {
                    self.team_unassigned_step(ctx, &scan, window, budget, tally).await?
                }
                AgentStep::Deadlines => self.deadline_step(ctx, &scan, window, budget, tally).await?,
                AgentStep::SlaBreach => {
                    if ctx.is_enabled(NotificationType::TicketSlaBreach) {
                        self.fetch_own_changes(ctx, &mut scan, window).await?;
                        self.sla_breach_step(ctx, &scan, budget, tally).await;
                    }
                }
                AgentStep::PriorityCritical => {
                    if ctx.is_enabled(NotificationType::TicketPriorityCritical) {
                        self.fetch_own_changes(ctx, &mut scan, window).await?;
                        self.priority_step(ctx, &scan, budget, tally).await;
                    }
                }
                AgentStep::Comments => self.comment_step(ctx, &scan, window, budget, tally).await?,
            }
        }
        Ok(())
    }

    /// Scalar changes on the user's own tickets, fetched once on first use.
    async fn fetch_own_changes(
        &self,
        ctx: &UserContext,
        scan: &mut AgentScan,
        window: Window,
    ) -> Result<(), JobError> {
        if scan.own_changes.is_none() {
            let changes = self
                .detector
                .get_changes(ctx, &ticket_ids(&scan.mine), window, &own_attributes(ctx))
                .await?;
            scan.own_changes = Some(changes);
        }
        Ok(())
    }

    /// `agent_id` set to the user: assigned from empty, reassigned otherwise.
    async fn assignment_step(
        &self,
        ctx: &UserContext,
        scan: &AgentScan,
        budget: &mut NotificationBudget,
        tally: &mut Tally,
    ) {
        if !ctx.is_enabled(NotificationType::TicketAssigned) {
            return;
        }
        let me = ctx.identity.person_id.as_str();
        for change in scan.own_changes().iter().filter(|c| c.attcode == "agent_id" && !c.is_noop()) {
            if change.newvalue != me {
                continue;
            }
            let event = if PersonId::is_unset(&change.oldvalue) {
                change_event(ctx, SubjectType::TicketAssigned, change, scan.ticket(&change.objkey))
            } else {
                change_event(ctx, SubjectType::TicketReassigned, change, scan.ticket(&change.objkey))
                    .with_param("old_agent_id", &change.oldvalue)
            };
            if !self.emit(ctx, budget, tally, event, Some(change)).await {
                return;
            }
        }
    }

    /// Ticket routed to one of the user's teams while nobody owns it.
    async fn team_unassigned_step(
        &self,
        ctx: &UserContext,
        scan: &AgentScan,
        window: Window,
        budget: &mut NotificationBudget,
        tally: &mut Tally,
    ) -> Result<(), JobError> {
        if !ctx.is_enabled(NotificationType::TeamUnassignedNew) {
            return Ok(());
        }
        let changes = self
            .detector
            .get_changes(ctx, &ticket_ids(&scan.team_tickets), window, &["team_id"])
            .await?;
        let team_tickets = index(&scan.team_tickets);
        for change in changes.iter().filter(|c| c.attcode == "team_id" && !c.is_noop()) {
            if !scan.teams.contains(&change.newvalue) {
                continue;
            }
            let Some(ticket) = team_tickets.get(change.objkey.as_str()).copied() else {
                continue;
            };
            if !ticket.is_unassigned() {
                continue;
            }
            let event = change_event(ctx, SubjectType::TeamUnassignedNew, change, Some(ticket))
                .with_param("team_id", &change.newvalue);
            if !self.emit(ctx, budget, tally, event, Some(change)).await {
                break;
            }
        }
        Ok(())
    }

    async fn deadline_step(
        &self,
        ctx: &UserContext,
        scan: &AgentScan,
        window: Window,
        budget: &mut NotificationBudget,
        tally: &mut Tally,
    ) -> Result<(), JobError> {
        for (kind, scope, subject) in DEADLINE_CHECKS {
            if !ctx.is_enabled(subject.notification_type()) || budget.is_exhausted() {
                continue;
            }
            let crossings = self
                .detector
                .get_tickets_approaching_deadline(ctx, kind, scope, &scan.teams, window)
                .await?;
            for crossing in crossings {
                let event = NotificationEvent::new(
                    ctx.user.clone(),
                    subject,
                    &crossing.ticket_id,
                    &crossing.ticket_class,
                    ctx.tz.format_epoch(crossing.crossed_at),
                )
                .with_param("level", crossing.level.to_string())
                .with_param("deadline", &crossing.deadline)
                .with_param("scope", scope.to_string());
                let event = with_ticket(event, scan.ticket(&crossing.ticket_id));
                if !self.emit(ctx, budget, tally, event, None).await {
                    return Ok(());
                }
            }
        }
        Ok(())
    }

    /// `sla_tto_passed` / `sla_ttr_passed` flipping to true.
    async fn sla_breach_step(
        &self,
        ctx: &UserContext,
        scan: &AgentScan,
        budget: &mut NotificationBudget,
        tally: &mut Tally,
    ) {
        if !ctx.is_enabled(NotificationType::TicketSlaBreach) {
            return;
        }
        let flags: BTreeMap<&str, DeadlineKind> = [DeadlineKind::Tto, DeadlineKind::Ttr]
            .into_iter()
            .map(|kind| (kind.passed_field(), kind))
            .collect();
        for change in scan.own_changes() {
            let Some(kind) = flags.get(change.attcode.as_str()) else {
                continue;
            };
            if !is_truthy(&change.newvalue) || is_truthy(&change.oldvalue) {
                continue;
            }
            let event =
                change_event(ctx, SubjectType::TicketSlaBreach, change, scan.ticket(&change.objkey))
                    .with_param("sla_type", kind.to_string());
            if !self.emit(ctx, budget, tally, event, Some(change)).await {
                return;
            }
        }
    }

    /// Priority raised to critical from anything else.
    async fn priority_step(
        &self,
        ctx: &UserContext,
        scan: &AgentScan,
        budget: &mut NotificationBudget,
        tally: &mut Tally,
    ) {
        if !ctx.is_enabled(NotificationType::TicketPriorityCritical) {
            return;
        }
        for change in scan.own_changes().iter().filter(|c| c.attcode == "priority") {
            if change.newvalue != CRITICAL_PRIORITY || change.oldvalue == CRITICAL_PRIORITY {
                continue;
            }
            let event = change_event(
                ctx,
                SubjectType::TicketPriorityCritical,
                change,
                scan.ticket(&change.objkey),
            )
            .with_param("old_priority", &change.oldvalue);
            if !self.emit(ctx, budget, tally, event, Some(change)).await {
                return;
            }
        }
    }

    /// New public or private log entries written by someone else.
    async fn comment_step(
        &self,
        ctx: &UserContext,
        scan: &AgentScan,
        window: Window,
        budget: &mut NotificationBudget,
        tally: &mut Tally,
    ) -> Result<(), JobError> {
        if !ctx.is_enabled(NotificationType::TicketComment) {
            return Ok(());
        }
        let changes = self
            .detector
            .get_changes(ctx, &ticket_ids(&scan.mine), window, &["public_log", "private_log"])
            .await?;
        for change in &changes {
            let log_type = match change.attcode.as_str() {
                "public_log" => "public",
                "private_log" => "private",
                _ => continue,
            };
            if change.is_system() || change.is_noop() {
                continue;
            }
            let event =
                change_event(ctx, SubjectType::TicketComment, change, scan.ticket(&change.objkey))
                    .with_param("log_type", log_type)
                    .with_param("author", &change.userinfo);
            if !self.emit(ctx, budget, tally, event, Some(change)).await {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
