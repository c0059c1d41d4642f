// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job runner: enumerates users, gates them, and drives one audience's
//! detection steps per user.
//!
//! Users are processed one at a time. A failure aborts only that user's
//! run and leaves their watermark where it was, so the next run covers the
//! same window again; the sink drops the duplicates by idempotency key.

use crate::context::{UserContext, Window};
use crate::detector::ChangeDetector;
use crate::directory::{Directory, Ticket};
use crate::dispatcher::{DispatchOutcome, NotificationDispatcher};
use crate::error::JobError;
use crate::scheduler::UserScheduler;
use itn_adapters::{CacheBackend, NotificationSink, RemoteClient, RemoteError};
use itn_core::{
    ChangeRecord, Clock, JobKind, NotificationBudget, NotificationEvent, PersonId, RemoteTimezone,
    SubjectType, UserId,
};
use itn_storage::{ConfigRepository, CredentialSource, TtlCache};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// How far back a user's first run looks.
pub const FIRST_RUN_LOOKBACK_SECS: i64 = 30 * 24 * 3600;

/// Label used for an empty agent slot.
pub const UNASSIGNED: &str = "Unassigned";

/// External collaborators a runner is built from.
pub struct JobDeps<R, N> {
    pub remote: R,
    pub sink: N,
    pub config: ConfigRepository,
    pub cache: Arc<dyn CacheBackend>,
}

/// Aggregate counters for one job invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub sent: usize,
    pub send_failures: usize,
    pub duration: Duration,
}

/// Dispatch results for one user.
#[derive(Debug, Default)]
pub(crate) struct Tally {
    pub(crate) sent: usize,
    pub(crate) failed: usize,
}

pub struct JobRunner<R, N, C: Clock> {
    pub(crate) config: ConfigRepository,
    pub(crate) directory: Arc<Directory<R, C>>,
    pub(crate) detector: ChangeDetector<R>,
    pub(crate) scheduler: UserScheduler<R, C>,
    pub(crate) dispatcher: NotificationDispatcher<N, C>,
    clock: C,
}

impl<R, N, C> JobRunner<R, N, C>
where
    R: RemoteClient,
    N: NotificationSink,
    C: Clock,
{
    pub fn new(deps: JobDeps<R, N>, clock: C) -> Self {
        let cache = TtlCache::new(deps.cache, clock.clone());
        let directory =
            Arc::new(Directory::new(deps.remote.clone(), cache, deps.config.clone()));
        Self {
            detector: ChangeDetector::new(deps.remote, deps.config.clone()),
            scheduler: UserScheduler::new(deps.config.clone(), Arc::clone(&directory), clock.clone()),
            dispatcher: NotificationDispatcher::new(deps.sink, clock.clone()),
            directory,
            config: deps.config,
            clock,
        }
    }

    /// Run one pass of `kind` over every known user.
    pub async fn run(&self, kind: JobKind) -> RunSummary {
        let started = self.clock.now();
        let now = self.clock.epoch_secs();
        let default_interval = self.config.default_check_interval_secs();
        let tz = self.config.timezone();
        let mut summary = RunSummary::default();

        for user in self.config.users() {
            if let Err(reason) = self.scheduler.gate(&user, kind, default_interval).await {
                tracing::trace!(%user, job = %kind, %reason, "user skipped");
                summary.skipped += 1;
                continue;
            }
            let Some(ctx) = self.context(&user, kind, tz) else {
                summary.skipped += 1;
                continue;
            };
            match self.process_user(&ctx, now).await {
                Ok(tally) => {
                    summary.processed += 1;
                    summary.sent += tally.sent;
                    summary.send_failures += tally.failed;
                }
                Err(e) => {
                    summary.failed += 1;
                    self.handle_failure(&ctx, &e);
                }
            }
        }

        summary.duration = self.clock.now().saturating_duration_since(started);
        tracing::info!(
            job = %kind,
            processed = summary.processed,
            skipped = summary.skipped,
            failed = summary.failed,
            sent = summary.sent,
            send_failures = summary.send_failures,
            duration_ms = summary.duration.as_millis() as u64,
            "job run complete"
        );
        summary
    }

    fn context(&self, user: &UserId, kind: JobKind, tz: RemoteTimezone) -> Option<UserContext> {
        let identity = self.config.identity(user)?;
        let Some((credential, credential_source)) = self.config.credential(user) else {
            tracing::debug!(%user, job = %kind, "no credential, skipping");
            return None;
        };
        Some(UserContext {
            user: user.clone(),
            kind,
            identity,
            credential,
            credential_source,
            tz,
            enabled: self.config.enabled_types(user, kind),
        })
    }

    async fn process_user(&self, ctx: &UserContext, now: i64) -> Result<Tally, JobError> {
        let since = self
            .config
            .watermark(&ctx.user, ctx.kind, &ctx.tz)
            .unwrap_or(now - FIRST_RUN_LOOKBACK_SECS);
        let window = Window { since, until: now };
        let mut budget = NotificationBudget::default();
        let mut tally = Tally::default();

        tracing::debug!(user = %ctx.user, job = %ctx.kind, since, until = now, "processing user");
        match ctx.kind {
            JobKind::Agent => self.agent_steps(ctx, window, &mut budget, &mut tally).await?,
            JobKind::Portal => self.portal_steps(ctx, window, &mut budget, &mut tally).await?,
        }

        self.config.set_watermark(&ctx.user, ctx.kind, now)?;
        Ok(tally)
    }

    fn handle_failure(&self, ctx: &UserContext, error: &JobError) {
        if !error.is_auth_invalid() {
            tracing::warn!(user = %ctx.user, job = %ctx.kind, %error, "user run failed");
            return;
        }
        match ctx.credential_source {
            CredentialSource::User => {
                if let Err(e) = self.config.wipe_user_token(&ctx.user) {
                    tracing::error!(user = %ctx.user, error = %e, "failed to wipe rejected token");
                }
                self.directory.invalidate_profile(&ctx.user);
                tracing::warn!(
                    user = %ctx.user,
                    job = %ctx.kind,
                    %error,
                    "credential rejected, token wiped until re-authentication"
                );
            }
            CredentialSource::Application => {
                tracing::error!(user = %ctx.user, job = %ctx.kind, %error, "application token rejected");
            }
        }
    }

    /// Dispatch one event; `false` once the budget is spent.
    pub(crate) async fn emit(
        &self,
        ctx: &UserContext,
        budget: &mut NotificationBudget,
        tally: &mut Tally,
        event: NotificationEvent,
        source: Option<&ChangeRecord>,
    ) -> bool {
        match self.dispatcher.dispatch(ctx, budget, event, source).await {
            DispatchOutcome::Sent => tally.sent += 1,
            DispatchOutcome::Failed => tally.failed += 1,
            DispatchOutcome::Suppressed => {}
            DispatchOutcome::BudgetExhausted => return false,
        }
        true
    }

    /// Display name for an agent slot value.
    pub(crate) async fn agent_name(
        &self,
        ctx: &UserContext,
        person_id: &str,
    ) -> Result<String, RemoteError> {
        if PersonId::is_unset(person_id) {
            return Ok(UNASSIGNED.to_string());
        }
        match self.directory.person_name(&ctx.credential, person_id).await {
            Ok(name) => Ok(name.unwrap_or_else(|| person_id.to_string())),
            Err(e) if e.is_auth_invalid() => Err(e),
            Err(e) => {
                tracing::debug!(user = %ctx.user, person = person_id, error = %e, "name lookup failed");
                Ok(person_id.to_string())
            }
        }
    }
}

pub(crate) fn index(tickets: &[Ticket]) -> BTreeMap<&str, &Ticket> {
    tickets.iter().map(|t| (t.id.as_str(), t)).collect()
}

pub(crate) fn ticket_ids(tickets: &[Ticket]) -> Vec<String> {
    tickets.iter().map(|t| t.id.clone()).collect()
}

/// Event for a change on a known ticket.
pub(crate) fn change_event(
    ctx: &UserContext,
    subject: SubjectType,
    change: &ChangeRecord,
    ticket: Option<&Ticket>,
) -> NotificationEvent {
    let class = match (change.objclass.is_empty(), ticket) {
        (true, Some(t)) => t.class.clone(),
        _ => change.objclass.clone(),
    };
    let event =
        NotificationEvent::new(ctx.user.clone(), subject, &change.objkey, class, &change.date);
    with_ticket(event, ticket)
}

pub(crate) fn with_ticket(event: NotificationEvent, ticket: Option<&Ticket>) -> NotificationEvent {
    match ticket {
        Some(t) => event.with_param("ticket_ref", &t.reference).with_param("title", &t.title),
        None => event,
    }
}

/// Agent-facing job.
pub struct AgentJob<R, N, C: Clock> {
    runner: Arc<JobRunner<R, N, C>>,
}

impl<R: RemoteClient, N: NotificationSink, C: Clock> AgentJob<R, N, C> {
    pub fn new(runner: Arc<JobRunner<R, N, C>>) -> Self {
        Self { runner }
    }

    pub async fn run(&self) -> RunSummary {
        self.runner.run(JobKind::Agent).await
    }
}

/// Portal-facing job.
pub struct PortalJob<R, N, C: Clock> {
    runner: Arc<JobRunner<R, N, C>>,
}

impl<R: RemoteClient, N: NotificationSink, C: Clock> PortalJob<R, N, C> {
    pub fn new(runner: Arc<JobRunner<R, N, C>>) -> Self {
        Self { runner }
    }

    pub async fn run(&self) -> RunSummary {
        self.runner.run(JobKind::Portal).await
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
