// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Change detection against iTop's change log and SLA deadlines.

use crate::context::{UserContext, Window};
use crate::error::JobError;
use crate::query::{
    self, RemoteObject, CASELOG_CHANGE_CLASS, CASELOG_FIELDS, CASE_LOG_ATTRIBUTES, CHANGE_FIELDS,
    SCALAR_CHANGE_CLASS,
};
use itn_adapters::{RemoteClient, RemoteError};
use itn_core::{
    level_to_signal, ChangeRecord, DeadlineCrossing, DeadlineKind, DeadlineScope,
    EscalationLevel,
};
use itn_storage::ConfigRepository;
use std::collections::BTreeSet;

/// Widest escalation threshold; deadlines further out cannot have crossed.
const HORIZON_SECS: i64 = 24 * 3600;

fn change_from_object(object: &RemoteObject, case_log: bool) -> ChangeRecord {
    let (oldvalue, newvalue) = if case_log {
        (String::new(), object.field("lastentry"))
    } else {
        (object.field("oldvalue"), object.field("newvalue"))
    };
    ChangeRecord {
        objkey: object.field("objkey"),
        objclass: object.field("objclass"),
        attcode: object.field("attcode"),
        oldvalue,
        newvalue,
        date: object.field("date"),
        user_id: object.opt_field("user_id"),
        userinfo: object.field("userinfo"),
    }
}

pub struct ChangeDetector<R> {
    remote: R,
    config: ConfigRepository,
}

impl<R: RemoteClient> ChangeDetector<R> {
    pub fn new(remote: R, config: ConfigRepository) -> Self {
        Self { remote, config }
    }

    /// Attribute changes on `object_ids` inside `window`, oldest first.
    ///
    /// `attribute_codes` is an allow-list, re-applied to the response. No-op
    /// records are returned as-is.
    pub async fn get_changes(
        &self,
        ctx: &UserContext,
        object_ids: &[String],
        window: Window,
        attribute_codes: &[&str],
    ) -> Result<Vec<ChangeRecord>, RemoteError> {
        let Some(ids) = query::id_list(object_ids.iter().map(String::as_str)) else {
            return Ok(Vec::new());
        };
        let (logs, scalars): (Vec<&str>, Vec<&str>) =
            attribute_codes.iter().copied().partition(|a| CASE_LOG_ATTRIBUTES.contains(a));

        let since = ctx.tz.format_epoch(window.since);
        let until = ctx.tz.format_epoch(window.until);
        let mut records = Vec::new();
        for (class, fields, attributes, case_log) in [
            (SCALAR_CHANGE_CLASS, CHANGE_FIELDS, &scalars, false),
            (CASELOG_CHANGE_CLASS, CASELOG_FIELDS, &logs, true),
        ] {
            if attributes.is_empty() {
                continue;
            }
            let oql = format!(
                "SELECT {class} WHERE objkey IN ({ids}) AND attcode IN ({}) AND date > {} AND date <= {}",
                query::literal_list(attributes.iter().copied()),
                query::quote(&since),
                query::quote(&until),
            );
            let body = self.remote.request(&ctx.credential, &query::core_get(class, oql, fields)).await?;
            let mut objects = query::objects(&body)?;
            objects.sort_by_key(RemoteObject::numeric_id);
            records.extend(objects.iter().map(|o| change_from_object(o, case_log)));
        }

        let wanted: BTreeSet<&str> = object_ids.iter().map(String::as_str).collect();
        records.retain(|r| {
            wanted.contains(r.objkey.as_str())
                && attribute_codes.contains(&r.attcode.as_str())
                && ctx.tz.parse_strict(&r.date).map_or(true, |at| window.contains(at.timestamp()))
        });
        // stable: change-op order is kept within one timestamp
        records.sort_by(|a, b| a.date.cmp(&b.date));
        tracing::debug!(
            user = %ctx.user,
            objects = object_ids.len(),
            changes = records.len(),
            "change log fetched"
        );
        Ok(records)
    }

    /// Tickets in `scope` whose `kind` deadline newly crossed an escalation
    /// level inside `window`.
    ///
    /// The last level signaled per ticket is kept in the config store; a
    /// ticket is reported only when the crossed level is tighter, and
    /// tickets that left the result set are forgotten.
    pub async fn get_tickets_approaching_deadline(
        &self,
        ctx: &UserContext,
        kind: DeadlineKind,
        scope: DeadlineScope,
        teams: &[String],
        window: Window,
    ) -> Result<Vec<DeadlineCrossing>, JobError> {
        let ledger_before = self.config.signaled_levels(&ctx.user, kind, scope);
        let mut ledger = ledger_before.clone();

        let objects =
            self.deadline_candidates(ctx, kind, scope, teams, window).await?.unwrap_or_default();

        let field = kind.deadline_field();
        let mut seen = BTreeSet::new();
        let mut crossings = Vec::new();
        for object in &objects {
            seen.insert(object.id.clone());
            let raw = object.field(field);
            let Some(deadline) = ctx.tz.parse_strict(&raw).or_else(|| ctx.tz.parse_loose(&raw))
            else {
                tracing::debug!(user = %ctx.user, ticket = %object.id, deadline = %raw, "unparseable deadline");
                continue;
            };
            let deadline = deadline.timestamp();
            let last: Option<EscalationLevel> = ledger.get(&object.id).copied();
            if let Some(level) = level_to_signal(deadline, window.since, window.until, last) {
                ledger.insert(object.id.clone(), level);
                crossings.push(DeadlineCrossing {
                    ticket_id: object.id.clone(),
                    ticket_class: object.class.clone(),
                    level,
                    deadline: raw,
                    crossed_at: level.crossing_at(deadline),
                });
            }
        }

        ledger.retain(|ticket, _| seen.contains(ticket));
        if ledger != ledger_before {
            self.config.set_signaled_levels(&ctx.user, kind, scope, &ledger)?;
        }
        crossings.sort_by_key(|c| c.crossed_at);
        tracing::debug!(
            user = %ctx.user,
            %kind,
            %scope,
            candidates = objects.len(),
            crossings = crossings.len(),
            "deadline check"
        );
        Ok(crossings)
    }

    /// Open tickets in scope whose deadline could have crossed a level in
    /// `window`. `None` when the scope cannot be expressed (no person id, no
    /// teams).
    async fn deadline_candidates(
        &self,
        ctx: &UserContext,
        kind: DeadlineKind,
        scope: DeadlineScope,
        teams: &[String],
        window: Window,
    ) -> Result<Option<Vec<RemoteObject>>, RemoteError> {
        let scope_clause = match scope {
            DeadlineScope::Mine => match query::id_list([ctx.identity.person_id.as_str()]) {
                Some(person) => format!("agent_id = {person}"),
                None => return Ok(None),
            },
            DeadlineScope::TeamUnassigned => match query::id_list(teams.iter().map(String::as_str)) {
                Some(teams) => format!("team_id IN ({teams}) AND agent_id = 0"),
                None => return Ok(None),
            },
        };
        let field = kind.deadline_field();
        let since = query::quote(&ctx.tz.format_epoch(window.since));
        let horizon = query::quote(&ctx.tz.format_epoch(window.until + HORIZON_SECS));

        let mut candidates = Vec::new();
        for class in self.config.ticket_classes().iter().filter(|c| query::is_class_name(c)) {
            let oql = format!(
                "SELECT {class} WHERE {field} > {since} AND {field} <= {horizon} AND {scope_clause} \
                 AND status NOT IN ('resolved','closed')"
            );
            let body = self
                .remote
                .request(&ctx.credential, &query::core_get(class, oql, &[field, "ref", "title"]))
                .await?;
            candidates.extend(query::objects(&body)?);
        }
        Ok(Some(candidates))
    }
}

#[cfg(test)]
#[path = "detector_tests.rs"]
mod tests;
