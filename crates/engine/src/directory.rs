// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lookups against iTop's object model: tickets, teams, people, profiles.
//!
//! Person names and user profiles are served through the TTL cache.

use crate::context::UserContext;
use crate::query::{self, RemoteObject, TICKET_FIELDS};
use itn_adapters::{Credential, RemoteClient, RemoteError};
use itn_core::{Clock, PersonId, RemoteIdentity, UserId};
use itn_storage::{ConfigRepository, TtlCache};

/// Profiles that only grant portal access.
const PORTAL_PROFILES: &[&str] = &["Portal user", "Portal power user"];

/// A ticket as seen at discovery time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub class: String,
    pub reference: String,
    pub title: String,
    pub status: String,
    pub agent_id: String,
    pub team_id: String,
    pub priority: String,
}

impl Ticket {
    fn from_object(object: &RemoteObject) -> Self {
        Self {
            id: object.id.clone(),
            class: object.class.clone(),
            reference: object.field("ref"),
            title: object.field("title"),
            status: object.field("status"),
            agent_id: object.field("agent_id"),
            team_id: object.field("team_id"),
            priority: object.field("priority"),
        }
    }

    pub fn is_unassigned(&self) -> bool {
        PersonId::is_unset(&self.agent_id)
    }
}

fn person_name_key(person_id: &str) -> String {
    format!("person_name:{person_id}")
}

fn profile_key(user: &UserId) -> String {
    format!("profile:{user}")
}

pub struct Directory<R, C: Clock> {
    remote: R,
    cache: TtlCache<C>,
    config: ConfigRepository,
}

impl<R: RemoteClient, C: Clock> Directory<R, C> {
    pub fn new(remote: R, cache: TtlCache<C>, config: ConfigRepository) -> Self {
        Self { remote, cache, config }
    }

    async fn fetch(
        &self,
        credential: &Credential,
        class: &str,
        oql: String,
        fields: &[&str],
    ) -> Result<Vec<RemoteObject>, RemoteError> {
        let body = self.remote.request(credential, &query::core_get(class, oql, fields)).await?;
        query::objects(&body)
    }

    /// Open tickets of every configured class matching `condition`.
    async fn tickets_where(
        &self,
        credential: &Credential,
        condition: &str,
    ) -> Result<Vec<Ticket>, RemoteError> {
        let mut tickets = Vec::new();
        for class in self.config.ticket_classes().iter().filter(|c| query::is_class_name(c)) {
            let oql = format!("SELECT {class} WHERE {condition} AND status != 'closed'");
            let objects = self.fetch(credential, class, oql, TICKET_FIELDS).await?;
            tickets.extend(objects.iter().map(Ticket::from_object));
        }
        tickets.sort_by_key(|t| t.id.parse::<u64>().unwrap_or_default());
        Ok(tickets)
    }

    /// Tickets currently assigned to the user.
    pub async fn tickets_for_agent(&self, ctx: &UserContext) -> Result<Vec<Ticket>, RemoteError> {
        let Some(person) = query::id_list([ctx.identity.person_id.as_str()]) else {
            return Ok(Vec::new());
        };
        self.tickets_where(&ctx.credential, &format!("agent_id = {person}")).await
    }

    /// Tickets routed to any of `teams`.
    pub async fn tickets_for_teams(
        &self,
        ctx: &UserContext,
        teams: &[String],
    ) -> Result<Vec<Ticket>, RemoteError> {
        let Some(teams) = query::id_list(teams.iter().map(String::as_str)) else {
            return Ok(Vec::new());
        };
        self.tickets_where(&ctx.credential, &format!("team_id IN ({teams})")).await
    }

    /// Tickets the user submitted through the portal.
    pub async fn tickets_for_caller(&self, ctx: &UserContext) -> Result<Vec<Ticket>, RemoteError> {
        let Some(person) = query::id_list([ctx.identity.person_id.as_str()]) else {
            return Ok(Vec::new());
        };
        self.tickets_where(&ctx.credential, &format!("caller_id = {person}")).await
    }

    /// Ids of the teams the user belongs to.
    pub async fn teams(&self, ctx: &UserContext) -> Result<Vec<String>, RemoteError> {
        let Some(person) = query::id_list([ctx.identity.person_id.as_str()]) else {
            return Ok(Vec::new());
        };
        let oql = format!(
            "SELECT Team AS t JOIN lnkPersonToTeam AS l ON l.team_id = t.id WHERE l.person_id = {person}"
        );
        let mut teams: Vec<String> = self
            .fetch(&ctx.credential, "Team", oql, &["name"])
            .await?
            .into_iter()
            .map(|o| o.id)
            .collect();
        teams.sort();
        teams.dedup();
        Ok(teams)
    }

    /// Display name of a person, cached.
    ///
    /// `None` when the person does not exist or has no name.
    pub async fn person_name(
        &self,
        credential: &Credential,
        person_id: &str,
    ) -> Result<Option<String>, RemoteError> {
        let key = person_name_key(person_id);
        if let Some(name) = self.cache.get::<String>(&key) {
            return Ok(Some(name));
        }
        let Some(id) = query::id_list([person_id]) else {
            return Ok(None);
        };
        let objects = self
            .fetch(credential, "Person", format!("SELECT Person WHERE id = {id}"), &["friendlyname"])
            .await?;
        let name = objects.first().and_then(|o| o.opt_field("friendlyname"));
        if let Some(name) = &name {
            self.cache.set(&key, name, self.config.person_name_ttl_secs());
        }
        Ok(name)
    }

    /// Names of the iTop profiles attached to the user's account, cached.
    pub async fn profiles(
        &self,
        user: &UserId,
        credential: &Credential,
        identity: &RemoteIdentity,
    ) -> Result<Vec<String>, RemoteError> {
        let key = profile_key(user);
        if let Some(profiles) = self.cache.get::<Vec<String>>(&key) {
            return Ok(profiles);
        }
        let Some(account) = query::id_list(identity.user_id.as_deref()) else {
            return Ok(Vec::new());
        };
        let oql = format!("SELECT URP_UserProfile WHERE userid = {account}");
        let mut profiles: Vec<String> = self
            .fetch(credential, "URP_UserProfile", oql, &["profile"])
            .await?
            .iter()
            .filter_map(|o| o.opt_field("profile"))
            .collect();
        profiles.sort();
        profiles.dedup();
        self.cache.set(&key, &profiles, self.config.profile_ttl_secs());
        Ok(profiles)
    }

    /// True when every profile of the account is a portal profile.
    ///
    /// An account with no known profiles is not portal-only.
    pub async fn is_portal_only(
        &self,
        user: &UserId,
        credential: &Credential,
        identity: &RemoteIdentity,
    ) -> Result<bool, RemoteError> {
        let profiles = self.profiles(user, credential, identity).await?;
        Ok(!profiles.is_empty() && profiles.iter().all(|p| PORTAL_PROFILES.contains(&p.as_str())))
    }

    pub fn invalidate_profile(&self, user: &UserId) {
        self.cache.invalidate(&profile_key(user));
    }
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
