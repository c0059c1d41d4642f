// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! SLA deadline escalation levels and the crossing-time check.
//!
//! A level `L` is crossed at `deadline - L.hours()`. A poll covering the
//! window `(since, now]` reports the tightest level whose crossing instant
//! lies inside the window, and only if it is tighter than the level already
//! signaled for that ticket. Staying inside a band across polls reports
//! nothing.

use serde::{Deserialize, Serialize};

/// Which SLA deadline field is examined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineKind {
    /// Time to own (`tto_escalation_deadline`).
    Tto,
    /// Time to resolve (`ttr_escalation_deadline`).
    Ttr,
}

crate::simple_display! {
    DeadlineKind {
        Tto => "tto",
        Ttr => "ttr",
    }
}

impl DeadlineKind {
    pub fn deadline_field(self) -> &'static str {
        match self {
            Self::Tto => "tto_escalation_deadline",
            Self::Ttr => "ttr_escalation_deadline",
        }
    }

    pub fn passed_field(self) -> &'static str {
        match self {
            Self::Tto => "sla_tto_passed",
            Self::Ttr => "sla_ttr_passed",
        }
    }
}

/// Which tickets a deadline query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineScope {
    /// Tickets assigned to the user.
    Mine,
    /// Tickets of the user's teams with no agent yet.
    TeamUnassigned,
}

crate::simple_display! {
    DeadlineScope {
        Mine => "mine",
        TeamUnassigned => "team_unassigned",
    }
}

/// Remaining-time threshold; later variants are tighter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EscalationLevel {
    #[serde(rename = "24h")]
    Hours24,
    #[serde(rename = "12h")]
    Hours12,
    #[serde(rename = "4h")]
    Hours4,
    #[serde(rename = "1h")]
    Hours1,
}

crate::simple_display! {
    EscalationLevel {
        Hours24 => "24h",
        Hours12 => "12h",
        Hours4 => "4h",
        Hours1 => "1h",
    }
}

impl EscalationLevel {
    /// All levels, loosest first.
    pub const ALL: [EscalationLevel; 4] = [Self::Hours24, Self::Hours12, Self::Hours4, Self::Hours1];

    pub fn hours(self) -> i64 {
        match self {
            Self::Hours24 => 24,
            Self::Hours12 => 12,
            Self::Hours4 => 4,
            Self::Hours1 => 1,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.to_string() == s.trim())
    }

    /// Epoch second at which this level is crossed for `deadline`.
    pub fn crossing_at(self, deadline: i64) -> i64 {
        deadline - self.hours() * 3600
    }
}

/// Tightest level crossed inside `(since, now]`, if any.
pub fn newly_crossed(deadline: i64, since: i64, now: i64) -> Option<EscalationLevel> {
    EscalationLevel::ALL.into_iter().rev().find(|level| {
        let at = level.crossing_at(deadline);
        since < at && at <= now
    })
}

/// Level to signal given what was last signaled for the ticket.
pub fn level_to_signal(
    deadline: i64,
    since: i64,
    now: i64,
    last_signaled: Option<EscalationLevel>,
) -> Option<EscalationLevel> {
    let crossed = newly_crossed(deadline, since, now)?;
    match last_signaled {
        Some(last) if last >= crossed => None,
        _ => Some(crossed),
    }
}

/// A ticket whose deadline crossed a new escalation level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadlineCrossing {
    pub ticket_id: String,
    pub ticket_class: String,
    pub level: EscalationLevel,
    /// Deadline as the remote system reported it.
    pub deadline: String,
    /// Epoch second of the crossing, used to key the notification.
    pub crossed_at: i64,
}

#[cfg(test)]
#[path = "deadline_tests.rs"]
mod tests;
