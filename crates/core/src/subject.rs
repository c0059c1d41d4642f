// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job kinds and the notification subject vocabulary.

use serde::{Deserialize, Serialize};

/// The two polling audiences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Ticket submitters using the iTop portal.
    Portal,
    /// Support agents working tickets.
    Agent,
}

crate::simple_display! {
    JobKind {
        Portal => "portal",
        Agent => "agent",
    }
}

/// Subject type handed to the notification sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    // Portal
    TicketStatusChanged,
    TicketResolved,
    AgentAssigned,
    AgentResponded,
    // Agent
    TicketAssigned,
    TicketReassigned,
    TeamUnassignedNew,
    TicketTtoWarning,
    TicketTtrWarning,
    TicketSlaBreach,
    TicketPriorityCritical,
    TicketComment,
}

crate::simple_display! {
    SubjectType {
        TicketStatusChanged => "ticket_status_changed",
        TicketResolved => "ticket_resolved",
        AgentAssigned => "agent_assigned",
        AgentResponded => "agent_responded",
        TicketAssigned => "ticket_assigned",
        TicketReassigned => "ticket_reassigned",
        TeamUnassignedNew => "team_unassigned_new",
        TicketTtoWarning => "ticket_tto_warning",
        TicketTtrWarning => "ticket_ttr_warning",
        TicketSlaBreach => "ticket_sla_breach",
        TicketPriorityCritical => "ticket_priority_critical",
        TicketComment => "ticket_comment",
    }
}

impl SubjectType {
    pub fn job_kind(self) -> JobKind {
        match self {
            Self::TicketStatusChanged
            | Self::TicketResolved
            | Self::AgentAssigned
            | Self::AgentResponded => JobKind::Portal,
            _ => JobKind::Agent,
        }
    }

    /// The enablement toggle governing this subject.
    ///
    /// Reassignment shares the assignment toggle; everything else has its own.
    pub fn notification_type(self) -> NotificationType {
        match self {
            Self::TicketStatusChanged => NotificationType::TicketStatusChanged,
            Self::TicketResolved => NotificationType::TicketResolved,
            Self::AgentAssigned => NotificationType::AgentAssigned,
            Self::AgentResponded => NotificationType::AgentResponded,
            Self::TicketAssigned | Self::TicketReassigned => NotificationType::TicketAssigned,
            Self::TeamUnassignedNew => NotificationType::TeamUnassignedNew,
            Self::TicketTtoWarning => NotificationType::TicketTtoWarning,
            Self::TicketTtrWarning => NotificationType::TicketTtrWarning,
            Self::TicketSlaBreach => NotificationType::TicketSlaBreach,
            Self::TicketPriorityCritical => NotificationType::TicketPriorityCritical,
            Self::TicketComment => NotificationType::TicketComment,
        }
    }
}

/// A user-facing notification toggle (admin policy + user opt-out unit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    TicketStatusChanged,
    TicketResolved,
    AgentAssigned,
    AgentResponded,
    TicketAssigned,
    TeamUnassignedNew,
    TicketTtoWarning,
    TicketTtrWarning,
    TicketSlaBreach,
    TicketPriorityCritical,
    TicketComment,
}

crate::simple_display! {
    NotificationType {
        TicketStatusChanged => "ticket_status_changed",
        TicketResolved => "ticket_resolved",
        AgentAssigned => "agent_assigned",
        AgentResponded => "agent_responded",
        TicketAssigned => "ticket_assigned",
        TeamUnassignedNew => "team_unassigned_new",
        TicketTtoWarning => "ticket_tto_warning",
        TicketTtrWarning => "ticket_ttr_warning",
        TicketSlaBreach => "ticket_sla_breach",
        TicketPriorityCritical => "ticket_priority_critical",
        TicketComment => "ticket_comment",
    }
}

impl NotificationType {
    pub const PORTAL: &'static [NotificationType] = &[
        Self::TicketStatusChanged,
        Self::TicketResolved,
        Self::AgentAssigned,
        Self::AgentResponded,
    ];

    pub const AGENT: &'static [NotificationType] = &[
        Self::TicketAssigned,
        Self::TeamUnassignedNew,
        Self::TicketTtoWarning,
        Self::TicketTtrWarning,
        Self::TicketSlaBreach,
        Self::TicketPriorityCritical,
        Self::TicketComment,
    ];

    pub fn for_job(kind: JobKind) -> &'static [NotificationType] {
        match kind {
            JobKind::Portal => Self::PORTAL,
            JobKind::Agent => Self::AGENT,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::PORTAL.iter().chain(Self::AGENT).copied().find(|t| t.to_string() == s.trim())
    }
}

#[cfg(test)]
#[path = "subject_tests.rs"]
mod tests;
