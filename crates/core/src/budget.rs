// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-user, per-run notification budget.

/// Maximum notifications dispatched to one user in one job run.
pub const MAX_NOTIFICATIONS_PER_RUN: usize = 20;

/// Cumulative counter shared by every detection step of one user's run.
///
/// Detection steps check [`NotificationBudget::is_exhausted`] before doing
/// any remote work, so an exhausted budget skips the remaining steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationBudget {
    limit: usize,
    used: usize,
}

impl Default for NotificationBudget {
    fn default() -> Self {
        Self::new(MAX_NOTIFICATIONS_PER_RUN)
    }
}

impl NotificationBudget {
    pub fn new(limit: usize) -> Self {
        Self { limit, used: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.used)
    }

    pub fn used(&self) -> usize {
        self.used
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Consume up to `n` units; returns how many were actually granted.
    pub fn consume(&mut self, n: usize) -> usize {
        let granted = n.min(self.remaining());
        self.used += granted;
        granted
    }
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
