// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! itn-core: domain types for the iTop notification watcher

pub mod macros;

pub mod budget;
pub mod change;
pub mod clock;
pub mod deadline;
pub mod id;
pub mod notification;
pub mod policy;
pub mod subject;
pub mod timestamp;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use budget::{NotificationBudget, MAX_NOTIFICATIONS_PER_RUN};
pub use change::ChangeRecord;
pub use clock::{Clock, FakeClock, SystemClock};
pub use deadline::{
    level_to_signal, newly_crossed, DeadlineCrossing, DeadlineKind, DeadlineScope, EscalationLevel,
};
pub use id::{short, PersonId, UserId};
pub use notification::{idempotency_key, NotificationEvent};
pub use policy::{effective_policy, enabled_types, AdminPolicy, RemoteIdentity};
pub use subject::{JobKind, NotificationType, SubjectType};
pub use timestamp::{RemoteTimezone, REMOTE_FORMAT};
