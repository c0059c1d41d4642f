// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! itn-engine: change detection, dispatch, and the polling jobs

mod agent;
mod context;
mod detector;
mod directory;
mod dispatcher;
mod error;
mod portal;
pub mod query;
mod runner;
mod scheduler;

#[cfg(test)]
mod test_helpers;

pub use context::{UserContext, Window};
pub use detector::ChangeDetector;
pub use directory::{Directory, Ticket};
pub use dispatcher::{DispatchOutcome, NotificationDispatcher, APP_ID, OBJECT_TYPE};
pub use error::JobError;
pub use runner::{
    AgentJob, JobDeps, JobRunner, PortalJob, RunSummary, FIRST_RUN_LOOKBACK_SECS, UNASSIGNED,
};
pub use scheduler::{SkipReason, UserScheduler};
