// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! iTop notification watcher daemon library
//!
//! Startup, the polling loop, and environment handling, shared by the
//! `itnd` binary and its tests.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod lifecycle;

pub use lifecycle::{startup, Config, Daemon, DaemonRuntime, LifecycleError, TickSummary};
