// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! itn-storage: typed configuration and the TTL cache layer

mod repository;
mod ttl_cache;

pub use repository::{
    ConfigRepository, CredentialSource, DEFAULT_CHECK_INTERVAL_MINUTES,
    DEFAULT_PERSON_NAME_TTL_SECS, DEFAULT_PROFILE_TTL_SECS, DEFAULT_TICKET_CLASSES,
};
pub use ttl_cache::TtlCache;
