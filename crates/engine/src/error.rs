// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors that abort one user's run.

use itn_adapters::{RemoteError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("remote: {0}")]
    Remote(#[from] RemoteError),
    #[error("config store: {0}")]
    Store(#[from] StoreError),
}

impl JobError {
    pub fn is_auth_invalid(&self) -> bool {
        matches!(self, Self::Remote(e) if e.is_auth_invalid())
    }
}
