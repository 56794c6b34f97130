// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the kernel

use crate::bundle::BundleError;
use crate::envelope::EnvelopeError;
use baton_storage::StorageError;
use thiserror::Error;

/// Errors that can occur inside admission, orchestration, or the watchdog
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("bad notification path: {0}")]
    BadNotification(String),
    #[error("dispatch failed: {0}")]
    Dispatch(String),
    #[error("credential failure: {0}")]
    Credential(String),
    #[error("repo fetch failed: {0}")]
    Repo(String),
    #[error("code source failure: {0}")]
    CodeSource(String),
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),
    #[error(transparent)]
    Bundle(#[from] BundleError),
    #[error("key store failure: {0}")]
    Key(String),
}
