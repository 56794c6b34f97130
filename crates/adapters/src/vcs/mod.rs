// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! VCS provider port.
//!
//! The kernel only calls out: webhook verification at the submission edge
//! and PR comments for run progress. Comment rendering and the concrete
//! provider API live outside the kernel.

mod noop;

pub use noop::NoOpVcs;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeVcs;

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use thiserror::Error;

baton_core::string_id! {
    /// Provider-assigned id of a PR comment.
    CommentId
}

/// Errors from VCS operations
#[derive(Debug, Error)]
pub enum VcsError {
    #[error("vcs api error: {0}")]
    Api(String),
}

/// The fields the kernel needs out of an opaque `pr_reference` value.
///
/// Submitters may attach arbitrary extra keys; they are ignored here and
/// passed through untouched in events.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PrReference {
    pub repo: String,
    pub number: u64,
    #[serde(default)]
    pub token_ref: Option<String>,
}

impl PrReference {
    /// Parse from the opaque descriptor value; `None` when the shape does
    /// not carry a usable repo/number pair.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }
}

/// Adapter for the VCS side of a run.
#[async_trait]
pub trait VcsProvider: Clone + Send + Sync + 'static {
    /// Check an inbound webhook signature.
    async fn verify_webhook(
        &self,
        headers: &HashMap<String, String>,
        body: &[u8],
        secret: &str,
    ) -> Result<bool, VcsError>;

    async fn create_comment(
        &self,
        repo: &str,
        pr: u64,
        body: &str,
        token: &str,
    ) -> Result<CommentId, VcsError>;

    async fn update_comment(
        &self,
        repo: &str,
        comment: &CommentId,
        body: &str,
        token: &str,
    ) -> Result<(), VcsError>;

    async fn find_comment_by_tag(
        &self,
        repo: &str,
        pr: u64,
        tag: &str,
        token: &str,
    ) -> Result<Option<CommentId>, VcsError>;
}
