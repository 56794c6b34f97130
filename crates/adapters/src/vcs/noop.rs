// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op VCS provider

use super::{CommentId, VcsError, VcsProvider};
use async_trait::async_trait;
use std::collections::HashMap;

/// Provider for deployments without a VCS integration.
///
/// Webhooks verify trivially and comment calls succeed without effect.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpVcs;

#[async_trait]
impl VcsProvider for NoOpVcs {
    async fn verify_webhook(
        &self,
        _headers: &HashMap<String, String>,
        _body: &[u8],
        _secret: &str,
    ) -> Result<bool, VcsError> {
        Ok(true)
    }

    async fn create_comment(
        &self,
        _repo: &str,
        _pr: u64,
        _body: &str,
        _token: &str,
    ) -> Result<CommentId, VcsError> {
        Ok(CommentId::new("noop"))
    }

    async fn update_comment(
        &self,
        _repo: &str,
        _comment: &CommentId,
        _body: &str,
        _token: &str,
    ) -> Result<(), VcsError> {
        Ok(())
    }

    async fn find_comment_by_tag(
        &self,
        _repo: &str,
        _pr: u64,
        _tag: &str,
        _token: &str,
    ) -> Result<Option<CommentId>, VcsError> {
        Ok(None)
    }
}
