// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake VCS provider for testing

use super::{CommentId, VcsError, VcsProvider};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Comment {
    repo: String,
    pr: u64,
    id: CommentId,
    body: String,
}

#[derive(Default)]
struct FakeVcsState {
    comments: Vec<Comment>,
    next_id: u64,
    verify_result: Option<bool>,
}

/// Fake VCS provider with an in-memory comment store.
#[derive(Clone, Default)]
pub struct FakeVcs {
    inner: Arc<Mutex<FakeVcsState>>,
}

impl FakeVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force the webhook verification result.
    pub fn set_verify_result(&self, ok: bool) {
        self.inner.lock().verify_result = Some(ok);
    }

    /// Bodies of all comments on a PR, in creation order.
    pub fn comment_bodies(&self, repo: &str, pr: u64) -> Vec<String> {
        self.inner
            .lock()
            .comments
            .iter()
            .filter(|c| c.repo == repo && c.pr == pr)
            .map(|c| c.body.clone())
            .collect()
    }
}

#[async_trait]
impl VcsProvider for FakeVcs {
    async fn verify_webhook(
        &self,
        _headers: &HashMap<String, String>,
        _body: &[u8],
        _secret: &str,
    ) -> Result<bool, VcsError> {
        Ok(self.inner.lock().verify_result.unwrap_or(true))
    }

    async fn create_comment(
        &self,
        repo: &str,
        pr: u64,
        body: &str,
        _token: &str,
    ) -> Result<CommentId, VcsError> {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = CommentId::new(format!("comment-{}", inner.next_id));
        inner.comments.push(Comment {
            repo: repo.to_string(),
            pr,
            id: id.clone(),
            body: body.to_string(),
        });
        Ok(id)
    }

    async fn update_comment(
        &self,
        repo: &str,
        comment: &CommentId,
        body: &str,
        _token: &str,
    ) -> Result<(), VcsError> {
        let mut inner = self.inner.lock();
        let found = inner
            .comments
            .iter_mut()
            .find(|c| c.repo == repo && &c.id == comment);
        match found {
            Some(c) => {
                c.body = body.to_string();
                Ok(())
            }
            None => Err(VcsError::Api(format!("no such comment: {}", comment))),
        }
    }

    async fn find_comment_by_tag(
        &self,
        repo: &str,
        pr: u64,
        tag: &str,
        _token: &str,
    ) -> Result<Option<CommentId>, VcsError> {
        Ok(self
            .inner
            .lock()
            .comments
            .iter()
            .find(|c| c.repo == repo && c.pr == pr && c.body.contains(tag))
            .map(|c| c.id.clone()))
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
