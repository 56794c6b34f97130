// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake dispatcher for testing

use super::{BackendDispatcher, DispatchError, DispatchHandle, DispatchRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Recorded dispatch
#[derive(Debug, Clone)]
pub struct DispatchCall {
    pub client_request_id: String,
    pub request: DispatchRequest,
}

#[derive(Default)]
struct FakeDispatchState {
    calls: Vec<DispatchCall>,
    failures: HashMap<String, String>,
    fail_all: Option<String>,
}

/// Fake dispatcher: records every call, optionally fails scripted requests.
#[derive(Clone, Default)]
pub struct FakeDispatcher {
    inner: Arc<Mutex<FakeDispatchState>>,
}

impl FakeDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the dispatch for a specific client request id.
    pub fn fail_for(&self, client_request_id: impl Into<String>, message: impl Into<String>) {
        self.inner
            .lock()
            .failures
            .insert(client_request_id.into(), message.into());
    }

    /// Fail every dispatch with the given message.
    pub fn fail_all(&self, message: impl Into<String>) {
        self.inner.lock().fail_all = Some(message.into());
    }

    /// All recorded dispatches, in call order.
    pub fn calls(&self) -> Vec<DispatchCall> {
        self.inner.lock().calls.clone()
    }

    /// Client request ids seen, deduplicated, in first-call order.
    pub fn dispatched_ids(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut seen = Vec::new();
        for call in &inner.calls {
            if !seen.contains(&call.client_request_id) {
                seen.push(call.client_request_id.clone());
            }
        }
        seen
    }
}

#[async_trait]
impl BackendDispatcher for FakeDispatcher {
    async fn dispatch(&self, req: DispatchRequest) -> Result<DispatchHandle, DispatchError> {
        let id = req.client_request_id();
        let mut inner = self.inner.lock();
        inner.calls.push(DispatchCall {
            client_request_id: id.clone(),
            request: req,
        });
        if let Some(message) = &inner.fail_all {
            return Err(DispatchError::Unavailable(message.clone()));
        }
        if let Some(message) = inner.failures.get(&id) {
            return Err(DispatchError::Rejected(message.clone()));
        }
        Ok(DispatchHandle {
            execution_url: format!("fake:{}", id),
        })
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
