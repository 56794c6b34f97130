// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Backend dispatch.
//!
//! The orchestrator hands a ready order to one of three backends through
//! this port. Dispatch must be idempotent: the client request id is derived
//! from `(run_id, order_num)`, so a replayed dispatch is absorbed instead of
//! starting a second execution.

mod inline;
mod noop;

pub use inline::{InlineDispatcher, WorkerFuture};
pub use noop::NoOpDispatcher;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{DispatchCall, FakeDispatcher};

use async_trait::async_trait;
use baton_core::{ExecutionTarget, OrderNum, RunId};
use thiserror::Error;

/// Errors from dispatch operations
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("dispatch rejected: {0}")]
    Rejected(String),
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// Everything a backend needs to start one order.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub run_id: RunId,
    pub num: OrderNum,
    pub target: ExecutionTarget,
    pub bundle_uri: String,
    pub key_ref: String,
    pub callback_uri: String,
    pub timeout_s: u64,
}

impl DispatchRequest {
    /// Deterministic id for dispatch deduplication.
    pub fn client_request_id(&self) -> String {
        format!("{}:{}", self.run_id, self.num)
    }
}

/// Handle returned by a backend for a started execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchHandle {
    pub execution_url: String,
}

/// Adapter for starting order executions on a backend.
#[async_trait]
pub trait BackendDispatcher: Clone + Send + Sync + 'static {
    async fn dispatch(&self, req: DispatchRequest) -> Result<DispatchHandle, DispatchError>;
}
