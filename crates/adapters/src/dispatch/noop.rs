// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! No-op dispatcher

use super::{BackendDispatcher, DispatchError, DispatchHandle, DispatchRequest};
use async_trait::async_trait;

/// Dispatcher that accepts everything and starts nothing.
///
/// Useful when a deployment only wants admission and reconciliation (for
/// example, replaying callbacks from a bucket).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpDispatcher;

#[async_trait]
impl BackendDispatcher for NoOpDispatcher {
    async fn dispatch(&self, req: DispatchRequest) -> Result<DispatchHandle, DispatchError> {
        Ok(DispatchHandle {
            execution_url: format!("noop:{}", req.client_request_id()),
        })
    }
}
