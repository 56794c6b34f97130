// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process worker runtime.
//!
//! Runs the worker body as a spawned task in this process. The worker is
//! handed the full dispatch request and must eventually write its callback
//! result; the kernel never waits on the task itself.

use super::{BackendDispatcher, DispatchError, DispatchHandle, DispatchRequest};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed worker body future.
pub type WorkerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;

type WorkerBody = dyn Fn(DispatchRequest) -> WorkerFuture + Send + Sync;

/// Dispatcher that runs orders as in-process tasks.
#[derive(Clone)]
pub struct InlineDispatcher {
    worker: Arc<WorkerBody>,
    started: Arc<Mutex<HashMap<String, DispatchHandle>>>,
}

impl InlineDispatcher {
    pub fn new<F>(worker: F) -> Self
    where
        F: Fn(DispatchRequest) -> WorkerFuture + Send + Sync + 'static,
    {
        Self {
            worker: Arc::new(worker),
            started: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl BackendDispatcher for InlineDispatcher {
    async fn dispatch(&self, req: DispatchRequest) -> Result<DispatchHandle, DispatchError> {
        let id = req.client_request_id();
        {
            let started = self.started.lock();
            // Duplicate dispatch is absorbed, not re-run
            if let Some(handle) = started.get(&id) {
                return Ok(handle.clone());
            }
        }
        let handle = DispatchHandle {
            execution_url: format!("inline:{}", id),
        };
        self.started.lock().insert(id.clone(), handle.clone());

        tracing::debug!(request = %id, "starting inline worker");
        let task = (self.worker)(req);
        tokio::spawn(task);
        Ok(handle)
    }
}

#[cfg(test)]
#[path = "inline_tests.rs"]
mod tests;
