// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State store: orders, events, and per-run locks.
//!
//! Three logical collections. Orders are keyed `(run_id, order_num)` and
//! expire a day after creation; events are keyed `(trace_id, sort_key)` and
//! expire after 90 days; locks are keyed by run and live for the run's
//! job timeout.

use crate::error::StorageError;
use async_trait::async_trait;
use baton_core::{FlowId, HolderId, OrderEvent, OrderNum, OrderRecord, OrderStatus, RunId, TraceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a run lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockState {
    Active,
    Completed,
}

/// Per-run mutual-exclusion record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunLock {
    pub run_id: RunId,
    pub holder_id: HolderId,
    pub state: LockState,
    pub acquired_at: DateTime<Utc>,
    pub flow_id: FlowId,
    pub trace_id: TraceId,
    pub expires_at_ms: u64,
}

/// Outcome of a conditional lock acquire.
///
/// Contention is a normal signal, not an error: the losing invocation exits
/// and relies on the next notification to re-enter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAttempt {
    Acquired,
    Contended,
}

/// Extra fields recorded together with a status update.
#[derive(Debug, Clone, Default)]
pub struct OrderPatch {
    pub execution_url: Option<String>,
    pub watchdog_handle: Option<String>,
    pub dispatched_at_ms: Option<u64>,
    pub log: Option<String>,
}

impl OrderPatch {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_log(log: impl Into<String>) -> Self {
        Self {
            log: Some(log.into()),
            ..Self::default()
        }
    }

    /// Apply onto a row together with the new status.
    pub fn apply(self, record: &mut OrderRecord, status: OrderStatus) {
        record.status = status;
        if let Some(url) = self.execution_url {
            record.execution_url = Some(url);
        }
        if let Some(handle) = self.watchdog_handle {
            record.watchdog_handle = Some(handle);
        }
        if let Some(at) = self.dispatched_at_ms {
            record.dispatched_at_ms = Some(at);
        }
        if let Some(log) = self.log {
            record.status_log = Some(log);
        }
    }
}

/// Durable store for orders, events, and per-run locks.
#[async_trait]
pub trait StateStore: Clone + Send + Sync + 'static {
    async fn put_order(&self, order: &OrderRecord) -> Result<(), StorageError>;

    async fn get_order(
        &self,
        run_id: &RunId,
        num: OrderNum,
    ) -> Result<Option<OrderRecord>, StorageError>;

    /// All orders of a run, sorted by order number.
    async fn orders_for_run(&self, run_id: &RunId) -> Result<Vec<OrderRecord>, StorageError>;

    /// Unconditional status update. Reconciliation is idempotent on
    /// terminal states, so repeating an update is harmless.
    async fn update_status(
        &self,
        run_id: &RunId,
        num: OrderNum,
        status: OrderStatus,
        patch: OrderPatch,
    ) -> Result<(), StorageError>;

    async fn append_event(&self, event: &OrderEvent) -> Result<(), StorageError>;

    /// Events of a trace, sorted by sort key, optionally filtered by a
    /// sort-key prefix (`"<order_name>:"` gives one order's events).
    async fn events_by_trace(
        &self,
        trace_id: &TraceId,
        prefix: Option<&str>,
    ) -> Result<Vec<OrderEvent>, StorageError>;

    /// Conditional acquire: succeeds if no lock record exists, the existing
    /// record is `completed`, or its TTL has lapsed. Contention is returned,
    /// never retried here.
    #[allow(clippy::too_many_arguments)]
    async fn acquire_lock(
        &self,
        run_id: &RunId,
        holder_id: &HolderId,
        flow_id: &FlowId,
        trace_id: &TraceId,
        ttl_ms: u64,
        now_ms: u64,
    ) -> Result<LockAttempt, StorageError>;

    /// Unconditional release: `state ← completed`.
    async fn release_lock(&self, run_id: &RunId) -> Result<(), StorageError>;
}
