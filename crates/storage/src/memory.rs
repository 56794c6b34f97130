// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory stores, used by tests and local composition.

use crate::artifact::{ArtifactStore, PresignedUrl};
use crate::error::StorageError;
use crate::state::{LockAttempt, LockState, OrderPatch, RunLock, StateStore};
use async_trait::async_trait;
use baton_core::{FlowId, HolderId, OrderEvent, OrderNum, OrderRecord, OrderStatus, RunId, TraceId};
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn epoch_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Default)]
struct StateInner {
    // (run_id, order_num) -> record; BTreeMap keeps runs ordered by num
    orders: HashMap<String, BTreeMap<OrderNum, OrderRecord>>,
    // trace_id -> events in arrival order
    events: HashMap<String, Vec<OrderEvent>>,
    locks: HashMap<String, RunLock>,
}

/// In-memory state store.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<StateInner>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current lock record for a run, if any.
    pub fn lock_record(&self, run_id: &RunId) -> Option<RunLock> {
        self.inner.lock().locks.get(run_id.as_str()).cloned()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn put_order(&self, order: &OrderRecord) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner
            .orders
            .entry(order.meta.run_id.to_string())
            .or_default()
            .insert(order.num, order.clone());
        Ok(())
    }

    async fn get_order(
        &self,
        run_id: &RunId,
        num: OrderNum,
    ) -> Result<Option<OrderRecord>, StorageError> {
        let inner = self.inner.lock();
        Ok(inner
            .orders
            .get(run_id.as_str())
            .and_then(|run| run.get(&num))
            .cloned())
    }

    async fn orders_for_run(&self, run_id: &RunId) -> Result<Vec<OrderRecord>, StorageError> {
        let inner = self.inner.lock();
        Ok(inner
            .orders
            .get(run_id.as_str())
            .map(|run| run.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn update_status(
        &self,
        run_id: &RunId,
        num: OrderNum,
        status: OrderStatus,
        patch: OrderPatch,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        let record = inner
            .orders
            .get_mut(run_id.as_str())
            .and_then(|run| run.get_mut(&num))
            .ok_or_else(|| StorageError::NotFound(format!("order {}/{}", run_id, num)))?;
        patch.apply(record, status);
        Ok(())
    }

    async fn append_event(&self, event: &OrderEvent) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        inner
            .events
            .entry(event.trace_id.to_string())
            .or_default()
            .push(event.clone());
        Ok(())
    }

    async fn events_by_trace(
        &self,
        trace_id: &TraceId,
        prefix: Option<&str>,
    ) -> Result<Vec<OrderEvent>, StorageError> {
        let inner = self.inner.lock();
        let mut events: Vec<OrderEvent> = inner
            .events
            .get(trace_id.as_str())
            .map(|events| {
                events
                    .iter()
                    .filter(|e| prefix.is_none_or(|p| e.sort_key.starts_with(p)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        events.sort_by(|a, b| a.sort_key.cmp(&b.sort_key));
        Ok(events)
    }

    async fn acquire_lock(
        &self,
        run_id: &RunId,
        holder_id: &HolderId,
        flow_id: &FlowId,
        trace_id: &TraceId,
        ttl_ms: u64,
        now_ms: u64,
    ) -> Result<LockAttempt, StorageError> {
        let mut inner = self.inner.lock();
        if let Some(existing) = inner.locks.get(run_id.as_str()) {
            let lapsed = existing.expires_at_ms <= now_ms;
            if existing.state == LockState::Active && !lapsed {
                return Ok(LockAttempt::Contended);
            }
        }
        inner.locks.insert(
            run_id.to_string(),
            RunLock {
                run_id: run_id.clone(),
                holder_id: holder_id.clone(),
                state: LockState::Active,
                acquired_at: Utc::now(),
                flow_id: flow_id.clone(),
                trace_id: trace_id.clone(),
                expires_at_ms: now_ms + ttl_ms,
            },
        );
        Ok(LockAttempt::Acquired)
    }

    async fn release_lock(&self, run_id: &RunId) -> Result<(), StorageError> {
        let mut inner = self.inner.lock();
        if let Some(lock) = inner.locks.get_mut(run_id.as_str()) {
            lock.state = LockState::Completed;
        }
        Ok(())
    }
}

/// In-memory artifact store.
#[derive(Clone, Default)]
pub struct MemoryArtifactStore {
    objects: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All stored paths, sorted. For assertions.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self.objects.lock().keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ArtifactStore for MemoryArtifactStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.objects.lock().insert(path.to_string(), bytes);
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.objects.lock().get(path).cloned())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.objects.lock().contains_key(path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.objects.lock().remove(path);
        Ok(())
    }

    async fn presign_write(
        &self,
        path: &str,
        ttl: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        Ok(PresignedUrl {
            uri: format!("memory://{}", path),
            expires_at_ms: epoch_ms_now() + ttl.as_millis() as u64,
        })
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
