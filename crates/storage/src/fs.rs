// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed stores for single-host deployments.
//!
//! Records are JSON files under a root directory; writes go to a temp file
//! and rename into place so a crash never leaves a torn record. The
//! conditional lock acquire uses `create_new`, which is atomic on the
//! filesystems we care about.

use crate::artifact::{ArtifactStore, PresignedUrl};
use crate::error::StorageError;
use crate::state::{LockAttempt, LockState, OrderPatch, RunLock, StateStore};
use async_trait::async_trait;
use baton_core::{FlowId, HolderId, OrderEvent, OrderNum, OrderRecord, OrderStatus, RunId, TraceId};
use chrono::Utc;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn epoch_ms_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Write JSON atomically (temp file, then rename).
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp)?;
        serde_json::to_writer(&mut file, value)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Reject absolute paths and parent traversal in object keys.
fn check_key(key: &str) -> Result<(), StorageError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.split('/').any(|seg| seg == ".." || seg.is_empty());
    if bad {
        return Err(StorageError::InvalidPath(key.to_string()));
    }
    Ok(())
}

/// File-backed state store.
#[derive(Clone)]
pub struct FsStateStore {
    root: PathBuf,
}

impl FsStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn order_path(&self, run_id: &RunId, num: OrderNum) -> PathBuf {
        self.root
            .join("orders")
            .join(run_id.as_str())
            .join(format!("{}.json", num))
    }

    fn events_dir(&self, trace_id: &TraceId) -> PathBuf {
        self.root.join("events").join(trace_id.as_str())
    }

    fn lock_path(&self, run_id: &RunId) -> PathBuf {
        self.root
            .join("locks")
            .join(format!("{}.json", run_id.as_str()))
    }
}

#[async_trait]
impl StateStore for FsStateStore {
    async fn put_order(&self, order: &OrderRecord) -> Result<(), StorageError> {
        write_json(&self.order_path(&order.meta.run_id, order.num), order)
    }

    async fn get_order(
        &self,
        run_id: &RunId,
        num: OrderNum,
    ) -> Result<Option<OrderRecord>, StorageError> {
        read_json(&self.order_path(run_id, num))
    }

    async fn orders_for_run(&self, run_id: &RunId) -> Result<Vec<OrderRecord>, StorageError> {
        let dir = self.root.join("orders").join(run_id.as_str());
        let mut orders = Vec::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(orders),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(order) = read_json::<OrderRecord>(&path)? {
                orders.push(order);
            }
        }
        orders.sort_by_key(|o| o.num);
        Ok(orders)
    }

    async fn update_status(
        &self,
        run_id: &RunId,
        num: OrderNum,
        status: OrderStatus,
        patch: OrderPatch,
    ) -> Result<(), StorageError> {
        let path = self.order_path(run_id, num);
        let mut order: OrderRecord = read_json(&path)?
            .ok_or_else(|| StorageError::NotFound(format!("order {}/{}", run_id, num)))?;
        patch.apply(&mut order, status);
        write_json(&path, &order)
    }

    async fn append_event(&self, event: &OrderEvent) -> Result<(), StorageError> {
        // Sort keys contain ':' which is fine on the target filesystems
        let path = self
            .events_dir(&event.trace_id)
            .join(format!("{}.json", event.sort_key));
        write_json(&path, event)
    }

    async fn events_by_trace(
        &self,
        trace_id: &TraceId,
        prefix: Option<&str>,
    ) -> Result<Vec<OrderEvent>, StorageError> {
        let dir = self.events_dir(trace_id);
        let mut events = Vec::new();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(events),
            Err(e) => return Err(e.into()),
        };
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(event) = read_json::<OrderEvent>(&path)? {
                if prefix.is_none_or(|p| event.sort_key.starts_with(p)) {
                    events.push(event);
                }
            }
        }
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
        let path = self.lock_path(run_id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let lock = RunLock {
            run_id: run_id.clone(),
            holder_id: holder_id.clone(),
            state: LockState::Active,
            acquired_at: Utc::now(),
            flow_id: flow_id.clone(),
            trace_id: trace_id.clone(),
            expires_at_ms: now_ms + ttl_ms,
        };

        // Two rounds: if the record exists but is completed or lapsed,
        // remove it and try the atomic create once more.
        for _ in 0..2 {
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(&serde_json::to_vec(&lock)?)?;
                    file.sync_all()?;
                    return Ok(LockAttempt::Acquired);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    let existing: Option<RunLock> = read_json(&path)?;
                    let reusable = match existing {
                        None => true,
                        Some(lock) => {
                            lock.state == LockState::Completed || lock.expires_at_ms <= now_ms
                        }
                    };
                    if !reusable {
                        return Ok(LockAttempt::Contended);
                    }
                    match fs::remove_file(&path) {
                        Ok(()) => {}
                        Err(e) if e.kind() == ErrorKind::NotFound => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        // Another invocation won the re-create race
        Ok(LockAttempt::Contended)
    }

    async fn release_lock(&self, run_id: &RunId) -> Result<(), StorageError> {
        let path = self.lock_path(run_id);
        let Some(mut lock) = read_json::<RunLock>(&path)? else {
            return Ok(());
        };
        lock.state = LockState::Completed;
        write_json(&path, &lock)
    }
}

/// File-backed artifact store.
#[derive(Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        check_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let target = self.object_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = target.with_extension("tmp");
        {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &target)?;
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let target = self.object_path(path)?;
        match fs::read(&target) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.object_path(path)?.exists())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let target = self.object_path(path)?;
        match fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn presign_write(
        &self,
        path: &str,
        ttl: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        let target = self.object_path(path)?;
        Ok(PresignedUrl {
            uri: format!("file://{}", target.display()),
            expires_at_ms: epoch_ms_now() + ttl.as_millis() as u64,
        })
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
