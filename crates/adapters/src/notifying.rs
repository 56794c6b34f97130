// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact-store wrapper that announces callback writes.
//!
//! Any write landing under the callback prefix is forwarded to the event
//! sink after the blob is durable, which is what re-enters the
//! orchestrator. All other operations pass straight through.

use crate::sink::EventSink;
use async_trait::async_trait;
use baton_core::parse_callback_path;
use baton_storage::{ArtifactStore, PresignedUrl, StorageError};
use std::time::Duration;

/// Wraps an artifact store with callback-write notifications.
#[derive(Clone)]
pub struct NotifyingArtifactStore<A, E> {
    inner: A,
    sink: E,
}

impl<A, E> NotifyingArtifactStore<A, E> {
    pub fn new(inner: A, sink: E) -> Self {
        Self { inner, sink }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }
}

#[async_trait]
impl<A, E> ArtifactStore for NotifyingArtifactStore<A, E>
where
    A: ArtifactStore,
    E: EventSink,
{
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.inner.put(path, bytes).await?;
        if parse_callback_path(path).is_some() {
            self.sink
                .object_written(path)
                .await
                .map_err(|e| StorageError::Unavailable(e.to_string()))?;
        }
        Ok(())
    }

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(path).await
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.inner.exists(path).await
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.inner.delete(path).await
    }

    async fn presign_write(
        &self,
        path: &str,
        ttl: Duration,
    ) -> Result<PresignedUrl, StorageError> {
        self.inner.presign_write(path, ttl).await
    }
}

#[cfg(test)]
#[path = "notifying_tests.rs"]
mod tests;
