// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Artifact store: blobs under well-known roots.
//!
//! Two logical namespaces: `internal/` (bundles and callbacks, expiring in a
//! day) and `done/` (permanent finalisation markers). Notification on
//! callback writes is not part of this trait; the server composes a
//! notifying wrapper around any implementation.

use crate::error::StorageError;
use async_trait::async_trait;
use std::time::Duration;

/// Time-limited write grant for a single object path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUrl {
    pub uri: String,
    pub expires_at_ms: u64,
}

/// Blob storage with presigned writes.
#[async_trait]
pub trait ArtifactStore: Clone + Send + Sync + 'static {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    async fn get(&self, path: &str) -> Result<Option<Vec<u8>>, StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Obtain a time-limited write URL for the given path.
    ///
    /// The URL is embedded in execution bundles so workers can report
    /// without holding store credentials.
    async fn presign_write(
        &self,
        path: &str,
        ttl: Duration,
    ) -> Result<PresignedUrl, StorageError>;
}
