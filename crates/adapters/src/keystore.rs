// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Key store port.
//!
//! Holds the private halves of per-order encryption key pairs under
//! `keys/<run_id>/<order_num>`. Cleanup at finalisation is best-effort.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors from key-store operations
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key store failure: {0}")]
    Store(String),
    #[error("key not found: {0}")]
    NotFound(String),
}

/// Adapter for private key material.
#[async_trait]
pub trait KeyStore: Clone + Send + Sync + 'static {
    async fn store(&self, key_ref: &str, material: Vec<u8>) -> Result<(), KeyError>;

    async fn load(&self, key_ref: &str) -> Result<Option<Vec<u8>>, KeyError>;

    async fn delete(&self, key_ref: &str) -> Result<(), KeyError>;
}

#[derive(Default)]
struct MemoryKeyState {
    keys: HashMap<String, Vec<u8>>,
    fail_deletes: bool,
}

/// In-memory key store.
#[derive(Clone, Default)]
pub struct MemoryKeyStore {
    inner: Arc<Mutex<MemoryKeyState>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored key refs, sorted. For assertions.
    pub fn refs(&self) -> Vec<String> {
        let mut refs: Vec<String> = self.inner.lock().keys.keys().cloned().collect();
        refs.sort();
        refs
    }

    /// Make every delete fail, to exercise best-effort cleanup paths.
    #[cfg(any(test, feature = "test-support"))]
    pub fn fail_deletes(&self) {
        self.inner.lock().fail_deletes = true;
    }
}

#[async_trait]
impl KeyStore for MemoryKeyStore {
    async fn store(&self, key_ref: &str, material: Vec<u8>) -> Result<(), KeyError> {
        self.inner.lock().keys.insert(key_ref.to_string(), material);
        Ok(())
    }

    async fn load(&self, key_ref: &str) -> Result<Option<Vec<u8>>, KeyError> {
        Ok(self.inner.lock().keys.get(key_ref).cloned())
    }

    async fn delete(&self, key_ref: &str) -> Result<(), KeyError> {
        let mut inner = self.inner.lock();
        if inner.fail_deletes {
            return Err(KeyError::Store(format!("delete denied for {}", key_ref)));
        }
        inner.keys.remove(key_ref);
        Ok(())
    }
}

#[cfg(test)]
#[path = "keystore_tests.rs"]
mod tests;
