// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Credential source port.
//!
//! Config and secret lookups are opaque to the kernel: a path goes in,
//! bytes come out. Values never appear in state records or events, only the
//! paths that produced them.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from credential lookups
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential not found: {0}")]
    NotFound(String),
    #[error("credential lookup failed: {0}")]
    Lookup(String),
}

/// Adapter for fetching config and secret values by path.
#[async_trait]
pub trait CredentialSource: Clone + Send + Sync + 'static {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, CredentialError>;
}

/// Credential source backed by process environment variables.
///
/// `auth/github/token` resolves from `AUTH_GITHUB_TOKEN`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialSource;

impl EnvCredentialSource {
    pub fn new() -> Self {
        Self
    }

    fn var_name(path: &str) -> String {
        path.chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect()
    }
}

#[async_trait]
impl CredentialSource for EnvCredentialSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, CredentialError> {
        let name = Self::var_name(path);
        std::env::var(&name)
            .map(String::into_bytes)
            .map_err(|_| CredentialError::NotFound(path.to_string()))
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{CredentialError, CredentialSource};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Fake credential source with preloaded values.
    #[derive(Clone, Default)]
    pub struct FakeCredentialSource {
        values: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl FakeCredentialSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, path: impl Into<String>, value: impl Into<Vec<u8>>) {
            self.values.lock().insert(path.into(), value.into());
        }
    }

    #[async_trait]
    impl CredentialSource for FakeCredentialSource {
        async fn fetch(&self, path: &str) -> Result<Vec<u8>, CredentialError> {
            self.values
                .lock()
                .get(path)
                .cloned()
                .ok_or_else(|| CredentialError::NotFound(path.to_string()))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeCredentialSource;

#[cfg(test)]
#[path = "credentials_tests.rs"]
mod tests;
