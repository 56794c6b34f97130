// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification sink port.
//!
//! Callback writes produce object-path notifications that drive the
//! orchestrator. The orchestrator only ever consumes paths; this module is
//! wired around the artifact store by the host process, never imported by
//! the orchestrator itself.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from sink delivery
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("notification sink closed")]
    Closed,
}

/// Receives "object written" notifications.
#[async_trait]
pub trait EventSink: Clone + Send + Sync + 'static {
    async fn object_written(&self, path: &str) -> Result<(), SinkError>;
}

/// In-process sink backed by a bounded channel.
///
/// Delivery is at-least-once from the orchestrator's point of view: the
/// reader may observe a path more than once across process restarts, and
/// reconciliation must stay idempotent.
#[derive(Clone)]
pub struct BusEventSink {
    tx: mpsc::Sender<String>,
}

/// Reader half of the bus.
pub struct SinkReader {
    rx: mpsc::Receiver<String>,
}

impl BusEventSink {
    /// Create a bus with the given capacity.
    ///
    /// Returns both the sink (for senders) and reader (for the notify loop).
    pub fn channel(capacity: usize) -> (Self, SinkReader) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, SinkReader { rx })
    }
}

#[async_trait]
impl EventSink for BusEventSink {
    async fn object_written(&self, path: &str) -> Result<(), SinkError> {
        self.tx
            .send(path.to_string())
            .await
            .map_err(|_| SinkError::Closed)
    }
}

impl SinkReader {
    /// Wait for the next notification. `None` when all sinks are dropped.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Sink that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn object_written(&self, _path: &str) -> Result<(), SinkError> {
        Ok(())
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{EventSink, SinkError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Fake sink recording every notified path.
    #[derive(Clone, Default)]
    pub struct FakeEventSink {
        paths: Arc<Mutex<Vec<String>>>,
    }

    impl FakeEventSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn paths(&self) -> Vec<String> {
            self.paths.lock().clone()
        }
    }

    #[async_trait]
    impl EventSink for FakeEventSink {
        async fn object_written(&self, path: &str) -> Result<(), SinkError> {
            self.paths.lock().push(path.to_string());
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeEventSink;

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
