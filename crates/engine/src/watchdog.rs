// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-order timeout watchdog.
//!
//! One watchdog per dispatched order polls the artifact store until the
//! order reports, or writes a synthetic timed-out result once the deadline
//! passes. That write produces a notification like any worker callback, so
//! the orchestrator reconciles both paths identically.

use crate::error::EngineError;
use baton_core::{callback_path, CallbackResult, CallbackStatus, Clock, OrderNum, RunId};
use baton_storage::ArtifactStore;
use async_trait::async_trait;
use std::time::Duration;

/// Input of one watchdog instance. It owns no other state.
#[derive(Debug, Clone)]
pub struct WatchdogSpec {
    pub run_id: RunId,
    pub num: OrderNum,
    pub timeout: Duration,
    pub dispatched_at_ms: u64,
}

impl WatchdogSpec {
    /// Wall-clock moment after which the order is considered lost.
    pub fn deadline_ms(&self) -> u64 {
        self.dispatched_at_ms + self.timeout.as_millis() as u64
    }
}

/// Outcome of a single poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogTick {
    /// The order reported; nothing to do.
    ResultPresent,
    /// Deadline passed; a synthetic timed-out result was written.
    TimedOutWritten,
    /// Neither; check again after the poll period.
    Waiting,
}

/// Poll state machine for one order.
pub struct Watchdog<A, C> {
    artifacts: A,
    clock: C,
    spec: WatchdogSpec,
    period: Duration,
}

impl<A, C> Watchdog<A, C>
where
    A: ArtifactStore,
    C: Clock,
{
    pub fn new(artifacts: A, clock: C, spec: WatchdogSpec, period: Duration) -> Self {
        Self {
            artifacts,
            clock,
            spec,
            period,
        }
    }

    /// One poll step.
    pub async fn tick(&self) -> Result<WatchdogTick, EngineError> {
        let path = callback_path(&self.spec.run_id, self.spec.num);
        if self.artifacts.exists(&path).await? {
            return Ok(WatchdogTick::ResultPresent);
        }
        if self.clock.epoch_ms() >= self.spec.deadline_ms() {
            let result = CallbackResult::new(
                CallbackStatus::TimedOut,
                format!(
                    "no callback within {}s of dispatch",
                    self.spec.timeout.as_secs()
                ),
            );
            self.artifacts
                .put(&path, serde_json::to_vec(&result).map_err(baton_storage::StorageError::from)?)
                .await?;
            tracing::info!(
                run = %self.spec.run_id,
                order = %self.spec.num,
                "watchdog wrote synthetic timed_out result"
            );
            return Ok(WatchdogTick::TimedOutWritten);
        }
        Ok(WatchdogTick::Waiting)
    }

    /// Poll until the order reports or times out.
    pub async fn run(self) -> Result<WatchdogTick, EngineError> {
        loop {
            match self.tick().await? {
                WatchdogTick::Waiting => tokio::time::sleep(self.period).await,
                done => return Ok(done),
            }
        }
    }
}

/// Port through which the orchestrator starts a watchdog per dispatch.
#[async_trait]
pub trait WatchdogLauncher: Clone + Send + Sync + 'static {
    /// Start a watchdog; returns an opaque handle recorded on the order.
    async fn launch(&self, spec: WatchdogSpec) -> Result<String, EngineError>;
}

/// Launcher running watchdogs as in-process tasks.
#[derive(Clone)]
pub struct TaskWatchdogLauncher<A, C> {
    artifacts: A,
    clock: C,
    period: Duration,
}

impl<A, C> TaskWatchdogLauncher<A, C> {
    pub fn new(artifacts: A, clock: C, period: Duration) -> Self {
        Self {
            artifacts,
            clock,
            period,
        }
    }
}

#[async_trait]
impl<A, C> WatchdogLauncher for TaskWatchdogLauncher<A, C>
where
    A: ArtifactStore,
    C: Clock,
{
    async fn launch(&self, spec: WatchdogSpec) -> Result<String, EngineError> {
        let handle = format!("watchdog:{}:{}", spec.run_id, spec.num);
        let watchdog = Watchdog::new(self.artifacts.clone(), self.clock.clone(), spec, self.period);
        tokio::spawn(async move {
            if let Err(e) = watchdog.run().await {
                tracing::warn!(error = %e, "watchdog exited with error");
            }
        });
        Ok(handle)
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{WatchdogLauncher, WatchdogSpec};
    use crate::error::EngineError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Launcher that only records specs.
    #[derive(Clone, Default)]
    pub struct FakeWatchdogLauncher {
        specs: Arc<Mutex<Vec<WatchdogSpec>>>,
    }

    impl FakeWatchdogLauncher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn launched(&self) -> Vec<WatchdogSpec> {
            self.specs.lock().clone()
        }
    }

    #[async_trait]
    impl WatchdogLauncher for FakeWatchdogLauncher {
        async fn launch(&self, spec: WatchdogSpec) -> Result<String, EngineError> {
            let handle = format!("watchdog:{}:{}", spec.run_id, spec.num);
            self.specs.lock().push(spec);
            Ok(handle)
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWatchdogLauncher;

#[cfg(test)]
#[path = "watchdog_tests.rs"]
mod tests;
