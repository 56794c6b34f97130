// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification loop.
//!
//! Drains the bus and runs one orchestrator invocation per object path.
//! Contention and unknown runs are normal signals; only genuine failures
//! are logged at warn.

use crate::composition::LocalOrchestrator;
use baton_adapters::SinkReader;
use baton_engine::{EngineError, TickOutcome};
use std::sync::Arc;

/// Run until every sink handle is dropped.
pub async fn run(mut reader: SinkReader, orchestrator: Arc<LocalOrchestrator>) {
    while let Some(path) = reader.recv().await {
        match orchestrator.handle_notification(&path).await {
            Ok(TickOutcome::Contended) => {
                tracing::debug!(%path, "tick: contended");
            }
            Ok(TickOutcome::UnknownRun) => {
                tracing::warn!(%path, "tick: unknown run");
            }
            Ok(TickOutcome::Progressed {
                dispatched,
                finalised,
            }) => {
                tracing::debug!(%path, dispatched, finalised, "tick: progressed");
            }
            Err(EngineError::BadNotification(path)) => {
                tracing::warn!(%path, "tick: unparseable notification path");
            }
            Err(e) => {
                tracing::warn!(%path, error = %e, "tick failed; next notification re-enters");
            }
        }
    }
    tracing::info!("notification bus closed, loop exiting");
}
