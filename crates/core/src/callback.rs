// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Callback and done-marker payloads, and artifact path discipline.
//!
//! Workers (or the watchdog) write a [`CallbackResult`] to the callback path
//! of their order; the write is the sole trigger for the orchestrator. The
//! done marker records the run's aggregate outcome.

use crate::id::RunId;
use crate::job::{JobStatus, JobSummary};
use crate::order::{OrderNum, OrderStatus};
use serde::{Deserialize, Serialize};

/// Callback logs are truncated to 256 KiB.
pub const MAX_CALLBACK_LOG_BYTES: usize = 256 * 1024;

/// Terminal outcome reported by a worker or the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackStatus {
    Succeeded,
    Failed,
    TimedOut,
}

impl From<CallbackStatus> for OrderStatus {
    fn from(status: CallbackStatus) -> Self {
        match status {
            CallbackStatus::Succeeded => OrderStatus::Succeeded,
            CallbackStatus::Failed => OrderStatus::Failed,
            CallbackStatus::TimedOut => OrderStatus::TimedOut,
        }
    }
}

/// Payload written to `internal/callbacks/<run>/<num>/result`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallbackResult {
    pub status: CallbackStatus,
    pub log: String,
}

impl CallbackResult {
    pub fn new(status: CallbackStatus, log: impl Into<String>) -> Self {
        let mut result = Self {
            status,
            log: log.into(),
        };
        result.truncate_log();
        result
    }

    /// Cap the log at [`MAX_CALLBACK_LOG_BYTES`], on a char boundary.
    pub fn truncate_log(&mut self) {
        if self.log.len() <= MAX_CALLBACK_LOG_BYTES {
            return;
        }
        let mut end = MAX_CALLBACK_LOG_BYTES;
        while !self.log.is_char_boundary(end) {
            end -= 1;
        }
        self.log.truncate(end);
    }
}

/// Payload written to `done/<run>/done` when every order is terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoneMarker {
    pub status: JobStatus,
    pub summary: JobSummary,
}

/// Path of an order's execution bundle.
pub fn bundle_path(run_id: &RunId, num: OrderNum) -> String {
    format!("internal/exec/{}/{}/bundle", run_id, num)
}

/// Path of an order's callback result.
pub fn callback_path(run_id: &RunId, num: OrderNum) -> String {
    format!("internal/callbacks/{}/{}/result", run_id, num)
}

/// Path of the run's done marker.
pub fn done_path(run_id: &RunId) -> String {
    format!("done/{}/done", run_id)
}

/// Extract `(run_id, order_num)` from a callback object path.
///
/// Accepts the path with or without the leading `internal/` segment; anything
/// else is not a callback notification.
pub fn parse_callback_path(path: &str) -> Option<(RunId, OrderNum)> {
    let path = path.strip_prefix("internal/").unwrap_or(path);
    let mut parts = path.split('/');
    if parts.next() != Some("callbacks") {
        return None;
    }
    let run = parts.next().filter(|s| !s.is_empty())?;
    let num: OrderNum = parts.next()?.parse().ok()?;
    if parts.next() != Some("result") || parts.next().is_some() {
        return None;
    }
    Some((RunId::new(run), num))
}

#[cfg(test)]
#[path = "callback_tests.rs"]
mod tests;
