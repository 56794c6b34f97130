// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Run-level metadata and aggregate status.

use crate::id::{RunId, TraceId};
use crate::order::{OrderRecord, OrderStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

crate::string_id! {
    /// Human-readable identifier shown to observers: `<user>:<trace>-<label>`.
    FlowId
}

/// Derive the flow id from its parts.
pub fn derive_flow_id(username: &str, trace_id: &TraceId, label: &str) -> FlowId {
    FlowId::new(format!("{}:{}-{}", username, trace_id, label))
}

/// Run-level fields denormalized onto every order row.
///
/// Created by admission and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMeta {
    pub run_id: RunId,
    pub trace_id: TraceId,
    pub flow_id: FlowId,
    pub submitter: String,
    pub job_timeout_s: u64,
    /// Wall-clock deadline for the whole run
    pub deadline_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pr_reference: Option<serde_json::Value>,
}

/// Aggregate status of a run, derived solely from its orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Succeeded,
    Failed,
    TimedOut,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed => write!(f, "failed"),
            JobStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Per-status order counts reported in the done marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobSummary {
    pub succeeded: u32,
    pub failed: u32,
    pub timed_out: u32,
}

/// Fold terminal orders into the run's aggregate status and summary.
///
/// `deadline_elapsed` marks a run whose job-level timeout passed before all
/// orders went terminal; it overrides the per-order fold.
pub fn aggregate_status(orders: &[OrderRecord], deadline_elapsed: bool) -> (JobStatus, JobSummary) {
    let mut summary = JobSummary::default();
    let mut failed = false;
    for order in orders {
        match order.status {
            OrderStatus::Succeeded => summary.succeeded += 1,
            OrderStatus::Failed => summary.failed += 1,
            OrderStatus::TimedOut => summary.timed_out += 1,
            OrderStatus::Queued | OrderStatus::Running => {}
        }
        if order.must_succeed && order.status != OrderStatus::Succeeded {
            failed = true;
        }
    }

    let status = if deadline_elapsed {
        JobStatus::TimedOut
    } else if failed {
        JobStatus::Failed
    } else {
        JobStatus::Succeeded
    };
    (status, summary)
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
