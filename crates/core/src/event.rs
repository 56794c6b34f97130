// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit events.

use crate::id::{RunId, TraceId};
use crate::job::FlowId;
use crate::order::OrderStatus;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reserved order name for job-level events.
pub const JOB_ORDER_NAME: &str = "_job";

/// Event-row TTL: 90 days.
pub const EVENT_TTL_MS: u64 = 90 * 24 * 60 * 60 * 1000;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    JobStarted,
    JobCompleted,
    OrderDispatched,
    OrderCompleted,
    DependencyFailed,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::JobStarted => write!(f, "job_started"),
            EventKind::JobCompleted => write!(f, "job_completed"),
            EventKind::OrderDispatched => write!(f, "order_dispatched"),
            EventKind::OrderCompleted => write!(f, "order_completed"),
            EventKind::DependencyFailed => write!(f, "dependency_failed"),
        }
    }
}

/// One audit record. Keyed `(trace_id, "<order_name>:<epoch_ms>")`.
///
/// Never rewritten; identical-millisecond collisions within one order break
/// by arrival and are acceptable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    pub trace_id: TraceId,
    pub sort_key: String,
    pub order_name: String,
    pub event_type: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
    pub flow_id: FlowId,
    pub run_id: RunId,
    #[serde(default)]
    pub data: serde_json::Value,
    pub expires_at_ms: u64,
}

impl OrderEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        trace_id: TraceId,
        flow_id: FlowId,
        run_id: RunId,
        order_name: &str,
        event_type: EventKind,
        status: Option<OrderStatus>,
        data: serde_json::Value,
        epoch_ms: u64,
    ) -> Self {
        Self {
            sort_key: sort_key(order_name, epoch_ms),
            trace_id,
            order_name: order_name.to_string(),
            event_type,
            status,
            flow_id,
            run_id,
            data,
            expires_at_ms: epoch_ms + EVENT_TTL_MS,
        }
    }
}

/// Build the event sort key for an order at a point in time.
pub fn sort_key(order_name: &str, epoch_ms: u64) -> String {
    format!("{}:{}", order_name, epoch_ms)
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
