// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Order records and their status state machine.
//!
//! An order is one unit of work within a run: a list of shell commands, a
//! target backend, and dependencies on sibling orders. Orders move
//! `queued → running → {succeeded | failed | timed_out}` and never leave a
//! terminal state.

use crate::job::RunMeta;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Zero-padded sequence position of an order within its run.
///
/// `0000` is reserved for the start signal and never names a real order;
/// real orders count from `0001`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderNum(u32);

impl OrderNum {
    /// The reserved start-signal position.
    pub const START: OrderNum = OrderNum(0);

    pub fn new(n: u32) -> Self {
        Self(n)
    }

    /// Order number for the zero-based position in a descriptor's list.
    pub fn from_index(i: usize) -> Self {
        Self(i as u32 + 1)
    }

    pub fn is_start(&self) -> bool {
        self.0 == 0
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for OrderNum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.0)
    }
}

impl FromStr for OrderNum {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(OrderNum)
    }
}

impl Serialize for OrderNum {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderNum {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Status of an order. Transitions are strictly monotone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    TimedOut,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Succeeded | OrderStatus::Failed | OrderStatus::TimedOut
        )
    }

    /// Whether the state machine permits moving to `next`.
    ///
    /// Re-asserting the same terminal state is allowed (reconciliation is
    /// idempotent); everything else from a terminal state is not.
    pub fn can_transition(&self, next: OrderStatus) -> bool {
        match self {
            OrderStatus::Queued => matches!(
                next,
                OrderStatus::Running | OrderStatus::Failed | OrderStatus::TimedOut
            ),
            OrderStatus::Running => next.is_terminal(),
            terminal => *terminal == next,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Queued => write!(f, "queued"),
            OrderStatus::Running => write!(f, "running"),
            OrderStatus::Succeeded => write!(f, "succeeded"),
            OrderStatus::Failed => write!(f, "failed"),
            OrderStatus::TimedOut => write!(f, "timed_out"),
        }
    }
}

/// Wire-level name of an execution backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetKind {
    #[serde(rename = "inline")]
    Inline,
    #[serde(rename = "container")]
    Container,
    #[serde(rename = "remote-agent")]
    RemoteAgent,
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetKind::Inline => write!(f, "inline"),
            TargetKind::Container => write!(f, "container"),
            TargetKind::RemoteAgent => write!(f, "remote-agent"),
        }
    }
}

/// Resolved execution backend with target-specific fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionTarget {
    /// In-process function runtime
    Inline { function: String },
    /// Long-running container job
    Container { project: String },
    /// Command channel to a named fleet
    RemoteAgent {
        targets: Vec<String>,
        document_ref: String,
    },
}

impl ExecutionTarget {
    pub fn kind(&self) -> TargetKind {
        match self {
            ExecutionTarget::Inline { .. } => TargetKind::Inline,
            ExecutionTarget::Container { .. } => TargetKind::Container,
            ExecutionTarget::RemoteAgent { .. } => TargetKind::RemoteAgent,
        }
    }
}

/// Where an order's code comes from. Exactly one variant per order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    Bundle {
        bundle_location: String,
    },
    Repo {
        repo: String,
        token_ref: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        folder: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        commit: Option<String>,
    },
}

/// A validated order before admission derives bundle and callback fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    pub num: OrderNum,
    pub name: String,
    pub target: ExecutionTarget,
    pub cmds: Vec<String>,
    pub timeout_s: u64,
    pub must_succeed: bool,
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    #[serde(default)]
    pub config_paths: Vec<String>,
    #[serde(default)]
    pub secret_paths: Vec<String>,
    pub source: OrderSource,
}

/// Persisted order row.
///
/// Run-level fields are denormalized into `meta` on every row so an
/// orchestrator invocation can recover trace, flow, and deadline from any
/// load of the run's orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub meta: RunMeta,
    pub num: OrderNum,
    pub name: String,
    pub target: ExecutionTarget,
    pub cmds: Vec<String>,
    pub timeout_s: u64,
    pub must_succeed: bool,
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_id: Option<String>,
    pub status: OrderStatus,
    pub bundle_uri: String,
    pub callback_uri: String,
    pub encryption_key_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watchdog_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispatched_at_ms: Option<u64>,
    /// Log line recorded with the terminal transition, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_log: Option<String>,
    pub created_at_ms: u64,
    /// Rows expire one day after creation
    pub expires_at_ms: u64,
}

/// Order-row TTL.
pub const ORDER_TTL_MS: u64 = 24 * 60 * 60 * 1000;

impl OrderRecord {
    /// Build the persisted row for a packaged order, status `queued`.
    pub fn queued(
        meta: RunMeta,
        spec: &OrderSpec,
        bundle_uri: String,
        callback_uri: String,
        encryption_key_ref: String,
        now_ms: u64,
    ) -> Self {
        Self {
            meta,
            num: spec.num,
            name: spec.name.clone(),
            target: spec.target.clone(),
            cmds: spec.cmds.clone(),
            timeout_s: spec.timeout_s,
            must_succeed: spec.must_succeed,
            dependencies: spec.dependencies.clone(),
            queue_id: spec.queue_id.clone(),
            status: OrderStatus::Queued,
            bundle_uri,
            callback_uri,
            encryption_key_ref,
            execution_url: None,
            watchdog_handle: None,
            dispatched_at_ms: None,
            status_log: None,
            created_at_ms: now_ms,
            expires_at_ms: now_ms + ORDER_TTL_MS,
        }
    }
}

#[cfg(test)]
#[path = "order_tests.rs"]
mod tests;
