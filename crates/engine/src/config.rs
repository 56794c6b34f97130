// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kernel configuration.
//!
//! Every invocation constructs an explicit `Config` from the environment at
//! entry; no module-level state. The names mirror the deployment's
//! store/backend bindings.

use baton_core::TargetDefaults;
use std::time::Duration;

/// Environment-configured names and operational limits.
#[derive(Debug, Clone)]
pub struct Config {
    /// C1 collection names
    pub orders_table: String,
    pub order_events_table: String,
    pub locks_table: String,
    /// C2 bucket names
    pub internal_bucket: String,
    pub done_bucket: String,
    /// Inline worker function name
    pub worker_target: String,
    /// Watchdog machine name, recorded on dispatched orders
    pub watchdog_handle: String,
    /// Notification sink name
    pub events_sink: String,
    /// Container project for `container` orders
    pub container_project: String,
    /// Command document for `remote-agent` orders
    pub agent_document_ref: String,
    /// Per-call timeout for state-store operations
    pub state_timeout: Duration,
    /// Per-call timeout for backend dispatch
    pub dispatch_timeout: Duration,
    /// Default lifetime of presigned callback-write URLs
    pub presign_ttl: Duration,
    /// Watchdog poll period
    pub watchdog_period: Duration,
    /// Concurrent dispatch cap within one invocation
    pub dispatch_fanout: usize,
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            orders_table: "baton-orders".to_string(),
            order_events_table: "baton-order-events".to_string(),
            locks_table: "baton-locks".to_string(),
            internal_bucket: "baton-internal".to_string(),
            done_bucket: "baton-done".to_string(),
            worker_target: "baton-worker".to_string(),
            watchdog_handle: "baton-watchdog".to_string(),
            events_sink: "baton-events".to_string(),
            container_project: "baton-runner".to_string(),
            agent_document_ref: "baton-run-commands".to_string(),
            state_timeout: Duration::from_secs(10),
            dispatch_timeout: Duration::from_secs(30),
            presign_ttl: Duration::from_secs(2 * 60 * 60),
            watchdog_period: Duration::from_secs(60),
            dispatch_fanout: 16,
        }
    }
}

impl Config {
    /// Read the deployment bindings from the environment.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            orders_table: env_or("ORDERS_TABLE", &defaults.orders_table),
            order_events_table: env_or("ORDER_EVENTS_TABLE", &defaults.order_events_table),
            locks_table: env_or("LOCKS_TABLE", &defaults.locks_table),
            internal_bucket: env_or("INTERNAL_BUCKET", &defaults.internal_bucket),
            done_bucket: env_or("DONE_BUCKET", &defaults.done_bucket),
            worker_target: env_or("WORKER_TARGET", &defaults.worker_target),
            watchdog_handle: env_or("WATCHDOG_HANDLE", &defaults.watchdog_handle),
            events_sink: env_or("EVENTS_SINK", &defaults.events_sink),
            container_project: env_or("CONTAINER_PROJECT", &defaults.container_project),
            agent_document_ref: env_or("AGENT_DOCUMENT_REF", &defaults.agent_document_ref),
            ..defaults
        }
    }

    /// Backend fields used when an order names only a target kind.
    pub fn target_defaults(&self) -> TargetDefaults {
        TargetDefaults {
            inline_function: self.worker_target.clone(),
            container_project: self.container_project.clone(),
            document_ref: self.agent_document_ref.clone(),
        }
    }

    /// Presign lifetime for a job: the default, stretched to cover long
    /// job timeouts.
    pub fn presign_ttl_for(&self, job_timeout_s: u64) -> Duration {
        self.presign_ttl.max(Duration::from_secs(job_timeout_s))
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
