// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builders shared by tests across the workspace.

use crate::descriptor::{JobDescriptor, OrderDescriptor, SourceFields};
use crate::id::{RunId, TraceId};
use crate::job::{derive_flow_id, RunMeta};
use crate::order::{
    ExecutionTarget, OrderNum, OrderRecord, OrderSource, OrderSpec, OrderStatus, TargetKind,
};
use crate::validate::TargetDefaults;

pub fn target_defaults() -> TargetDefaults {
    TargetDefaults {
        inline_function: "baton-worker".to_string(),
        container_project: "baton-runner".to_string(),
        document_ref: "baton-run-commands".to_string(),
    }
}

/// Descriptor with the given orders and test defaults.
pub fn descriptor(orders: Vec<OrderDescriptor>) -> JobDescriptor {
    JobDescriptor {
        username: "mia".to_string(),
        flow_label: "exec".to_string(),
        trace_id: None,
        run_id: None,
        job_timeout_s: 3600,
        pr_reference: None,
        encryption_key_ref: None,
        orders,
    }
}

/// Inline order with a blob source, named dependencies, `cmds: ["true"]`.
pub fn bundle_order(name: &str, dependencies: &[&str]) -> OrderDescriptor {
    OrderDescriptor {
        order_name: Some(name.to_string()),
        execution_target: Some(TargetKind::Inline),
        use_lambda: None,
        cmds: vec!["true".to_string()],
        timeout_s: 30,
        must_succeed: true,
        dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        queue_id: None,
        env_vars: Default::default(),
        config_paths: vec![],
        secret_paths: vec![],
        source: Some(SourceFields {
            bundle_location: Some(format!("internal/pre/{}", name)),
            ..Default::default()
        }),
        targets: vec![],
        document_ref: None,
    }
}

/// Run meta for a fixed test run.
pub fn run_meta(run_id: &str) -> RunMeta {
    let trace_id = TraceId::new("trace1");
    RunMeta {
        run_id: RunId::new(run_id),
        flow_id: derive_flow_id("mia", &trace_id, "exec"),
        trace_id,
        submitter: "mia".to_string(),
        job_timeout_s: 3600,
        deadline_ms: 1_700_000_000_000 + 3_600_000,
        pr_reference: None,
    }
}

/// Resolved spec for an inline order.
pub fn order_spec(name: &str, num: u32, dependencies: &[&str]) -> OrderSpec {
    OrderSpec {
        num: OrderNum::new(num),
        name: name.to_string(),
        target: ExecutionTarget::Inline {
            function: "baton-worker".to_string(),
        },
        cmds: vec!["true".to_string()],
        timeout_s: 30,
        must_succeed: true,
        dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        queue_id: None,
        env_vars: Default::default(),
        config_paths: vec![],
        secret_paths: vec![],
        source: OrderSource::Bundle {
            bundle_location: format!("internal/pre/{}", name),
        },
    }
}

/// Persisted order row in the given status, for run `run1`.
pub fn order_record(name: &str, num: u32, status: OrderStatus) -> OrderRecord {
    let meta = run_meta("run1");
    let spec = order_spec(name, num, &[]);
    let mut record = OrderRecord::queued(
        meta,
        &spec,
        format!("internal/exec/run1/{:04}/bundle", num),
        format!("https://example.invalid/cb/{:04}", num),
        format!("keys/run1/{:04}", num),
        1_700_000_000_000,
    );
    record.status = status;
    record
}
