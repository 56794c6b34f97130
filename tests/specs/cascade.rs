// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S3: a must-succeed failure dooms everything downstream.

use crate::prelude::*;
use baton_core::test_support::bundle_order;
use baton_core::{EventKind, JobStatus, OrderStatus};

#[tokio::test]
async fn must_succeed_failure_cascades() {
    let mut h = harness();
    let response = h
        .submit(vec![
            order_with_cmds("a", &[], &["false"], 30),
            bundle_order("b", &["a"]),
        ])
        .await;

    let run = &response.run_id;
    h.pump().await;

    assert_eq!(h.status_of(run, "a").await, OrderStatus::Failed);
    assert_eq!(h.status_of(run, "b").await, OrderStatus::Failed);

    let orders = h.orders(run).await;
    let b = orders.iter().find(|o| o.name == "b").unwrap();
    assert_eq!(b.status_log.as_deref(), Some("dependency a ended as failed"));

    let done = h.done(run).await.expect("done marker");
    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.summary.succeeded, 0);
    assert_eq!(done.summary.failed, 2);
    assert_eq!(done.summary.timed_out, 0);

    // the doomed order never dispatched; its terminal event is the
    // dependency failure
    let b_events = h.events(&response.trace_id, "b:").await;
    assert!(b_events
        .iter()
        .all(|e| e.event_type != EventKind::OrderDispatched));
    assert!(b_events
        .iter()
        .any(|e| e.event_type == EventKind::DependencyFailed));
}

#[tokio::test]
async fn optional_failure_does_not_cascade() {
    let mut h = harness();
    let mut optional = order_with_cmds("a", &[], &["false"], 30);
    optional.must_succeed = false;
    let response = h.submit(vec![optional, bundle_order("b", &["a"])]).await;

    let run = &response.run_id;
    h.pump().await;

    assert_eq!(h.status_of(run, "a").await, OrderStatus::Failed);
    assert_eq!(h.status_of(run, "b").await, OrderStatus::Succeeded);

    let done = h.done(run).await.expect("done marker");
    assert_eq!(done.status, JobStatus::Succeeded);
    assert_eq!(done.summary.failed, 1);
    assert_eq!(done.summary.succeeded, 1);
}
