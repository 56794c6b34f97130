// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S1: linear success through a two-order chain.

use crate::prelude::*;
use baton_core::test_support::bundle_order;
use baton_core::{EventKind, JobStatus, OrderStatus};

#[tokio::test]
async fn linear_chain_completes_in_dependency_order() {
    let mut h = harness();
    let response = h
        .submit(vec![bundle_order("a", &[]), bundle_order("b", &["a"])])
        .await;
    h.pump().await;

    let run = &response.run_id;
    assert_eq!(h.status_of(run, "a").await, OrderStatus::Succeeded);
    assert_eq!(h.status_of(run, "b").await, OrderStatus::Succeeded);

    let done = h.done(run).await.expect("done marker");
    assert_eq!(done.status, JobStatus::Succeeded);
    assert_eq!(done.summary.succeeded, 2);
    assert_eq!(done.summary.failed, 0);
    assert_eq!(done.summary.timed_out, 0);

    // b was dispatched only after a succeeded
    let b_events = h.events(&response.trace_id, "b:").await;
    assert!(b_events
        .iter()
        .any(|e| e.event_type == EventKind::OrderDispatched));

    // each order has exactly one terminal event
    for name in ["a:", "b:"] {
        let terminal = h
            .events(&response.trace_id, name)
            .await
            .iter()
            .filter(|e| e.event_type == EventKind::OrderCompleted)
            .count();
        assert_eq!(terminal, 1, "one terminal event for {}", name);
    }

    // job lifecycle events bracket the run
    let job_events = h.events(&response.trace_id, "_job:").await;
    assert!(job_events
        .iter()
        .any(|e| e.event_type == EventKind::JobStarted));
    assert!(job_events
        .iter()
        .any(|e| e.event_type == EventKind::JobCompleted));
}
