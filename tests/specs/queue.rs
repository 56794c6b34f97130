// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S6: queue-id serialisation of independent orders.

use crate::prelude::*;
use baton_core::test_support::bundle_order;
use baton_core::JobStatus;

#[tokio::test]
async fn same_queue_orders_never_run_together() {
    let mut h = harness();
    let mut a = bundle_order("a", &[]);
    a.queue_id = Some("q1".to_string());
    let mut b = bundle_order("b", &[]);
    b.queue_id = Some("q1".to_string());
    let response = h.submit(vec![a, b]).await;
    let run = &response.run_id;

    // the pump asserts after every tick that at most one order per queue id
    // is running; a violation panics there
    h.pump().await;

    let done = h.done(run).await.expect("done marker");
    assert_eq!(done.status, JobStatus::Succeeded);
    assert_eq!(done.summary.succeeded, 2);
}

#[tokio::test]
async fn different_queues_do_not_serialise() {
    let mut h = harness();
    let mut a = bundle_order("a", &[]);
    a.queue_id = Some("q1".to_string());
    let mut b = bundle_order("b", &[]);
    b.queue_id = Some("q2".to_string());
    let response = h.submit(vec![a, b]).await;

    h.pump().await;
    let done = h.done(&response.run_id).await.expect("done marker");
    assert_eq!(done.summary.succeeded, 2);
}
