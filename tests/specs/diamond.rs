// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S2: diamond graph; independent roots run in the same tick, the join
//! waits for both.

use crate::prelude::*;
use baton_core::test_support::bundle_order;
use baton_core::{EventKind, JobStatus, OrderStatus};

#[tokio::test]
async fn diamond_joins_after_both_roots() {
    let mut h = harness();
    let response = h
        .submit(vec![
            bundle_order("a", &[]),
            bundle_order("b", &[]),
            bundle_order("c", &["a", "b"]),
        ])
        .await;

    let run = &response.run_id;
    h.pump().await;

    let done = h.done(run).await.expect("done marker");
    assert_eq!(done.status, JobStatus::Succeeded);
    assert_eq!(done.summary.succeeded, 3);
    assert_eq!(h.status_of(run, "c").await, OrderStatus::Succeeded);

    // both roots were dispatched exactly once
    let a_dispatched = h
        .events(&response.trace_id, "a:")
        .await
        .iter()
        .filter(|e| e.event_type == EventKind::OrderDispatched)
        .count();
    let b_dispatched = h
        .events(&response.trace_id, "b:")
        .await
        .iter()
        .filter(|e| e.event_type == EventKind::OrderDispatched)
        .count();
    assert_eq!((a_dispatched, b_dispatched), (1, 1));
}
