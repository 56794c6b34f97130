// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S4: a worker that never reports is resolved by the watchdog.

use crate::prelude::*;
use baton_core::{JobStatus, OrderStatus};
use std::time::Duration;

#[tokio::test]
async fn lost_worker_times_out_through_the_watchdog() {
    let mut h = harness();
    let response = h
        .submit(vec![order_with_cmds("a", &[], &["sleep 600"], 5)])
        .await;
    let run = &response.run_id;

    // dispatch happens, the worker never reports
    h.pump().await;
    assert_eq!(h.status_of(run, "a").await, OrderStatus::Running);
    assert!(h.done(run).await.is_none());

    // past the order deadline the watchdog writes the synthetic result,
    // which re-enters the orchestrator
    h.clock.advance(Duration::from_secs(6));
    h.pump().await;

    assert_eq!(h.status_of(run, "a").await, OrderStatus::TimedOut);
    let orders = h.orders(run).await;
    assert!(orders[0]
        .status_log
        .as_deref()
        .unwrap()
        .contains("no callback within 5s"));

    // must_succeed defaults to true, so the run fails
    let done = h.done(run).await.expect("done marker");
    assert_eq!(done.status, JobStatus::Failed);
    assert_eq!(done.summary.timed_out, 1);
}
