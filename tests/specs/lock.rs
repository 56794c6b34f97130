// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! S5: simultaneous notifications for one run; the lock admits exactly one
//! orchestrator at a time and nothing is lost.

use crate::prelude::*;
use baton_core::test_support::bundle_order;
use baton_core::{
    callback_path, Clock, EventKind, FlowId, HolderId, JobStatus, OrderNum, TraceId,
};
use baton_storage::StateStore;

#[tokio::test]
async fn held_lock_turns_an_invocation_away() {
    let mut h = harness();
    let response = h.submit(vec![bundle_order("a", &[])]).await;
    let run = &response.run_id;

    h.state
        .acquire_lock(
            run,
            &HolderId::new("other-invocation"),
            &FlowId::new("mia:t-exec"),
            &TraceId::new("t"),
            3_600_000,
            h.clock.epoch_ms(),
        )
        .await
        .unwrap();

    let outcome = h
        .orchestrator
        .handle_notification(&callback_path(run, OrderNum::START))
        .await
        .unwrap();
    assert_eq!(outcome, baton_engine::TickOutcome::Contended);

    // the loser made no transitions
    assert_eq!(
        h.status_of(run, "a").await,
        baton_core::OrderStatus::Queued
    );

    h.state.release_lock(run).await.unwrap();
    h.pump().await;
    assert_eq!(h.done(run).await.unwrap().status, JobStatus::Succeeded);
}

#[tokio::test]
async fn racing_notifications_lose_no_updates() {
    let mut h = harness();
    let response = h.submit(vec![bundle_order("a", &[])]).await;
    let run = response.run_id.clone();

    // two invocations race on the same start notification
    let path = callback_path(&run, OrderNum::START);
    let first = h.orchestrator.clone();
    let second = h.orchestrator.clone();
    let (a, b) = tokio::join!(
        first.handle_notification(&path),
        second.handle_notification(&path),
    );
    a.unwrap();
    b.unwrap();

    // drain the worker callback and finish the run
    h.pump().await;
    assert_eq!(h.done(&run).await.unwrap().status, JobStatus::Succeeded);

    // event counts equal the serialised replay: one dispatch, one terminal
    let a_events = h.events(&response.trace_id, "a:").await;
    let dispatched = a_events
        .iter()
        .filter(|e| e.event_type == EventKind::OrderDispatched)
        .count();
    let terminal = a_events
        .iter()
        .filter(|e| e.event_type == EventKind::OrderCompleted)
        .count();
    assert_eq!((dispatched, terminal), (1, 1));
}
