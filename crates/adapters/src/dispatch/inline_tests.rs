// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use baton_core::{ExecutionTarget, OrderNum, RunId};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::mpsc;

fn request(num: u32) -> DispatchRequest {
    DispatchRequest {
        run_id: RunId::new("r1"),
        num: OrderNum::new(num),
        target: ExecutionTarget::Inline {
            function: "baton-worker".into(),
        },
        bundle_uri: "internal/exec/r1/0001/bundle".into(),
        key_ref: "keys/r1/0001".into(),
        callback_uri: "memory://cb".into(),
        timeout_s: 30,
    }
}

#[tokio::test]
async fn runs_worker_as_background_task() {
    let (tx, mut rx) = mpsc::channel(1);
    let dispatcher = InlineDispatcher::new(move |req: DispatchRequest| {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx.send(req.client_request_id()).await;
        }) as WorkerFuture
    });

    let handle = dispatcher.dispatch(request(1)).await.unwrap();
    assert_eq!(handle.execution_url, "inline:r1:0001");
    assert_eq!(rx.recv().await.as_deref(), Some("r1:0001"));
}

#[tokio::test]
async fn duplicate_dispatch_is_absorbed() {
    let runs = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&runs);
    let dispatcher = InlineDispatcher::new(move |_req| {
        let counter = Arc::clone(&counter);
        Box::pin(async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }) as WorkerFuture
    });

    let first = dispatcher.dispatch(request(1)).await.unwrap();
    let second = dispatcher.dispatch(request(1)).await.unwrap();
    assert_eq!(first, second);

    tokio::task::yield_now().await;
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}
