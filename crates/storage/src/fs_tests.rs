// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use baton_core::test_support::order_record;
use tempfile::tempdir;
use yare::parameterized;

const NOW: u64 = 1_700_000_000_000;

#[tokio::test]
async fn orders_survive_reopen() {
    let dir = tempdir().unwrap();
    let run = RunId::new("run1");
    {
        let store = FsStateStore::new(dir.path());
        store
            .put_order(&order_record("a", 1, OrderStatus::Queued))
            .await
            .unwrap();
        store
            .put_order(&order_record("b", 2, OrderStatus::Queued))
            .await
            .unwrap();
    }
    let store = FsStateStore::new(dir.path());
    let orders = store.orders_for_run(&run).await.unwrap();
    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].num, OrderNum::new(1));
}

#[tokio::test]
async fn update_status_rewrites_record() {
    let dir = tempdir().unwrap();
    let store = FsStateStore::new(dir.path());
    let run = RunId::new("run1");
    store
        .put_order(&order_record("a", 1, OrderStatus::Queued))
        .await
        .unwrap();

    store
        .update_status(
            &run,
            OrderNum::new(1),
            OrderStatus::Failed,
            OrderPatch::with_log("dependency x ended as failed"),
        )
        .await
        .unwrap();

    let order = store
        .get_order(&run, OrderNum::new(1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(order.status, OrderStatus::Failed);
    assert_eq!(
        order.status_log.as_deref(),
        Some("dependency x ended as failed")
    );
}

#[tokio::test]
async fn conditional_acquire_contends_on_active_lock() {
    let dir = tempdir().unwrap();
    let store = FsStateStore::new(dir.path());
    let run = RunId::new("run1");
    let flow = FlowId::new("mia:trace1-exec");
    let trace = TraceId::new("trace1");

    let first = store
        .acquire_lock(&run, &HolderId::new("h1"), &flow, &trace, 60_000, NOW)
        .await
        .unwrap();
    assert_eq!(first, LockAttempt::Acquired);

    let second = store
        .acquire_lock(&run, &HolderId::new("h2"), &flow, &trace, 60_000, NOW + 1)
        .await
        .unwrap();
    assert_eq!(second, LockAttempt::Contended);
}

#[parameterized(
    released = { true },
    lapsed = { false },
)]
fn lock_is_reusable(released: bool) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let dir = tempdir().unwrap();
        let store = FsStateStore::new(dir.path());
        let run = RunId::new("run1");
        let flow = FlowId::new("mia:trace1-exec");
        let trace = TraceId::new("trace1");

        store
            .acquire_lock(&run, &HolderId::new("h1"), &flow, &trace, 1_000, NOW)
            .await
            .unwrap();
        let retry_at = if released {
            store.release_lock(&run).await.unwrap();
            NOW + 1
        } else {
            NOW + 1_001
        };

        let attempt = store
            .acquire_lock(&run, &HolderId::new("h2"), &flow, &trace, 1_000, retry_at)
            .await
            .unwrap();
        assert_eq!(attempt, LockAttempt::Acquired);
    });
}

#[tokio::test]
async fn release_without_lock_is_a_noop() {
    let dir = tempdir().unwrap();
    let store = FsStateStore::new(dir.path());
    store.release_lock(&RunId::new("ghost")).await.unwrap();
}

#[tokio::test]
async fn artifact_round_trip_and_delete() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());

    store
        .put("internal/exec/r1/0001/bundle", vec![1, 2, 3])
        .await
        .unwrap();
    assert!(store.exists("internal/exec/r1/0001/bundle").await.unwrap());
    assert_eq!(
        store.get("internal/exec/r1/0001/bundle").await.unwrap(),
        Some(vec![1, 2, 3])
    );

    store.delete("internal/exec/r1/0001/bundle").await.unwrap();
    assert!(!store.exists("internal/exec/r1/0001/bundle").await.unwrap());
    // deleting again stays fine
    store.delete("internal/exec/r1/0001/bundle").await.unwrap();
}

#[parameterized(
    traversal = { "internal/../../etc/passwd" },
    absolute = { "/etc/passwd" },
    empty_segment = { "internal//bundle" },
)]
fn hostile_keys_are_rejected(key: &str) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let dir = tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());
        let err = store.put(key, vec![0]).await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidPath(_)));
    });
}

#[tokio::test]
async fn fs_presign_points_into_root() {
    let dir = tempdir().unwrap();
    let store = FsArtifactStore::new(dir.path());
    let url = store
        .presign_write("internal/callbacks/r1/0001/result", Duration::from_secs(60))
        .await
        .unwrap();
    assert!(url.uri.starts_with("file://"));
    assert!(url.uri.ends_with("internal/callbacks/r1/0001/result"));
}
