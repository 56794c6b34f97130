// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn store_load_delete_round_trip() {
    let keys = MemoryKeyStore::new();
    keys.store("keys/r1/0001", vec![7; 32]).await.unwrap();
    assert_eq!(keys.load("keys/r1/0001").await.unwrap(), Some(vec![7; 32]));
    assert_eq!(keys.refs(), vec!["keys/r1/0001"]);

    keys.delete("keys/r1/0001").await.unwrap();
    assert!(keys.load("keys/r1/0001").await.unwrap().is_none());
}

#[tokio::test]
async fn missing_key_loads_as_none() {
    let keys = MemoryKeyStore::new();
    assert!(keys.load("keys/r1/0009").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_failures_are_reportable() {
    let keys = MemoryKeyStore::new();
    keys.store("keys/r1/0001", vec![1]).await.unwrap();
    keys.fail_deletes();
    let err = keys.delete("keys/r1/0001").await.unwrap_err();
    assert!(matches!(err, KeyError::Store(_)));
    // key remains for a later sweep
    assert_eq!(keys.refs(), vec!["keys/r1/0001"]);
}
