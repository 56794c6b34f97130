// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn ids_compare_against_str() {
    let id = HolderId::new("holder-1");
    assert_eq!(id, "holder-1");
    assert_eq!(id.as_str(), "holder-1");
    assert_eq!(id.to_string(), "holder-1");
}

#[test]
fn ids_round_trip_through_json() {
    let id = RunId::new("run-42");
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, "\"run-42\"");
    let back: RunId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn uuid_gen_produces_unique_ids() {
    let gen = UuidIdGen;
    let a = gen.generate();
    let b = gen.generate();
    assert_ne!(a, b);
    assert_eq!(a.len(), 36);
}

#[test]
fn trace_tokens_are_short_hex() {
    let gen = UuidIdGen;
    let token = gen.trace_token();
    assert_eq!(token.len(), 8);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert_ne!(token, gen.trace_token());
}
