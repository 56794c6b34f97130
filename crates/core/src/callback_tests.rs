// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn paths_are_stable() {
    let run = RunId::new("r1");
    assert_eq!(
        bundle_path(&run, OrderNum::new(3)),
        "internal/exec/r1/0003/bundle"
    );
    assert_eq!(
        callback_path(&run, OrderNum::new(3)),
        "internal/callbacks/r1/0003/result"
    );
    assert_eq!(done_path(&run), "done/r1/done");
}

#[parameterized(
    with_internal = { "internal/callbacks/r1/0002/result" },
    without_internal = { "callbacks/r1/0002/result" },
)]
fn parse_accepts_callback_paths(path: &str) {
    let (run, num) = parse_callback_path(path).unwrap();
    assert_eq!(run, "r1");
    assert_eq!(num, OrderNum::new(2));
}

#[parameterized(
    wrong_root = { "internal/exec/r1/0002/bundle" },
    missing_result = { "callbacks/r1/0002" },
    trailing_segment = { "callbacks/r1/0002/result/extra" },
    bad_num = { "callbacks/r1/two/result" },
    empty_run = { "callbacks//0002/result" },
)]
fn parse_rejects_non_callback_paths(path: &str) {
    assert!(parse_callback_path(path).is_none());
}

#[test]
fn parse_start_signal_path() {
    let (_, num) = parse_callback_path("internal/callbacks/r1/0000/result").unwrap();
    assert!(num.is_start());
}

#[test]
fn callback_log_truncates_to_cap() {
    let long = "x".repeat(MAX_CALLBACK_LOG_BYTES + 100);
    let result = CallbackResult::new(CallbackStatus::Failed, long);
    assert_eq!(result.log.len(), MAX_CALLBACK_LOG_BYTES);
}

#[test]
fn callback_log_truncates_on_char_boundary() {
    // Multi-byte char straddling the cap must not split
    let mut log = "a".repeat(MAX_CALLBACK_LOG_BYTES - 1);
    log.push('é');
    log.push_str("tail");
    let result = CallbackResult::new(CallbackStatus::Succeeded, log);
    assert!(result.log.len() <= MAX_CALLBACK_LOG_BYTES);
    assert!(result.log.is_char_boundary(result.log.len()));
}

#[test]
fn callback_status_maps_to_order_status() {
    assert_eq!(
        OrderStatus::from(CallbackStatus::TimedOut),
        OrderStatus::TimedOut
    );
}

#[test]
fn done_marker_serializes_per_contract() {
    let marker = DoneMarker {
        status: JobStatus::Failed,
        summary: JobSummary {
            succeeded: 0,
            failed: 2,
            timed_out: 0,
        },
    };
    let json = serde_json::to_value(&marker).unwrap();
    assert_eq!(json["status"], "failed");
    assert_eq!(json["summary"]["failed"], 2);
}
