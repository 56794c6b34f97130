// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[test]
fn order_num_formats_zero_padded() {
    assert_eq!(OrderNum::new(1).to_string(), "0001");
    assert_eq!(OrderNum::new(42).to_string(), "0042");
    assert_eq!(OrderNum::START.to_string(), "0000");
}

#[test]
fn order_num_from_index_is_one_based() {
    assert_eq!(OrderNum::from_index(0), OrderNum::new(1));
    assert_eq!(OrderNum::from_index(9), OrderNum::new(10));
    assert!(!OrderNum::from_index(0).is_start());
}

#[test]
fn order_num_round_trips_through_json() {
    let num = OrderNum::new(7);
    let json = serde_json::to_string(&num).unwrap();
    assert_eq!(json, "\"0007\"");
    let back: OrderNum = serde_json::from_str(&json).unwrap();
    assert_eq!(back, num);
}

#[parameterized(
    queued_to_running = { OrderStatus::Queued, OrderStatus::Running, true },
    queued_to_failed = { OrderStatus::Queued, OrderStatus::Failed, true },
    queued_to_timed_out = { OrderStatus::Queued, OrderStatus::TimedOut, true },
    queued_to_succeeded = { OrderStatus::Queued, OrderStatus::Succeeded, false },
    running_to_succeeded = { OrderStatus::Running, OrderStatus::Succeeded, true },
    running_to_failed = { OrderStatus::Running, OrderStatus::Failed, true },
    running_to_queued = { OrderStatus::Running, OrderStatus::Queued, false },
    succeeded_reassert = { OrderStatus::Succeeded, OrderStatus::Succeeded, true },
    succeeded_to_failed = { OrderStatus::Succeeded, OrderStatus::Failed, false },
    timed_out_to_running = { OrderStatus::TimedOut, OrderStatus::Running, false },
)]
fn status_transitions(from: OrderStatus, to: OrderStatus, allowed: bool) {
    assert_eq!(from.can_transition(to), allowed);
}

#[test]
fn terminal_statuses() {
    assert!(!OrderStatus::Queued.is_terminal());
    assert!(!OrderStatus::Running.is_terminal());
    assert!(OrderStatus::Succeeded.is_terminal());
    assert!(OrderStatus::Failed.is_terminal());
    assert!(OrderStatus::TimedOut.is_terminal());
}

#[test]
fn status_serializes_snake_case() {
    let json = serde_json::to_string(&OrderStatus::TimedOut).unwrap();
    assert_eq!(json, "\"timed_out\"");
}

#[test]
fn target_kind_uses_wire_names() {
    assert_eq!(
        serde_json::to_string(&TargetKind::RemoteAgent).unwrap(),
        "\"remote-agent\""
    );
    let kind: TargetKind = serde_json::from_str("\"inline\"").unwrap();
    assert_eq!(kind, TargetKind::Inline);
}

#[test]
fn execution_target_carries_variant_fields() {
    let target = ExecutionTarget::RemoteAgent {
        targets: vec!["fleet-a".into()],
        document_ref: "run-commands".into(),
    };
    assert_eq!(target.kind(), TargetKind::RemoteAgent);

    let json = serde_json::to_value(&target).unwrap();
    assert_eq!(json["kind"], "remote_agent");
    assert_eq!(json["targets"][0], "fleet-a");
}

#[test]
fn order_source_deserializes_both_variants() {
    let bundle: OrderSource =
        serde_json::from_str(r#"{"bundle":{"bundle_location":"internal/pre/b1"}}"#).unwrap();
    assert!(matches!(bundle, OrderSource::Bundle { .. }));

    let repo: OrderSource = serde_json::from_str(
        r#"{"repo":{"repo":"git.example/x","token_ref":"tokens/x","commit":"abc123"}}"#,
    )
    .unwrap();
    match repo {
        OrderSource::Repo { commit, folder, .. } => {
            assert_eq!(commit.as_deref(), Some("abc123"));
            assert!(folder.is_none());
        }
        other => panic!("expected repo source, got {:?}", other),
    }
}
