// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::PrReference;

#[tokio::test]
async fn comments_create_find_update() {
    let vcs = FakeVcs::new();
    let id = vcs
        .create_comment("org/repo", 7, "<!-- baton:r1 --> queued", "tok")
        .await
        .unwrap();

    let found = vcs
        .find_comment_by_tag("org/repo", 7, "baton:r1", "tok")
        .await
        .unwrap();
    assert_eq!(found, Some(id.clone()));

    vcs.update_comment("org/repo", &id, "<!-- baton:r1 --> done", "tok")
        .await
        .unwrap();
    assert_eq!(
        vcs.comment_bodies("org/repo", 7),
        vec!["<!-- baton:r1 --> done"]
    );
}

#[tokio::test]
async fn find_misses_other_prs() {
    let vcs = FakeVcs::new();
    vcs.create_comment("org/repo", 7, "<!-- baton:r1 -->", "tok")
        .await
        .unwrap();
    let found = vcs
        .find_comment_by_tag("org/repo", 8, "baton:r1", "tok")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn update_unknown_comment_errors() {
    let vcs = FakeVcs::new();
    let err = vcs
        .update_comment("org/repo", &CommentId::new("comment-9"), "x", "tok")
        .await
        .unwrap_err();
    assert!(matches!(err, VcsError::Api(_)));
}

#[tokio::test]
async fn verify_result_is_scriptable() {
    let vcs = FakeVcs::new();
    assert!(vcs
        .verify_webhook(&HashMap::new(), b"{}", "secret")
        .await
        .unwrap());
    vcs.set_verify_result(false);
    assert!(!vcs
        .verify_webhook(&HashMap::new(), b"{}", "secret")
        .await
        .unwrap());
}

#[test]
fn pr_reference_parses_from_opaque_value() {
    let value = serde_json::json!({
        "repo": "org/repo",
        "number": 12,
        "token_ref": "tokens/bot",
        "extra": {"ignored": true}
    });
    let pr = PrReference::from_value(&value).unwrap();
    assert_eq!(pr.repo, "org/repo");
    assert_eq!(pr.number, 12);

    assert!(PrReference::from_value(&serde_json::json!({"number": 1})).is_none());
}
