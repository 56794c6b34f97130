// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

#[parameterized(
    slashes = { "auth/github/token", "AUTH_GITHUB_TOKEN" },
    dashes = { "team-a/db-pass", "TEAM_A_DB_PASS" },
    already_flat = { "SIMPLE", "SIMPLE" },
)]
fn env_var_names_flatten_paths(path: &str, expected: &str) {
    assert_eq!(EnvCredentialSource::var_name(path), expected);
}

#[tokio::test]
async fn fake_source_round_trips() {
    let source = FakeCredentialSource::new();
    source.insert("auth/github/token", "s3cret");
    assert_eq!(
        source.fetch("auth/github/token").await.unwrap(),
        b"s3cret".to_vec()
    );
}

#[tokio::test]
async fn missing_path_is_not_found() {
    let source = FakeCredentialSource::new();
    let err = source.fetch("nope").await.unwrap_err();
    assert!(matches!(err, CredentialError::NotFound(_)));
}
