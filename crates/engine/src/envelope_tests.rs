// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn seal_then_open_recovers_plaintext() {
    let keys = generate_keypair();
    let envelope = seal_envelope(
        &keys.public,
        "keys/r1/0001",
        br#"{"CALLBACK_URL":"memory://cb"}"#,
        vec!["config/team".to_string()],
    )
    .unwrap();

    assert_eq!(envelope.key_ref, "keys/r1/0001");
    assert_eq!(envelope.source_paths, vec!["config/team"]);

    let plaintext = open_envelope(&envelope, &keys.private).unwrap();
    assert_eq!(plaintext, br#"{"CALLBACK_URL":"memory://cb"}"#);
}

#[test]
fn wrong_private_key_fails_to_open() {
    let keys = generate_keypair();
    let other = generate_keypair();
    let envelope = seal_envelope(&keys.public, "keys/r1/0001", b"secret", vec![]).unwrap();
    assert!(matches!(
        open_envelope(&envelope, &other.private),
        Err(EnvelopeError::Decrypt)
    ));
}

#[test]
fn tampered_ciphertext_fails_to_open() {
    let keys = generate_keypair();
    let mut envelope = seal_envelope(&keys.public, "keys/r1/0001", b"secret", vec![]).unwrap();
    envelope.ciphertext = envelope.ciphertext.replace(
        envelope.ciphertext.chars().next().unwrap(),
        if envelope.ciphertext.starts_with('A') { "B" } else { "A" },
    );
    assert!(open_envelope(&envelope, &keys.private).is_err());
}

#[test]
fn malformed_fields_are_reported() {
    let keys = generate_keypair();
    let mut envelope = seal_envelope(&keys.public, "keys/r1/0001", b"x", vec![]).unwrap();
    envelope.ephemeral_pub = "notbase64!".to_string();
    assert!(matches!(
        open_envelope(&envelope, &keys.private),
        Err(EnvelopeError::Malformed(_))
    ));
}

#[test]
fn plaintext_never_appears_in_serialized_envelope() {
    let keys = generate_keypair();
    let envelope = seal_envelope(
        &keys.public,
        "keys/r1/0001",
        b"SUPER_SECRET_VALUE",
        vec!["secrets/db".to_string()],
    )
    .unwrap();
    let json = serde_json::to_string(&envelope).unwrap();
    assert!(!json.contains("SUPER_SECRET_VALUE"));
    // audit carries the path, not the value
    assert!(json.contains("secrets/db"));
}

#[test]
fn each_seal_uses_fresh_material() {
    let keys = generate_keypair();
    let a = seal_envelope(&keys.public, "k", b"same", vec![]).unwrap();
    let b = seal_envelope(&keys.public, "k", b"same", vec![]).unwrap();
    assert_ne!(a.ciphertext, b.ciphertext);
    assert_ne!(a.ephemeral_pub, b.ephemeral_pub);
}
