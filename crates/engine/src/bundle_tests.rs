// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::envelope::{generate_keypair, open_envelope, seal_envelope};

fn sample_files() -> Vec<(String, Vec<u8>)> {
    vec![
        ("run.sh".to_string(), b"#!/bin/sh\ntrue\n".to_vec()),
        ("src/job.py".to_string(), b"print('ok')\n".to_vec()),
    ]
}

#[test]
fn code_only_bundle_round_trips() {
    let bytes = pack_bundle(&sample_files(), None).unwrap();
    let (files, envelope) = unpack_bundle(&bytes).unwrap();
    assert_eq!(files, sample_files());
    assert!(envelope.is_none());
}

#[test]
fn envelope_travels_with_the_code() {
    let keys = generate_keypair();
    let sealed = seal_envelope(&keys.public, "keys/r1/0001", b"TIMEOUT=30", vec![]).unwrap();

    let bytes = pack_bundle(&sample_files(), Some(&sealed)).unwrap();
    let (files, envelope) = unpack_bundle(&bytes).unwrap();

    // envelope entry is split out of the file list
    assert_eq!(files, sample_files());
    let envelope = envelope.unwrap();
    assert_eq!(envelope.key_ref, "keys/r1/0001");
    assert_eq!(
        open_envelope(&envelope, &keys.private).unwrap(),
        b"TIMEOUT=30"
    );
}

#[test]
fn empty_bundle_is_valid() {
    let bytes = pack_bundle(&[], None).unwrap();
    let (files, envelope) = unpack_bundle(&bytes).unwrap();
    assert!(files.is_empty());
    assert!(envelope.is_none());
}

#[test]
fn garbage_bytes_fail_to_unpack() {
    assert!(unpack_bundle(b"definitely not zstd").is_err());
}
