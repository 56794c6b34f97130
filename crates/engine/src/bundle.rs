// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution bundles.
//!
//! A bundle is a zstd-compressed tar of the order's code tree plus the
//! sealed env envelope under [`SEALED_ENV_ENTRY`]. Pre-uploaded code
//! bundles use the same format without the envelope entry.

use crate::envelope::SealedEnvelope;
use std::io::Read;
use thiserror::Error;

/// Archive entry holding the sealed env map.
pub const SEALED_ENV_ENTRY: &str = "env.sealed.json";

/// Archive entry holding the order's command list.
pub const CMDS_ENTRY: &str = "cmds.json";

/// Errors from bundle packing/unpacking
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Pack files (relative path, contents) and an optional envelope.
pub fn pack_bundle(
    files: &[(String, Vec<u8>)],
    envelope: Option<&SealedEnvelope>,
) -> Result<Vec<u8>, BundleError> {
    let encoder = zstd::Encoder::new(Vec::new(), 0)?;
    let mut builder = tar::Builder::new(encoder);

    for (path, bytes) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        builder.append_data(&mut header, path, bytes.as_slice())?;
    }
    if let Some(envelope) = envelope {
        let json = serde_json::to_vec(envelope)?;
        let mut header = tar::Header::new_gnu();
        header.set_size(json.len() as u64);
        header.set_mode(0o600);
        builder.append_data(&mut header, SEALED_ENV_ENTRY, json.as_slice())?;
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// Unpack a bundle into its files and the envelope, if present.
pub fn unpack_bundle(
    bytes: &[u8],
) -> Result<(Vec<(String, Vec<u8>)>, Option<SealedEnvelope>), BundleError> {
    let decoder = zstd::Decoder::new(bytes)?;
    let mut archive = tar::Archive::new(decoder);

    let mut files = Vec::new();
    let mut envelope = None;
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_string_lossy().into_owned();
        let mut contents = Vec::new();
        entry.read_to_end(&mut contents)?;
        if path == SEALED_ENV_ENTRY {
            envelope = Some(serde_json::from_slice(&contents)?);
        } else {
            files.push((path, contents));
        }
    }
    Ok((files, envelope))
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
