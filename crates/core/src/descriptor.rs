// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical job-descriptor parsing.
//!
//! Submissions arrive either as the raw JSON descriptor or wrapped in a
//! `{"job_parameters_b64": "<base64(JSON)>"}` envelope. Parsing applies wire
//! defaults only; semantic checks live in [`crate::validate`].

use crate::order::TargetKind;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Errors turning request bytes into a descriptor
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("job_parameters_b64 is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

fn default_flow_label() -> String {
    "exec".to_string()
}

fn default_job_timeout_s() -> i64 {
    3600
}

fn default_must_succeed() -> bool {
    true
}

/// A submitted job, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub username: String,
    #[serde(default = "default_flow_label")]
    pub flow_label: String,
    #[serde(default)]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default = "default_job_timeout_s")]
    pub job_timeout_s: i64,
    #[serde(default)]
    pub pr_reference: Option<serde_json::Value>,
    #[serde(default)]
    pub encryption_key_ref: Option<String>,
    #[serde(default)]
    pub orders: Vec<OrderDescriptor>,
}

/// Source fields as they appear on the wire.
///
/// Kept flat (instead of an enum) so validation can see when a submitter
/// supplied both a bundle location and a repo, or neither.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceFields {
    #[serde(default)]
    pub bundle_location: Option<String>,
    #[serde(default)]
    pub repo: Option<String>,
    #[serde(default)]
    pub token_ref: Option<String>,
    #[serde(default)]
    pub folder: Option<String>,
    #[serde(default)]
    pub commit: Option<String>,
}

/// One submitted order, before validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDescriptor {
    #[serde(default)]
    pub order_name: Option<String>,
    #[serde(default)]
    pub execution_target: Option<TargetKind>,
    /// Legacy flag; `execution_target` wins when both are present.
    #[serde(default)]
    pub use_lambda: Option<bool>,
    #[serde(default)]
    pub cmds: Vec<String>,
    #[serde(default)]
    pub timeout_s: i64,
    #[serde(default = "default_must_succeed")]
    pub must_succeed: bool,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub queue_id: Option<String>,
    #[serde(default)]
    pub env_vars: HashMap<String, String>,
    #[serde(default)]
    pub config_paths: Vec<String>,
    #[serde(default)]
    pub secret_paths: Vec<String>,
    #[serde(default)]
    pub source: Option<SourceFields>,
    /// Remote-agent fleet targets
    #[serde(default)]
    pub targets: Vec<String>,
    /// Remote-agent command document
    #[serde(default)]
    pub document_ref: Option<String>,
}

impl OrderDescriptor {
    /// Resolve the wire target, mapping the legacy `use_lambda` flag
    /// (`true → inline`, `false → container`) when the canonical field is
    /// absent.
    pub fn target_kind(&self) -> Option<TargetKind> {
        if let Some(kind) = self.execution_target {
            return Some(kind);
        }
        self.use_lambda.map(|lambda| {
            if lambda {
                TargetKind::Inline
            } else {
                TargetKind::Container
            }
        })
    }
}

#[derive(Debug, Deserialize)]
struct B64Envelope {
    job_parameters_b64: String,
}

/// Parse a request body into a descriptor.
pub fn parse_descriptor(body: &[u8]) -> Result<JobDescriptor, DescriptorError> {
    if let Ok(envelope) = serde_json::from_slice::<B64Envelope>(body) {
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(envelope.job_parameters_b64.trim())?;
        return Ok(serde_json::from_slice(&decoded)?);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
