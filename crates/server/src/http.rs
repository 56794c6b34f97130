// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP submission API.
//!
//! `POST /init` accepts any job; `POST /ssm` accepts remote-agent-only
//! jobs. Bodies are either the raw JSON descriptor or the
//! `job_parameters_b64` envelope. When a webhook secret is configured and a
//! signature header is present, the request is verified through the VCS
//! provider before admission.

use crate::composition::LocalAdmission;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use baton_adapters::{NoOpVcs, VcsProvider};
use baton_core::{parse_descriptor, TargetKind};
use baton_engine::AdmitError;
use std::collections::HashMap;
use std::sync::Arc;

const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Shared state of the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub admission: Arc<LocalAdmission>,
    pub vcs: NoOpVcs,
    pub webhook_secret: Option<String>,
}

/// Build the submission router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/init", post(init))
        .route("/ssm", post(ssm))
        .with_state(state)
}

async fn init(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    submit(state, headers, body, false).await
}

async fn ssm(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    submit(state, headers, body, true).await
}

async fn submit(state: AppState, headers: HeaderMap, body: Bytes, agents_only: bool) -> Response {
    if let Some(secret) = &state.webhook_secret {
        if headers.contains_key(SIGNATURE_HEADER) {
            let header_map: HashMap<String, String> = headers
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_string(),
                        String::from_utf8_lossy(v.as_bytes()).into_owned(),
                    )
                })
                .collect();
            match state.vcs.verify_webhook(&header_map, &body, secret).await {
                Ok(true) => {}
                Ok(false) => {
                    return error_response(
                        StatusCode::UNAUTHORIZED,
                        "webhook signature verification failed",
                    );
                }
                Err(e) => {
                    return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
                }
            }
        }
    }

    let descriptor = match parse_descriptor(&body) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            return errors_response(StatusCode::BAD_REQUEST, vec![e.to_string()]);
        }
    };

    if agents_only {
        let offending: Vec<String> = descriptor
            .orders
            .iter()
            .enumerate()
            .filter(|(_, o)| o.target_kind() != Some(TargetKind::RemoteAgent))
            .map(|(i, o)| {
                format!(
                    "order '{}': only remote-agent orders are accepted on /ssm",
                    o.order_name.clone().unwrap_or_else(|| format!("{:04}", i + 1))
                )
            })
            .collect();
        if !offending.is_empty() {
            return errors_response(StatusCode::BAD_REQUEST, offending);
        }
    }

    match state.admission.admit(descriptor).await {
        Ok(response) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ok",
                "run_id": response.run_id,
                "trace_id": response.trace_id,
                "flow_id": response.flow_id,
                "done_uri": response.done_uri,
            })),
        )
            .into_response(),
        Err(AdmitError::Invalid(errors)) => errors_response(
            StatusCode::BAD_REQUEST,
            errors.iter().map(|e| e.to_string()).collect(),
        ),
        Err(AdmitError::Internal(e)) => {
            tracing::error!(error = %e, "admission failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}

fn errors_response(code: StatusCode, errors: Vec<String>) -> Response {
    (
        code,
        Json(serde_json::json!({ "status": "error", "errors": errors })),
    )
        .into_response()
}

fn error_response(code: StatusCode, error: &str) -> Response {
    (
        code,
        Json(serde_json::json!({ "status": "error", "error": error })),
    )
        .into_response()
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
