// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local shell worker.
//!
//! Worker body for the inline backend: fetch the bundle, open the sealed
//! env with the order's private key, run the command list in a scratch
//! directory, and report through the callback contract. The timeout is
//! self-enforced; the watchdog stays as the backstop.

use baton_adapters::{DispatchRequest, KeyStore, MemoryKeyStore, WorkerFuture};
use baton_core::{callback_path, CallbackResult, CallbackStatus};
use baton_engine::{open_envelope, unpack_bundle, CMDS_ENTRY, SEALED_ENV_ENTRY};
use baton_storage::ArtifactStore;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Shell worker over an artifact store and key store.
#[derive(Clone)]
pub struct LocalWorker<A> {
    artifacts: A,
    keys: MemoryKeyStore,
}

impl<A> LocalWorker<A>
where
    A: ArtifactStore,
{
    pub fn new(artifacts: A, keys: MemoryKeyStore) -> Self {
        Self { artifacts, keys }
    }

    /// Worker entry; always reports, even on internal failure.
    pub fn run(self, req: DispatchRequest) -> WorkerFuture {
        Box::pin(async move {
            let path = callback_path(&req.run_id, req.num);
            let result = match self.execute(&req).await {
                Ok(result) => result,
                Err(message) => CallbackResult::new(CallbackStatus::Failed, message),
            };
            let bytes = match serde_json::to_vec(&result) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(error = %e, "callback serialization failed");
                    return;
                }
            };
            if let Err(e) = self.artifacts.put(&path, bytes).await {
                tracing::warn!(run = %req.run_id, order = %req.num, error = %e, "callback write failed");
            }
        })
    }

    async fn execute(&self, req: &DispatchRequest) -> Result<CallbackResult, String> {
        let bytes = self
            .artifacts
            .get(&req.bundle_uri)
            .await
            .map_err(|e| format!("bundle fetch failed: {}", e))?
            .ok_or_else(|| format!("bundle missing: {}", req.bundle_uri))?;
        let (files, envelope) =
            unpack_bundle(&bytes).map_err(|e| format!("bundle unpack failed: {}", e))?;
        let envelope = envelope.ok_or_else(|| format!("bundle has no {}", SEALED_ENV_ENTRY))?;

        let private: [u8; 32] = self
            .keys
            .load(&req.key_ref)
            .await
            .map_err(|e| format!("key load failed: {}", e))?
            .ok_or_else(|| format!("key missing: {}", req.key_ref))?
            .try_into()
            .map_err(|_| format!("malformed key: {}", req.key_ref))?;
        let plaintext =
            open_envelope(&envelope, &private).map_err(|e| format!("env decrypt failed: {}", e))?;
        let env: HashMap<String, String> =
            serde_json::from_slice(&plaintext).map_err(|e| format!("env parse failed: {}", e))?;

        let cmds: Vec<String> = files
            .iter()
            .find(|(name, _)| name == CMDS_ENTRY)
            .map(|(_, bytes)| serde_json::from_slice(bytes))
            .transpose()
            .map_err(|e| format!("cmds parse failed: {}", e))?
            .ok_or_else(|| format!("bundle has no {}", CMDS_ENTRY))?;

        // Materialise the code tree in a scratch directory
        let scratch = tempfile::tempdir().map_err(|e| format!("scratch dir failed: {}", e))?;
        for (name, contents) in &files {
            if name == CMDS_ENTRY {
                continue;
            }
            let target = scratch.path().join(name);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
            }
            std::fs::write(&target, contents).map_err(|e| e.to_string())?;
        }

        let deadline = Duration::from_secs(req.timeout_s);
        let started = std::time::Instant::now();
        let mut log = String::new();
        for cmd in &cmds {
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                return Ok(CallbackResult::new(
                    CallbackStatus::TimedOut,
                    format!("{}timed out before `{}`", log, cmd),
                ));
            }
            let mut child = Command::new("sh");
            child
                .arg("-c")
                .arg(cmd)
                .current_dir(scratch.path())
                .envs(&env)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());

            let output = match tokio::time::timeout(remaining, child.output()).await {
                Ok(Ok(output)) => output,
                Ok(Err(e)) => {
                    return Ok(CallbackResult::new(
                        CallbackStatus::Failed,
                        format!("{}`{}` failed to start: {}", log, cmd, e),
                    ));
                }
                Err(_) => {
                    return Ok(CallbackResult::new(
                        CallbackStatus::TimedOut,
                        format!("{}`{}` exceeded the order timeout", log, cmd),
                    ));
                }
            };

            log.push_str(&String::from_utf8_lossy(&output.stdout));
            log.push_str(&String::from_utf8_lossy(&output.stderr));
            if !output.status.success() {
                return Ok(CallbackResult::new(
                    CallbackStatus::Failed,
                    format!("{}`{}` exited with {}", log, cmd, output.status),
                ));
            }
        }
        Ok(CallbackResult::new(CallbackStatus::Succeeded, log))
    }
}
