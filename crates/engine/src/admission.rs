// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job admission pipeline.
//!
//! Receive, validate, package credentials, persist state, emit the start
//! signal. Admission makes no scheduling decision: dispatch belongs to the
//! orchestrator so there is a single locus of control.

use crate::bundle::pack_bundle;
use crate::config::Config;
use crate::envelope::{generate_keypair, seal_envelope};
use crate::error::EngineError;
use baton_adapters::{CredentialError, CredentialSource, KeyStore, RepoFetcher};
use baton_core::{
    bundle_path, callback_path, derive_flow_id, validate_job, CallbackResult, CallbackStatus,
    Clock, EventKind, FlowId, IdGen, JobDescriptor, OrderEvent, OrderNum, OrderRecord, OrderSource,
    OrderSpec, RunId, RunMeta, TraceId, ValidationError, JOB_ORDER_NAME,
};
use baton_storage::{with_retries, ArtifactStore, RetryPolicy, StateStore};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::task::JoinSet;

/// Errors surfaced to the submitter
#[derive(Debug, thiserror::Error)]
pub enum AdmitError {
    #[error("job validation failed")]
    Invalid(Vec<ValidationError>),
    #[error(transparent)]
    Internal(#[from] EngineError),
}

/// Synchronous admission reply.
#[derive(Debug, Clone, Serialize)]
pub struct AdmitResponse {
    pub run_id: RunId,
    pub trace_id: TraceId,
    pub flow_id: FlowId,
    pub done_uri: String,
}

/// Collaborators of the admission pipeline.
pub struct AdmissionDeps<S, A, Cr, R, K> {
    pub state: S,
    pub artifacts: A,
    pub credentials: Cr,
    pub repos: R,
    pub keys: K,
}

/// The admission pipeline.
pub struct Admission<S, A, Cr, R, K, C> {
    deps: AdmissionDeps<S, A, Cr, R, K>,
    clock: C,
    ids: Arc<dyn IdGen>,
    config: Config,
    retry: RetryPolicy,
}

impl<S, A, Cr, R, K, C> Admission<S, A, Cr, R, K, C>
where
    S: StateStore,
    A: ArtifactStore,
    Cr: CredentialSource,
    R: RepoFetcher,
    K: KeyStore,
    C: Clock,
{
    pub fn new(
        deps: AdmissionDeps<S, A, Cr, R, K>,
        clock: C,
        ids: Arc<dyn IdGen>,
        config: Config,
    ) -> Self {
        Self {
            retry: RetryPolicy::with_attempt_timeout(config.state_timeout),
            deps,
            clock,
            ids,
            config,
        }
    }

    /// Admit one job: the full receive-to-start-signal pipeline.
    pub async fn admit(&self, descriptor: JobDescriptor) -> Result<AdmitResponse, AdmitError> {
        // Stage 1: identifier allocation, adopting caller-supplied ids
        let run_id = RunId::new(
            descriptor
                .run_id
                .clone()
                .unwrap_or_else(|| self.ids.generate()),
        );
        let trace_id = TraceId::new(
            descriptor
                .trace_id
                .clone()
                .unwrap_or_else(|| self.ids.trace_token()),
        );
        let flow_id = derive_flow_id(&descriptor.username, &trace_id, &descriptor.flow_label);

        // Stage 2: validation; nothing is persisted on failure
        let specs = validate_job(&descriptor, &self.config.target_defaults())
            .map_err(AdmitError::Invalid)?;
        let existing = with_retries(&self.retry, "orders_for_run", || {
            self.deps.state.orders_for_run(&run_id)
        })
        .await
        .map_err(EngineError::from)?;
        if !existing.is_empty() {
            return Err(AdmitError::Invalid(vec![ValidationError::RunIdCollision {
                run_id: run_id.to_string(),
            }]));
        }

        let now_ms = self.clock.epoch_ms();
        let job_timeout_s = descriptor.job_timeout_s as u64;
        let meta = RunMeta {
            run_id: run_id.clone(),
            trace_id: trace_id.clone(),
            flow_id: flow_id.clone(),
            submitter: descriptor.username.clone(),
            job_timeout_s,
            deadline_ms: now_ms + job_timeout_s * 1000,
            pr_reference: descriptor.pr_reference.clone(),
        };

        // Stage 3: per-order packaging, bounded fan-out
        let records = self
            .package_all(&meta, &specs, descriptor.encryption_key_ref.as_deref())
            .await?;

        // Stage 4: persist orders and the job-level start event
        for record in &records {
            with_retries(&self.retry, "put_order", || self.deps.state.put_order(record))
                .await
                .map_err(EngineError::from)?;
        }
        let event = OrderEvent::new(
            trace_id.clone(),
            flow_id.clone(),
            run_id.clone(),
            JOB_ORDER_NAME,
            EventKind::JobStarted,
            None,
            serde_json::json!({
                "orders": records.len(),
                "submitter": descriptor.username,
            }),
            self.clock.epoch_ms(),
        );
        with_retries(&self.retry, "append_event", || {
            self.deps.state.append_event(&event)
        })
        .await
        .map_err(EngineError::from)?;

        // Stage 5: start signal; its write triggers the first orchestration
        let start = CallbackResult::new(CallbackStatus::Succeeded, "job accepted");
        let start_bytes = serde_json::to_vec(&start)
            .map_err(|e| EngineError::Storage(e.into()))?;
        self.deps
            .artifacts
            .put(&callback_path(&run_id, OrderNum::START), start_bytes)
            .await
            .map_err(EngineError::from)?;

        tracing::info!(run = %run_id, flow = %flow_id, orders = records.len(), "job admitted");
        Ok(AdmitResponse {
            done_uri: format!("{}/{}", self.config.done_bucket, baton_core::done_path(&run_id)),
            run_id,
            trace_id,
            flow_id,
        })
    }

    /// Package every order concurrently, capped by the dispatch fan-out.
    async fn package_all(
        &self,
        meta: &RunMeta,
        specs: &[OrderSpec],
        job_key_ref: Option<&str>,
    ) -> Result<Vec<OrderRecord>, EngineError> {
        let mut tasks: JoinSet<Result<(OrderNum, OrderRecord), EngineError>> = JoinSet::new();
        let mut packaged = BTreeMap::new();

        for spec in specs.iter().cloned() {
            while tasks.len() >= self.config.dispatch_fanout {
                if let Some((num, record)) = Self::join_one(&mut tasks).await? {
                    packaged.insert(num, record);
                }
            }
            let packager = Packager {
                artifacts: self.deps.artifacts.clone(),
                credentials: self.deps.credentials.clone(),
                repos: self.deps.repos.clone(),
                keys: self.deps.keys.clone(),
                config: self.config.clone(),
                meta: meta.clone(),
                job_key_ref: job_key_ref.map(String::from),
            };
            let now_ms = self.clock.epoch_ms();
            tasks.spawn(async move {
                let record = packager.package(spec, now_ms).await?;
                Ok((record.num, record))
            });
        }
        while let Some(result) = Self::join_one(&mut tasks).await? {
            packaged.insert(result.0, result.1);
        }
        Ok(packaged.into_values().collect())
    }

    async fn join_one(
        tasks: &mut JoinSet<Result<(OrderNum, OrderRecord), EngineError>>,
    ) -> Result<Option<(OrderNum, OrderRecord)>, EngineError> {
        match tasks.join_next().await {
            None => Ok(None),
            Some(Ok(result)) => result.map(Some),
            Some(Err(join_err)) => Err(EngineError::Dispatch(format!(
                "packaging task failed: {}",
                join_err
            ))),
        }
    }
}

/// Per-order packaging work, owned by one spawned task.
struct Packager<A, Cr, R, K> {
    artifacts: A,
    credentials: Cr,
    repos: R,
    keys: K,
    config: Config,
    meta: RunMeta,
    job_key_ref: Option<String>,
}

impl<A, Cr, R, K> Packager<A, Cr, R, K>
where
    A: ArtifactStore,
    Cr: CredentialSource,
    R: RepoFetcher,
    K: KeyStore,
{
    async fn package(&self, spec: OrderSpec, now_ms: u64) -> Result<OrderRecord, EngineError> {
        let run_id = &self.meta.run_id;

        // a. fetch code; the command list travels inside the bundle
        let mut files = self.fetch_code(&spec).await?;
        files.retain(|(name, _)| name != crate::bundle::CMDS_ENTRY);
        files.push((
            crate::bundle::CMDS_ENTRY.to_string(),
            serde_json::to_vec(&spec.cmds).map_err(baton_storage::StorageError::from)?,
        ));

        // b. resolve config and secret paths
        let mut env = spec.env_vars.clone();
        let mut source_paths = Vec::new();
        for path in spec.config_paths.iter().chain(spec.secret_paths.iter()) {
            let value = self
                .credentials
                .fetch(path)
                .await
                .map_err(|e| EngineError::Credential(e.to_string()))?;
            env.insert(env_key(path), String::from_utf8_lossy(&value).into_owned());
            source_paths.push(path.clone());
        }

        // c. target-account credentials, when the deployment has them
        let account_path = format!("accounts/{}", self.meta.submitter);
        match self.credentials.fetch(&account_path).await {
            Ok(value) => {
                env.insert(
                    "TARGET_ACCOUNT_CREDENTIALS".to_string(),
                    String::from_utf8_lossy(&value).into_owned(),
                );
                source_paths.push(account_path);
            }
            Err(CredentialError::NotFound(_)) => {}
            Err(e) => return Err(EngineError::Credential(e.to_string())),
        }

        // d. presigned callback-write URL
        let callback = self
            .artifacts
            .presign_write(
                &callback_path(run_id, spec.num),
                self.config.presign_ttl_for(self.meta.job_timeout_s),
            )
            .await?;

        // e. merge in the worker contract fields
        env.insert("CALLBACK_URL".to_string(), callback.uri.clone());
        env.insert("TIMEOUT".to_string(), spec.timeout_s.to_string());

        // f. envelope-encrypt the env map
        let (key_ref, public) = self.order_key(&spec).await?;
        let plaintext =
            serde_json::to_vec(&env).map_err(baton_storage::StorageError::from)?;
        let envelope = seal_envelope(&public, &key_ref, &plaintext, source_paths)?;

        // g. rebundle and upload
        let bundle = pack_bundle(&files, Some(&envelope))?;
        let bundle_uri = bundle_path(run_id, spec.num);
        self.artifacts.put(&bundle_uri, bundle).await?;

        Ok(OrderRecord::queued(
            self.meta.clone(),
            &spec,
            bundle_uri,
            callback.uri,
            key_ref,
            now_ms,
        ))
    }

    async fn fetch_code(&self, spec: &OrderSpec) -> Result<Vec<(String, Vec<u8>)>, EngineError> {
        match &spec.source {
            OrderSource::Bundle { bundle_location } => {
                let bytes = self
                    .artifacts
                    .get(bundle_location)
                    .await?
                    .ok_or_else(|| {
                        EngineError::CodeSource(format!("bundle not found: {}", bundle_location))
                    })?;
                let (files, _) = crate::bundle::unpack_bundle(&bytes)?;
                Ok(files)
            }
            OrderSource::Repo {
                repo,
                token_ref,
                folder,
                commit,
            } => {
                let token = self
                    .credentials
                    .fetch(token_ref)
                    .await
                    .map_err(|e| EngineError::Credential(e.to_string()))?;
                self.repos
                    .fetch(repo, commit.as_deref(), folder.as_deref(), &token)
                    .await
                    .map_err(|e| EngineError::Repo(e.to_string()))
            }
        }
    }

    /// Key pair for the order: the job-supplied reference, or a fresh pair
    /// whose private half goes to the key store.
    async fn order_key(&self, spec: &OrderSpec) -> Result<(String, [u8; 32]), EngineError> {
        if let Some(key_ref) = &self.job_key_ref {
            let material = self
                .keys
                .load(key_ref)
                .await
                .map_err(|e| EngineError::Key(e.to_string()))?
                .ok_or_else(|| EngineError::Key(format!("missing key: {}", key_ref)))?;
            let private: [u8; 32] = material
                .try_into()
                .map_err(|_| EngineError::Key(format!("malformed key: {}", key_ref)))?;
            let public = x25519_dalek::PublicKey::from(&x25519_dalek::StaticSecret::from(private));
            return Ok((key_ref.clone(), public.to_bytes()));
        }

        let pair = generate_keypair();
        let key_ref = format!("keys/{}/{}", self.meta.run_id, spec.num);
        self.keys
            .store(&key_ref, pair.private.to_vec())
            .await
            .map_err(|e| EngineError::Key(e.to_string()))?;
        Ok((key_ref, pair.public))
    }
}

/// Env-map key for a credential path: final segment, flattened.
fn env_key(path: &str) -> String {
    let segment = path.rsplit('/').next().unwrap_or(path);
    segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
