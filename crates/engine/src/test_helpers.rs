// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::admission::{Admission, AdmissionDeps, AdmitError, AdmitResponse};
use crate::bundle::pack_bundle;
use crate::config::Config;
use crate::orchestrator::{Orchestrator, OrchestratorDeps, TickOutcome};
use crate::watchdog::FakeWatchdogLauncher;
use baton_adapters::{FakeCredentialSource, FakeDispatcher, FakeRepoFetcher, FakeVcs, MemoryKeyStore};
use baton_core::{
    callback_path, CallbackResult, CallbackStatus, DoneMarker, FakeClock, JobDescriptor,
    OrderNum, OrderRecord, OrderSource, RunId, UuidIdGen,
};
use baton_storage::{ArtifactStore, MemoryArtifactStore, MemoryStateStore, StateStore};
use std::sync::Arc;

pub(crate) type TestAdmission = Admission<
    MemoryStateStore,
    MemoryArtifactStore,
    FakeCredentialSource,
    FakeRepoFetcher,
    MemoryKeyStore,
    FakeClock,
>;

pub(crate) type TestOrchestrator = Orchestrator<
    MemoryStateStore,
    MemoryArtifactStore,
    FakeDispatcher,
    FakeVcs,
    FakeCredentialSource,
    MemoryKeyStore,
    FakeWatchdogLauncher,
    FakeClock,
>;

/// Test context holding the kernel over memory stores and fakes.
pub(crate) struct TestContext {
    pub admission: TestAdmission,
    pub orchestrator: TestOrchestrator,
    pub state: MemoryStateStore,
    pub artifacts: MemoryArtifactStore,
    pub dispatcher: FakeDispatcher,
    pub vcs: FakeVcs,
    pub credentials: FakeCredentialSource,
    pub keys: MemoryKeyStore,
    pub watchdogs: FakeWatchdogLauncher,
    pub clock: FakeClock,
}

pub(crate) fn setup() -> TestContext {
    let state = MemoryStateStore::new();
    let artifacts = MemoryArtifactStore::new();
    let credentials = FakeCredentialSource::new();
    let repos = FakeRepoFetcher::new();
    let keys = MemoryKeyStore::new();
    let dispatcher = FakeDispatcher::new();
    let vcs = FakeVcs::new();
    let watchdogs = FakeWatchdogLauncher::new();
    let clock = FakeClock::new();
    let config = Config::default();
    let ids = Arc::new(UuidIdGen);

    let admission = Admission::new(
        AdmissionDeps {
            state: state.clone(),
            artifacts: artifacts.clone(),
            credentials: credentials.clone(),
            repos: repos.clone(),
            keys: keys.clone(),
        },
        clock.clone(),
        ids.clone(),
        config.clone(),
    );
    let orchestrator = Orchestrator::new(
        OrchestratorDeps {
            state: state.clone(),
            artifacts: artifacts.clone(),
            dispatcher: dispatcher.clone(),
            vcs: vcs.clone(),
            credentials: credentials.clone(),
            keys: keys.clone(),
            watchdogs: watchdogs.clone(),
        },
        clock.clone(),
        ids,
        config,
    );

    TestContext {
        admission,
        orchestrator,
        state,
        artifacts,
        dispatcher,
        vcs,
        credentials,
        keys,
        watchdogs,
        clock,
    }
}

impl TestContext {
    /// Upload a trivial code bundle for every blob-sourced order, then admit.
    pub async fn submit(&self, descriptor: JobDescriptor) -> Result<AdmitResponse, AdmitError> {
        for order in &descriptor.orders {
            if let Some(source) = &order.source {
                if let Some(location) = &source.bundle_location {
                    self.seed_code_bundle(location).await;
                }
            }
        }
        self.admission.admit(descriptor).await
    }

    pub async fn seed_code_bundle(&self, location: &str) {
        let files = vec![("run.sh".to_string(), b"#!/bin/sh\ntrue\n".to_vec())];
        let bytes = pack_bundle(&files, None).unwrap();
        self.artifacts.put(location, bytes).await.unwrap();
    }

    /// Write a worker callback for an order.
    pub async fn write_callback(
        &self,
        run_id: &RunId,
        num: u32,
        status: CallbackStatus,
        log: &str,
    ) {
        let result = CallbackResult::new(status, log);
        self.artifacts
            .put(
                &callback_path(run_id, OrderNum::new(num)),
                serde_json::to_vec(&result).unwrap(),
            )
            .await
            .unwrap();
    }

    /// Drive one orchestrator pass via the run's start-signal path.
    pub async fn tick(&self, run_id: &RunId) -> TickOutcome {
        self.orchestrator
            .handle_notification(&callback_path(run_id, OrderNum::START))
            .await
            .unwrap()
    }

    pub async fn orders(&self, run_id: &RunId) -> Vec<OrderRecord> {
        self.state.orders_for_run(run_id).await.unwrap()
    }

    pub async fn done_marker(&self, run_id: &RunId) -> Option<DoneMarker> {
        self.artifacts
            .get(&baton_core::done_path(run_id))
            .await
            .unwrap()
            .map(|bytes| serde_json::from_slice(&bytes).unwrap())
    }
}

/// Descriptor with a repo-sourced order, for packaging tests.
pub(crate) fn repo_order(name: &str) -> baton_core::OrderDescriptor {
    let mut order = baton_core::test_support::bundle_order(name, &[]);
    order.source = Some(baton_core::descriptor::SourceFields {
        repo: Some("https://git.example/org/repo".to_string()),
        token_ref: Some("auth/git/token".to_string()),
        commit: Some("abc123".to_string()),
        ..Default::default()
    });
    order
}

/// The bundle source location used by `bundle_order`.
pub(crate) fn source_location(order: &baton_core::OrderDescriptor) -> String {
    match &order.source {
        Some(fields) => fields.bundle_location.clone().unwrap_or_default(),
        None => String::new(),
    }
}

#[allow(dead_code)]
pub(crate) fn bundle_source(spec_source: &OrderSource) -> &str {
    match spec_source {
        OrderSource::Bundle { bundle_location } => bundle_location,
        OrderSource::Repo { repo, .. } => repo,
    }
}
