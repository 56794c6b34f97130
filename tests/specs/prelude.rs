// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Test harness for kernel behavior specifications.
//!
//! Composes the kernel exactly as a host process would: memory-backed
//! stores, the notification bus wrapped around the artifact store, inline
//! workers that honour the callback contract, and task-based watchdogs on a
//! fake clock. The pump drains notifications while checking the global
//! invariants after every orchestrator pass.

#![allow(dead_code)]

use baton_adapters::{
    BusEventSink, DispatchRequest, FakeCredentialSource, FakeRepoFetcher, FakeVcs,
    InlineDispatcher, MemoryKeyStore, NotifyingArtifactStore, SinkReader, WorkerFuture,
};
use baton_core::test_support::{bundle_order, descriptor};
use baton_core::{
    callback_path, CallbackResult, CallbackStatus, DoneMarker, FakeClock, OrderDescriptor,
    OrderRecord, OrderStatus, RunId, TraceId, UuidIdGen,
};
use baton_engine::{
    unpack_bundle, Admission, AdmissionDeps, AdmitResponse, Config, Orchestrator,
    OrchestratorDeps, TaskWatchdogLauncher, CMDS_ENTRY,
};
use baton_storage::{ArtifactStore, MemoryArtifactStore, MemoryStateStore, StateStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub type SpecArtifacts = NotifyingArtifactStore<MemoryArtifactStore, BusEventSink>;

pub type SpecAdmission = Admission<
    MemoryStateStore,
    SpecArtifacts,
    FakeCredentialSource,
    FakeRepoFetcher,
    MemoryKeyStore,
    FakeClock,
>;

pub type SpecOrchestrator = Orchestrator<
    MemoryStateStore,
    SpecArtifacts,
    InlineDispatcher,
    FakeVcs,
    FakeCredentialSource,
    MemoryKeyStore,
    TaskWatchdogLauncher<SpecArtifacts, FakeClock>,
    FakeClock,
>;

/// Watchdog poll period for specs: short enough that a fake-clock advance
/// is observed within one pump round.
const WATCHDOG_PERIOD: Duration = Duration::from_millis(20);

/// How long the pump waits before declaring the bus quiet.
const QUIET_AFTER: Duration = Duration::from_millis(400);

pub struct Harness {
    pub admission: SpecAdmission,
    pub orchestrator: Arc<SpecOrchestrator>,
    pub state: MemoryStateStore,
    pub artifacts: SpecArtifacts,
    pub clock: FakeClock,
    pub vcs: FakeVcs,
    reader: SinkReader,
    runs: Vec<RunId>,
    // last observed status per (run, order), for monotonicity checks
    seen: HashMap<(String, String), OrderStatus>,
}

pub fn harness() -> Harness {
    let state = MemoryStateStore::new();
    let (sink, reader) = BusEventSink::channel(256);
    let artifacts = NotifyingArtifactStore::new(MemoryArtifactStore::new(), sink);
    let credentials = FakeCredentialSource::new();
    let keys = MemoryKeyStore::new();
    let clock = FakeClock::new();
    let vcs = FakeVcs::new();
    let ids = Arc::new(UuidIdGen);
    let config = Config::default();

    let dispatcher = spec_worker(artifacts.clone());
    let watchdogs = TaskWatchdogLauncher::new(artifacts.clone(), clock.clone(), WATCHDOG_PERIOD);

    let admission = Admission::new(
        AdmissionDeps {
            state: state.clone(),
            artifacts: artifacts.clone(),
            credentials: credentials.clone(),
            repos: FakeRepoFetcher::new(),
            keys: keys.clone(),
        },
        clock.clone(),
        ids.clone(),
        config.clone(),
    );
    let orchestrator = Arc::new(Orchestrator::new(
        OrchestratorDeps {
            state: state.clone(),
            artifacts: artifacts.clone(),
            dispatcher,
            vcs: vcs.clone(),
            credentials,
            keys,
            watchdogs,
        },
        clock.clone(),
        ids,
        config,
    ));

    Harness {
        admission,
        orchestrator,
        state,
        artifacts,
        clock,
        vcs,
        reader,
        runs: Vec::new(),
        seen: HashMap::new(),
    }
}

/// Inline worker honouring the callback contract, scripted by the order's
/// command list: `false` fails, `sleep ...` never reports, anything else
/// succeeds.
fn spec_worker(artifacts: SpecArtifacts) -> InlineDispatcher {
    InlineDispatcher::new(move |req: DispatchRequest| {
        let artifacts = artifacts.clone();
        Box::pin(async move {
            let Ok(Some(bytes)) = artifacts.get(&req.bundle_uri).await else {
                return;
            };
            let Ok((files, _)) = unpack_bundle(&bytes) else {
                return;
            };
            let cmds: Vec<String> = files
                .iter()
                .find(|(name, _)| name == CMDS_ENTRY)
                .and_then(|(_, bytes)| serde_json::from_slice(bytes).ok())
                .unwrap_or_default();

            if cmds.iter().any(|c| c.starts_with("sleep")) {
                // lost worker; the watchdog must resolve this order
                return;
            }
            let result = if cmds.iter().any(|c| c == "false") {
                CallbackResult::new(CallbackStatus::Failed, "exit 1")
            } else {
                CallbackResult::new(CallbackStatus::Succeeded, "ok")
            };
            let path = callback_path(&req.run_id, req.num);
            if let Ok(bytes) = serde_json::to_vec(&result) {
                let _ = artifacts.put(&path, bytes).await;
            }
        }) as WorkerFuture
    })
}

impl Harness {
    /// Admit a job built from the given orders.
    pub async fn submit(&mut self, orders: Vec<OrderDescriptor>) -> AdmitResponse {
        self.submit_descriptor(descriptor(orders)).await
    }

    pub async fn submit_descriptor(
        &mut self,
        descriptor: baton_core::JobDescriptor,
    ) -> AdmitResponse {
        for order in &descriptor.orders {
            if let Some(source) = &order.source {
                if let Some(location) = &source.bundle_location {
                    let files = vec![("run.sh".to_string(), b"#!/bin/sh\ntrue\n".to_vec())];
                    let bytes = baton_engine::pack_bundle(&files, None).unwrap();
                    self.artifacts.put(location, bytes).await.unwrap();
                }
            }
        }
        let response = self.admission.admit(descriptor).await.unwrap();
        self.runs.push(response.run_id.clone());
        response
    }

    /// Drain notifications until the bus stays quiet, asserting the global
    /// invariants after every orchestrator pass.
    pub async fn pump(&mut self) {
        loop {
            match tokio::time::timeout(QUIET_AFTER, self.reader.recv()).await {
                Err(_) | Ok(None) => break,
                Ok(Some(path)) => {
                    let _ = self.orchestrator.handle_notification(&path).await;
                    self.assert_invariants().await;
                }
            }
        }
    }

    /// Statuses are monotone, and at most one order per queue id runs at a
    /// time.
    async fn assert_invariants(&mut self) {
        for run in self.runs.clone() {
            let orders = self.orders(&run).await;
            let mut running_queues: Vec<&str> = Vec::new();
            for order in &orders {
                let key = (run.to_string(), order.name.clone());
                if let Some(prev) = self.seen.get(&key) {
                    assert!(
                        prev.can_transition(order.status),
                        "order {} moved {} -> {}",
                        order.name,
                        prev,
                        order.status
                    );
                }
                self.seen.insert(key, order.status);

                if order.status == OrderStatus::Running {
                    if let Some(queue) = order.queue_id.as_deref() {
                        assert!(
                            !running_queues.contains(&queue),
                            "two orders running in queue '{}'",
                            queue
                        );
                        running_queues.push(queue);
                    }
                }
            }
        }
    }

    pub async fn orders(&self, run: &RunId) -> Vec<OrderRecord> {
        self.state.orders_for_run(run).await.unwrap()
    }

    pub async fn status_of(&self, run: &RunId, name: &str) -> OrderStatus {
        self.orders(run)
            .await
            .iter()
            .find(|o| o.name == name)
            .map(|o| o.status)
            .unwrap_or_else(|| panic!("no order named {}", name))
    }

    pub async fn done(&self, run: &RunId) -> Option<DoneMarker> {
        self.artifacts
            .get(&baton_core::done_path(run))
            .await
            .unwrap()
            .map(|bytes| serde_json::from_slice(&bytes).unwrap())
    }

    pub async fn events(&self, trace: &TraceId, prefix: &str) -> Vec<baton_core::OrderEvent> {
        self.state
            .events_by_trace(trace, Some(prefix))
            .await
            .unwrap()
    }
}

/// Inline order with the given commands.
pub fn order_with_cmds(name: &str, deps: &[&str], cmds: &[&str], timeout_s: i64) -> OrderDescriptor {
    let mut order = bundle_order(name, deps);
    order.cmds = cmds.iter().map(|c| c.to_string()).collect();
    order.timeout_s = timeout_s;
    order
}
