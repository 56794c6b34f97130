// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local composition of the kernel.
//!
//! File-backed stores under a state directory, the in-process notification
//! bus, the shell worker behind the inline dispatcher, and task-based
//! watchdogs. This wiring is the only place the artifact store meets the
//! notification sink.

use crate::worker::LocalWorker;
use baton_adapters::{
    BusEventSink, EnvCredentialSource, GitCliFetcher, InlineDispatcher, MemoryKeyStore, NoOpVcs,
    NotifyingArtifactStore, SinkReader,
};
use baton_core::{SystemClock, UuidIdGen};
use baton_engine::{
    Admission, AdmissionDeps, Config, Orchestrator, OrchestratorDeps, TaskWatchdogLauncher,
};
use baton_storage::{FsArtifactStore, FsStateStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

/// Artifact store as the kernel sees it locally.
pub type LocalArtifacts = NotifyingArtifactStore<FsArtifactStore, BusEventSink>;

pub type LocalAdmission = Admission<
    FsStateStore,
    LocalArtifacts,
    EnvCredentialSource,
    GitCliFetcher,
    MemoryKeyStore,
    SystemClock,
>;

pub type LocalOrchestrator = Orchestrator<
    FsStateStore,
    LocalArtifacts,
    InlineDispatcher,
    NoOpVcs,
    EnvCredentialSource,
    MemoryKeyStore,
    TaskWatchdogLauncher<LocalArtifacts, SystemClock>,
    SystemClock,
>;

/// Server process configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub state_dir: PathBuf,
    pub listen: SocketAddr,
    pub webhook_secret: Option<String>,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let state_dir = std::env::var("BATON_STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./baton-state"));
        let listen = std::env::var("BATON_LISTEN")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([127, 0, 0, 1], 8237)));
        let webhook_secret = std::env::var("BATON_WEBHOOK_SECRET").ok();
        Self {
            state_dir,
            listen,
            webhook_secret,
        }
    }
}

/// The composed kernel plus the notification reader to drain.
pub struct Kernel {
    pub admission: Arc<LocalAdmission>,
    pub orchestrator: Arc<LocalOrchestrator>,
    pub reader: SinkReader,
}

/// Wire the kernel over a state directory.
pub fn build_kernel(server: &ServerConfig, config: Config) -> Kernel {
    let clock = SystemClock;
    let ids = Arc::new(UuidIdGen);

    let state = FsStateStore::new(server.state_dir.join("state"));
    let (sink, reader) = BusEventSink::channel(256);
    let artifacts = NotifyingArtifactStore::new(
        FsArtifactStore::new(server.state_dir.join("artifacts")),
        sink,
    );
    let credentials = EnvCredentialSource::new();
    let keys = MemoryKeyStore::new();
    let repos = GitCliFetcher::new();

    let worker = LocalWorker::new(artifacts.clone(), keys.clone());
    let dispatcher = InlineDispatcher::new(move |req| worker.clone().run(req));
    let watchdogs = TaskWatchdogLauncher::new(artifacts.clone(), clock, config.watchdog_period);

    let admission = Arc::new(Admission::new(
        AdmissionDeps {
            state: state.clone(),
            artifacts: artifacts.clone(),
            credentials,
            repos,
            keys: keys.clone(),
        },
        clock,
        ids.clone(),
        config.clone(),
    ));
    let orchestrator = Arc::new(Orchestrator::new(
        OrchestratorDeps {
            state,
            artifacts,
            dispatcher,
            vcs: NoOpVcs,
            credentials: EnvCredentialSource::new(),
            keys,
            watchdogs,
        },
        clock,
        ids,
        config,
    ));

    Kernel {
        admission,
        orchestrator,
        reader,
    }
}
