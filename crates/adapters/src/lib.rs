// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the kernel's external collaborators: backend dispatch,
//! VCS, credentials, key storage, repo fetching, and the notification sink.

pub mod credentials;
pub mod dispatch;
pub mod keystore;
pub mod notifying;
pub mod repo;
pub mod sink;
pub mod vcs;

pub use credentials::{CredentialError, CredentialSource, EnvCredentialSource};
pub use dispatch::{
    BackendDispatcher, DispatchError, DispatchHandle, DispatchRequest, InlineDispatcher,
    NoOpDispatcher, WorkerFuture,
};
pub use keystore::{KeyError, KeyStore, MemoryKeyStore};
pub use notifying::NotifyingArtifactStore;
pub use repo::{GitCliFetcher, RepoError, RepoFetcher};
pub use sink::{BusEventSink, EventSink, NoOpEventSink, SinkError, SinkReader};
pub use vcs::{CommentId, NoOpVcs, PrReference, VcsError, VcsProvider};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use credentials::FakeCredentialSource;
#[cfg(any(test, feature = "test-support"))]
pub use dispatch::{DispatchCall, FakeDispatcher};
#[cfg(any(test, feature = "test-support"))]
pub use repo::FakeRepoFetcher;
#[cfg(any(test, feature = "test-support"))]
pub use sink::FakeEventSink;
#[cfg(any(test, feature = "test-support"))]
pub use vcs::FakeVcs;
