// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Repo fetcher port.
//!
//! Admission pulls order code either from a pre-uploaded bundle or from a
//! repository revision. This port covers the latter: materialise the named
//! revision (optionally narrowed to a folder) as a list of relative paths
//! and file contents.

use async_trait::async_trait;
use std::path::Path;
use std::process::Output;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// Errors from repo fetch operations
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("repo fetch failed: {0}")]
    Fetch(String),
    #[error("IO error reading checkout: {0}")]
    Io(#[from] std::io::Error),
}

/// Adapter for fetching a repo revision as files.
#[async_trait]
pub trait RepoFetcher: Clone + Send + Sync + 'static {
    async fn fetch(
        &self,
        repo: &str,
        commit: Option<&str>,
        folder: Option<&str>,
        token: &[u8],
    ) -> Result<Vec<(String, Vec<u8>)>, RepoError>;
}

/// Bound on each git invocation. Clones dominate; checkouts share the same
/// figure.
const GIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Fetcher shelling out to the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitCliFetcher {
    timeout: Duration,
}

impl Default for GitCliFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCliFetcher {
    pub fn new() -> Self {
        Self {
            timeout: GIT_TIMEOUT,
        }
    }

    fn clone_url(repo: &str, token: &[u8]) -> String {
        let token = String::from_utf8_lossy(token);
        match repo.split_once("://") {
            Some((scheme, rest)) if !token.is_empty() => {
                format!("{}://x-access-token:{}@{}", scheme, token, rest)
            }
            _ => repo.to_string(),
        }
    }

    /// Run one git command under the fetcher's time bound. The child is
    /// killed when the bound elapses (tokio kills on drop).
    async fn git(&self, mut cmd: Command, action: &str) -> Result<Output, RepoError> {
        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(e)) => Err(RepoError::Fetch(format!(
                "git {} did not start: {}",
                action, e
            ))),
            Err(_) => Err(RepoError::Fetch(format!(
                "git {} gave up after {}s",
                action,
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl RepoFetcher for GitCliFetcher {
    async fn fetch(
        &self,
        repo: &str,
        commit: Option<&str>,
        folder: Option<&str>,
        token: &[u8],
    ) -> Result<Vec<(String, Vec<u8>)>, RepoError> {
        let scratch = tempfile::tempdir()?;
        let checkout = scratch.path().join("checkout");
        let url = Self::clone_url(repo, token);

        let mut clone = Command::new("git");
        clone.arg("clone").arg("--quiet");
        if commit.is_none() {
            clone.arg("--depth").arg("1");
        }
        clone.arg(&url).arg(&checkout);
        let output = self.git(clone, "clone").await?;
        if !output.status.success() {
            // Never echo the URL back; it may carry the token
            return Err(RepoError::Fetch(format!(
                "git clone of {} failed: {}",
                repo,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        if let Some(commit) = commit {
            let mut co = Command::new("git");
            co.arg("-C")
                .arg(&checkout)
                .arg("checkout")
                .arg("--quiet")
                .arg(commit);
            let output = self.git(co, "checkout").await?;
            if !output.status.success() {
                return Err(RepoError::Fetch(format!(
                    "git checkout of {} failed: {}",
                    commit,
                    String::from_utf8_lossy(&output.stderr).trim()
                )));
            }
        }

        let root = match folder {
            Some(folder) => checkout.join(folder),
            None => checkout.clone(),
        };
        if !root.is_dir() {
            return Err(RepoError::Fetch(format!(
                "folder '{}' not present in {}",
                folder.unwrap_or("."),
                repo
            )));
        }

        let mut files = Vec::new();
        collect_files(&root, &root, &mut files)?;
        files.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(files)
    }
}

fn collect_files(
    root: &Path,
    dir: &Path,
    files: &mut Vec<(String, Vec<u8>)>,
) -> Result<(), RepoError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let name = entry.file_name();
        if name == ".git" {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else if path.is_file() {
            let rel = path
                .strip_prefix(root)
                .map_err(|e| RepoError::Fetch(e.to_string()))?
                .to_string_lossy()
                .into_owned();
            files.push((rel, std::fs::read(&path)?));
        }
    }
    Ok(())
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{RepoError, RepoFetcher};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Fake fetcher serving scripted file trees per repo.
    #[derive(Clone, Default)]
    pub struct FakeRepoFetcher {
        trees: Arc<Mutex<HashMap<String, Vec<(String, Vec<u8>)>>>>,
        calls: Arc<Mutex<Vec<(String, Option<String>)>>>,
    }

    impl FakeRepoFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn insert(&self, repo: impl Into<String>, files: Vec<(String, Vec<u8>)>) {
            self.trees.lock().insert(repo.into(), files);
        }

        /// Recorded `(repo, commit)` fetches.
        pub fn calls(&self) -> Vec<(String, Option<String>)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl RepoFetcher for FakeRepoFetcher {
        async fn fetch(
            &self,
            repo: &str,
            commit: Option<&str>,
            _folder: Option<&str>,
            _token: &[u8],
        ) -> Result<Vec<(String, Vec<u8>)>, RepoError> {
            self.calls
                .lock()
                .push((repo.to_string(), commit.map(String::from)));
            self.trees
                .lock()
                .get(repo)
                .cloned()
                .ok_or_else(|| RepoError::Fetch(format!("unknown repo: {}", repo)))
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeRepoFetcher;

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
