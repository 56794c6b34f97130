// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-driven orchestrator.
//!
//! One invocation per callback notification: acquire the run's lock,
//! reconcile completed results, evaluate the dependency graph, dispatch
//! ready orders, finalise when everything is terminal, release. A losing
//! invocation exits immediately; the next notification re-enters.

use crate::config::Config;
use crate::error::EngineError;
use crate::watchdog::{WatchdogLauncher, WatchdogSpec};
use baton_adapters::{
    BackendDispatcher, CredentialSource, DispatchRequest, KeyStore, PrReference, VcsProvider,
};
use baton_core::{
    aggregate_status, callback_path, done_path, parse_callback_path, CallbackResult,
    CallbackStatus, Clock, DoneMarker, EventKind, HolderId, IdGen, OrderEvent, OrderNum,
    OrderRecord, OrderStatus, RunMeta, JOB_ORDER_NAME,
};
use baton_storage::{with_retries, ArtifactStore, LockAttempt, OrderPatch, RetryPolicy, StateStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Outcome of one orchestrator invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another invocation holds the run's lock; nothing was done.
    Contended,
    /// The notification named a run with no persisted orders.
    UnknownRun,
    /// A locked pass ran to completion.
    Progressed { dispatched: usize, finalised: bool },
}

/// Collaborators of the orchestrator.
pub struct OrchestratorDeps<S, A, D, V, Cr, K, W> {
    pub state: S,
    pub artifacts: A,
    pub dispatcher: D,
    pub vcs: V,
    pub credentials: Cr,
    pub keys: K,
    pub watchdogs: W,
}

/// The orchestrator.
pub struct Orchestrator<S, A, D, V, Cr, K, W, C> {
    deps: OrchestratorDeps<S, A, D, V, Cr, K, W>,
    clock: C,
    ids: Arc<dyn IdGen>,
    config: Config,
    retry: RetryPolicy,
}

impl<S, A, D, V, Cr, K, W, C> Orchestrator<S, A, D, V, Cr, K, W, C>
where
    S: StateStore,
    A: ArtifactStore,
    D: BackendDispatcher,
    V: VcsProvider,
    Cr: CredentialSource,
    K: KeyStore,
    W: WatchdogLauncher,
    C: Clock,
{
    pub fn new(
        deps: OrchestratorDeps<S, A, D, V, Cr, K, W>,
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

    /// React to one callback notification.
    pub async fn handle_notification(&self, object_path: &str) -> Result<TickOutcome, EngineError> {
        let Some((run_id, _num)) = parse_callback_path(object_path) else {
            return Err(EngineError::BadNotification(object_path.to_string()));
        };

        // Peek at the orders to recover run meta for the lock record
        let orders = with_retries(&self.retry, "orders_for_run", || {
            self.deps.state.orders_for_run(&run_id)
        })
        .await?;
        let Some(meta) = orders.first().map(|o| o.meta.clone()) else {
            tracing::warn!(run = %run_id, path = object_path, "notification for unknown run");
            return Ok(TickOutcome::UnknownRun);
        };

        // Step 1: acquire exclusion
        let holder = HolderId::new(self.ids.generate());
        let attempt = self
            .deps
            .state
            .acquire_lock(
                &run_id,
                &holder,
                &meta.flow_id,
                &meta.trace_id,
                meta.job_timeout_s * 1000,
                self.clock.epoch_ms(),
            )
            .await?;
        if attempt == LockAttempt::Contended {
            tracing::debug!(run = %run_id, "lock contention, leaving run to the holder");
            return Ok(TickOutcome::Contended);
        }

        // Steps 2-5 under the lock; release unconditionally either way
        let result = self.locked_pass(&meta).await;
        if let Err(e) = self.deps.state.release_lock(&run_id).await {
            tracing::warn!(run = %run_id, error = %e, "failed to release run lock");
        }
        result
    }

    /// Reconcile, evaluate, dispatch, finalise.
    async fn locked_pass(&self, meta: &RunMeta) -> Result<TickOutcome, EngineError> {
        let run_id = &meta.run_id;
        let mut orders = with_retries(&self.retry, "orders_for_run", || {
            self.deps.state.orders_for_run(run_id)
        })
        .await?;

        // Step 2: reconcile completed results
        for order in orders.iter_mut() {
            if order.status != OrderStatus::Running {
                continue;
            }
            let path = callback_path(run_id, order.num);
            let Some(bytes) = self.deps.artifacts.get(&path).await? else {
                continue;
            };
            let mut result: CallbackResult = match serde_json::from_slice(&bytes) {
                Ok(result) => result,
                Err(e) => {
                    tracing::warn!(run = %run_id, order = %order.num, error = %e, "unparseable callback payload");
                    CallbackResult::new(CallbackStatus::Failed, "unparseable callback payload")
                }
            };
            result.truncate_log();

            let status = OrderStatus::from(result.status);
            with_retries(&self.retry, "update_status", || {
                self.deps.state.update_status(
                    run_id,
                    order.num,
                    status,
                    OrderPatch::with_log(&result.log),
                )
            })
            .await?;
            self.append_order_event(meta, &order.name, EventKind::OrderCompleted, status, &result.log)
                .await?;
            order.status = status;
            tracing::info!(run = %run_id, order = %order.name, %status, "order reconciled");
            self.notify_pr(meta, &format!("order `{}` {}", order.name, status))
                .await;
        }

        // Step 3: evaluate dependencies until no new order is doomed.
        // Dooms change the terminal picture, and nothing else will wake this
        // run for them, so cascade inside the tick.
        let ready = loop {
            let eval = evaluate(&orders);
            if eval.doomed.is_empty() {
                break eval.ready;
            }
            for (num, log) in eval.doomed {
                with_retries(&self.retry, "update_status", || {
                    self.deps.state.update_status(
                        run_id,
                        num,
                        OrderStatus::Failed,
                        OrderPatch::with_log(&log),
                    )
                })
                .await?;
                if let Some(order) = orders.iter_mut().find(|o| o.num == num) {
                    order.status = OrderStatus::Failed;
                    let name = order.name.clone();
                    self.append_order_event(
                        meta,
                        &name,
                        EventKind::DependencyFailed,
                        OrderStatus::Failed,
                        &log,
                    )
                    .await?;
                    tracing::info!(run = %run_id, order = %name, %log, "order doomed by dependency");
                }
            }
        };

        // Step 4: dispatch ready orders, bounded fan-out
        let dispatched = self.dispatch_all(meta, ready).await?;

        // Step 5: finalisation check
        let finalised = self.finalise_if_done(meta).await?;

        Ok(TickOutcome::Progressed {
            dispatched,
            finalised,
        })
    }

    async fn dispatch_all(
        &self,
        meta: &RunMeta,
        ready: Vec<OrderRecord>,
    ) -> Result<usize, EngineError> {
        let mut tasks: JoinSet<bool> = JoinSet::new();
        let mut dispatched = 0;

        for order in ready {
            while tasks.len() >= self.config.dispatch_fanout {
                if let Some(Ok(true)) = tasks.join_next().await {
                    dispatched += 1;
                }
            }
            let ctx = DispatchCtx {
                state: self.deps.state.clone(),
                dispatcher: self.deps.dispatcher.clone(),
                watchdogs: self.deps.watchdogs.clone(),
                meta: meta.clone(),
                retry: self.retry.clone(),
                dispatch_timeout: self.config.dispatch_timeout,
                now_ms: self.clock.epoch_ms(),
            };
            tasks.spawn(async move { ctx.dispatch_one(order).await });
        }
        while let Some(result) = tasks.join_next().await {
            if matches!(result, Ok(true)) {
                dispatched += 1;
            }
        }
        Ok(dispatched)
    }

    /// Write the done marker and clean up once every order is terminal.
    /// Past the job deadline, still-running orders get watchdog-style
    /// synthetic results so the run converges.
    async fn finalise_if_done(&self, meta: &RunMeta) -> Result<bool, EngineError> {
        let run_id = &meta.run_id;
        let orders = with_retries(&self.retry, "orders_for_run", || {
            self.deps.state.orders_for_run(run_id)
        })
        .await?;
        let now_ms = self.clock.epoch_ms();
        let deadline_elapsed = now_ms >= meta.deadline_ms;

        if !orders.iter().all(|o| o.status.is_terminal()) {
            if deadline_elapsed {
                for order in orders.iter().filter(|o| o.status == OrderStatus::Running) {
                    let path = callback_path(run_id, order.num);
                    if self.deps.artifacts.exists(&path).await? {
                        continue;
                    }
                    let result =
                        CallbackResult::new(CallbackStatus::TimedOut, "job deadline elapsed");
                    self.deps
                        .artifacts
                        .put(
                            &path,
                            serde_json::to_vec(&result)
                                .map_err(baton_storage::StorageError::from)?,
                        )
                        .await?;
                    tracing::info!(run = %run_id, order = %order.name, "job deadline sweep wrote timed_out result");
                }
            }
            return Ok(false);
        }

        // A replayed notification after finalisation changes nothing
        if self.deps.artifacts.exists(&done_path(run_id)).await? {
            return Ok(false);
        }

        let (status, summary) = aggregate_status(&orders, deadline_elapsed);
        let event = OrderEvent::new(
            meta.trace_id.clone(),
            meta.flow_id.clone(),
            run_id.clone(),
            JOB_ORDER_NAME,
            EventKind::JobCompleted,
            None,
            serde_json::json!({
                "status": status,
                "summary": summary,
            }),
            self.clock.epoch_ms(),
        );
        with_retries(&self.retry, "append_event", || {
            self.deps.state.append_event(&event)
        })
        .await?;

        let marker = DoneMarker { status, summary };
        self.deps
            .artifacts
            .put(
                &done_path(run_id),
                serde_json::to_vec(&marker).map_err(baton_storage::StorageError::from)?,
            )
            .await?;

        self.notify_pr(
            meta,
            &format!(
                "run {}: {} ({} succeeded, {} failed, {} timed out)",
                run_id, status, summary.succeeded, summary.failed, summary.timed_out
            ),
        )
        .await;

        // Best-effort key cleanup; a leftover key is not a failed run
        for order in &orders {
            if let Err(e) = self.deps.keys.delete(&order.encryption_key_ref).await {
                tracing::warn!(run = %run_id, key = %order.encryption_key_ref, error = %e, "key cleanup failed");
            }
        }

        tracing::info!(run = %run_id, %status, "run finalised");
        Ok(true)
    }

    async fn append_order_event(
        &self,
        meta: &RunMeta,
        order_name: &str,
        kind: EventKind,
        status: OrderStatus,
        log: &str,
    ) -> Result<(), EngineError> {
        let event = OrderEvent::new(
            meta.trace_id.clone(),
            meta.flow_id.clone(),
            meta.run_id.clone(),
            order_name,
            kind,
            Some(status),
            serde_json::json!({ "log": log_excerpt(log) }),
            self.clock.epoch_ms(),
        );
        with_retries(&self.retry, "append_event", || {
            self.deps.state.append_event(&event)
        })
        .await?;
        Ok(())
    }

    /// Post or update the run's tagged PR comment. Best-effort.
    async fn notify_pr(&self, meta: &RunMeta, body: &str) {
        let Some(value) = &meta.pr_reference else {
            return;
        };
        let Some(pr) = PrReference::from_value(value) else {
            tracing::debug!(run = %meta.run_id, "pr_reference present but not usable");
            return;
        };
        let token = match &pr.token_ref {
            Some(path) => match self.deps.credentials.fetch(path).await {
                Ok(bytes) => String::from_utf8_lossy(&bytes).trim().to_string(),
                Err(e) => {
                    tracing::warn!(run = %meta.run_id, error = %e, "pr token lookup failed");
                    return;
                }
            },
            None => String::new(),
        };

        let tag = format!("<!-- baton:{} -->", meta.run_id);
        let body = format!("{}\n{}", tag, body);
        let result = match self
            .deps
            .vcs
            .find_comment_by_tag(&pr.repo, pr.number, &tag, &token)
            .await
        {
            Ok(Some(id)) => self
                .deps
                .vcs
                .update_comment(&pr.repo, &id, &body, &token)
                .await,
            Ok(None) => self
                .deps
                .vcs
                .create_comment(&pr.repo, pr.number, &body, &token)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(run = %meta.run_id, error = %e, "pr comment failed");
        }
    }
}

/// Cloned collaborators for one dispatch task.
struct DispatchCtx<S, D, W> {
    state: S,
    dispatcher: D,
    watchdogs: W,
    meta: RunMeta,
    retry: RetryPolicy,
    dispatch_timeout: Duration,
    now_ms: u64,
}

impl<S, D, W> DispatchCtx<S, D, W>
where
    S: StateStore,
    D: BackendDispatcher,
    W: WatchdogLauncher,
{
    /// Dispatch one order. Returns whether it went to `running`; a failure
    /// fails this order only.
    async fn dispatch_one(self, order: OrderRecord) -> bool {
        let run_id = &self.meta.run_id;
        let request = DispatchRequest {
            run_id: run_id.clone(),
            num: order.num,
            target: order.target.clone(),
            bundle_uri: order.bundle_uri.clone(),
            key_ref: order.encryption_key_ref.clone(),
            callback_uri: order.callback_uri.clone(),
            timeout_s: order.timeout_s,
        };

        let dispatch_result =
            match tokio::time::timeout(self.dispatch_timeout, self.dispatcher.dispatch(request))
                .await
            {
                Ok(Ok(handle)) => Ok(handle),
                Ok(Err(e)) => Err(e.to_string()),
                Err(_) => Err(format!(
                    "dispatch timed out after {}s",
                    self.dispatch_timeout.as_secs()
                )),
            };

        match dispatch_result {
            Ok(handle) => {
                let watchdog = self
                    .watchdogs
                    .launch(WatchdogSpec {
                        run_id: run_id.clone(),
                        num: order.num,
                        timeout: Duration::from_secs(order.timeout_s),
                        dispatched_at_ms: self.now_ms,
                    })
                    .await;
                match watchdog {
                    Ok(watchdog_handle) => {
                        let patch = OrderPatch {
                            execution_url: Some(handle.execution_url.clone()),
                            watchdog_handle: Some(watchdog_handle),
                            dispatched_at_ms: Some(self.now_ms),
                            log: None,
                        };
                        let updated = with_retries(&self.retry, "update_status", || {
                            self.state.update_status(
                                run_id,
                                order.num,
                                OrderStatus::Running,
                                patch.clone(),
                            )
                        })
                        .await;
                        if let Err(e) = updated {
                            tracing::warn!(run = %run_id, order = %order.name, error = %e, "running transition failed");
                            return false;
                        }
                        self.record_event(
                            &order.name,
                            EventKind::OrderDispatched,
                            OrderStatus::Running,
                            &handle.execution_url,
                        )
                        .await;
                        tracing::info!(run = %run_id, order = %order.name, url = %handle.execution_url, "order dispatched");
                        true
                    }
                    Err(e) => {
                        // An unwatched order could hang the run forever
                        self.fail_order(&order, &format!("watchdog launch failed: {}", e))
                            .await;
                        false
                    }
                }
            }
            Err(message) => {
                self.fail_order(&order, &format!("dispatch failed: {}", message))
                    .await;
                false
            }
        }
    }

    async fn fail_order(&self, order: &OrderRecord, log: &str) {
        tracing::warn!(run = %self.meta.run_id, order = %order.name, %log, "order failed at dispatch");
        let updated = with_retries(&self.retry, "update_status", || {
            self.state.update_status(
                &self.meta.run_id,
                order.num,
                OrderStatus::Failed,
                OrderPatch::with_log(log),
            )
        })
        .await;
        if let Err(e) = updated {
            tracing::warn!(run = %self.meta.run_id, order = %order.name, error = %e, "failed transition not persisted");
        }
        self.record_event(&order.name, EventKind::OrderCompleted, OrderStatus::Failed, log)
            .await;
    }

    async fn record_event(&self, order_name: &str, kind: EventKind, status: OrderStatus, log: &str) {
        let event = OrderEvent::new(
            self.meta.trace_id.clone(),
            self.meta.flow_id.clone(),
            self.meta.run_id.clone(),
            order_name,
            kind,
            Some(status),
            serde_json::json!({ "log": log_excerpt(log) }),
            self.now_ms,
        );
        if let Err(e) = with_retries(&self.retry, "append_event", || {
            self.state.append_event(&event)
        })
        .await
        {
            tracing::warn!(order = order_name, error = %e, "event append failed");
        }
    }
}

/// Disjoint evaluation of the queued orders.
pub(crate) struct Evaluation {
    /// Dispatchable now
    pub ready: Vec<OrderRecord>,
    /// Doomed by a must-succeed dependency, with the synthetic log line
    pub doomed: Vec<(OrderNum, String)>,
}

/// Split queued orders into ready / doomed / (implicitly) waiting.
///
/// A must-succeed dependency that ended non-succeeded dooms its downstream;
/// a non-must-succeed dependency permits downstream in any terminal state.
/// At most one order per queue id may run at a time.
pub(crate) fn evaluate(orders: &[OrderRecord]) -> Evaluation {
    let by_name: HashMap<&str, &OrderRecord> =
        orders.iter().map(|o| (o.name.as_str(), o)).collect();
    let mut busy_queues: Vec<&str> = orders
        .iter()
        .filter(|o| o.status == OrderStatus::Running)
        .filter_map(|o| o.queue_id.as_deref())
        .collect();

    let mut ready = Vec::new();
    let mut doomed = Vec::new();
    for order in orders.iter().filter(|o| o.status == OrderStatus::Queued) {
        let mut blocked = false;
        let mut doom_log = None;
        for dep_name in &order.dependencies {
            let Some(dep) = by_name.get(dep_name.as_str()) else {
                // Admission validated references; a missing row is a hard fault
                doom_log = Some(format!("dependency {} missing from state", dep_name));
                break;
            };
            match dep.status {
                OrderStatus::Succeeded => {}
                OrderStatus::Failed | OrderStatus::TimedOut if !dep.must_succeed => {}
                OrderStatus::Failed | OrderStatus::TimedOut => {
                    doom_log = Some(format!(
                        "dependency {} ended as {}",
                        dep.name, dep.status
                    ));
                    break;
                }
                OrderStatus::Queued | OrderStatus::Running => {
                    blocked = true;
                }
            }
        }

        if let Some(log) = doom_log {
            doomed.push((order.num, log));
        } else if !blocked {
            if let Some(queue_id) = order.queue_id.as_deref() {
                if busy_queues.contains(&queue_id) {
                    continue; // waiting on its serialisation class
                }
                busy_queues.push(queue_id);
            }
            ready.push(order.clone());
        }
    }
    Evaluation { ready, doomed }
}

/// First KiB of a log line for event payloads.
fn log_excerpt(log: &str) -> String {
    const EXCERPT: usize = 1024;
    if log.len() <= EXCERPT {
        return log.to_string();
    }
    let mut end = EXCERPT;
    while !log.is_char_boundary(end) {
        end -= 1;
    }
    log[..end].to_string()
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
