// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job validation.
//!
//! Validation is value-based: every problem in the submission is collected
//! into a list of [`ValidationError`]s, and nothing is persisted when the
//! list is non-empty. A successful validation yields fully-resolved
//! [`OrderSpec`]s in submission order.

use crate::descriptor::{JobDescriptor, OrderDescriptor};
use crate::order::{ExecutionTarget, OrderNum, OrderSource, OrderSpec, TargetKind};
use std::collections::{HashMap, HashSet, VecDeque};
use thiserror::Error;

/// A structured validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("job has no orders")]
    NoOrders,
    #[error("username is required")]
    MissingUsername,
    #[error("job_timeout_s must be positive, got {0}")]
    NonPositiveJobTimeout(i64),
    #[error("order '{order}': cmds must be non-empty")]
    EmptyCmds { order: String },
    #[error("order '{order}': timeout_s must be positive, got {timeout_s}")]
    NonPositiveTimeout { order: String, timeout_s: i64 },
    #[error("order '{order}': no execution target given")]
    MissingTarget { order: String },
    #[error("order '{order}': remote-agent orders need at least one target")]
    MissingAgentTargets { order: String },
    #[error("order '{order}': no source given")]
    MissingSource { order: String },
    #[error("order '{order}': source must name exactly one of bundle_location or repo")]
    AmbiguousSource { order: String },
    #[error("order '{order}': repo source requires token_ref")]
    MissingTokenRef { order: String },
    #[error("duplicate order name '{order}'")]
    DuplicateOrderName { order: String },
    #[error("order '{order}': unknown dependency '{dependency}'")]
    UnknownDependency { order: String, dependency: String },
    #[error("dependency cycle involving orders: {orders}")]
    DependencyCycle { orders: String },
    #[error("run_id '{run_id}' already exists")]
    RunIdCollision { run_id: String },
}

/// Backend fields filled in when the wire descriptor names only a kind.
#[derive(Debug, Clone)]
pub struct TargetDefaults {
    /// Function name for inline dispatch
    pub inline_function: String,
    /// Project name for container dispatch
    pub container_project: String,
    /// Command document for remote-agent dispatch
    pub document_ref: String,
}

/// Validate a descriptor and resolve it into order specs.
pub fn validate_job(
    descriptor: &JobDescriptor,
    defaults: &TargetDefaults,
) -> Result<Vec<OrderSpec>, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if descriptor.username.trim().is_empty() {
        errors.push(ValidationError::MissingUsername);
    }
    if descriptor.job_timeout_s <= 0 {
        errors.push(ValidationError::NonPositiveJobTimeout(
            descriptor.job_timeout_s,
        ));
    }
    if descriptor.orders.is_empty() {
        errors.push(ValidationError::NoOrders);
        return Err(errors);
    }

    let mut specs = Vec::with_capacity(descriptor.orders.len());
    let mut names = HashSet::new();
    for (i, order) in descriptor.orders.iter().enumerate() {
        let num = OrderNum::from_index(i);
        let name = order
            .order_name
            .clone()
            .unwrap_or_else(|| num.to_string());
        if !names.insert(name.clone()) {
            errors.push(ValidationError::DuplicateOrderName {
                order: name.clone(),
            });
        }
        match resolve_order(order, num, &name, defaults) {
            Ok(spec) => specs.push(spec),
            Err(mut order_errors) => errors.append(&mut order_errors),
        }
    }

    // Dependency references and cycles are only meaningful once every order
    // resolved to a name.
    if errors.is_empty() {
        for spec in &specs {
            for dep in &spec.dependencies {
                if !names.contains(dep) {
                    errors.push(ValidationError::UnknownDependency {
                        order: spec.name.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
        }
    }
    if errors.is_empty() {
        if let Some(cycle) = find_cycle(&specs) {
            errors.push(ValidationError::DependencyCycle {
                orders: cycle.join(", "),
            });
        }
    }

    if errors.is_empty() {
        Ok(specs)
    } else {
        Err(errors)
    }
}

fn resolve_order(
    order: &OrderDescriptor,
    num: OrderNum,
    name: &str,
    defaults: &TargetDefaults,
) -> Result<OrderSpec, Vec<ValidationError>> {
    let mut errors = Vec::new();

    if order.cmds.is_empty() || order.cmds.iter().any(|c| c.trim().is_empty()) {
        errors.push(ValidationError::EmptyCmds {
            order: name.to_string(),
        });
    }
    if order.timeout_s <= 0 {
        errors.push(ValidationError::NonPositiveTimeout {
            order: name.to_string(),
            timeout_s: order.timeout_s,
        });
    }

    let target = match order.target_kind() {
        None => {
            errors.push(ValidationError::MissingTarget {
                order: name.to_string(),
            });
            None
        }
        Some(TargetKind::Inline) => Some(ExecutionTarget::Inline {
            function: defaults.inline_function.clone(),
        }),
        Some(TargetKind::Container) => Some(ExecutionTarget::Container {
            project: defaults.container_project.clone(),
        }),
        Some(TargetKind::RemoteAgent) => {
            if order.targets.is_empty() {
                errors.push(ValidationError::MissingAgentTargets {
                    order: name.to_string(),
                });
                None
            } else {
                Some(ExecutionTarget::RemoteAgent {
                    targets: order.targets.clone(),
                    document_ref: order
                        .document_ref
                        .clone()
                        .unwrap_or_else(|| defaults.document_ref.clone()),
                })
            }
        }
    };

    let source = match &order.source {
        None => {
            errors.push(ValidationError::MissingSource {
                order: name.to_string(),
            });
            None
        }
        Some(fields) => match (&fields.bundle_location, &fields.repo) {
            (Some(location), None) => Some(OrderSource::Bundle {
                bundle_location: location.clone(),
            }),
            (None, Some(repo)) => match &fields.token_ref {
                Some(token_ref) => Some(OrderSource::Repo {
                    repo: repo.clone(),
                    token_ref: token_ref.clone(),
                    folder: fields.folder.clone(),
                    commit: fields.commit.clone(),
                }),
                None => {
                    errors.push(ValidationError::MissingTokenRef {
                        order: name.to_string(),
                    });
                    None
                }
            },
            (Some(_), Some(_)) => {
                errors.push(ValidationError::AmbiguousSource {
                    order: name.to_string(),
                });
                None
            }
            (None, None) => {
                errors.push(ValidationError::MissingSource {
                    order: name.to_string(),
                });
                None
            }
        },
    };

    match (target, source) {
        (Some(target), Some(source)) if errors.is_empty() => Ok(OrderSpec {
            num,
            name: name.to_string(),
            target,
            cmds: order.cmds.clone(),
            timeout_s: order.timeout_s as u64,
            must_succeed: order.must_succeed,
            dependencies: order.dependencies.clone(),
            queue_id: order.queue_id.clone(),
            env_vars: order.env_vars.clone(),
            config_paths: order.config_paths.clone(),
            secret_paths: order.secret_paths.clone(),
            source,
        }),
        _ => Err(errors),
    }
}

/// Kahn's topological sort; returns the names left over when the graph has a
/// cycle, sorted for a stable error message.
fn find_cycle(specs: &[OrderSpec]) -> Option<Vec<String>> {
    let mut in_degree: HashMap<&str, usize> =
        specs.iter().map(|s| (s.name.as_str(), 0)).collect();
    let mut downstream: HashMap<&str, Vec<&str>> = HashMap::new();
    for spec in specs {
        for dep in &spec.dependencies {
            *in_degree.entry(spec.name.as_str()).or_default() += 1;
            downstream
                .entry(dep.as_str())
                .or_default()
                .push(spec.name.as_str());
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| *n)
        .collect();
    let mut visited = 0;
    while let Some(name) = queue.pop_front() {
        visited += 1;
        if let Some(next) = downstream.get(name) {
            for &n in next {
                let degree = in_degree.entry(n).or_default();
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(n);
                }
            }
        }
    }

    if visited == specs.len() {
        None
    } else {
        let mut cyclic: Vec<String> = in_degree
            .iter()
            .filter(|(_, d)| **d > 0)
            .map(|(n, _)| n.to_string())
            .collect();
        cyclic.sort();
        Some(cyclic)
    }
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
