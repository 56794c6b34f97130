// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Identifier newtypes.
//!
//! Everything the kernel stores is keyed by opaque strings: the run, the
//! trace shared by all of a run's legs, and the holder token written into
//! the run lock. Each gets its own type so a lock key cannot be handed to
//! a call site expecting a run id.

/// Define a string-backed identifier.
///
/// Identifiers are minted once (by admission or an [`IdGen`]) and after
/// that only compared, displayed, and serialized; the macro generates
/// exactly that surface and keeps the inner string private.
#[macro_export]
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

crate::string_id! {
    /// Opaque unique id of a submitted run (alias: job id).
    ///
    /// Every order, event, lock, bundle, and callback of a run is keyed
    /// under this id.
    RunId
}

crate::string_id! {
    /// Short random token shared by all legs of a run.
    ///
    /// Events are partitioned by trace id; the flow id is derived from it.
    TraceId
}

crate::string_id! {
    /// Token identifying one orchestrator invocation.
    ///
    /// Written into the run lock so contention is attributable.
    HolderId
}

/// Mints the kernel's identifiers.
pub trait IdGen: Send + Sync {
    /// Opaque unique id, for runs and lock holders.
    fn generate(&self) -> String;

    /// Short random token, for traces.
    fn trace_token(&self) -> String;
}

/// UUID-backed generator: v4 for unique ids, the first eight hex digits of
/// one for trace tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn trace_token(&self) -> String {
        let mut token = uuid::Uuid::new_v4().simple().to_string();
        token.truncate(8);
        token
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
