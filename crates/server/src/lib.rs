// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Baton server (batond)
//!
//! Hosts the kernel for single-host deployments: the HTTP submission API,
//! the in-process notification loop, and a local shell worker behind the
//! inline dispatcher.

pub mod composition;
pub mod http;
pub mod notify_loop;
pub mod worker;

pub use composition::{build_kernel, Kernel, ServerConfig};
pub use http::{router, AppState};
