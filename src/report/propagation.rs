// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Task-local reporter propagation.
//!
//! A server gives each request its own [`Telemetry`] and runs the request
//! future inside [`scope`]; code further down reaches it through
//! [`current`] without threading a parameter through every call.

use std::future::Future;
use std::sync::Arc;

use super::reporter::Telemetry;

tokio::task_local! {
    static CURRENT: Arc<Telemetry>;
}

/// Run `fut` with `telemetry` as the task's current reporter.
pub async fn scope<F: Future>(telemetry: Arc<Telemetry>, fut: F) -> F::Output {
    CURRENT.scope(telemetry, fut).await
}

/// Run `f` with `telemetry` as the current reporter, synchronously.
pub fn sync_scope<R>(telemetry: Arc<Telemetry>, f: impl FnOnce() -> R) -> R {
    CURRENT.sync_scope(telemetry, f)
}

/// The reporter for the running task, if one was set.
pub fn current() -> Option<Arc<Telemetry>> {
    CURRENT.try_with(Arc::clone).ok()
}
