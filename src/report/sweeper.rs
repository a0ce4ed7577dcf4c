// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Background expiry sweep.
//!
//! Every mutating reporter call already sweeps expired timers, but an idle
//! session would otherwise never surface its orphaned timers. The sweeper
//! is one periodic task per reporter rather than one timer per entry.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::reporter::Telemetry;

/// Sweep `telemetry` every `interval` until it is dropped or the task is
/// aborted.
pub fn spawn_sweeper(telemetry: &Arc<Telemetry>, interval: Duration) -> JoinHandle<()> {
    let weak: Weak<Telemetry> = Arc::downgrade(telemetry);
    let interval = interval.max(Duration::from_millis(1));

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let Some(telemetry) = weak.upgrade() else {
                tracing::debug!("telemetry dropped, sweeper exiting");
                break;
            };
            let expired = telemetry.sweep_expired();
            if expired > 0 {
                tracing::debug!(expired, "swept expired timers");
            }
        }
    })
}
