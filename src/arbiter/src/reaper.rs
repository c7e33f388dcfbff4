// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Periodically releases stale controller registrations and abandoned
//! assignments. Runs on the same cadence as the reconciliation sweep;
//! see `DESIGN.md` for the reasoning.

use std::sync::Arc;
use std::time::Duration;

use ose_assign::AssignmentTable;
use tracing::info;

pub async fn run(table: Arc<AssignmentTable>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    // The first tick fires immediately; skip it so the reaper's cadence
    // matches the sweep's instead of running twice back to back.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        let now = chrono::Utc::now();
        let stale_controllers = table.reap_stale_controllers(now);
        let stale_assignments = table.reap_stale_assignments(now);
        if !stale_controllers.is_empty() || !stale_assignments.is_empty() {
            info!(
                reaped_controllers = stale_controllers.len(),
                reaped_assignments = stale_assignments.len(),
                "reaper pass complete"
            );
        }
    }
}
