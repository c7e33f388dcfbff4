// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Arbiter-wide tunables assembled from CLI flags/env in `bin/main.rs`.

use std::time::Duration;

use ose_assign::AssignConfig;
use ose_hub_client::HubConfig;

/// TCP port the assignment API listens on.
pub const LISTEN_PORT: u16 = 9035;

/// The analysis service's throughput budget plus the sweep/reap
/// cadences layered on top of [`AssignConfig`].
#[derive(Debug, Clone)]
pub struct ArbiterConfig {
    pub hub: HubConfig,
    pub assign: AssignConfig,
    pub scanner_version: String,
    /// How often the reconciliation sweep and the stale reapers run.
    /// Fixed at 30 minutes; the reapers piggyback on the same tick.
    pub reconcile_interval: Duration,
    pub reconcile_workers: usize,
}

impl ArbiterConfig {
    pub fn new(hub: HubConfig, scanner_version: impl Into<String>) -> Self {
        ArbiterConfig {
            hub,
            assign: AssignConfig::default(),
            scanner_version: scanner_version.into(),
            reconcile_interval: Duration::from_secs(30 * 60),
            reconcile_workers: 5,
        }
    }
}
