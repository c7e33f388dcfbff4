// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Tunables for the assignment state machine.
//!
//! The admission limit (historically hard-coded to 7), lease expiry on
//! assignments, and GC of stale controller registrations are all config
//! knobs here instead of constants; see `DESIGN.md` for the reasoning.

use std::time::Duration;

/// The downstream analysis service's admission budget and staleness
/// thresholds for the reaper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignConfig {
    /// Maximum number of scans the arbiter will let run concurrently
    /// against the analysis service. The historical default is 7.
    pub admission_limit: u64,
    /// A `ControllerRegistration` whose last heartbeat is older than this
    /// is considered dead; its assignments are released and the
    /// registration is dropped.
    pub stale_controller_after: Duration,
    /// An `Assignment` whose `updatedAt` (last `/processing` keepalive)
    /// is older than this is treated as if its holder had called
    /// `/abort`.
    pub stale_assignment_after: Duration,
}

impl Default for AssignConfig {
    fn default() -> Self {
        AssignConfig {
            admission_limit: 7,
            stale_controller_after: Duration::from_secs(300),
            stale_assignment_after: Duration::from_secs(30 * 60),
        }
    }
}
