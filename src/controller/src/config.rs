// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Controller-wide tunables assembled from CLI flags/env in `bin/main.rs`.

use std::time::Duration;

use ose_hub_client::HubConfig;

/// How long a worker sleeps before retrying `/heartbeat` or a saturated
/// `/image/request`. Fixed at 30 seconds for both, as specified.
pub const RETRY_INTERVAL: Duration = Duration::from_secs(30);

/// How long a scan is expected to take; a worker gives up and aborts at
/// twice this, matching the arbiter's own stale-assignment threshold so
/// both sides agree on when a scan is dead.
pub const DEFAULT_EXPECTED_SCAN_DURATION: Duration = Duration::from_secs(30 * 60);

/// How often a worker posts `/image/{id}/processing` while a scan is
/// running. Must stay well under the arbiter's `stale_assignment_after`
/// (30 minutes by default) so a long scan's keepalive always lands
/// before the reaper would otherwise reclaim it.
pub const PROCESSING_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Connection and identity settings for a single controller process.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub controller_id: String,
    pub arbiter_url: String,
    pub hub: HubConfig,
    pub scanner_image: String,
    pub worker_count: usize,
    pub expected_scan_duration: Duration,
}

impl ControllerConfig {
    pub fn new(
        controller_id: impl Into<String>,
        arbiter_url: impl Into<String>,
        hub: HubConfig,
        scanner_image: impl Into<String>,
        worker_count: usize,
    ) -> Self {
        ControllerConfig {
            controller_id: controller_id.into(),
            arbiter_url: arbiter_url.into(),
            hub,
            scanner_image: scanner_image.into(),
            worker_count,
            expected_scan_duration: DEFAULT_EXPECTED_SCAN_DURATION,
        }
    }

    /// The deadline a worker allows a single scan to run before treating
    /// it as dead and aborting: twice [`Self::expected_scan_duration`].
    pub fn scan_deadline(&self) -> Duration {
        self.expected_scan_duration * 2
    }

    /// Rejects configuration that would make the controller non-functional:
    /// required identity/connection strings left empty, or a worker pool
    /// of size zero.
    pub fn validate(&self) -> Result<(), crate::error::ControllerError> {
        if self.controller_id.trim().is_empty() {
            return Err(crate::error::ControllerError::ConfigInvalid(
                "controller id must not be empty".to_string(),
            ));
        }
        if self.arbiter_url.trim().is_empty() {
            return Err(crate::error::ControllerError::ConfigInvalid(
                "arbiter url must not be empty".to_string(),
            ));
        }
        if self.scanner_image.trim().is_empty() {
            return Err(crate::error::ControllerError::ConfigInvalid(
                "scanner image must not be empty".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(crate::error::ControllerError::ConfigInvalid(
                "worker count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
