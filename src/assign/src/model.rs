// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The arbiter-side records: a controller's registration and the
//! assignment it may be holding for a given fingerprint.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use ose_common::{Fingerprint, RequestId};
use serde::{Deserialize, Serialize};

/// What the arbiter knows about one controller: its remaining worker
/// budget, the scans it has advertised interest in, and the scans it
/// currently holds.
///
/// Worker-budget conservation: `worker_count + assigned_scans.len() ==
/// initial_worker_count` at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerRegistration {
    pub id: String,
    /// Remaining worker capacity; decremented on assignment, restored
    /// on `done`/`abort`.
    pub worker_count: i64,
    /// The worker count reported at registration. Never mutated after
    /// creation -- budget conservation is checked against this value.
    pub initial_worker_count: i64,
    pub last_heartbeat: DateTime<Utc>,
    /// `fingerprint -> requestId` of scans this controller advertised
    /// interest in via `/image/found`.
    pub requested_scans: BTreeMap<Fingerprint, RequestId>,
    /// `fingerprint -> assignedAt` of scans currently held.
    pub assigned_scans: BTreeMap<Fingerprint, DateTime<Utc>>,
}

impl ControllerRegistration {
    pub fn new(id: impl Into<String>, worker_count: i64, now: DateTime<Utc>) -> Self {
        ControllerRegistration {
            id: id.into(),
            worker_count,
            initial_worker_count: worker_count,
            last_heartbeat: now,
            requested_scans: BTreeMap::new(),
            assigned_scans: BTreeMap::new(),
        }
    }

    /// Worker-budget conservation.
    pub fn budget_is_conserved(&self) -> bool {
        self.worker_count + self.assigned_scans.len() as i64 == self.initial_worker_count
    }
}

/// A single in-flight scan ownership, keyed by `requestId` in the
/// arbiter's `assignedImages` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    pub controller_id: String,
    pub fingerprint: Fingerprint,
    pub assigned_at: DateTime<Utc>,
    /// Refreshed by `/image/{id}/processing` keepalives; the reaper uses
    /// staleness of this field to decide an assignment is abandoned.
    pub updated_at: DateTime<Utc>,
}

/// The reverse index the arbiter's reconciliation sweep uses to find
/// which pods reference a given local-runtime image id, so it can patch
/// both the image and every pod that runs it.
pub type ImageUsage = BTreeMap<String, BTreeSet<(String, String)>>;

/// The response shape shared by `/image/found` and `/image/request`:
/// an empty `request_id` is never observed here since
/// the id is always derivable from the fingerprint, but `start_scan`/
/// `skip_scan` drive the HTTP layer's response body directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentOutcome {
    pub start_scan: bool,
    pub skip_scan: bool,
}

impl AssignmentOutcome {
    pub const REQUESTED: AssignmentOutcome = AssignmentOutcome {
        start_scan: false,
        skip_scan: false,
    };
    pub const ASSIGNED: AssignmentOutcome = AssignmentOutcome {
        start_scan: true,
        skip_scan: false,
    };
    pub const SKIP: AssignmentOutcome = AssignmentOutcome {
        start_scan: false,
        skip_scan: true,
    };
}
