// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The assignment state machine: the single guarded structure that
//! consolidates every arbiter-side table so every transition is atomic
//! across all of them at once -- piecemeal locking risks violating
//! worker-budget conservation or double-assigning a fingerprint.
//!
//! `inFlightScans` is the one exception, held as a bare atomic outside
//! the lock since it only ever needs a relaxed read for the admission
//! check.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use ose_common::{Fingerprint, RequestId, ScanImage};
use tracing::{debug, info, warn};

use crate::config::AssignConfig;
use crate::error::{AssignError, Result};
use crate::model::{Assignment, AssignmentOutcome, ControllerRegistration, ImageUsage};

struct Inner {
    images: HashMap<Fingerprint, ScanImage>,
    requested_images: HashMap<Fingerprint, RequestId>,
    assigned_images: HashMap<RequestId, Assignment>,
    controllers: HashMap<String, ControllerRegistration>,
    image_usage: ImageUsage,
}

/// The arbiter's entire in-memory brain. One per process.
pub struct AssignmentTable {
    inner: RwLock<Inner>,
    in_flight_scans: AtomicU64,
    config: AssignConfig,
}

impl AssignmentTable {
    pub fn new(config: AssignConfig) -> Self {
        AssignmentTable {
            inner: RwLock::new(Inner {
                images: HashMap::new(),
                requested_images: HashMap::new(),
                assigned_images: HashMap::new(),
                controllers: HashMap::new(),
                image_usage: BTreeMap::new(),
            }),
            in_flight_scans: AtomicU64::new(0),
            config,
        }
    }

    pub fn config(&self) -> &AssignConfig {
        &self.config
    }

    pub fn in_flight_scans(&self) -> u64 {
        self.in_flight_scans.load(Ordering::SeqCst)
    }

    /// Registers a controller on its first heartbeat, or simply refreshes
    /// `last_heartbeat` on subsequent ones. The worker count reported at
    /// first registration is never overwritten -- budget conservation is
    /// checked against that original value for this registration's
    /// lifetime.
    pub fn heartbeat(&self, controller_id: &str, worker_count: i64, now: DateTime<Utc>) {
        let mut inner = self.inner.write().unwrap();
        match inner.controllers.get_mut(controller_id) {
            Some(existing) => {
                existing.last_heartbeat = now;
            }
            None => {
                debug!(controller_id, worker_count, "registering controller");
                inner.controllers.insert(
                    controller_id.to_string(),
                    ControllerRegistration::new(controller_id, worker_count, now),
                );
            }
        }
    }

    fn derive_state_image(images: &mut HashMap<Fingerprint, ScanImage>, fingerprint: &Fingerprint) {
        images
            .entry(fingerprint.clone())
            .or_insert_with(|| ScanImage {
                engine_id: String::new(),
                tagged_name: fingerprint.tagged_name().to_string(),
                content_digest: fingerprint.content_digest().unwrap_or("").to_string(),
                fingerprint: fingerprint.clone(),
                scanned: false,
                scan_id: None,
            });
    }

    /// `UNKNOWN -> REQUESTED` / `REQUESTED -> REQUESTED` in the §4.1
    /// table. Advertises `controller_id`'s interest in `fingerprint` and
    /// returns the derived `requestId`.
    pub fn found(
        &self,
        controller_id: &str,
        fingerprint: &Fingerprint,
    ) -> Result<(RequestId, AssignmentOutcome)> {
        let mut inner = self.inner.write().unwrap();
        if !inner.controllers.contains_key(controller_id) {
            return Err(AssignError::UnknownController(controller_id.to_string()));
        }
        let request_id = fingerprint.request_id();

        Self::derive_state_image(&mut inner.images, fingerprint);
        let already_scanned = inner.images[fingerprint].scanned;

        if already_scanned {
            return Ok((request_id, AssignmentOutcome::SKIP));
        }

        inner
            .requested_images
            .entry(fingerprint.clone())
            .or_insert_with(|| request_id.clone());
        inner
            .controllers
            .get_mut(controller_id)
            .unwrap()
            .requested_scans
            .insert(fingerprint.clone(), request_id.clone());

        debug!(controller_id, %fingerprint, %request_id, "image found");
        Ok((request_id, AssignmentOutcome::REQUESTED))
    }

    /// `REQUESTED -> ASSIGNED`, the poach/reclaim/stand-down guards, and
    /// the saturation rule.
    ///
    /// The admission check is a pure read of `in_flight_scans` performed
    /// before any table mutation: on saturation the call returns early
    /// without touching `controllers`/`assigned_images`, fixing a bug
    /// in the original where side effects could fire even when over
    /// budget.
    pub fn request(
        &self,
        controller_id: &str,
        fingerprint: &Fingerprint,
        now: DateTime<Utc>,
    ) -> Result<(RequestId, AssignmentOutcome)> {
        let mut inner = self.inner.write().unwrap();
        if !inner.controllers.contains_key(controller_id) {
            return Err(AssignError::UnknownController(controller_id.to_string()));
        }
        let request_id = fingerprint.request_id();

        if let Some(image) = inner.images.get(fingerprint) {
            if image.scanned {
                return Ok((request_id, AssignmentOutcome::SKIP));
            }
        }

        let has_found = inner.controllers[controller_id]
            .requested_scans
            .contains_key(fingerprint);
        if !has_found {
            // found must happen-before request: a controller that
            // skipped /image/found is told to stand down rather than
            // silently assigned.
            return Ok((request_id, AssignmentOutcome::SKIP));
        }

        if let Some(assignment) = inner.assigned_images.get(&request_id) {
            return if assignment.controller_id == controller_id {
                // Idempotent reclaim: same holder re-requesting.
                Ok((request_id, AssignmentOutcome::ASSIGNED))
            } else {
                // Cannot poach another controller's in-flight scan.
                Ok((request_id, AssignmentOutcome::REQUESTED))
            };
        }

        // Admission control: a pure read, gating every subsequent
        // mutation. Saturation never partially mutates state. No
        // assignment is made, so the wire contract gets an empty
        // requestId rather than one the caller might mistake for a hold.
        if self.in_flight_scans.load(Ordering::SeqCst) >= self.config.admission_limit {
            debug!(controller_id, %fingerprint, "admission saturated, retry later");
            return Ok((RequestId::empty(), AssignmentOutcome::REQUESTED));
        }

        let controller = inner.controllers.get_mut(controller_id).unwrap();
        if controller.worker_count <= 0 {
            return Ok((RequestId::empty(), AssignmentOutcome::REQUESTED));
        }

        controller.worker_count -= 1;
        controller
            .assigned_scans
            .insert(fingerprint.clone(), now);
        inner.assigned_images.insert(
            request_id.clone(),
            Assignment {
                controller_id: controller_id.to_string(),
                fingerprint: fingerprint.clone(),
                assigned_at: now,
                updated_at: now,
            },
        );
        self.in_flight_scans.fetch_add(1, Ordering::SeqCst);

        info!(controller_id, %fingerprint, %request_id, "scan assigned");
        Ok((request_id, AssignmentOutcome::ASSIGNED))
    }

    /// Refreshes `updated_at` on the holder's assignment. 404s (via
    /// `NotHolder`) if `controller_id` isn't the current holder.
    pub fn processing(&self, controller_id: &str, request_id: &RequestId, now: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        let assignment = inner
            .assigned_images
            .get_mut(request_id)
            .filter(|a| a.controller_id == controller_id)
            .ok_or_else(|| AssignError::NotHolder {
                request_id: request_id.clone(),
                controller_id: controller_id.to_string(),
            })?;
        assignment.updated_at = now;
        Ok(())
    }

    /// `ASSIGNED(x) -> COMPLETE`: marks the image scanned, restores the
    /// holder's worker budget, and broadcasts the "skip" by dropping the
    /// fingerprint from every other controller's advertised interest.
    pub fn done(&self, controller_id: &str, request_id: &RequestId) -> Result<Fingerprint> {
        let mut inner = self.inner.write().unwrap();
        let assignment = inner
            .assigned_images
            .get(request_id)
            .filter(|a| a.controller_id == controller_id)
            .cloned()
            .ok_or_else(|| AssignError::NotHolder {
                request_id: request_id.clone(),
                controller_id: controller_id.to_string(),
            })?;

        let fingerprint = assignment.fingerprint.clone();

        if let Some(image) = inner.images.get_mut(&fingerprint) {
            if !image.scanned {
                image.scanned = true;
            }
        }

        inner.assigned_images.remove(request_id);
        inner.requested_images.remove(&fingerprint);

        if let Some(holder) = inner.controllers.get_mut(controller_id) {
            holder.worker_count += 1;
            holder.assigned_scans.remove(&fingerprint);
            holder.requested_scans.remove(&fingerprint);
        }

        // Skip broadcast to every other controller that advertised
        // interest in this fingerprint.
        for (id, registration) in inner.controllers.iter_mut() {
            if id != controller_id {
                registration.requested_scans.remove(&fingerprint);
            }
        }

        self.in_flight_scans.fetch_sub(1, Ordering::SeqCst);
        info!(controller_id, %fingerprint, %request_id, "scan done");
        Ok(fingerprint)
    }

    /// `ASSIGNED(x) -> REQUESTED`: releases the holder's worker budget
    /// and leaves the fingerprint open for any controller (including
    /// the aborting one) to re-request.
    pub fn abort(&self, controller_id: &str, request_id: &RequestId) -> Result<Fingerprint> {
        let mut inner = self.inner.write().unwrap();
        let assignment = inner
            .assigned_images
            .get(request_id)
            .filter(|a| a.controller_id == controller_id)
            .cloned()
            .ok_or_else(|| AssignError::NotHolder {
                request_id: request_id.clone(),
                controller_id: controller_id.to_string(),
            })?;

        let fingerprint = assignment.fingerprint.clone();
        inner.assigned_images.remove(request_id);

        if let Some(holder) = inner.controllers.get_mut(controller_id) {
            holder.worker_count += 1;
            holder.assigned_scans.remove(&fingerprint);
            holder.requested_scans.remove(&fingerprint);
        }

        self.in_flight_scans.fetch_sub(1, Ordering::SeqCst);
        warn!(controller_id, %fingerprint, %request_id, "scan aborted");
        Ok(fingerprint)
    }

    /// Records that `namespace/pod_name` references the local runtime
    /// image `engine_id`, for the reconciliation sweep's pod-annotation
    /// pass.
    pub fn record_image_usage(&self, engine_id: &str, namespace: &str, pod_name: &str) {
        let mut inner = self.inner.write().unwrap();
        inner
            .image_usage
            .entry(engine_id.to_string())
            .or_default()
            .insert((namespace.to_string(), pod_name.to_string()));
    }

    pub fn image_usage(&self, engine_id: &str) -> std::collections::BTreeSet<(String, String)> {
        self.inner
            .read()
            .unwrap()
            .image_usage
            .get(engine_id)
            .cloned()
            .unwrap_or_default()
    }

    /// A snapshot of every image the arbiter has ever seen, for the
    /// periodic reconciliation sweep.
    pub fn known_images(&self) -> Vec<ScanImage> {
        self.inner.read().unwrap().images.values().cloned().collect()
    }

    pub fn is_scanned(&self, fingerprint: &Fingerprint) -> bool {
        self.inner
            .read()
            .unwrap()
            .images
            .get(fingerprint)
            .map(|i| i.scanned)
            .unwrap_or(false)
    }

    /// Drops controller registrations whose last heartbeat is older than
    /// `stale_controller_after`, releasing any assignments they held
    /// back to `REQUESTED`. Run on the reconciliation sweep's cadence;
    /// see `DESIGN.md` for the reasoning.
    pub fn reap_stale_controllers(&self, now: DateTime<Utc>) -> Vec<String> {
        let threshold = self.config.stale_controller_after;
        let mut inner = self.inner.write().unwrap();

        let stale: Vec<String> = inner
            .controllers
            .iter()
            .filter(|(_, c)| {
                now.signed_duration_since(c.last_heartbeat)
                    .to_std()
                    .map(|age| age >= threshold)
                    .unwrap_or(false)
            })
            .map(|(id, _)| id.clone())
            .collect();

        for id in &stale {
            if let Some(registration) = inner.controllers.remove(id) {
                let released: Vec<RequestId> = registration
                    .assigned_scans
                    .keys()
                    .map(|f| f.request_id())
                    .collect();
                for request_id in released {
                    if inner.assigned_images.remove(&request_id).is_some() {
                        self.in_flight_scans.fetch_sub(1, Ordering::SeqCst);
                    }
                }
                warn!(controller_id = %id, "reaped stale controller registration");
            }
        }
        stale
    }

    /// Treats any `Assignment` whose `updated_at` predates
    /// `stale_assignment_after` as if its holder had called `/abort`;
    /// see `DESIGN.md` for the reasoning.
    pub fn reap_stale_assignments(&self, now: DateTime<Utc>) -> Vec<RequestId> {
        let threshold = self.config.stale_assignment_after;
        let mut inner = self.inner.write().unwrap();

        let stale: Vec<(RequestId, String, Fingerprint)> = inner
            .assigned_images
            .iter()
            .filter(|(_, a)| {
                now.signed_duration_since(a.updated_at)
                    .to_std()
                    .map(|age| age >= threshold)
                    .unwrap_or(false)
            })
            .map(|(request_id, a)| (request_id.clone(), a.controller_id.clone(), a.fingerprint.clone()))
            .collect();

        for (request_id, controller_id, fingerprint) in &stale {
            inner.assigned_images.remove(request_id);
            if let Some(holder) = inner.controllers.get_mut(controller_id) {
                holder.worker_count += 1;
                holder.assigned_scans.remove(fingerprint);
                holder.requested_scans.remove(fingerprint);
            }
            self.in_flight_scans.fetch_sub(1, Ordering::SeqCst);
            warn!(%request_id, controller_id, %fingerprint, "reaped stale assignment");
        }
        stale.into_iter().map(|(id, _, _)| id).collect()
    }

    /// Test/debug helper: the worker count a controller currently has
    /// available.
    pub fn controller_worker_count(&self, controller_id: &str) -> Option<i64> {
        self.inner
            .read()
            .unwrap()
            .controllers
            .get(controller_id)
            .map(|c| c.worker_count)
    }

    pub fn controller_budget_is_conserved(&self, controller_id: &str) -> Option<bool> {
        self.inner
            .read()
            .unwrap()
            .controllers
            .get(controller_id)
            .map(|c| c.budget_is_conserved())
    }

    pub fn controller_has_requested(&self, controller_id: &str, fingerprint: &Fingerprint) -> bool {
        self.inner
            .read()
            .unwrap()
            .controllers
            .get(controller_id)
            .map(|c| c.requested_scans.contains_key(fingerprint))
            .unwrap_or(false)
    }

    pub fn assigned_images_len(&self) -> usize {
        self.inner.read().unwrap().assigned_images.len()
    }

    /// Whether `fingerprint` is in the global `requestedImages` table --
    /// distinct from [`Self::controller_has_requested`], which checks a
    /// single controller's own advertised interest.
    pub fn is_requested(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.read().unwrap().requested_images.contains_key(fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ose_common::Fingerprint;

    fn table() -> AssignmentTable {
        AssignmentTable::new(AssignConfig::default())
    }

    fn table_with_limit(limit: u64) -> AssignmentTable {
        AssignmentTable::new(AssignConfig {
            admission_limit: limit,
            ..AssignConfig::default()
        })
    }

    fn fp(spec: &str) -> Fingerprint {
        Fingerprint::new(spec)
    }

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    // Two controllers, only one request wins; after done, the loser's
    // retry is told to stand down.
    #[test]
    fn two_controllers_race_for_one_image() {
        let t = table();
        let f = fp("host/ns/img@sha256:abc");
        t.heartbeat("A", 2, now());
        t.heartbeat("B", 2, now());

        t.found("A", &f).unwrap();
        t.found("B", &f).unwrap();

        let (_, a_request) = t.request("A", &f, now()).unwrap();
        assert_eq!(a_request, AssignmentOutcome::ASSIGNED);

        let (_, b_request) = t.request("B", &f, now()).unwrap();
        assert_eq!(b_request, AssignmentOutcome::REQUESTED);

        let (request_id, _) = t.found("A", &f).unwrap();
        t.done("A", &request_id).unwrap();

        let (_, b_retry) = t.request("B", &f, now()).unwrap();
        assert_eq!(b_retry, AssignmentOutcome::SKIP);

        assert_eq!(t.controller_worker_count("A"), Some(2));
        assert_eq!(t.controller_worker_count("B"), Some(2));
        assert!(t.is_scanned(&f));
        assert_eq!(t.assigned_images_len(), 0);
    }

    // Abort restores the worker budget and leaves the fingerprint open
    // for re-request.
    #[test]
    fn abort_restores_budget_and_reopens_fingerprint() {
        let t = table();
        let f = fp("host/ns/img@sha256:abc");
        t.heartbeat("A", 2, now());
        t.found("A", &f).unwrap();
        let (request_id, outcome) = t.request("A", &f, now()).unwrap();
        assert_eq!(outcome, AssignmentOutcome::ASSIGNED);

        t.abort("A", &request_id).unwrap();

        assert_eq!(t.controller_worker_count("A"), Some(2));
        assert!(!t.is_scanned(&f));
        // abort clears the holder's own advertised interest...
        assert!(!t.controller_has_requested("A", &f));
        // ...but leaves the fingerprint open in the global table so any
        // controller (including A, on retry) can request it again.
        assert!(t.is_requested(&f));
    }

    // A saturated admission limit refuses new scans but never mutates
    // state; a subsequent done() frees a slot for the retry.
    #[test]
    fn admission_cap_gates_new_assignments() {
        let t = table_with_limit(2);
        let f1 = fp("img1@sha256:aaa");
        let f2 = fp("img2@sha256:bbb");
        let f3 = fp("img3@sha256:ccc");

        t.heartbeat("A", 1, now());
        t.heartbeat("B", 1, now());
        t.heartbeat("C", 1, now());
        t.found("A", &f1).unwrap();
        t.found("B", &f2).unwrap();
        t.found("C", &f3).unwrap();

        let (_, r1) = t.request("A", &f1, now()).unwrap();
        let (_, r2) = t.request("B", &f2, now()).unwrap();
        assert_eq!(r1, AssignmentOutcome::ASSIGNED);
        assert_eq!(r2, AssignmentOutcome::ASSIGNED);
        assert_eq!(t.in_flight_scans(), 2);

        let (request_id_3, r3) = t.request("C", &f3, now()).unwrap();
        assert_eq!(r3, AssignmentOutcome::REQUESTED);
        // No assignment was made, so the wire contract gets an empty id.
        assert_eq!(request_id_3, RequestId::empty());
        // Saturation must not have mutated C's budget.
        assert_eq!(t.controller_worker_count("C"), Some(1));

        let (done_request_id, _) = t.found("A", &f1).unwrap();
        t.done("A", &done_request_id).unwrap();
        assert_eq!(t.in_flight_scans(), 1);

        let (request_id_3_retry, r3_retry) = t.request("C", &f3, now()).unwrap();
        assert_eq!(r3_retry, AssignmentOutcome::ASSIGNED);
        assert_eq!(request_id_3_retry, f3.request_id());
    }

    // requestId is a stable md5 hex of the pull-spec.
    #[test]
    fn request_id_is_md5_hex_of_spec() {
        let f = fp("host/ns/img@sha256:abc");
        let (request_id, _) = {
            let t = table();
            t.heartbeat("A", 1, now());
            t.found("A", &f).unwrap()
        };
        assert_eq!(request_id, f.request_id());

        let (request_id_again, _) = {
            let t = table();
            t.heartbeat("A", 1, now());
            t.found("A", &f).unwrap()
        };
        assert_eq!(request_id, request_id_again);
    }

    // Exactly-once completion, monotonic.
    #[test]
    fn done_flips_scanned_exactly_once() {
        let t = table();
        let f = fp("img@sha256:abc");
        t.heartbeat("A", 1, now());
        t.found("A", &f).unwrap();
        let (request_id, _) = t.request("A", &f, now()).unwrap();
        assert!(!t.is_scanned(&f));
        t.done("A", &request_id).unwrap();
        assert!(t.is_scanned(&f));
    }

    // Worker budget conservation holds across a full scan lifecycle.
    #[test]
    fn worker_budget_is_conserved_through_lifecycle() {
        let t = table();
        let f = fp("img@sha256:abc");
        t.heartbeat("A", 3, now());
        assert_eq!(t.controller_budget_is_conserved("A"), Some(true));

        t.found("A", &f).unwrap();
        let (request_id, _) = t.request("A", &f, now()).unwrap();
        assert_eq!(t.controller_budget_is_conserved("A"), Some(true));

        t.done("A", &request_id).unwrap();
        assert_eq!(t.controller_budget_is_conserved("A"), Some(true));
    }

    // Idempotent re-claim -- a second request() from the same holder
    // returns startScan=true again without a second transition.
    #[test]
    fn reclaim_is_idempotent() {
        let t = table();
        let f = fp("img@sha256:abc");
        t.heartbeat("A", 2, now());
        t.found("A", &f).unwrap();

        let (_, first) = t.request("A", &f, now()).unwrap();
        let (_, second) = t.request("A", &f, now()).unwrap();
        assert_eq!(first, AssignmentOutcome::ASSIGNED);
        assert_eq!(second, AssignmentOutcome::ASSIGNED);
        // Only one worker slot consumed, not two.
        assert_eq!(t.controller_worker_count("A"), Some(1));
    }

    // Skip broadcast -- once A completes, B's advertised interest in
    // the same fingerprint is withdrawn.
    #[test]
    fn done_broadcasts_skip_to_other_controllers() {
        let t = table();
        let f = fp("img@sha256:abc");
        t.heartbeat("A", 1, now());
        t.heartbeat("B", 1, now());
        t.found("A", &f).unwrap();
        t.found("B", &f).unwrap();
        assert!(t.controller_has_requested("B", &f));

        let (request_id, _) = t.request("A", &f, now()).unwrap();
        t.done("A", &request_id).unwrap();

        assert!(!t.controller_has_requested("B", &f));
    }

    // Every endpoint 404s against an unregistered controller id.
    #[test]
    fn unknown_controller_is_rejected_everywhere() {
        let t = table();
        let f = fp("img@sha256:abc");
        assert!(matches!(
            t.found("ghost", &f),
            Err(AssignError::UnknownController(_))
        ));
        assert!(matches!(
            t.request("ghost", &f, now()),
            Err(AssignError::UnknownController(_))
        ));
        let request_id = f.request_id();
        assert!(matches!(
            t.processing("ghost", &request_id, now()),
            Err(AssignError::NotHolder { .. })
        ));
        assert!(matches!(
            t.done("ghost", &request_id),
            Err(AssignError::NotHolder { .. })
        ));
        assert!(matches!(
            t.abort("ghost", &request_id),
            Err(AssignError::NotHolder { .. })
        ));
    }

    #[test]
    fn request_without_prior_found_is_told_to_stand_down() {
        let t = table();
        let f = fp("img@sha256:abc");
        t.heartbeat("A", 1, now());
        let (_, outcome) = t.request("A", &f, now()).unwrap();
        assert_eq!(outcome, AssignmentOutcome::SKIP);
    }

    #[test]
    fn processing_refreshes_updated_at_for_the_holder_only() {
        let t = table();
        let f = fp("img@sha256:abc");
        t.heartbeat("A", 1, now());
        t.heartbeat("B", 1, now());
        t.found("A", &f).unwrap();
        let (request_id, _) = t.request("A", &f, now()).unwrap();

        assert!(t.processing("A", &request_id, now()).is_ok());
        assert!(matches!(
            t.processing("B", &request_id, now()),
            Err(AssignError::NotHolder { .. })
        ));
    }

    #[test]
    fn reap_stale_controllers_releases_their_assignments() {
        let t = table();
        let f = fp("img@sha256:abc");
        let start = now();
        t.heartbeat("A", 1, start);
        t.found("A", &f).unwrap();
        t.request("A", &f, start).unwrap();
        assert_eq!(t.in_flight_scans(), 1);

        let later = start + chrono::Duration::seconds(301);
        let reaped = t.reap_stale_controllers(later);
        assert_eq!(reaped, vec!["A".to_string()]);
        assert_eq!(t.in_flight_scans(), 0);
        assert_eq!(t.controller_worker_count("A"), None);
    }

    #[test]
    fn reap_stale_assignments_acts_like_an_abort() {
        let t = table();
        let f = fp("img@sha256:abc");
        let start = now();
        t.heartbeat("A", 1, start);
        t.found("A", &f).unwrap();
        let (request_id, _) = t.request("A", &f, start).unwrap();

        let later = start + chrono::Duration::minutes(31);
        let reaped = t.reap_stale_assignments(later);
        assert_eq!(reaped, vec![request_id]);
        assert_eq!(t.controller_worker_count("A"), Some(1));
        assert!(!t.is_scanned(&f));
    }
}
