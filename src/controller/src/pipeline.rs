// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The per-image pre-filter and worker-loop body.
//!
//! Grounded on `worker.go`'s `Worker.Start` (pull a job, run it, report
//! done) and `scanimage.go`'s `scan()` (build the scanner argv, launch
//! it, mark scanned), generalized to first negotiate the scan with the
//! arbiter before launching anything.

use std::collections::HashSet;
use std::sync::Arc;

use ose_common::annotate::is_scan_needed;
use ose_common::{Annotator, Fingerprint, ImageInfo};
use ose_hub_client::HubClient;
use ose_orchestrator::ClusterClient;
use ose_runtime::{ContainerRuntime, ScanContainerSpec};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::arbiter_client::ArbiterClient;
use crate::config::{ControllerConfig, PROCESSING_KEEPALIVE_INTERVAL, RETRY_INTERVAL};

/// An image observed on a cluster object (an image-stream entry or a
/// pod container resolved against the local runtime), not yet known to
/// have been claimed for scanning in this process.
#[derive(Debug, Clone)]
pub struct DiscoveredImage {
    pub namespace: String,
    pub name: String,
    pub engine_id: String,
    pub tagged_name: String,
    pub content_digest: String,
    pub info: ImageInfo,
}

/// One unit of work for the worker pool: a fingerprint the pre-filter
/// decided needs scanning, plus the cluster object to patch once it's
/// done.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub fingerprint: Fingerprint,
    pub namespace: String,
    pub name: String,
    pub engine_id: String,
    pub tagged_name: String,
    pub content_digest: String,
}

/// The node agent: the local runtime, the cluster client, the arbiter
/// and analysis-service collaborators, and the set of fingerprints
/// already claimed this process's lifetime (the controller's "images
/// map", single writer-lock as specified).
pub struct Agent<C, R> {
    pub config: ControllerConfig,
    pub cluster: Arc<C>,
    pub runtime: Arc<R>,
    pub arbiter: Arc<ArbiterClient>,
    pub hub: Arc<HubClient>,
    pub annotator: Annotator,
    seen: Mutex<HashSet<Fingerprint>>,
}

impl<C, R> Agent<C, R>
where
    C: ClusterClient + 'static,
    R: ContainerRuntime + 'static,
{
    pub fn new(
        config: ControllerConfig,
        cluster: Arc<C>,
        runtime: Arc<R>,
        arbiter: Arc<ArbiterClient>,
        hub: Arc<HubClient>,
        annotator: Annotator,
    ) -> Self {
        Agent {
            config,
            cluster,
            runtime,
            arbiter,
            hub,
            annotator,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Claims a fingerprint for this process. Returns `true` the first
    /// time a given fingerprint is seen; subsequent discoveries of the
    /// same fingerprint (a second pod referencing the same image, a
    /// re-list after a debounce window) are no-ops.
    pub async fn claim(&self, fingerprint: &Fingerprint) -> bool {
        self.seen.lock().await.insert(fingerprint.clone())
    }

    /// The pre-filter (per-image pipeline step 1): `false` when the
    /// object already carries our current scanner version and analysis-
    /// service identity, and its recorded project-version URL still
    /// resolves.
    pub async fn needs_scan(&self, info: &ImageInfo) -> bool {
        let still_valid = match self.annotator.recorded_project_version_url(info) {
            Some(url) => self.hub.get_project_version(url).await.is_ok(),
            None => false,
        };
        is_scan_needed(&self.annotator, info, still_valid)
    }

    /// The worker loop body: steps a-f of the per-image pipeline.
    pub async fn handle_job(&self, job: ScanJob) {
        if !self.image_still_present(&job.engine_id).await {
            debug!(engine_id = %job.engine_id, "image no longer present locally, skipping");
            return;
        }

        if !self.heartbeat_until_success().await {
            return;
        }

        let found = match self
            .arbiter
            .image_found(&self.config.controller_id, &job.fingerprint)
            .await
        {
            Ok(decision) => decision,
            Err(error) => {
                warn!(fingerprint = %job.fingerprint, %error, "image/found failed, abandoning job");
                return;
            }
        };
        if found.skip_scan {
            debug!(fingerprint = %job.fingerprint, "arbiter says skip on found");
            return;
        }

        let decision = match self.request_until_decided(&job.fingerprint).await {
            Some(decision) => decision,
            None => return,
        };

        let keepalive = ose_ore::task::spawn(
            || format!("processing-keepalive-{}", decision.request_id),
            processing_keepalive_loop(self.arbiter.clone(), self.config.controller_id.clone(), decision.request_id.clone()),
        );
        let scan_result = tokio::time::timeout(self.config.scan_deadline(), self.run_scanner(&job)).await;
        keepalive.abort();

        let outcome = match scan_result {
            Ok(result) => result,
            Err(_) => {
                warn!(fingerprint = %job.fingerprint, "scan exceeded its deadline, aborting");
                if let Err(error) = self.arbiter.abort(&self.config.controller_id, &decision.request_id).await {
                    warn!(fingerprint = %job.fingerprint, %error, "abort notification failed");
                }
                return;
            }
        };

        match outcome {
            Ok(scan_id) => {
                if let Err(error) = self.arbiter.done(&self.config.controller_id, &decision.request_id).await {
                    warn!(fingerprint = %job.fingerprint, %error, "done notification failed");
                }
                self.patch_success(&job, &scan_id).await;
            }
            Err(error) => {
                warn!(fingerprint = %job.fingerprint, %error, "scan failed, aborting");
                if let Err(error) = self.arbiter.abort(&self.config.controller_id, &decision.request_id).await {
                    warn!(fingerprint = %job.fingerprint, %error, "abort notification failed");
                }
            }
        }
    }

    async fn image_still_present(&self, engine_id: &str) -> bool {
        match self.runtime.list_images().await {
            Ok(images) => images.iter().any(|i| i.engine_id == engine_id),
            Err(error) => {
                warn!(%error, "failed to list local images for presence re-check");
                false
            }
        }
    }

    /// Step b: POST `/heartbeat`, retrying every [`RETRY_INTERVAL`] until
    /// it succeeds. Returns `false` only if the worker should give up
    /// entirely (never, currently -- kept as a return value so a future
    /// shutdown signal can short-circuit the loop).
    async fn heartbeat_until_success(&self) -> bool {
        loop {
            match self
                .arbiter
                .heartbeat(&self.config.controller_id, self.config.worker_count as i64)
                .await
            {
                Ok(()) => return true,
                Err(error) => {
                    warn!(%error, "heartbeat failed, retrying");
                    tokio::time::sleep(RETRY_INTERVAL).await;
                }
            }
        }
    }

    /// Step d: POST `/image/request` until the arbiter either denies or
    /// authorizes the scan.
    async fn request_until_decided(&self, fingerprint: &Fingerprint) -> Option<crate::arbiter_client::AssignmentDecision> {
        loop {
            match self.arbiter.image_request(&self.config.controller_id, fingerprint).await {
                Ok(decision) if decision.skip_scan => {
                    debug!(%fingerprint, "arbiter says skip on request");
                    return None;
                }
                Ok(decision) if decision.start_scan => return Some(decision),
                Ok(_) => {
                    debug!(%fingerprint, "arbiter saturated, retrying");
                    tokio::time::sleep(RETRY_INTERVAL).await;
                }
                Err(error) => {
                    warn!(%fingerprint, %error, "image/request failed, retrying");
                    tokio::time::sleep(RETRY_INTERVAL).await;
                }
            }
        }
    }

    /// Step e: launches the scanner container and returns the scan id
    /// it reports.
    async fn run_scanner(&self, job: &ScanJob) -> ose_runtime::Result<String> {
        let spec = ScanContainerSpec {
            scanner_image: self.config.scanner_image.clone(),
            hub_host: self.config.hub.host.clone(),
            hub_port: self.config.hub.port.clone(),
            hub_scheme: self.config.hub.scheme.clone(),
            hub_user: self.config.hub.user.clone(),
            hub_password: self.config.hub.password.clone(),
            engine_id: job.engine_id.clone(),
            tagged_name: job.tagged_name.clone(),
            content_digest: job.content_digest.clone(),
        };
        let outcome = self.runtime.run_scanner(&spec).await?;
        Ok(outcome.scan_id)
    }

    /// Step f (success path): resolves risk/policy data for the scan and
    /// patches it onto the cluster object the job came from.
    async fn patch_success(&self, job: &ScanJob, scan_id: &str) {
        let result = match self.hub.resolve_scan_results(scan_id).await {
            Ok(result) => result,
            Err(error) => {
                warn!(%scan_id, %error, "could not resolve scan results, skipping annotation");
                return;
            }
        };

        let images = match self.cluster.list_images().await {
            Ok(images) => images,
            Err(error) => {
                warn!(%error, "failed to list cluster images for post-scan annotation");
                return;
            }
        };
        let Some(image) = images
            .into_iter()
            .find(|i| i.namespace == job.namespace && i.name == job.name)
        else {
            return;
        };

        let info = self.annotator.update_annotations(
            image.info,
            result.violations,
            result.vulnerabilities,
            &result.project_version_url,
            scan_id,
            &chrono::Utc::now().to_rfc3339(),
        );
        if let Err(error) = self
            .cluster
            .patch_image_annotations(&job.namespace, &job.name, info)
            .await
        {
            warn!(namespace = %job.namespace, name = %job.name, %error, "failed to patch cluster image after scan");
        } else {
            info!(fingerprint = %job.fingerprint, scan_id, "scan complete and annotated");
        }
    }
}

/// Runs for as long as the scanner container does, posting
/// `/processing` every [`PROCESSING_KEEPALIVE_INTERVAL`] so the arbiter's
/// stale-assignment reaper never reclaims a legitimately long-running
/// scan out from under its holder. Cancelled by the caller once the
/// scan returns.
async fn processing_keepalive_loop(arbiter: Arc<ArbiterClient>, controller_id: String, request_id: ose_common::RequestId) {
    loop {
        tokio::time::sleep(PROCESSING_KEEPALIVE_INTERVAL).await;
        if let Err(error) = arbiter.processing(&controller_id, &request_id).await {
            warn!(%request_id, %error, "processing keepalive failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ose_common::annotate::{ANNOTATION_HUB_SERVER, ANNOTATION_SCANNER_VERSION};
    use ose_hub_client::HubConfig;
    use ose_orchestrator::FakeClusterClient;
    use ose_runtime::MockRuntime;

    fn agent() -> Agent<FakeClusterClient, MockRuntime> {
        let config = ControllerConfig::new(
            "node-1",
            "http://arbiter:9035",
            HubConfig::new("hub", "443", "https", "user", "pass", false),
            "scanner:latest",
            2,
        );
        Agent::new(
            config,
            Arc::new(FakeClusterClient::new(Vec::new(), Vec::new())),
            Arc::new(MockRuntime::new(Vec::new())),
            Arc::new(ArbiterClient::new("http://arbiter:9035").unwrap()),
            Arc::new(HubClient::new(HubConfig::new("hub", "443", "https", "user", "pass", false)).unwrap()),
            Annotator::new("v1", "hub.example.com"),
        )
    }

    #[tokio::test]
    async fn claim_is_true_only_on_first_sighting() {
        let agent = agent();
        let fp = Fingerprint::new("img@sha256:abc");
        assert!(agent.claim(&fp).await);
        assert!(!agent.claim(&fp).await);
    }

    #[tokio::test]
    async fn needs_scan_is_true_when_no_project_version_is_recorded() {
        let agent = agent();
        assert!(agent.needs_scan(&ImageInfo::default()).await);
    }

    #[tokio::test]
    async fn needs_scan_is_true_when_markers_present_but_no_url_was_ever_recorded() {
        let agent = agent();
        let mut info = ImageInfo::default();
        info.annotations
            .insert(ANNOTATION_SCANNER_VERSION.to_string(), "v1".to_string());
        info.annotations
            .insert(ANNOTATION_HUB_SERVER.to_string(), "hub.example.com".to_string());
        // Markers match but no project-version URL was ever recorded, so
        // there is nothing to validate -- a scan is still needed.
        assert!(agent.needs_scan(&info).await);
    }

    #[tokio::test]
    async fn image_still_present_checks_the_local_runtime() {
        let agent = agent();
        assert!(!agent.image_still_present("missing").await);
    }
}
