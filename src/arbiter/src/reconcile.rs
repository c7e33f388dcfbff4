// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The periodic reconciliation loop: every 30 minutes, sweep every
//! known image and the pods that reference it, resolve fresh
//! risk/policy data from the analysis service, and patch the results
//! back onto the cluster objects.
//!
//! Grounded on the controller's own annotation step and `Annotator`
//! (`common/annotate.go`'s merge logic), reused here instead of
//! reimplemented, since both sides write the identical label/
//! annotation schema.

use std::sync::Arc;

use ose_assign::AssignmentTable;
use ose_common::annotate::ANNOTATION_SCAN_ID;
use ose_common::{Annotator, ScanImage};
use ose_dispatcher::Dispatcher;
use ose_hub_client::{HubClient, HubError};
use ose_orchestrator::ClusterClient;
use tracing::{debug, info, warn};

use crate::index::ClusterImageIndex;

/// One sweep's unit of work: a tagged variant, one dispatch arm per
/// variant, applied to the arbiter's own two reconciliation targets --
/// the image object itself, and a pod that references it.
pub enum Job {
    Image(ScanImage),
    Pod {
        fingerprint: ose_common::Fingerprint,
        namespace: String,
        pod_name: String,
    },
}

pub struct Reconciler<C: ClusterClient> {
    pub hub: Arc<HubClient>,
    pub cluster: Arc<C>,
    pub index: Arc<ClusterImageIndex>,
    pub table: Arc<AssignmentTable>,
    pub annotator: Annotator,
}

struct ReconciledResult {
    project_version_url: String,
    vulnerabilities: i64,
    violations: i64,
}

impl<C: ClusterClient + 'static> Reconciler<C> {
    /// Sweeps every image the assignment table has ever observed, plus
    /// every pod `imageUsage` says references one, via a bounded
    /// dispatcher of `workers` (5, by default).
    pub async fn sweep_once(self: Arc<Self>, workers: usize) {
        let images = self.table.known_images();
        debug!(count = images.len(), "starting reconciliation sweep");

        let mut jobs: Vec<Job> = Vec::new();
        for image in &images {
            let Some(cluster_image) = self.index.get(&image.fingerprint) else {
                continue;
            };
            for (namespace, pod_name) in self.table.image_usage(&cluster_image.engine_id) {
                jobs.push(Job::Pod {
                    fingerprint: image.fingerprint.clone(),
                    namespace,
                    pod_name,
                });
            }
            jobs.push(Job::Image(image.clone()));
        }

        let reconciler = self.clone();
        let dispatcher = Dispatcher::spawn(workers, jobs.len().max(1), move |job: Job| {
            let reconciler = reconciler.clone();
            async move { reconciler.handle(job).await }
        });

        for job in jobs {
            if let Err(error) = dispatcher.submit(job).await {
                warn!(%error, "reconciliation queue closed mid-sweep");
                break;
            }
        }

        dispatcher.shutdown(std::time::Duration::from_secs(60)).await;
    }

    async fn handle(&self, job: Job) {
        match job {
            Job::Image(image) => self.reconcile_image(image).await,
            Job::Pod {
                fingerprint,
                namespace,
                pod_name,
            } => self.reconcile_pod(&fingerprint, &namespace, &pod_name).await,
        }
    }

    async fn reconcile_image(&self, image: ScanImage) {
        let Some(cluster_image) = self.index.get(&image.fingerprint) else {
            debug!(fingerprint = %image.fingerprint, "no cluster object known for this fingerprint yet");
            return;
        };

        let result = match self.resolve(&image).await {
            Ok(result) => result,
            Err(error) => {
                warn!(fingerprint = %image.fingerprint, %error, "reconciliation lookup failed, retrying next sweep");
                return;
            }
        };

        let existing_scan_id = cluster_image
            .info
            .annotations
            .get(ANNOTATION_SCAN_ID)
            .cloned()
            .unwrap_or_default();
        let info = self.annotator.update_annotations(
            cluster_image.info.clone(),
            result.violations,
            result.vulnerabilities,
            &result.project_version_url,
            &existing_scan_id,
            &chrono::Utc::now().to_rfc3339(),
        );

        if let Err(error) = self
            .cluster
            .patch_image_annotations(&cluster_image.namespace, &cluster_image.name, info)
            .await
        {
            warn!(namespace = %cluster_image.namespace, name = %cluster_image.name, %error, "failed to patch cluster image");
        }
    }

    async fn reconcile_pod(&self, fingerprint: &ose_common::Fingerprint, namespace: &str, pod_name: &str) {
        let Some(image) = self
            .table
            .known_images()
            .into_iter()
            .find(|i| &i.fingerprint == fingerprint)
        else {
            return;
        };
        let result = match self.resolve(&image).await {
            Ok(result) => result,
            Err(error) => {
                warn!(%fingerprint, namespace, pod_name, %error, "reconciliation lookup failed, retrying next sweep");
                return;
            }
        };

        let pods = match self.cluster.list_pods().await {
            Ok(pods) => pods,
            Err(error) => {
                warn!(namespace, pod_name, %error, "failed to list pods for reconciliation patch");
                return;
            }
        };
        let Some(pod) = pods
            .into_iter()
            .find(|p| p.namespace == namespace && p.name == pod_name)
        else {
            return;
        };

        let existing_scan_id = pod
            .info
            .annotations
            .get(ANNOTATION_SCAN_ID)
            .cloned()
            .unwrap_or_default();
        let info = self.annotator.update_annotations(
            pod.info,
            result.violations,
            result.vulnerabilities,
            &result.project_version_url,
            &existing_scan_id,
            &chrono::Utc::now().to_rfc3339(),
        );
        if let Err(error) = self.cluster.patch_pod_annotations(namespace, pod_name, info).await {
            warn!(namespace, pod_name, %error, "failed to patch cluster pod");
        }
    }

    /// `findProjects(name) -> findProjectVersions(projectId, shortDigest)
    /// -> getProjectVersion -> riskProfile/policyStatus`, the lookup the
    /// periodic sweep needs -- distinct from `resolve_scan_results`,
    /// which walks from a `scanId` the arbiter never learns over the
    /// wire.
    async fn resolve(&self, image: &ScanImage) -> ose_hub_client::Result<ReconciledResult> {
        let project_name = project_name_of(&image.tagged_name);
        let short_digest = image.fingerprint.short_digest().unwrap_or_default();

        let projects = self.hub.find_projects(project_name).await?;
        let project = projects.items.first().ok_or_else(|| HubError::MissingLink {
            resource: format!("project {project_name}"),
            rel: "self".to_string(),
        })?;
        let project_id = project_id_of(&project.meta.href).ok_or_else(|| HubError::MissingLink {
            resource: project.name.clone(),
            rel: "self".to_string(),
        })?;

        let versions = self.hub.find_project_versions(project_id, short_digest).await?;
        let version = versions.items.first().ok_or_else(|| HubError::MissingLink {
            resource: format!("project {project_name} version {short_digest}"),
            rel: "self".to_string(),
        })?;
        let project_version = self.hub.get_project_version(&version.meta.href).await?;

        let mut vulnerabilities = 0;
        let mut violations = 0;
        if let Some(risk_url) = project_version.meta.link("riskProfile") {
            let profile = self.hub.get_risk_profile(risk_url).await?;
            vulnerabilities = profile.categories.vulnerability.high;
        }
        if let Some(policy_url) = project_version.meta.link("policy-status") {
            let status = self.hub.get_policy_status(policy_url).await?;
            violations = status.violation_count();
        }

        info!(fingerprint = %image.fingerprint, vulnerabilities, violations, "reconciled image");
        Ok(ReconciledResult {
            project_version_url: project_version.meta.href.clone(),
            vulnerabilities,
            violations,
        })
    }
}

/// The convention assumed for project names: the image name without
/// registry/namespace prefix or tag, e.g. `registry/ns/myapp:v1` ->
/// `myapp`.
fn project_name_of(tagged_name: &str) -> &str {
    let without_tag = tagged_name.rsplit_once(':').map_or(tagged_name, |(base, _)| base);
    without_tag.rsplit('/').next().unwrap_or(without_tag)
}

fn project_id_of(href: &str) -> Option<&str> {
    href.trim_end_matches('/').rsplit('/').next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_name_strips_registry_namespace_and_tag() {
        assert_eq!(project_name_of("registry.example.com/ns/myapp:v1"), "myapp");
        assert_eq!(project_name_of("myapp:latest"), "myapp");
    }

    #[test]
    fn project_id_is_the_final_path_segment() {
        assert_eq!(
            project_id_of("https://hub.example.com/api/projects/abc-123"),
            Some("abc-123")
        );
        assert_eq!(
            project_id_of("https://hub.example.com/api/projects/abc-123/"),
            Some("abc-123")
        );
    }
}
