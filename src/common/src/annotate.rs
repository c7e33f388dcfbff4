// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The cluster-object label/annotation schema and the merge logic that
//! applies scan results to it.
//!
//! Ported from `common/annotate.go`'s `Annotator`: the original keeps a
//! small set of well-known label/annotation keys and merges new results
//! into whatever a cluster image or pod already carries, never clobbering
//! unrelated keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const LABEL_POLICY_VIOLATIONS: &str = "com.blackducksoftware.image.policy-violations";
pub const LABEL_HAS_POLICY_VIOLATIONS: &str = "com.blackducksoftware.image.has-policy-violations";
pub const LABEL_VULNERABILITIES: &str = "com.blackducksoftware.image.vulnerabilities";
pub const LABEL_HAS_VULNERABILITIES: &str = "com.blackducksoftware.image.has-vulnerabilities";

pub const ANNOTATION_SCANNER_VERSION: &str = "blackducksoftware.com/hub-scanner-version";
pub const ANNOTATION_HUB_SERVER: &str = "blackducksoftware.com/attestation-hub-server";
pub const ANNOTATION_PROJECT_ENDPOINT: &str = "blackducksoftware.com/project-endpoint";
pub const ANNOTATION_SCAN_ID: &str = "blackducksoftware.com/scan-id";
pub const ANNOTATION_VULNERABILITY_QUALITY: &str =
    "quality.images.openshift.io/vulnerability.blackduck";
pub const ANNOTATION_POLICY_QUALITY: &str = "quality.images.openshift.io/policy.blackduck";

/// The label/annotation set carried by a cluster image or pod object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

/// A single entry in the `quality.images.openshift.io/*` JSON documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub label: String,
    pub score: i64,
    #[serde(rename = "severityIndex")]
    pub severity_index: i64,
}

/// The `quality.images.openshift.io/{vulnerability,policy}.blackduck`
/// document schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityDocument {
    pub name: String,
    pub description: String,
    pub timestamp: String,
    pub reference: String,
    pub compliant: bool,
    pub summary: Vec<QualitySummary>,
}

/// Applies and merges scan results onto a cluster object's label/annotation
/// set, without disturbing unrelated keys.
#[derive(Debug, Clone)]
pub struct Annotator {
    pub scanner_version: String,
    pub hub_server: String,
}

impl Annotator {
    pub fn new(scanner_version: impl Into<String>, hub_server: impl Into<String>) -> Self {
        Annotator {
            scanner_version: scanner_version.into(),
            hub_server: hub_server.into(),
        }
    }

    /// Merges scan-result labels/annotations into `info`, returning the
    /// updated copy. Existing keys not touched by this update are
    /// preserved.
    #[allow(clippy::too_many_arguments)]
    pub fn update_annotations(
        &self,
        mut info: ImageInfo,
        violations: i64,
        vulnerabilities: i64,
        project_version_url: &str,
        scan_id: &str,
        timestamp: &str,
    ) -> ImageInfo {
        let (policy_label, has_policy) = count_label(violations);
        let (vuln_label, has_vuln) = count_label(vulnerabilities);

        info.labels
            .insert(LABEL_POLICY_VIOLATIONS.to_string(), policy_label);
        info.labels
            .insert(LABEL_HAS_POLICY_VIOLATIONS.to_string(), has_policy.to_string());
        info.labels
            .insert(LABEL_VULNERABILITIES.to_string(), vuln_label);
        info.labels
            .insert(LABEL_HAS_VULNERABILITIES.to_string(), has_vuln.to_string());

        info.annotations.insert(
            ANNOTATION_SCANNER_VERSION.to_string(),
            self.scanner_version.clone(),
        );
        info.annotations
            .insert(ANNOTATION_HUB_SERVER.to_string(), self.hub_server.clone());
        info.annotations.insert(
            ANNOTATION_PROJECT_ENDPOINT.to_string(),
            project_version_url.to_string(),
        );
        info.annotations
            .insert(ANNOTATION_SCAN_ID.to_string(), scan_id.to_string());

        let vuln_doc = QualityDocument {
            name: project_version_url.to_string(),
            description: "Black Duck vulnerability scan".to_string(),
            timestamp: timestamp.to_string(),
            reference: scan_id.to_string(),
            compliant: vulnerabilities == 0,
            summary: vec![QualitySummary {
                label: "high".to_string(),
                score: vulnerabilities,
                severity_index: vulnerabilities,
            }],
        };
        let policy_doc = QualityDocument {
            summary: vec![QualitySummary {
                label: "important".to_string(),
                score: violations,
                severity_index: violations,
            }],
            ..vuln_doc.clone()
        };

        if let Ok(json) = serde_json::to_string(&vuln_doc) {
            info.annotations
                .insert(ANNOTATION_VULNERABILITY_QUALITY.to_string(), json);
        }
        if let Ok(json) = serde_json::to_string(&policy_doc) {
            info.annotations
                .insert(ANNOTATION_POLICY_QUALITY.to_string(), json);
        }

        info
    }

    /// Whether this `ImageInfo` already carries our current scanner
    /// version and hub server identity -- the static half of the
    /// controller's pre-filter. The project-version
    /// URL validity probe is a network call and lives with the caller
    /// (the controller's pipeline), not here.
    pub fn has_current_scan_markers(&self, info: &ImageInfo) -> bool {
        let version_ok = info
            .annotations
            .get(ANNOTATION_SCANNER_VERSION)
            .map(|v| v == &self.scanner_version)
            .unwrap_or(false);
        let hub_ok = info
            .annotations
            .get(ANNOTATION_HUB_SERVER)
            .map(|v| v == &self.hub_server)
            .unwrap_or(false);
        version_ok && hub_ok
    }

    /// Returns the project-version URL recorded on a previous scan, if
    /// any -- the controller probes this URL for validity before deciding
    /// whether a rescan is needed.
    pub fn recorded_project_version_url<'a>(&self, info: &'a ImageInfo) -> Option<&'a str> {
        info.annotations
            .get(ANNOTATION_PROJECT_ENDPOINT)
            .map(String::as_str)
    }
}

/// Whether a node agent should re-scan an image: the static annotation
/// check plus the caller's own answer to "is the recorded project-version
/// URL still valid", since that half requires a network probe the
/// annotator itself has no business making.
pub fn is_scan_needed(annotator: &Annotator, info: &ImageInfo, project_version_still_valid: bool) -> bool {
    !(annotator.has_current_scan_markers(info) && project_version_still_valid)
}

fn count_label(n: i64) -> (String, bool) {
    if n == 0 {
        ("None".to_string(), false)
    } else {
        (n.to_string(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_counts_render_as_none_with_false_flags() {
        let a = Annotator::new("v1", "hub.example.com");
        let info = a.update_annotations(ImageInfo::default(), 0, 0, "url", "scan-1", "t");
        assert_eq!(info.labels[LABEL_POLICY_VIOLATIONS], "None");
        assert_eq!(info.labels[LABEL_HAS_POLICY_VIOLATIONS], "false");
        assert_eq!(info.labels[LABEL_VULNERABILITIES], "None");
        assert_eq!(info.labels[LABEL_HAS_VULNERABILITIES], "false");
    }

    #[test]
    fn nonzero_counts_set_flags_true() {
        let a = Annotator::new("v1", "hub.example.com");
        let info = a.update_annotations(ImageInfo::default(), 3, 5, "url", "scan-1", "t");
        assert_eq!(info.labels[LABEL_POLICY_VIOLATIONS], "3");
        assert_eq!(info.labels[LABEL_HAS_POLICY_VIOLATIONS], "true");
        assert_eq!(info.labels[LABEL_VULNERABILITIES], "5");
        assert_eq!(info.labels[LABEL_HAS_VULNERABILITIES], "true");
    }

    #[test]
    fn update_preserves_unrelated_keys() {
        let a = Annotator::new("v1", "hub.example.com");
        let mut info = ImageInfo::default();
        info.labels.insert("team".to_string(), "payments".to_string());
        let info = a.update_annotations(info, 0, 0, "url", "scan-1", "t");
        assert_eq!(info.labels["team"], "payments");
    }

    #[test]
    fn has_current_scan_markers_requires_both_version_and_hub() {
        let a = Annotator::new("v1", "hub.example.com");
        let mut info = ImageInfo::default();
        info.annotations
            .insert(ANNOTATION_SCANNER_VERSION.to_string(), "v1".to_string());
        assert!(!a.has_current_scan_markers(&info));
        info.annotations
            .insert(ANNOTATION_HUB_SERVER.to_string(), "hub.example.com".to_string());
        assert!(a.has_current_scan_markers(&info));
    }

    #[test]
    fn scan_not_needed_only_when_markers_and_url_both_hold() {
        let a = Annotator::new("v1", "hub.example.com");
        let mut info = ImageInfo::default();
        info.annotations
            .insert(ANNOTATION_SCANNER_VERSION.to_string(), "v1".to_string());
        info.annotations
            .insert(ANNOTATION_HUB_SERVER.to_string(), "hub.example.com".to_string());

        assert!(is_scan_needed(&a, &info, false));
        assert!(!is_scan_needed(&a, &info, true));
    }
}
