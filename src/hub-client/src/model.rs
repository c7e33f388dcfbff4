// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Wire types for the subset of the analysis service's REST API the
//! controller and arbiter need: projects, project versions, scan
//! summaries, code locations, risk profiles, and policy status.

use serde::{Deserialize, Serialize};

/// A HAL-style `rel`/`href` link, as returned in every resource's `_meta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub rel: String,
    pub href: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default)]
    pub href: String,
    #[serde(default)]
    pub links: Vec<Link>,
}

impl Meta {
    pub fn link(&self, rel: &str) -> Option<&str> {
        self.links
            .iter()
            .find(|l| l.rel == rel)
            .map(|l| l.href.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub name: String,
    #[serde(default, rename = "_meta")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectList {
    #[serde(rename = "totalCount")]
    pub total_count: i64,
    #[serde(default)]
    pub items: Vec<Project>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectVersion {
    #[serde(rename = "versionName")]
    pub version_name: String,
    pub phase: String,
    #[serde(default, rename = "_meta")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectVersionList {
    #[serde(rename = "totalCount")]
    pub total_count: i64,
    #[serde(default)]
    pub items: Vec<ProjectVersion>,
}

/// The terminal states a scan summary's `status` field can settle in.
/// Anything else is treated as still-in-progress by [`ScanSummary::is_terminal`].
pub const SCAN_STATUS_COMPLETE: &str = "COMPLETE";
pub const SCAN_STATUS_ERROR: &str = "ERROR";
pub const SCAN_STATUS_ERROR_BUILDING_BOM: &str = "ERROR_BUILDING_BOM";
pub const SCAN_STATUS_ERROR_MATCHING: &str = "ERROR_MATCHING";
pub const SCAN_STATUS_ERROR_SAVING_SCAN_DATA: &str = "ERROR_SAVING_SCAN_DATA";
pub const SCAN_STATUS_ERROR_SCANNING: &str = "ERROR_SCANNING";
pub const SCAN_STATUS_CANCELLED: &str = "CANCELLED";

/// Every terminal status other than `COMPLETE` itself -- each one a
/// distinct failure mode the matching engine can report, but all treated
/// identically by the controller: the scan is over and it did not
/// succeed.
const TERMINAL_ERROR_STATUSES: &[&str] = &[
    SCAN_STATUS_ERROR,
    SCAN_STATUS_ERROR_BUILDING_BOM,
    SCAN_STATUS_ERROR_MATCHING,
    SCAN_STATUS_ERROR_SAVING_SCAN_DATA,
    SCAN_STATUS_ERROR_SCANNING,
    SCAN_STATUS_CANCELLED,
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub status: String,
    #[serde(default, rename = "_meta")]
    pub meta: Meta,
}

impl ScanSummary {
    pub fn is_terminal(&self) -> bool {
        self.status == SCAN_STATUS_COMPLETE || self.is_error()
    }

    pub fn is_error(&self) -> bool {
        TERMINAL_ERROR_STATUSES.contains(&self.status.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLocation {
    #[serde(rename = "mappedProjectVersion")]
    pub mapped_project_version: String,
    #[serde(default, rename = "_meta")]
    pub meta: Meta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeLocationList {
    #[serde(rename = "totalCount")]
    pub total_count: i64,
    #[serde(default)]
    pub items: Vec<CodeLocation>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCategory {
    #[serde(default)]
    pub high: i64,
    #[serde(default)]
    pub medium: i64,
    #[serde(default)]
    pub low: i64,
    #[serde(default)]
    pub ok: i64,
    #[serde(default)]
    pub unknown: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCategories {
    #[serde(default, rename = "VULNERABILITY")]
    pub vulnerability: RiskCategory,
    #[serde(default, rename = "VERSION")]
    pub version: RiskCategory,
    #[serde(default, rename = "ACTIVITY")]
    pub activity: RiskCategory,
    #[serde(default, rename = "LICENSE")]
    pub license: RiskCategory,
    #[serde(default, rename = "OPERATIONAL")]
    pub operational: RiskCategory,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskProfile {
    #[serde(default)]
    pub categories: RiskCategories,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatusCount {
    pub name: String,
    pub value: i64,
}

pub const POLICY_IN_VIOLATION: &str = "IN_VIOLATION";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyStatus {
    #[serde(default, rename = "componentVersionStatusCounts")]
    pub component_version_status_counts: Vec<PolicyStatusCount>,
}

impl PolicyStatus {
    /// The count of components currently in violation of policy.
    pub fn violation_count(&self) -> i64 {
        self.component_version_status_counts
            .iter()
            .find(|c| c.name == POLICY_IN_VIOLATION)
            .map(|c| c.value)
            .unwrap_or(0)
    }
}

/// The walked result of [`crate::client::HubClient::resolve_scan_results`]:
/// what a controller needs to annotate the source image with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResults {
    pub project_version_url: String,
    pub vulnerabilities: i64,
    pub violations: i64,
}
