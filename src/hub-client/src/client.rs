// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A thin REST client for the analysis service.
//!
//! Grounded on `hubserver.go`: a form-login that seeds a session cookie,
//! a handful of typed `GET`s, and an explicit logout. We replace the
//! original's hand-rolled `myjar` cookie jar with `reqwest`'s built-in
//! one and its silent `log.Printf`-on-every-branch error handling with
//! a typed [`HubError`].

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::HubConfig;
use crate::error::{HubError, Result};
use crate::model::{
    CodeLocation, CodeLocationList, PolicyStatus, Project, ProjectList, ProjectVersion,
    ProjectVersionList, RiskProfile, ScanResults, ScanSummary,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const SCAN_POLL_INTERVAL: Duration = Duration::from_secs(60);

pub struct HubClient {
    http: Client,
    config: HubConfig,
}

impl HubClient {
    pub fn new(config: HubConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .cookie_store(true)
            .danger_accept_invalid_certs(config.insecure_https)
            .build()
            .map_err(|source| HubError::Transport {
                url: config.url.clone(),
                source,
            })?;
        Ok(HubClient { http, config })
    }

    /// Logs in via the form-based security check endpoint. The session
    /// cookie is retained by the client's cookie jar for every
    /// subsequent call; an explicit [`HubClient::logout`] is required.
    pub async fn login(&self) -> Result<()> {
        let url = format!("{}/j_spring_security_check", self.config.url);
        debug!(%url, "logging into analysis service");

        let resp = self
            .http
            .post(&url)
            .form(&[
                ("j_username", self.config.user.as_str()),
                ("j_password", self.config.password.as_str()),
            ])
            .send()
            .await
            .map_err(|source| HubError::Transport { url: url.clone(), source })?;

        if resp.status() != StatusCode::NO_CONTENT {
            warn!(status = %resp.status(), "analysis service login rejected");
            return Err(HubError::LoginFailed {
                user: self.config.user.clone(),
            });
        }
        info!("logged into analysis service");
        Ok(())
    }

    pub async fn logout(&self) -> Result<()> {
        let url = format!("{}/j_spring_security_logout", self.config.url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| HubError::Transport { url: url.clone(), source })?;
        if resp.status() != StatusCode::NO_CONTENT {
            return Err(HubError::UnexpectedStatus {
                url,
                status: resp.status(),
            });
        }
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(%url, "GET");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| HubError::Transport {
                url: url.to_string(),
                source,
            })?;
        if resp.status() != StatusCode::OK {
            return Err(HubError::UnexpectedStatus {
                url: url.to_string(),
                status: resp.status(),
            });
        }
        resp.json().await.map_err(|source| HubError::Decode {
            url: url.to_string(),
            source,
        })
    }

    pub async fn find_projects(&self, name: &str) -> Result<ProjectList> {
        let url = format!(
            "{}/api/projects/?q={}&limit=5000",
            self.config.url,
            urlencode(&format!("name:{name}"))
        );
        self.get_json(&url).await
    }

    pub async fn get_project(&self, url: &str) -> Result<Project> {
        self.get_json(url).await
    }

    pub async fn find_project_versions(
        &self,
        project_id: &str,
        version_name: &str,
    ) -> Result<ProjectVersionList> {
        let url = format!(
            "{}/api/projects/{}/versions?q={}&limit=5000",
            self.config.url,
            project_id,
            urlencode(&format!("versionName:{version_name}"))
        );
        self.get_json(&url).await
    }

    pub async fn get_project_version(&self, url: &str) -> Result<ProjectVersion> {
        self.get_json(url).await
    }

    pub async fn find_code_locations(&self, search: &str) -> Result<CodeLocationList> {
        let url = format!(
            "{}/api/codelocations/?q={}&limit=5000",
            self.config.url,
            urlencode(search)
        );
        self.get_json(&url).await
    }

    pub async fn get_code_location(&self, url: &str) -> Result<CodeLocation> {
        self.get_json(url).await
    }

    pub async fn get_scan_summary(&self, scan_id: &str) -> Result<ScanSummary> {
        let url = format!("{}/api/scan-summaries/{}", self.config.url, scan_id);
        self.get_json(&url).await
    }

    pub async fn get_risk_profile(&self, url: &str) -> Result<RiskProfile> {
        self.get_json(url).await
    }

    pub async fn get_policy_status(&self, url: &str) -> Result<PolicyStatus> {
        self.get_json(url).await
    }

    /// Polls a scan summary every [`SCAN_POLL_INTERVAL`] until it leaves
    /// the in-progress state, then returns it.
    pub async fn wait_for_scan_summary(&self, scan_id: &str) -> Result<ScanSummary> {
        loop {
            let summary = self.get_scan_summary(scan_id).await?;
            if summary.is_terminal() {
                return Ok(summary);
            }
            debug!(scan_id, status = %summary.status, "scan still in progress");
            tokio::time::sleep(SCAN_POLL_INTERVAL).await;
        }
    }

    /// Walks scan summary -> code location -> project version ->
    /// risk-profile/policy-status, exactly as the original `ScanResults`
    /// routine did, but without the embedded login/logout (callers
    /// bracket a batch of these calls with one login/logout pair).
    pub async fn resolve_scan_results(&self, scan_id: &str) -> Result<ScanResults> {
        let summary = self.wait_for_scan_summary(scan_id).await?;
        if summary.is_error() {
            return Err(HubError::ScanFailed {
                scan_id: scan_id.to_string(),
            });
        }

        let code_location_url = summary.meta.link("codelocation").ok_or_else(|| HubError::MissingLink {
            resource: format!("scan summary {scan_id}"),
            rel: "codelocation".to_string(),
        })?;
        let code_location = self.get_code_location(code_location_url).await?;

        let project_version_url = code_location.mapped_project_version.clone();
        if project_version_url.is_empty() {
            return Err(HubError::CodeLocationNotFound {
                scan_id: scan_id.to_string(),
            });
        }
        let project_version = self.get_project_version(&project_version_url).await?;

        let mut vulnerabilities = 0;
        let mut violations = 0;

        if let Some(risk_url) = project_version.meta.link("riskProfile") {
            let profile = self.get_risk_profile(risk_url).await?;
            vulnerabilities = profile.categories.vulnerability.high;
        }
        if let Some(policy_url) = project_version.meta.link("policy-status") {
            let status = self.get_policy_status(policy_url).await?;
            violations = status.violation_count();
        }

        info!(
            scan_id,
            vulnerabilities, violations, "resolved scan results"
        );

        Ok(ScanResults {
            project_version_url,
            vulnerabilities,
            violations,
        })
    }
}

fn urlencode(s: &str) -> String {
    // Matches Go's `url.QueryEscape` closely enough for the query strings
    // this client builds: project/version names and search predicates.
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urlencode_escapes_special_characters() {
        assert_eq!(urlencode("name:my project"), "name%3Amy+project");
    }
}
