// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A thin client for the arbiter's assignment API.
//!
//! Grounded on `arbiterinterface.go`'s `Arbiter` struct, but targeting
//! the already-built `ose-arbiter` HTTP contract: every successful call
//! decodes a `{requestId,startScan,skipScan}` body, and any non-2xx
//! response (including the 404 the original branched on as
//! `StatusTooManyRequests`) is surfaced as [`ControllerError`] for the
//! caller to retry or abandon.

use std::time::Duration;

use ose_common::{Fingerprint, RequestId};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ControllerError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ArbiterClient {
    http: Client,
    base_url: String,
}

/// The arbiter's answer to `/image/found` or `/image/request`: either an
/// assignment has been made, the work is already spoken for
/// (`skip_scan`), or the caller should retry later (neither flag set).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentDecision {
    pub request_id: RequestId,
    pub start_scan: bool,
    pub skip_scan: bool,
}

#[derive(Debug, Serialize)]
struct ControllerInfo<'a> {
    id: &'a str,
    workers: i64,
}

#[derive(Debug, Serialize)]
struct ImageInfoRequest<'a> {
    id: &'a str,
    spec: &'a str,
}

#[derive(Debug, Serialize)]
struct HolderRequest<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct AssignmentResponse {
    #[serde(rename = "requestId")]
    request_id: String,
    #[serde(rename = "startScan")]
    start_scan: bool,
    #[serde(rename = "skipScan")]
    skip_scan: bool,
}

impl ArbiterClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|source| ControllerError::ArbiterTransport {
                url: base_url.clone(),
                source,
            })?;
        Ok(ArbiterClient { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// POSTs `/heartbeat`. The caller retries this on failure (step b,
    /// `RETRY_INTERVAL`); this method makes a single attempt.
    pub async fn heartbeat(&self, controller_id: &str, workers: i64) -> Result<()> {
        let url = self.url("/heartbeat");
        debug!(controller_id, workers, "POST /heartbeat");
        let resp = self
            .http
            .post(&url)
            .json(&ControllerInfo {
                id: controller_id,
                workers,
            })
            .send()
            .await
            .map_err(|source| ControllerError::ArbiterTransport { url: url.clone(), source })?;
        expect_status(&url, resp, StatusCode::CREATED).await?;
        Ok(())
    }

    /// POSTs `/image/found` to advertise interest in a fingerprint.
    pub async fn image_found(&self, controller_id: &str, fingerprint: &Fingerprint) -> Result<AssignmentDecision> {
        let url = self.url("/image/found");
        debug!(controller_id, fingerprint = %fingerprint, "POST /image/found");
        let resp = self
            .http
            .post(&url)
            .json(&ImageInfoRequest {
                id: controller_id,
                spec: fingerprint.as_str(),
            })
            .send()
            .await
            .map_err(|source| ControllerError::ArbiterTransport { url: url.clone(), source })?;
        decode_assignment(&url, resp).await
    }

    /// POSTs `/image/request` to ask for authorization to start scanning.
    pub async fn image_request(&self, controller_id: &str, fingerprint: &Fingerprint) -> Result<AssignmentDecision> {
        let url = self.url("/image/request");
        debug!(controller_id, fingerprint = %fingerprint, "POST /image/request");
        let resp = self
            .http
            .post(&url)
            .json(&ImageInfoRequest {
                id: controller_id,
                spec: fingerprint.as_str(),
            })
            .send()
            .await
            .map_err(|source| ControllerError::ArbiterTransport { url: url.clone(), source })?;
        decode_assignment(&url, resp).await
    }

    /// POSTs `/image/{id}/processing`, the keepalive that resets the
    /// arbiter's stale-assignment reaper clock for a held assignment.
    pub async fn processing(&self, controller_id: &str, request_id: &RequestId) -> Result<()> {
        let url = self.url(&format!("/image/{}/processing", request_id.as_str()));
        let resp = self
            .http
            .post(&url)
            .json(&HolderRequest { id: controller_id })
            .send()
            .await
            .map_err(|source| ControllerError::ArbiterTransport { url: url.clone(), source })?;
        expect_status(&url, resp, StatusCode::OK).await?;
        Ok(())
    }

    /// POSTs `/image/{id}/done` after a successful scan.
    pub async fn done(&self, controller_id: &str, request_id: &RequestId) -> Result<()> {
        let url = self.url(&format!("/image/{}/done", request_id.as_str()));
        debug!(controller_id, request_id = %request_id, "POST /image/.../done");
        let resp = self
            .http
            .post(&url)
            .json(&HolderRequest { id: controller_id })
            .send()
            .await
            .map_err(|source| ControllerError::ArbiterTransport { url: url.clone(), source })?;
        expect_status(&url, resp, StatusCode::OK).await?;
        Ok(())
    }

    /// POSTs `/image/{id}/abort` after a failed scan.
    pub async fn abort(&self, controller_id: &str, request_id: &RequestId) -> Result<()> {
        let url = self.url(&format!("/image/{}/abort", request_id.as_str()));
        debug!(controller_id, request_id = %request_id, "POST /image/.../abort");
        let resp = self
            .http
            .post(&url)
            .json(&HolderRequest { id: controller_id })
            .send()
            .await
            .map_err(|source| ControllerError::ArbiterTransport { url: url.clone(), source })?;
        expect_status(&url, resp, StatusCode::OK).await?;
        Ok(())
    }
}

async fn expect_status(url: &str, resp: reqwest::Response, want: StatusCode) -> Result<()> {
    if resp.status() != want {
        return Err(ControllerError::ArbiterUnexpectedStatus {
            url: url.to_string(),
            status: resp.status(),
        });
    }
    Ok(())
}

async fn decode_assignment(url: &str, resp: reqwest::Response) -> Result<AssignmentDecision> {
    let status = resp.status();
    if status != StatusCode::OK && status != StatusCode::CREATED {
        return Err(ControllerError::ArbiterUnexpectedStatus {
            url: url.to_string(),
            status,
        });
    }
    let body: AssignmentResponse = resp
        .json()
        .await
        .map_err(|source| ControllerError::ArbiterDecode {
            url: url.to_string(),
            source,
        })?;
    Ok(AssignmentDecision {
        request_id: RequestId::from(body.request_id),
        start_scan: body.start_scan,
        skip_scan: body.skip_scan,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_paths_are_built_from_the_request_id() {
        let client = ArbiterClient::new("http://arbiter:9035").unwrap();
        let id = RequestId::from("abc123".to_string());
        assert_eq!(client.url(&format!("/image/{}/done", id.as_str())), "http://arbiter:9035/image/abc123/done");
        assert_eq!(
            client.url(&format!("/image/{}/abort", id.as_str())),
            "http://arbiter:9035/image/abc123/abort"
        );
    }
}
