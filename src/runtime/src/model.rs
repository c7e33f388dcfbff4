// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Runtime-facing image and scan-job records.

/// An image as the local container runtime sees it, before it is wrapped
/// in an `ose_common::ScanImage`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeImage {
    pub engine_id: String,
    pub tagged_name: String,
    pub content_digest: String,
}

/// Everything the scanner container needs on its command line: the
/// image to scan plus the credentials it reports results back with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanContainerSpec {
    pub scanner_image: String,
    pub hub_host: String,
    pub hub_port: String,
    pub hub_scheme: String,
    pub hub_user: String,
    pub hub_password: String,
    pub engine_id: String,
    pub tagged_name: String,
    pub content_digest: String,
}

impl ScanContainerSpec {
    /// The scanner binary's argv, `-h`/`-p`/`-s`/`-u`/`-w`/`-id`/`-tag`/`-digest`.
    pub fn args(&self) -> Vec<String> {
        vec![
            "/ose_scanner".to_string(),
            "-h".to_string(),
            self.hub_host.clone(),
            "-p".to_string(),
            self.hub_port.clone(),
            "-s".to_string(),
            self.hub_scheme.clone(),
            "-u".to_string(),
            self.hub_user.clone(),
            "-w".to_string(),
            self.hub_password.clone(),
            "-id".to_string(),
            self.engine_id.clone(),
            "-tag".to_string(),
            self.tagged_name.clone(),
            "-digest".to_string(),
            self.content_digest.clone(),
        ]
    }
}

/// The parsed result of a completed scan container run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub scan_id: String,
}
