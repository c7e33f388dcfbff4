// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Connection settings for the analysis service.

use serde::{Deserialize, Serialize};

/// How to reach and authenticate against the analysis service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HubConfig {
    pub url: String,
    pub host: String,
    pub port: String,
    pub scheme: String,
    pub user: String,
    pub password: String,
    /// Skip TLS certificate verification. Only ever set for self-signed
    /// on-prem deployments; never the default.
    pub insecure_https: bool,
}

impl HubConfig {
    pub fn new(
        host: impl Into<String>,
        port: impl Into<String>,
        scheme: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
        insecure_https: bool,
    ) -> Self {
        let host = host.into();
        let port = port.into();
        let scheme = scheme.into();
        let url = format!("{scheme}://{host}:{port}");
        HubConfig {
            url,
            host,
            port,
            scheme,
            user: user.into(),
            password: password.into(),
            insecure_https,
        }
    }
}
