// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Errors the controller agent surfaces.
//!
//! Transport failures against the arbiter or the analysis service are
//! retried locally by the worker loop and never reach here as a fatal
//! `Result::Err`; this enum is for the handful of failures a caller
//! actually needs to branch on, plus the ones that abort the process at
//! startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("configuration invalid: {0}")]
    ConfigInvalid(String),

    #[error("arbiter request to {url} failed: {source}")]
    ArbiterTransport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("arbiter returned unexpected status {status} for {url}")]
    ArbiterUnexpectedStatus { url: String, status: reqwest::StatusCode },

    #[error("could not decode arbiter response from {url}: {source}")]
    ArbiterDecode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("container runtime error: {0}")]
    Runtime(#[from] ose_runtime::RuntimeError),

    #[error("analysis service error: {0}")]
    Hub(#[from] ose_hub_client::HubError),

    #[error("cluster client error: {0}")]
    Cluster(#[from] ose_orchestrator::ClusterError),
}

impl ControllerError {
    /// Whether the arbiter call behind this error is worth retrying
    /// (network blip, 5xx) rather than abandoning the job.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ControllerError::ArbiterTransport { .. } | ControllerError::ArbiterUnexpectedStatus { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;
