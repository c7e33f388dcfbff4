// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Errors surfaced by [`crate::client::HubClient`].
//!
//! A plain bool/error pair leaves callers unable to distinguish "try
//! again later" from "this image will never resolve"; this enum keeps
//! that distinction explicit.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("analysis service login failed for user {user}")]
    LoginFailed { user: String },

    #[error("analysis service request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("analysis service returned status {status} for {url}")]
    UnexpectedStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode analysis service response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("scan {scan_id} ended in ERROR status")]
    ScanFailed { scan_id: String },

    #[error("no {rel} link present on {resource}")]
    MissingLink { resource: String, rel: String },

    #[error("no code location found for scan {scan_id}")]
    CodeLocationNotFound { scan_id: String },
}

impl HubError {
    /// Whether a retry has any chance of succeeding: network blips and
    /// non-2xx server responses are worth retrying, a bad password or a
    /// scan that the Hub itself marked ERROR is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HubError::Transport { .. } | HubError::UnexpectedStatus { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
