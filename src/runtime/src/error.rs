// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("failed to list images from container runtime: {0}")]
    ListImages(String),

    #[error("failed to launch scanner container: {0}")]
    LaunchFailed(String),

    #[error("scanner container exited with status {0}")]
    NonZeroExit(i64),

    #[error("scanner output did not contain a Post Scan success marker")]
    NoSuccessMarker,

    #[error("scanner output's ScanContainerView line did not contain a scanId")]
    MissingScanId,
}

pub type Result<T> = std::result::Result<T, RuntimeError>;
