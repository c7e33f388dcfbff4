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
pub enum ClusterError {
    #[error("failed to list {kind} cluster-wide: {message}")]
    List { kind: &'static str, message: String },

    #[error("failed to watch {kind} cluster-wide: {message}")]
    Watch { kind: &'static str, message: String },

    #[error("failed to patch annotations on {namespace}/{name}: {message}")]
    Patch {
        namespace: String,
        name: String,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, ClusterError>;
