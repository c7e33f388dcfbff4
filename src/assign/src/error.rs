// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use ose_common::RequestId;
use thiserror::Error;

/// Errors the assignment table's endpoints surface -- every one of these
/// corresponds to a 404 at the HTTP boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssignError {
    #[error("controller {0} is not registered")]
    UnknownController(String),

    #[error("no assignment for request {request_id} held by controller {controller_id}")]
    NotHolder {
        request_id: RequestId,
        controller_id: String,
    },
}

pub type Result<T> = std::result::Result<T, AssignError>;
