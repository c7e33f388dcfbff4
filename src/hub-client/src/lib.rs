// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Client for the external vulnerability-analysis service ("the Hub").

pub mod client;
pub mod config;
pub mod error;
pub mod model;

pub use client::HubClient;
pub use config::HubConfig;
pub use error::{HubError, Result};
