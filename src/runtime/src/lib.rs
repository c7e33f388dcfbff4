// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The local container-runtime collaborator: enumerating images present
//! on a node and launching the scanner container against one of them.
//!
//! `docker.go`/`scanimage.go` talked directly to the Docker Engine API.
//! We instead define the boundary as a trait so the controller can be
//! tested without a real container runtime underneath it.

pub mod error;
pub mod mock;
pub mod model;
pub mod output;

use async_trait::async_trait;

pub use error::{Result, RuntimeError};
pub use mock::MockRuntime;
pub use model::{RuntimeImage, ScanContainerSpec, ScanOutcome};

/// The local container engine (Docker, CRI-O, etc). Implementations are
/// expected to launch the scanner container privileged and bind-mount
/// the engine's own socket in, matching the original `launchContainer`.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Enumerates images currently present on this node.
    async fn list_images(&self) -> Result<Vec<RuntimeImage>>;

    /// Launches the scanner container described by `spec`, blocks until
    /// it exits, and parses its output for the resulting scan id.
    async fn run_scanner(&self, spec: &ScanContainerSpec) -> Result<ScanOutcome>;
}
