// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The cluster-API collaborator: image-stream/pod objects, the events a
//! list-and-watch subscription emits for them, and the annotation patch
//! calls a reconciliation writes back.

pub mod client;
pub mod error;
pub mod fake;
pub mod model;

pub use client::{ClusterClient, ImageEventStream, PodEventStream};
pub use error::{ClusterError, Result};
pub use fake::FakeClusterClient;
pub use model::{ClusterImage, ClusterPod, ImageEvent, ObjectRef, PodContainer, PodEvent, PodPhase};
