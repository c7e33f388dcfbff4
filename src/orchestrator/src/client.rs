// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The cluster-API boundary.
//!
//! `watcher.go` talked to the OpenShift/Kubernetes API directly through
//! a generated client. We isolate that dependency behind a trait so the
//! watcher and agent logic can be driven by an in-memory fake in tests.

use std::pin::Pin;

use async_trait::async_trait;
use ose_common::ImageInfo;
use tokio_stream::Stream;

use crate::error::Result;
use crate::model::{ClusterImage, ClusterPod, ImageEvent, PodEvent};

pub type ImageEventStream = Pin<Box<dyn Stream<Item = ImageEvent> + Send>>;
pub type PodEventStream = Pin<Box<dyn Stream<Item = PodEvent> + Send>>;

#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Image streams across every namespace, resolved to image
    /// references -- the `List` half of `ListWatch`.
    async fn list_images(&self) -> Result<Vec<ClusterImage>>;

    /// The `Watch` half: an unbounded stream of add/update/delete events.
    async fn watch_images(&self) -> Result<ImageEventStream>;

    async fn list_pods(&self) -> Result<Vec<ClusterPod>>;

    async fn watch_pods(&self) -> Result<PodEventStream>;

    async fn patch_image_annotations(
        &self,
        namespace: &str,
        name: &str,
        info: ImageInfo,
    ) -> Result<()>;

    async fn patch_pod_annotations(
        &self,
        namespace: &str,
        name: &str,
        info: ImageInfo,
    ) -> Result<()>;
}
