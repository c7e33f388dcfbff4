// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Cluster-object types: image streams, pods, and the events a watch
//! emits for them.

use ose_common::ImageInfo;

/// A concrete image reference resolved from an image-stream tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterImage {
    pub namespace: String,
    pub name: String,
    pub engine_id: String,
    pub tagged_name: String,
    pub content_digest: String,
    pub info: ImageInfo,
}

/// A single container entry in a pod spec, as seen by the watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PodContainer {
    pub name: String,
    pub image_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
    Pending,
    Running,
    Succeeded,
    Failed,
    Unknown,
}

impl PodPhase {
    /// `Succeeded`/`Failed` are terminal; the pod-phase poller stops
    /// waiting once it observes either, same as `Running`.
    pub fn is_settled(self) -> bool {
        matches!(self, PodPhase::Running | PodPhase::Succeeded | PodPhase::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterPod {
    pub namespace: String,
    pub name: String,
    pub phase: PodPhase,
    pub containers: Vec<PodContainer>,
    pub info: ImageInfo,
}

/// A cluster object identifier, used by delete events and patch calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub namespace: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageEvent {
    Added(ClusterImage),
    Updated(ClusterImage),
    Deleted(ObjectRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PodEvent {
    Added(ClusterPod),
    Updated(ClusterPod),
    Deleted(ObjectRef),
}
