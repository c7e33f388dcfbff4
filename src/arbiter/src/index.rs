// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Maps a fingerprint back to the cluster image object it came from.
//!
//! `AssignmentTable` deliberately knows nothing about cluster-object
//! identity -- it only keys on fingerprint/requestId -- but
//! the reconciliation sweep still needs `namespace`/`name` to patch the
//! right object, plus `engineId` to look up `imageUsage`, so the
//! arbiter's own cluster watcher keeps this index alongside the
//! assignment table. Fed purely by `watch_images`, independent of
//! controller heartbeats.

use std::collections::HashMap;
use std::sync::RwLock;

use ose_common::Fingerprint;
use ose_orchestrator::{ClusterImage, ObjectRef};

#[derive(Default)]
pub struct ClusterImageIndex {
    inner: RwLock<HashMap<Fingerprint, ClusterImage>>,
}

impl ClusterImageIndex {
    pub fn new() -> Self {
        ClusterImageIndex::default()
    }

    pub fn record(&self, image: ClusterImage) {
        let fingerprint = Fingerprint::new(format!("{}@{}", image.tagged_name, image.content_digest));
        self.inner.write().unwrap().insert(fingerprint, image);
    }

    pub fn remove(&self, object: &ObjectRef) {
        self.inner
            .write()
            .unwrap()
            .retain(|_, v| v.namespace != object.namespace || v.name != object.name);
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<ClusterImage> {
        self.inner.read().unwrap().get(fingerprint).cloned()
    }

    /// Matches a pod container's `image_name` against every tracked
    /// cluster image's tagged name, returning the runtime engine id to
    /// key `imageUsage` with -- the arbiter-side stand-in for the
    /// per-node runtime lookup the controller does for the same purpose.
    pub fn engine_id_for_tagged_name(&self, image_name: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap()
            .values()
            .find(|img| img.tagged_name == image_name)
            .map(|img| img.engine_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ose_common::ImageInfo;

    fn image() -> ClusterImage {
        ClusterImage {
            namespace: "ns".to_string(),
            name: "img".to_string(),
            engine_id: "docker://abc".to_string(),
            tagged_name: "registry/ns/img:latest".to_string(),
            content_digest: "sha256:abc".to_string(),
            info: ImageInfo::default(),
        }
    }

    #[test]
    fn records_and_retrieves_by_fingerprint() {
        let index = ClusterImageIndex::new();
        let img = image();
        let f = Fingerprint::new(format!("{}@{}", img.tagged_name, img.content_digest));
        index.record(img.clone());
        assert_eq!(index.get(&f), Some(img));
    }

    #[test]
    fn resolves_engine_id_from_tagged_name() {
        let index = ClusterImageIndex::new();
        index.record(image());
        assert_eq!(
            index.engine_id_for_tagged_name("registry/ns/img:latest"),
            Some("docker://abc".to_string())
        );
        assert_eq!(index.engine_id_for_tagged_name("nope"), None);
    }

    #[test]
    fn remove_drops_by_object_identity() {
        let index = ClusterImageIndex::new();
        let img = image();
        let f = Fingerprint::new(format!("{}@{}", img.tagged_name, img.content_digest));
        index.record(img.clone());
        index.remove(&ObjectRef {
            namespace: img.namespace.clone(),
            name: img.name.clone(),
        });
        assert_eq!(index.get(&f), None);
    }
}
