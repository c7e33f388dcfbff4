// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The per-image scan record both the arbiter and the controller track.

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;

/// A single image discovered on some node, and the scan's progress.
///
/// `scanned` starts `false` and transitions to `true` exactly once, on a
/// `done` call; there is no path back to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanImage {
    pub engine_id: String,
    pub tagged_name: String,
    pub content_digest: String,
    pub fingerprint: Fingerprint,
    pub scanned: bool,
    pub scan_id: Option<String>,
}

impl ScanImage {
    /// Builds the record for a newly discovered image. `scanned` starts
    /// `false` and `scan_id` starts unset.
    pub fn new(engine_id: impl Into<String>, tagged_name: impl Into<String>, content_digest: impl Into<String>) -> Self {
        let tagged_name = tagged_name.into();
        let content_digest = content_digest.into();
        let fingerprint = Fingerprint::new(format!("{tagged_name}@{content_digest}"));
        ScanImage {
            engine_id: engine_id.into(),
            tagged_name,
            content_digest,
            fingerprint,
            scanned: false,
            scan_id: None,
        }
    }

    /// Marks this image as scanned. A no-op if already scanned -- the
    /// arbiter's `done` handler is idempotent.
    pub fn mark_scanned(&mut self, scan_id: impl Into<String>) {
        if self.scanned {
            return;
        }
        self.scanned = true;
        self.scan_id = Some(scan_id.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_image_is_unscanned() {
        let img = ScanImage::new("docker", "registry/ns/img:latest", "sha256:abc");
        assert!(!img.scanned);
        assert!(img.scan_id.is_none());
        assert_eq!(img.fingerprint.as_str(), "registry/ns/img:latest@sha256:abc");
    }

    #[test]
    fn mark_scanned_sets_scan_id_once() {
        let mut img = ScanImage::new("docker", "registry/ns/img:latest", "sha256:abc");
        img.mark_scanned("scan-1");
        assert!(img.scanned);
        assert_eq!(img.scan_id.as_deref(), Some("scan-1"));

        // A second call does not overwrite the recorded scan id.
        img.mark_scanned("scan-2");
        assert_eq!(img.scan_id.as_deref(), Some("scan-1"));
    }
}
