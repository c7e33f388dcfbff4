// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An in-memory [`ContainerRuntime`] for tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{Result, RuntimeError};
use crate::model::{RuntimeImage, ScanContainerSpec, ScanOutcome};
use crate::ContainerRuntime;

/// A fake runtime that serves a fixed image inventory and returns a
/// canned (or failing) scan outcome for every launch.
pub struct MockRuntime {
    images: Vec<RuntimeImage>,
    next_outcome: Mutex<Vec<Result<ScanOutcome>>>,
    launches: Mutex<Vec<ScanContainerSpec>>,
}

impl MockRuntime {
    pub fn new(images: Vec<RuntimeImage>) -> Self {
        MockRuntime {
            images,
            next_outcome: Mutex::new(Vec::new()),
            launches: Mutex::new(Vec::new()),
        }
    }

    /// Queues outcomes to be returned by successive `run_scanner` calls,
    /// in order. Defaults to a generic success if the queue is empty.
    pub async fn queue_outcome(&self, outcome: Result<ScanOutcome>) {
        self.next_outcome.lock().await.push(outcome);
    }

    pub async fn launch_count(&self) -> usize {
        self.launches.lock().await.len()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn list_images(&self) -> Result<Vec<RuntimeImage>> {
        Ok(self.images.clone())
    }

    async fn run_scanner(&self, spec: &ScanContainerSpec) -> Result<ScanOutcome> {
        self.launches.lock().await.push(spec.clone());
        let mut queue = self.next_outcome.lock().await;
        if queue.is_empty() {
            Ok(ScanOutcome {
                scan_id: format!("mock-scan-{}", spec.engine_id),
            })
        } else {
            queue.remove(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(engine_id: &str) -> ScanContainerSpec {
        ScanContainerSpec {
            scanner_image: "scanner:latest".to_string(),
            hub_host: "hub".to_string(),
            hub_port: "443".to_string(),
            hub_scheme: "https".to_string(),
            hub_user: "u".to_string(),
            hub_password: "p".to_string(),
            engine_id: engine_id.to_string(),
            tagged_name: "registry/ns/img:latest".to_string(),
            content_digest: "sha256:abc".to_string(),
        }
    }

    #[tokio::test]
    async fn run_scanner_returns_queued_outcomes_in_order() {
        let runtime = MockRuntime::new(vec![]);
        runtime
            .queue_outcome(Ok(ScanOutcome {
                scan_id: "first".to_string(),
            }))
            .await;
        runtime
            .queue_outcome(Err(RuntimeError::NoSuccessMarker))
            .await;

        let first = runtime.run_scanner(&spec("img-1")).await.unwrap();
        assert_eq!(first.scan_id, "first");

        let second = runtime.run_scanner(&spec("img-2")).await;
        assert!(second.is_err());
        assert_eq!(runtime.launch_count().await, 2);
    }

    #[tokio::test]
    async fn defaults_to_deterministic_success_when_queue_empty() {
        let runtime = MockRuntime::new(vec![]);
        let outcome = runtime.run_scanner(&spec("img-3")).await.unwrap();
        assert_eq!(outcome.scan_id, "mock-scan-img-3");
    }
}
