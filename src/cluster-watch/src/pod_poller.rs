// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Waits for a `Pending` pod to reach `Running` or a terminal phase
//! before the discovery loop acts on it, per-container image lookups
//! being pointless against a pod that hasn't started yet.

use std::sync::Arc;
use std::time::Duration;

use ose_orchestrator::{ClusterClient, ClusterPod, PodPhase};
use tracing::debug;

const POLL_MIN: Duration = Duration::from_millis(50);
const POLL_MAX: Duration = Duration::from_secs(5);

/// Polls `namespace`/`name` via repeated `list_pods` calls, backing off
/// from [`POLL_MIN`] to [`POLL_MAX`], until the pod is `Running`,
/// terminal, or gone. Returns `None` if the pod disappears before
/// settling.
pub async fn wait_until_settled<C: ClusterClient + ?Sized>(
    client: &Arc<C>,
    namespace: &str,
    name: &str,
) -> Option<ClusterPod> {
    let mut backoff = POLL_MIN;
    loop {
        let pods = client.list_pods().await.ok()?;
        let found = pods
            .into_iter()
            .find(|p| p.namespace == namespace && p.name == name);

        match found {
            None => return None,
            Some(pod) if pod.phase.is_settled() => return Some(pod),
            Some(pod) => {
                debug!(namespace, name, phase = ?pod.phase, "pod still pending, backing off");
            }
        }

        tokio::time::sleep(backoff).await;
        backoff = (backoff * 2).min(POLL_MAX);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ose_common::ImageInfo;
    use ose_orchestrator::FakeClusterClient;

    fn pod(namespace: &str, name: &str, phase: PodPhase) -> ClusterPod {
        ClusterPod {
            namespace: namespace.to_string(),
            name: name.to_string(),
            phase,
            containers: vec![],
            info: ImageInfo::default(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_none_once_pod_disappears() {
        let client: Arc<FakeClusterClient> = Arc::new(FakeClusterClient::new(vec![], vec![]));
        let result = wait_until_settled(&client, "ns", "gone").await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn returns_immediately_for_already_running_pod() {
        let client: Arc<FakeClusterClient> = Arc::new(FakeClusterClient::new(
            vec![],
            vec![pod("ns", "p1", PodPhase::Running)],
        ));
        let result = wait_until_settled(&client, "ns", "p1").await.unwrap();
        assert_eq!(result.phase, PodPhase::Running);
    }
}
