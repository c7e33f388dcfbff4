// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Ties together the cluster client's list-and-watch streams, the
//! per-key debounce, and the pod-phase poller into the add/update/delete
//! callbacks the controller and arbiter both subscribe to.
//!
//! Grounded on `watcher.go`'s `Watcher.Run`: list once up front, then
//! fire callbacks off a long-lived watch stream.

use std::sync::Arc;

use ose_orchestrator::{ClusterClient, ImageEvent, PodEvent, PodPhase};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;

use crate::debounce::debounce;
use crate::pod_poller;

pub struct ClusterWatcher<C: ClusterClient + 'static> {
    client: Arc<C>,
}

impl<C: ClusterClient + 'static> ClusterWatcher<C> {
    pub fn new(client: Arc<C>) -> Self {
        ClusterWatcher { client }
    }

    /// Delivers one [`ImageEvent::Added`] per currently-listed image,
    /// then forwards the live watch stream with add/update events
    /// debounced per object key and deletes passed through immediately.
    pub async fn watch_images<F>(&self, on_event: F) -> ose_orchestrator::Result<()>
    where
        F: Fn(ImageEvent) + Send + Sync + 'static,
    {
        let on_event = Arc::new(on_event);

        for image in self.client.list_images().await? {
            on_event(ImageEvent::Added(image));
        }

        let stream = self.client.watch_images().await?;
        let (key_tx, key_rx) = mpsc::unbounded_channel();
        let mut debounced = debounce(key_rx);

        let immediate = on_event.clone();
        ose_ore::task::spawn(|| "cluster-watch-images-split", async move {
            tokio::pin!(stream);
            while let Some(event) = stream.next().await {
                let key = match &event {
                    ImageEvent::Added(img) | ImageEvent::Updated(img) => {
                        Some((img.namespace.clone(), img.name.clone()))
                    }
                    ImageEvent::Deleted(_) => None,
                };
                match key {
                    Some(key) => {
                        let _ = key_tx.send((key, event));
                    }
                    None => immediate(event),
                }
            }
        });

        ose_ore::task::spawn(|| "cluster-watch-images-debounced", async move {
            while let Some(event) = debounced.recv().await {
                on_event(event);
            }
        });

        Ok(())
    }

    /// Same as [`Self::watch_images`], but a pod seen in [`PodPhase::Pending`]
    /// is held back: a background poller waits for it to become
    /// `Running` or terminal before the callback fires for it.
    pub async fn watch_pods<F>(&self, on_event: F) -> ose_orchestrator::Result<()>
    where
        F: Fn(PodEvent) + Send + Sync + 'static,
    {
        let on_event = Arc::new(on_event);
        let client = self.client.clone();

        for pod in self.client.list_pods().await? {
            dispatch_or_poll(client.clone(), on_event.clone(), PodEvent::Added(pod));
        }

        let stream = self.client.watch_pods().await?;
        let (key_tx, key_rx) = mpsc::unbounded_channel();
        let mut debounced = debounce(key_rx);

        let immediate_client = client.clone();
        let immediate_cb = on_event.clone();
        ose_ore::task::spawn(|| "cluster-watch-pods-split", async move {
            tokio::pin!(stream);
            while let Some(event) = stream.next().await {
                let key = match &event {
                    PodEvent::Added(pod) | PodEvent::Updated(pod) => {
                        Some((pod.namespace.clone(), pod.name.clone()))
                    }
                    PodEvent::Deleted(_) => None,
                };
                match key {
                    Some(key) => {
                        let _ = key_tx.send((key, event));
                    }
                    None => dispatch_or_poll(immediate_client.clone(), immediate_cb.clone(), event),
                }
            }
        });

        ose_ore::task::spawn(|| "cluster-watch-pods-debounced", async move {
            while let Some(event) = debounced.recv().await {
                dispatch_or_poll(client.clone(), on_event.clone(), event);
            }
        });

        Ok(())
    }
}

/// Fires `on_event` immediately unless the pod is `Pending`, in which
/// case a poller is spawned to wait for it to settle first.
fn dispatch_or_poll<C, F>(client: Arc<C>, on_event: Arc<F>, event: PodEvent)
where
    C: ClusterClient + 'static,
    F: Fn(PodEvent) + Send + Sync + 'static,
{
    let pending = match &event {
        PodEvent::Added(pod) | PodEvent::Updated(pod) if pod.phase == PodPhase::Pending => {
            Some((pod.namespace.clone(), pod.name.clone()))
        }
        _ => None,
    };

    match pending {
        None => on_event(event),
        Some((namespace, name)) => {
            ose_ore::task::spawn(|| "cluster-watch-pod-poll", async move {
                if let Some(settled) = pod_poller::wait_until_settled(&client, &namespace, &name).await {
                    on_event(PodEvent::Updated(settled));
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ose_common::ImageInfo;
    use ose_orchestrator::{ClusterImage, ClusterPod, FakeClusterClient};
    use std::sync::Mutex as StdMutex;

    fn image(namespace: &str, name: &str) -> ClusterImage {
        ClusterImage {
            namespace: namespace.to_string(),
            name: name.to_string(),
            engine_id: "abc".to_string(),
            tagged_name: "registry/ns/img:latest".to_string(),
            content_digest: "sha256:abc".to_string(),
            info: ImageInfo::default(),
        }
    }

    fn pod(namespace: &str, name: &str, phase: ose_orchestrator::PodPhase) -> ClusterPod {
        ClusterPod {
            namespace: namespace.to_string(),
            name: name.to_string(),
            phase,
            containers: vec![],
            info: ImageInfo::default(),
        }
    }

    #[tokio::test]
    async fn watch_images_delivers_initial_list_as_added() {
        let client = Arc::new(FakeClusterClient::new(vec![image("ns", "img-1")], vec![]));
        let watcher = ClusterWatcher::new(client);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();

        watcher
            .watch_images(move |event| sink.lock().unwrap().push(event))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn watch_pods_delivers_running_pod_immediately() {
        let client = Arc::new(FakeClusterClient::new(
            vec![],
            vec![pod("ns", "p1", ose_orchestrator::PodPhase::Running)],
        ));
        let watcher = ClusterWatcher::new(client);
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sink = seen.clone();

        watcher
            .watch_pods(move |event| sink.lock().unwrap().push(event))
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(seen.lock().unwrap().len(), 1);
    }
}
