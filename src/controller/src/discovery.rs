// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Wires cluster discovery into the scan pipeline.
//!
//! Image-stream add/update events resolve to a concrete image reference
//! directly from the cluster client (`ClusterImage` already carries
//! `engine_id`/`tagged_name`/`content_digest`). Pod add/update events
//! carry only a container's image name; each is resolved against the
//! local runtime's own inventory, which may yield more than one
//! content-digest for a single image name (an image retagged since the
//! pod started, or a multi-arch manifest list).

use std::sync::Arc;

use ose_cluster_watch::ClusterWatcher;
use ose_orchestrator::{ClusterClient, ClusterPod, ImageEvent, PodEvent};
use ose_runtime::ContainerRuntime;
use ose_dispatcher::Dispatcher;
use tracing::warn;

use crate::pipeline::{Agent, DiscoveredImage, ScanJob};

/// Subscribes to cluster image and pod events and feeds newly-discovered,
/// not-yet-current images into `dispatcher`. Returns once both
/// subscriptions are established; delivery itself runs on spawned tasks
/// for the lifetime of the process.
pub async fn run<C, R>(agent: Arc<Agent<C, R>>, dispatcher: Arc<Dispatcher<ScanJob>>) -> anyhow::Result<()>
where
    C: ClusterClient + 'static,
    R: ContainerRuntime + 'static,
{
    let watcher = ClusterWatcher::new(agent.cluster.clone());

    let image_agent = agent.clone();
    let image_dispatcher = dispatcher.clone();
    watcher
        .watch_images(move |event| {
            let (ImageEvent::Added(image) | ImageEvent::Updated(image)) = event else {
                return;
            };
            let agent = image_agent.clone();
            let dispatcher = image_dispatcher.clone();
            ose_ore::task::spawn(|| "controller-add-image", async move {
                enqueue(
                    &agent,
                    &dispatcher,
                    DiscoveredImage {
                        namespace: image.namespace,
                        name: image.name,
                        engine_id: image.engine_id,
                        tagged_name: image.tagged_name,
                        content_digest: image.content_digest,
                        info: image.info,
                    },
                )
                .await;
            });
        })
        .await?;

    let pod_agent = agent;
    let pod_dispatcher = dispatcher;
    watcher
        .watch_pods(move |event| {
            let (PodEvent::Added(pod) | PodEvent::Updated(pod)) = event else {
                return;
            };
            let agent = pod_agent.clone();
            let dispatcher = pod_dispatcher.clone();
            ose_ore::task::spawn(|| "controller-add-pod-images", async move {
                resolve_pod_images(&agent, &dispatcher, pod).await;
            });
        })
        .await?;

    Ok(())
}

async fn enqueue<C, R>(agent: &Arc<Agent<C, R>>, dispatcher: &Arc<Dispatcher<ScanJob>>, discovered: DiscoveredImage)
where
    C: ClusterClient + 'static,
    R: ContainerRuntime + 'static,
{
    let fingerprint = ose_common::Fingerprint::new(format!(
        "{}@{}",
        discovered.tagged_name, discovered.content_digest
    ));

    if !agent.claim(&fingerprint).await {
        return;
    }
    if !agent.needs_scan(&discovered.info).await {
        return;
    }

    let job = ScanJob {
        fingerprint,
        namespace: discovered.namespace,
        name: discovered.name,
        engine_id: discovered.engine_id,
        tagged_name: discovered.tagged_name,
        content_digest: discovered.content_digest,
    };
    if let Err(error) = dispatcher.submit(job).await {
        warn!(%error, "scan queue closed, dropping discovered image");
    }
}

/// Pod add/update trigger: resolves each container's image name
/// against the local runtime's inventory and enqueues every match.
async fn resolve_pod_images<C, R>(agent: &Arc<Agent<C, R>>, dispatcher: &Arc<Dispatcher<ScanJob>>, pod: ClusterPod)
where
    C: ClusterClient + 'static,
    R: ContainerRuntime + 'static,
{
    let local_images = match agent.runtime.list_images().await {
        Ok(images) => images,
        Err(error) => {
            warn!(%error, "failed to list local images while resolving pod containers");
            return;
        }
    };

    for container in &pod.containers {
        for local in local_images.iter().filter(|i| i.tagged_name == container.image_name) {
            enqueue(
                agent,
                dispatcher,
                DiscoveredImage {
                    namespace: pod.namespace.clone(),
                    name: pod.name.clone(),
                    engine_id: local.engine_id.clone(),
                    tagged_name: local.tagged_name.clone(),
                    content_digest: local.content_digest.clone(),
                    info: pod.info.clone(),
                },
            )
            .await;
        }
    }
}
