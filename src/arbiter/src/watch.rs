// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Wires the shared cluster watcher to the arbiter's own bookkeeping:
//! the `imageUsage` reverse index and the cluster-identity lookup the
//! reconciliation sweep needs.

use std::sync::Arc;

use ose_assign::AssignmentTable;
use ose_cluster_watch::ClusterWatcher;
use ose_orchestrator::{ClusterClient, ImageEvent, PodEvent};
use tracing::warn;

use crate::index::ClusterImageIndex;

pub async fn run<C: ClusterClient + 'static>(
    client: Arc<C>,
    index: Arc<ClusterImageIndex>,
    table: Arc<AssignmentTable>,
) -> ose_orchestrator::Result<()> {
    let watcher = ClusterWatcher::new(client);

    let image_index = index.clone();
    watcher
        .watch_images(move |event| match event {
            ImageEvent::Added(image) | ImageEvent::Updated(image) => image_index.record(image),
            ImageEvent::Deleted(object) => image_index.remove(&object),
        })
        .await?;

    watcher
        .watch_pods(move |event| {
            let pod = match event {
                PodEvent::Added(pod) | PodEvent::Updated(pod) => pod,
                PodEvent::Deleted(_) => return,
            };
            for container in &pod.containers {
                match index.engine_id_for_tagged_name(&container.image_name) {
                    Some(engine_id) => table.record_image_usage(&engine_id, &pod.namespace, &pod.name),
                    None => warn!(
                        image_name = %container.image_name,
                        namespace = %pod.namespace,
                        pod = %pod.name,
                        "pod references an image the arbiter hasn't observed yet"
                    ),
                }
            }
        })
        .await?;

    Ok(())
}
