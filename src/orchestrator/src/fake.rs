// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! An in-memory [`ClusterClient`] for tests: a fixed inventory plus an
//! injectable event feed, and a log of every patch call so tests can
//! assert on what got annotated.

use async_trait::async_trait;
use ose_common::ImageInfo;
use tokio::sync::{mpsc, Mutex};
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::client::{ClusterClient, ImageEventStream, PodEventStream};
use crate::error::Result;
use crate::model::{ClusterImage, ClusterPod, ImageEvent, ObjectRef, PodEvent};

pub struct FakeClusterClient {
    images: Mutex<Vec<ClusterImage>>,
    pods: Mutex<Vec<ClusterPod>>,
    image_events: Mutex<Option<mpsc::UnboundedSender<ImageEvent>>>,
    pod_events: Mutex<Option<mpsc::UnboundedSender<PodEvent>>>,
    pub patched_images: Mutex<Vec<(ObjectRef, ImageInfo)>>,
    pub patched_pods: Mutex<Vec<(ObjectRef, ImageInfo)>>,
}

impl FakeClusterClient {
    pub fn new(images: Vec<ClusterImage>, pods: Vec<ClusterPod>) -> Self {
        FakeClusterClient {
            images: Mutex::new(images),
            pods: Mutex::new(pods),
            image_events: Mutex::new(None),
            pod_events: Mutex::new(None),
            patched_images: Mutex::new(Vec::new()),
            patched_pods: Mutex::new(Vec::new()),
        }
    }

    /// Pushes an image event to whichever watcher is currently attached,
    /// if any. Silently dropped if nothing is watching, matching a
    /// real informer with no subscribers.
    pub async fn push_image_event(&self, event: ImageEvent) {
        if let Some(tx) = self.image_events.lock().await.as_ref() {
            let _ = tx.send(event);
        }
    }

    pub async fn push_pod_event(&self, event: PodEvent) {
        if let Some(tx) = self.pod_events.lock().await.as_ref() {
            let _ = tx.send(event);
        }
    }
}

#[async_trait]
impl ClusterClient for FakeClusterClient {
    async fn list_images(&self) -> Result<Vec<ClusterImage>> {
        Ok(self.images.lock().await.clone())
    }

    async fn watch_images(&self) -> Result<ImageEventStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.image_events.lock().await = Some(tx);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn list_pods(&self) -> Result<Vec<ClusterPod>> {
        Ok(self.pods.lock().await.clone())
    }

    async fn watch_pods(&self) -> Result<PodEventStream> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.pod_events.lock().await = Some(tx);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn patch_image_annotations(
        &self,
        namespace: &str,
        name: &str,
        info: ImageInfo,
    ) -> Result<()> {
        self.patched_images.lock().await.push((
            ObjectRef {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            info,
        ));
        Ok(())
    }

    async fn patch_pod_annotations(
        &self,
        namespace: &str,
        name: &str,
        info: ImageInfo,
    ) -> Result<()> {
        self.patched_pods.lock().await.push((
            ObjectRef {
                namespace: namespace.to_string(),
                name: name.to_string(),
            },
            info,
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_stream::StreamExt;

    #[tokio::test]
    async fn watch_images_delivers_pushed_events() {
        let client = FakeClusterClient::new(vec![], vec![]);
        let mut stream = client.watch_images().await.unwrap();

        client
            .push_image_event(ImageEvent::Deleted(ObjectRef {
                namespace: "ns".to_string(),
                name: "img".to_string(),
            }))
            .await;

        let event = stream.next().await.unwrap();
        assert_eq!(
            event,
            ImageEvent::Deleted(ObjectRef {
                namespace: "ns".to_string(),
                name: "img".to_string()
            })
        );
    }

    #[tokio::test]
    async fn patch_image_annotations_is_recorded() {
        let client = FakeClusterClient::new(vec![], vec![]);
        client
            .patch_image_annotations("ns", "img", ImageInfo::default())
            .await
            .unwrap();
        assert_eq!(client.patched_images.lock().await.len(), 1);
    }
}
