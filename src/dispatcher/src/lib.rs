// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A bounded FIFO job queue served by a fixed pool of worker tasks.
//!
//! Used both by the arbiter's periodic reconciliation sweep (a job per
//! image/pod) and the controller's per-image scan pipeline. The job
//! type itself -- the tagged `ImageScan`/`PodReconcile` variant -- is
//! defined by each caller; this crate only owns the queue and the
//! worker loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// A running worker pool. Dropping this without calling [`Dispatcher::shutdown`]
/// abandons the workers; they keep running detached until their queue is
/// dropped and drained, same as any other tokio task leaked this way.
pub struct Dispatcher<J> {
    sender: mpsc::Sender<J>,
    workers: Vec<JoinHandle<()>>,
}

impl<J: Send + 'static> Dispatcher<J> {
    /// Spawns `worker_count` workers pulling from a queue bounded at
    /// `queue_capacity`, each job handled by a clone of `handler`.
    pub fn spawn<F, Fut>(worker_count: usize, queue_capacity: usize, handler: F) -> Self
    where
        F: Fn(J) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        assert!(worker_count > 0, "a dispatcher needs at least one worker");

        let (sender, receiver) = mpsc::channel(queue_capacity);
        let receiver = Arc::new(Mutex::new(receiver));
        let handler = Arc::new(handler);

        let workers = (0..worker_count)
            .map(|id| {
                let receiver = receiver.clone();
                let handler = handler.clone();
                ose_ore::task::spawn(
                    move || format!("dispatcher-worker-{id}"),
                    async move {
                        loop {
                            let job = receiver.lock().await.recv().await;
                            match job {
                                Some(job) => handler(job).await,
                                None => break,
                            }
                        }
                    },
                )
            })
            .collect();

        Dispatcher { sender, workers }
    }

    /// Enqueues a job, waiting if the queue is full.
    pub async fn submit(&self, job: J) -> Result<(), mpsc::error::SendError<J>> {
        self.sender.send(job).await
    }

    /// Enqueues a job without waiting, failing if the queue is full or
    /// closed. Used by admission paths that must not block.
    pub fn try_submit(&self, job: J) -> Result<(), mpsc::error::TrySendError<J>> {
        self.sender.try_send(job)
    }

    /// Closes the queue so workers finish whatever they're already
    /// running, drain whatever's still buffered, and exit -- then waits
    /// up to `grace_period` for them to do so. Workers still running
    /// past the grace period are abandoned, not forcibly aborted.
    pub async fn shutdown(self, grace_period: Duration) {
        drop(self.sender);
        let drain = futures::future::join_all(self.workers);
        match tokio::time::timeout(grace_period, drain).await {
            Ok(_) => debug!("dispatcher drained cleanly"),
            Err(_) => warn!("dispatcher grace period elapsed with workers still running"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn jobs_are_handled_by_the_pool() {
        let processed = Arc::new(AtomicUsize::new(0));
        let counter = processed.clone();
        let dispatcher = Dispatcher::spawn(4, 16, move |_job: i32| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        for i in 0..10 {
            dispatcher.submit(i).await.unwrap();
        }

        dispatcher.shutdown(Duration::from_secs(5)).await;
        assert_eq!(processed.load(Ordering::SeqCst), 10);
    }

    #[tokio::test]
    async fn shutdown_waits_for_in_flight_work_within_grace_period() {
        let done = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let worker_flag = done.clone();
        let dispatcher = Dispatcher::spawn(1, 4, move |_job: ()| {
            let worker_flag = worker_flag.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                worker_flag.store(true, Ordering::SeqCst);
            }
        });

        dispatcher.submit(()).await.unwrap();
        dispatcher.shutdown(Duration::from_secs(5)).await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn shutdown_abandons_work_past_the_grace_period() {
        let dispatcher = Dispatcher::spawn(1, 4, |_job: ()| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });
        dispatcher.submit(()).await.unwrap();
        // Should return promptly once the short grace period elapses,
        // not block for the full 60s job.
        dispatcher.shutdown(Duration::from_millis(50)).await;
    }
}
