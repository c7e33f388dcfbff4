// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Named task spawning.
//!
//! Every background loop in the arbiter and the controller (the HTTP
//! server, the reconciliation sweep, the per-worker scan loop, the cluster
//! watchers) is spawned through here so that a panic or a `tracing` span is
//! always attributable to a human-readable name rather than `tokio-runtime-worker`.

use std::future::Future;

use tokio::task::JoinHandle;

/// Spawns a future as a named, detached tokio task.
///
/// `name` is evaluated lazily so call sites can pass a `format!` without
/// paying for it unless the task actually panics and tracing needs it.
pub fn spawn<Name, Fut>(name: impl FnOnce() -> Name, future: Fut) -> JoinHandle<Fut::Output>
where
    Name: AsRef<str>,
    Fut: Future + Send + 'static,
    Fut::Output: Send + 'static,
{
    let name = name().as_ref().to_string();
    tracing::debug!(task = %name, "spawning task");
    tokio::spawn(async move {
        let output = future.await;
        tracing::debug!(task = %name, "task finished");
        output
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn spawned_task_runs_to_completion() {
        let handle = spawn(|| "test-task", async { 1 + 1 });
        assert_eq!(handle.await.unwrap(), 2);
    }
}
