// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Exponential backoff for reconnect loops.
//!
//! Used by the controller's arbiter client and the cluster watchers when
//! re-establishing a connection after a transient failure.

use std::time::Duration;

use futures::Stream;

/// Builder for a backoff sequence: `initial_backoff`, doubling each step,
/// clamped to `max_backoff`.
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    initial_backoff: Duration,
    max_backoff: Duration,
    factor: u32,
}

impl Default for Retry {
    fn default() -> Self {
        Retry {
            initial_backoff: Duration::from_millis(125),
            max_backoff: Duration::MAX,
            factor: 2,
        }
    }
}

impl Retry {
    /// Caps the backoff at `max`. The original Go implementation just slept
    /// a fixed 30s between retries; we keep that as the common case by
    /// calling `clamp_backoff` with a small cap, but allow growth for
    /// reconnect loops that should back off harder under sustained failure.
    pub fn clamp_backoff(mut self, max: Duration) -> Self {
        self.max_backoff = max;
        self
    }

    /// Turns this configuration into an infinite stream that, when polled,
    /// sleeps for the next backoff duration before yielding `()`. Each
    /// `.next().await` is one retry attempt's worth of delay.
    pub fn into_retry_stream(self) -> impl Stream<Item = ()> {
        futures::stream::unfold(self.initial_backoff, move |backoff| async move {
            tokio::time::sleep(backoff).await;
            let next = backoff.saturating_mul(self.factor).min(self.max_backoff);
            Some(((), next))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_and_clamps() {
        let retry = Retry::default().clamp_backoff(Duration::from_secs(1));
        let mut stream = Box::pin(retry.into_retry_stream());
        for _ in 0..5 {
            stream.next().await.unwrap();
        }
    }
}
