// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! A trailing debounce keyed by object identity: a burst of events for
//! the same key within [`DEBOUNCE_WINDOW`] collapses to the last one.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(2);

/// Spawns a task that reads `key`+`value` pairs from `input` and emits
/// each key's most recent value on `output` once [`DEBOUNCE_WINDOW`] has
/// passed since that key was last seen, matching an informer's
/// add/update resync behavior without a fixed resync period.
pub fn debounce<K, V>(
    mut input: mpsc::UnboundedReceiver<(K, V)>,
) -> mpsc::UnboundedReceiver<V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();

    ose_ore::task::spawn(
        || "cluster-watch-debounce",
        async move {
            let mut pending: HashMap<K, (V, Instant)> = HashMap::new();
            loop {
                let sleep_for = pending
                    .values()
                    .map(|(_, seen_at)| {
                        DEBOUNCE_WINDOW.saturating_sub(seen_at.elapsed())
                    })
                    .min()
                    .unwrap_or(Duration::from_secs(3600));

                tokio::select! {
                    received = input.recv() => {
                        match received {
                            Some((key, value)) => {
                                pending.insert(key, (value, Instant::now()));
                            }
                            None => {
                                for (_, (value, _)) in pending.drain() {
                                    let _ = tx.send(value);
                                }
                                return;
                            }
                        }
                    }
                    _ = tokio::time::sleep(sleep_for) => {
                        let ready: Vec<K> = pending
                            .iter()
                            .filter(|(_, (_, seen_at))| seen_at.elapsed() >= DEBOUNCE_WINDOW)
                            .map(|(k, _)| k.clone())
                            .collect();
                        for key in ready {
                            if let Some((value, _)) = pending.remove(&key) {
                                let _ = tx.send(value);
                            }
                        }
                    }
                }
            }
        },
    );

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn collapses_a_burst_to_the_last_value() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut out = debounce::<&'static str, i32>(rx);

        tx.send(("img-1", 1)).unwrap();
        tx.send(("img-1", 2)).unwrap();
        tx.send(("img-1", 3)).unwrap();

        tokio::time::advance(DEBOUNCE_WINDOW + Duration::from_millis(10)).await;

        let value = out.recv().await.unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_keys_are_not_coalesced_together() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut out = debounce::<&'static str, i32>(rx);

        tx.send(("img-1", 1)).unwrap();
        tx.send(("img-2", 2)).unwrap();

        tokio::time::advance(DEBOUNCE_WINDOW + Duration::from_millis(10)).await;

        let mut seen = vec![out.recv().await.unwrap(), out.recv().await.unwrap()];
        seen.sort();
        assert_eq!(seen, vec![1, 2]);
    }
}
