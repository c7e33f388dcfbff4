// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The arbiter process: the assignment HTTP API, the cluster watcher
//! that backs the reconciliation sweep's identity lookups, and the
//! periodic sweep and reaper loops.

pub mod config;
pub mod http;
pub mod index;
pub mod reaper;
pub mod reconcile;
pub mod watch;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use ose_assign::AssignmentTable;
use ose_common::Annotator;
use ose_hub_client::HubClient;
use ose_orchestrator::ClusterClient;

pub use config::ArbiterConfig;

/// Assembles and runs the arbiter to completion (i.e. until the process
/// is killed -- there is no graceful top-level shutdown signal wired up
/// here beyond what each subsystem already does on drop).
pub async fn run<C: ClusterClient + 'static>(config: ArbiterConfig, cluster: Arc<C>) -> anyhow::Result<()> {
    let table = Arc::new(AssignmentTable::new(config.assign));
    let index = Arc::new(index::ClusterImageIndex::new());
    let hub = Arc::new(HubClient::new(config.hub.clone()).context("constructing analysis-service client")?);
    hub.login().await.context("logging into analysis service")?;

    let annotator = Annotator::new(config.scanner_version.clone(), config.hub.host.clone());
    let reconciler = Arc::new(reconcile::Reconciler {
        hub: hub.clone(),
        cluster: cluster.clone(),
        index: index.clone(),
        table: table.clone(),
        annotator,
    });

    ose_ore::task::spawn(
        || "cluster-watch",
        watch::run(cluster.clone(), index.clone(), table.clone()),
    );

    ose_ore::task::spawn(|| "reaper", reaper::run(table.clone(), config.reconcile_interval));

    let reconcile_workers = config.reconcile_workers;
    ose_ore::task::spawn(|| "reconcile-sweep", {
        let reconciler = reconciler.clone();
        let interval = config.reconcile_interval;
        async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                reconciler.clone().sweep_once(reconcile_workers).await;
            }
        }
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config::LISTEN_PORT));
    let app = http::router(Arc::new(http::AppState { table }));
    tracing::info!(%addr, "arbiter listening");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await
        .context("arbiter HTTP server failed")?;

    hub.logout().await.context("logging out of analysis service")?;
    Ok(())
}
