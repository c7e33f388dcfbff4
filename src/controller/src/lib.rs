// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The controller node agent: one process per node, responsible for
//! discovering images local to that node, negotiating each scan with
//! the arbiter, and launching the scanner container.

pub mod arbiter_client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod pipeline;

use std::sync::Arc;

use anyhow::Context;
use ose_common::Annotator;
use ose_dispatcher::Dispatcher;
use ose_hub_client::HubClient;
use ose_orchestrator::ClusterClient;
use ose_runtime::ContainerRuntime;

pub use arbiter_client::ArbiterClient;
pub use config::ControllerConfig;
pub use pipeline::{Agent, ScanJob};

/// Assembles and runs the controller to completion: validates arbiter,
/// analysis-service, and local-runtime connectivity, then serves
/// cluster discovery until killed.
pub async fn run<C, R>(config: ControllerConfig, cluster: Arc<C>, runtime: Arc<R>) -> anyhow::Result<()>
where
    C: ClusterClient + 'static,
    R: ContainerRuntime + 'static,
{
    config.validate().context("invalid controller configuration")?;

    let arbiter = Arc::new(
        ArbiterClient::new(config.arbiter_url.clone()).context("constructing arbiter client")?,
    );
    let hub = Arc::new(HubClient::new(config.hub.clone()).context("constructing analysis-service client")?);
    hub.login().await.context("logging into analysis service")?;

    runtime
        .list_images()
        .await
        .context("validating local container-runtime connectivity")?;
    arbiter
        .heartbeat(&config.controller_id, config.worker_count as i64)
        .await
        .context("initial heartbeat to arbiter")?;

    // The scanner image reference doubles as its version string for the
    // annotation schema, matching how the arbiter's own `--scanner` flag
    // is used: both sides must agree on this value for the pre-filter's
    // "already scanned with the current scanner" check to ever hold.
    let annotator = Annotator::new(config.scanner_image.clone(), config.hub.host.clone());
    let worker_count = config.worker_count.max(1);
    let hub_for_logout = hub.clone();
    let agent = Arc::new(Agent::new(config, cluster, runtime, arbiter, hub, annotator));

    let dispatch_agent = agent.clone();
    let dispatcher = Arc::new(Dispatcher::spawn(worker_count, worker_count, move |job: ScanJob| {
        let agent = dispatch_agent.clone();
        async move { agent.handle_job(job).await }
    }));

    discovery::run(agent, dispatcher)
        .await
        .context("wiring cluster discovery")?;

    tracing::info!("controller running, watching for scan work");
    let _ = tokio::signal::ctrl_c().await;

    hub_for_logout
        .logout()
        .await
        .context("logging out of analysis service")?;
    Ok(())
}
