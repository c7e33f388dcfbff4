// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The controller binary: parses the shared `BDS_*` CLI/env surface
//! plus the two flags the original delegated to the cluster runtime
//! (this node's identity, and where to reach the arbiter), validates
//! connectivity, and runs the per-image pipeline until killed.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ose_controller::ControllerConfig;
use ose_hub_client::HubConfig;
use ose_orchestrator::FakeClusterClient;
use ose_runtime::MockRuntime;

/// The shared flags, plus `--id`/`BDS_CONTROLLER_ID` (this node's
/// identity -- the original relied on the cluster runtime's own
/// hostname assignment for this) and `--arbiter-url`/`BDS_ARBITER_URL`
/// (a new addition: the controller has no other way to learn where the
/// arbiter listens).
#[derive(Debug, Parser)]
#[command(name = "ose-controller", disable_help_flag = true)]
struct Cli {
    #[arg(long = "id", env = "BDS_CONTROLLER_ID")]
    controller_id: String,

    #[arg(long = "arbiter-url", env = "BDS_ARBITER_URL")]
    arbiter_url: String,

    #[arg(long = "host", short = 'h', env = "BDS_HOST")]
    host: String,

    #[arg(long = "port", short = 'p', env = "BDS_PORT")]
    port: String,

    #[arg(long = "scheme", short = 's', env = "BDS_SCHEME", default_value = "https")]
    scheme: String,

    #[arg(long = "user", short = 'u', env = "BDS_USER")]
    user: String,

    #[arg(long = "password", short = 'w', env = "BDS_PASSWORD")]
    password: String,

    #[arg(long = "scanner", env = "BDS_SCANNER")]
    scanner: String,

    #[arg(long = "workers", env = "BDS_WORKERS", default_value_t = 1)]
    workers: usize,

    #[arg(long = "insecure-https", short = 'i', env = "BDS_INSECURE_HTTPS")]
    insecure_https: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let hub = HubConfig::new(
        cli.host,
        cli.port,
        cli.scheme,
        cli.user,
        cli.password,
        cli.insecure_https,
    );
    let config = ControllerConfig::new(cli.controller_id, cli.arbiter_url, hub, cli.scanner, cli.workers);

    // The cluster-API and container-runtime clients are external
    // collaborators out of scope here; production deployments supply
    // their own `ClusterClient` and `ContainerRuntime`. This wires
    // in-memory stand-ins so the controller is runnable standalone,
    // mirroring the arbiter binary's own `FakeClusterClient` wiring.
    let cluster = Arc::new(FakeClusterClient::new(Vec::new(), Vec::new()));
    let runtime = Arc::new(MockRuntime::new(Vec::new()));

    match ose_controller::run(config, cluster, runtime).await {
        Ok(()) => ExitCode::from(0),
        Err(error) => {
            tracing::error!(%error, "controller exited with an error");
            ExitCode::from(1)
        }
    }
}
