// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The arbiter binary: parses the shared `BDS_*` CLI/env surface,
//! validates analysis-service connectivity, and runs the assignment API
//! plus reconciliation loop until killed.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use ose_arbiter::ArbiterConfig;
use ose_hub_client::HubConfig;
use ose_orchestrator::FakeClusterClient;

/// The shared `BDS_HOST, BDS_PORT, BDS_SCHEME, BDS_USER, BDS_PASSWORD,
/// BDS_SCANNER, BDS_WORKERS, BDS_INSECURE_HTTPS` surface, each with a
/// matching flag; flag presence takes precedence over env.
#[derive(Debug, Parser)]
#[command(name = "ose-arbiter", disable_help_flag = true)]
struct Cli {
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
    scanner_version: String,

    /// Accepted for CLI-surface parity with the controller binary; the
    /// arbiter's own concurrency (5 reconciliation workers) is not
    /// user-configurable.
    #[arg(long = "workers", env = "BDS_WORKERS", default_value_t = 5)]
    #[allow(dead_code)]
    workers: u32,

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
    let config = ArbiterConfig::new(hub, cli.scanner_version);

    // The cluster-API client is an external collaborator out of scope
    // here; production deployments supply their own `ClusterClient`.
    // This wires the in-memory fake so the arbiter is runnable
    // standalone.
    let cluster = Arc::new(FakeClusterClient::new(Vec::new(), Vec::new()));

    match ose_arbiter::run(config, cluster).await {
        Ok(()) => ExitCode::from(0),
        Err(error) => {
            tracing::error!(%error, "arbiter exited with an error");
            ExitCode::from(1)
        }
    }
}
