// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// barcodelens — HTTP service that reads barcodes from photos and looks the
// products up in Open Food Facts.

mod http;
mod multipart;

use barcodelens_core::config::ServiceConfig;
use barcodelens_core::error::{BarcodelensError, Result};
use barcodelens_scan::ScanOrchestrator;
use tracing::{error, info};

use http::ScanServer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "barcodelens starting");

    if let Err(e) = run().await {
        error!(error = %e, "barcodelens exited with an error");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let config = ServiceConfig::from_env()?;
    let orchestrator = ScanOrchestrator::from_config(&config)?;

    let mut server = ScanServer::new(config, orchestrator);
    let addr = server.start().await?;
    info!(%addr, "ready for scans");

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| BarcodelensError::Server(format!("waiting for Ctrl-C: {e}")))?;
    info!("shutdown requested");

    server.stop().await
}
