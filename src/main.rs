// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

use anyhow::Result;
use event_replay::{
    ReplayApp, configuration::ReplayConfiguration, telemetry::setup_tracing,
};
use tracing::error;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ReplayConfiguration::parse();
    setup_tracing(config.verbosity)?;

    let app = ReplayApp::build_app(&config).await?;

    // Run the replay. On failure, the process exits without closing the storage.
    match app.run().await {
        Ok(_) => app.shutdown().await,
        Err(e) => {
            error!("Error retrieving contract history: {e:#}");
            Err(e)
        }
    }
}
