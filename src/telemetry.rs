// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::{filter::Targets, fmt, prelude::*};

/// Maps the verbosity given in the command line to a log level.
pub fn tracing_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

pub fn setup_tracing(verbosity: u8) -> Result<()> {
    let tracing_level = tracing_level(verbosity);

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_line_number(false))
        .with(Targets::new().with_target("event_replay", tracing_level))
        .try_init()?;

    Ok(())
}
