// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Module that handles the command line interface.

use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(author = "Bilinear Labs")]
#[command(version = "0.1.0")]
#[command(about = "Event replay")]
#[command(
    long_about = "Replays the history of the list contracts from Base, Optimism and Ethereum into a database.\n\
    RPC endpoints, contract addresses and the database URL are read from the environment (a .env file is honoured)."
)]
pub struct ReplayArgs {
    #[arg(
        short,
        long,
        help = "Path to a configuration file (YAML, JSON or TOML). Environment variables take precedence over its values."
    )]
    pub config: Option<String>,
    #[arg(
        long,
        help = "Block range for the get_Logs requests. Default: 2000"
    )]
    pub block_range: Option<u64>,
    #[arg(
        long,
        help = "Number of events upserted per database statement. Default: 1"
    )]
    pub batch_size: Option<usize>,
    #[arg(
        long,
        help = "Pause in milliseconds between two database chunks. Default: 0"
    )]
    pub chunk_delay_ms: Option<u64>,
    #[arg(
        short,
        long,
        help = "Verbosity level. 0 = WARN, 1 = INFO (default), 2 = DEBUG, 3 = TRACE",
        default_value_t = 1
    )]
    pub verbosity: u8,
}
