// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Library of the event-replay crate.
//!
//! # Description
//!
//! The crate replays the history of a fixed set of contract events from several EVM chains into a relational
//! store. The pipeline is strictly sequential: the [ReplayApp] walks the [registry] in business order, the
//! [EventCollector] fetches and decodes the logs of each job, and the [EventProcessor] upserts the canonical
//! events in chunks.

pub mod chain;
pub use chain::Chain;
pub mod chain_client;
pub mod cli;
pub mod configuration;
pub mod event;
pub use event::{Event, EventArg, EventArgs, EventRow};
pub mod event_collector;
pub use event_collector::EventCollector;
pub mod event_decoder;
pub mod event_processor;
pub use event_processor::EventProcessor;
pub mod registry;
pub mod replay_app;
pub use replay_app::ReplayApp;
pub mod storage {
    pub mod storage_api;
    pub use storage_api::{Storage, open_storage};
    pub mod storage_duckdb;
    pub use storage_duckdb::DuckDBStorage;
    pub mod storage_postgresql;
    pub use storage_postgresql::PostgreSqlStorage;
}
pub use storage::Storage;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

/// Module with constants used throughout the application.
pub mod constants {
    use std::time::Duration;

    /// Default block range for the log fetcher. This range is used in every get_Logs call.
    pub const DEFAULT_BLOCK_RANGE: u64 = 2000;
    /// Default number of rows sent to the storage in a single upsert.
    pub const DEFAULT_BATCH_SIZE: usize = 1;
    /// Default pause between two chunk uploads.
    pub const DEFAULT_CHUNK_DELAY: Duration = Duration::ZERO;
    /// Maximum number of retries issued by the transport when the RPC server rate limits us.
    pub const DEFAULT_RPC_MAX_RETRIES: u32 = 3;
    /// Initial backoff in milliseconds for rate limited RPC requests.
    pub const DEFAULT_RPC_BACKOFF_TIME: u64 = 1000;
    /// Compute units per second assumed for the RPC servers.
    pub const DEFAULT_RPC_COMPUTE_UNITS: u64 = 330;
    /// Name of the table that holds the replayed events.
    pub const EVENTS_TABLE_NAME: &str = "events";
    /// Base table name for the DuckDB database.
    pub const DUCKDB_BASE_TABLE_NAME: &str = "replay_info";
    /// Schema version for the DuckDB database.
    pub const DUCKDB_SCHEMA_VERSION: &str = "0.1.0";
    /// Maximum number of pooled connections to PostgreSQL.
    pub const POSTGRES_MAX_CONNECTIONS: u32 = 4;
}

/// Exit codes used when the process can't start.
pub mod error_codes {
    pub const ERROR_CODE_FAILED_TO_LOAD_CONFIGURATION: i32 = 2;
    pub const ERROR_CODE_INVALID_REGISTRY: i32 = 3;
    pub const ERROR_CODE_DATABASE_UNAVAILABLE: i32 = 4;
}
