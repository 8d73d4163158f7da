// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

use crate::{
    EventRow,
    storage::{DuckDBStorage, PostgreSqlStorage},
};
use anyhow::Result;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::info;

/// Trait that defines the API between the loader and the storage.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Inserts the given rows in the events table, updating those whose (chain_id, transaction_hash, log_index)
    /// already exists.
    ///
    /// # Description
    ///
    /// The rows are written as a single statement or transaction: either all of them are stored or none. The
    /// returned value is the number of affected rows as reported by the backend.
    async fn upsert_events(&self, rows: &[EventRow]) -> Result<u64>;
    /// Releases the connections held by the storage.
    async fn close(&self) -> Result<()>;
}

/// Opens the storage pointed by `database_url`.
///
/// `postgres://` and `postgresql://` URLs open a PostgreSQL pool. Anything else is handled as a DuckDB database, with
/// an optional `duckdb://` prefix; `:memory:` opens an in-memory database.
pub async fn open_storage(database_url: &SecretString) -> Result<Arc<dyn Storage>> {
    let database_url = database_url.expose_secret();

    if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Using PostgreSQL storage");
        Ok(Arc::new(PostgreSqlStorage::connect(database_url).await?))
    } else {
        let db_path = database_url.strip_prefix("duckdb://").unwrap_or(database_url);
        info!("Using DuckDB storage at {db_path}");
        Ok(Arc::new(DuckDBStorage::with_db(db_path)?))
    }
}
