// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Module that handles the connection to the DuckDB database.

use crate::{EventRow, constants::*, storage::Storage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use duckdb::{Connection, params};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Implementation of the Storage trait for the DuckDB database.
///
/// # Description
///
/// The DuckDBStorage object owns a single connection to the database, shared behind a lock. The schema is created
/// the first time a database is opened. Every chunk of rows is written within a transaction.
pub struct DuckDBStorage {
    conn: Mutex<Connection>,
    db_path: String,
}

impl DuckDBStorage {
    pub fn with_db(db_path: &str) -> Result<DuckDBStorage> {
        let conn = Connection::open(db_path).with_context(|| {
            format!(
                "Failed to open database: {db_path}. Check that the DB file is not locked by another process."
            )
        })?;

        let table_exists: bool = conn.query_row(
            r#"
                SELECT
                    count(*)
                FROM
                    information_schema.tables
                WHERE
                    table_schema = 'main'
                    AND table_name = ?
                    AND table_type = 'BASE TABLE';"#,
            [DUCKDB_BASE_TABLE_NAME],
            |row| row.get(0),
        )?;

        if !table_exists {
            DuckDBStorage::create_db_base(&conn)?;
        } else {
            let version: String = conn
                .query_row(
                    format!("SELECT version FROM {DUCKDB_BASE_TABLE_NAME} LIMIT 1").as_str(),
                    [],
                    |row| row.get(0),
                )
                .with_context(|| {
                    format!("Failed to retrieve version from {DUCKDB_BASE_TABLE_NAME} table")
                })?;

            if version != DUCKDB_SCHEMA_VERSION {
                warn!("Your database is out of date. Please run the database upgrade.");
            }
        }

        debug!("Database connection successfully established");

        Ok(DuckDBStorage {
            conn: Mutex::new(conn),
            db_path: db_path.to_string(),
        })
    }

    fn create_db_base(conn: &Connection) -> Result<()> {
        let statement = format!(
            "
            BEGIN;
            CREATE TABLE IF NOT EXISTS {DUCKDB_BASE_TABLE_NAME}(
                version VARCHAR NOT NULL,
                PRIMARY KEY (version)
            );
            CREATE TABLE IF NOT EXISTS {EVENTS_TABLE_NAME}(
                chain_id UBIGINT NOT NULL,
                block_number UBIGINT NOT NULL,
                transaction_index UBIGINT NOT NULL,
                log_index UBIGINT NOT NULL,
                contract_address VARCHAR(42) NOT NULL,
                event_name VARCHAR NOT NULL,
                event_args VARCHAR NOT NULL,
                block_hash VARCHAR(66) NOT NULL,
                transaction_hash VARCHAR(66) NOT NULL,
                sort_key VARCHAR(27) NOT NULL,
                PRIMARY KEY (chain_id, transaction_hash, log_index)
            );
            INSERT INTO {DUCKDB_BASE_TABLE_NAME} (version) VALUES ('{DUCKDB_SCHEMA_VERSION}');
            COMMIT;"
        );
        conn.execute_batch(&statement)?;

        info!("Database schema created (version {DUCKDB_SCHEMA_VERSION})");

        Ok(())
    }

    /// Path of the database file, `:memory:` for in-memory databases.
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Number of rows in the events table.
    pub fn count_events(&self) -> Result<u64> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire lock: {}", e))?;
        let count: i64 = conn.query_row(
            format!("SELECT count(*) FROM {EVENTS_TABLE_NAME}").as_str(),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[async_trait]
impl Storage for DuckDBStorage {
    async fn upsert_events(&self, rows: &[EventRow]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire lock: {}", e))?;
        let tx = conn.transaction()?;

        let mut affected = 0;
        {
            let mut statement = tx.prepare(&format!(
                "INSERT INTO {EVENTS_TABLE_NAME} (chain_id, block_number, transaction_index, log_index, \
                 contract_address, event_name, event_args, block_hash, transaction_hash, sort_key) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
                 ON CONFLICT (chain_id, transaction_hash, log_index) DO UPDATE SET \
                 block_number = EXCLUDED.block_number, \
                 transaction_index = EXCLUDED.transaction_index, \
                 contract_address = EXCLUDED.contract_address, \
                 event_name = EXCLUDED.event_name, \
                 event_args = EXCLUDED.event_args, \
                 block_hash = EXCLUDED.block_hash, \
                 sort_key = EXCLUDED.sort_key"
            ))?;

            for row in rows {
                affected += statement.execute(params![
                    row.chain_id,
                    row.block_number,
                    row.transaction_index,
                    row.log_index,
                    row.contract_address,
                    row.event_name,
                    row.event_args,
                    row.block_hash,
                    row.transaction_hash,
                    row.sort_key,
                ])?;
            }
        }

        tx.commit()?;

        Ok(affected as u64)
    }

    async fn close(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Failed to acquire lock: {}", e))?;
        conn.execute_batch("CHECKPOINT;")?;
        debug!("Database {} checkpointed", self.db_path);
        Ok(())
    }
}
