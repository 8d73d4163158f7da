// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Module that handles the connection to the PostgreSQL database.
//!
//! The events table is expected to exist already, with a unique constraint on (chain_id, transaction_hash,
//! log_index). Chunks are sent as a single multi-row `INSERT ... ON CONFLICT` statement.

use crate::{EventRow, constants::*, storage::Storage};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder, postgres::PgPoolOptions};
use tracing::debug;

const INSERT_EVENTS: &str = "INSERT INTO events (chain_id, block_number, transaction_index, log_index, \
     contract_address, event_name, event_args, block_hash, transaction_hash, sort_key) ";

const ON_CONFLICT_UPDATE: &str = " ON CONFLICT (chain_id, transaction_hash, log_index) DO UPDATE SET \
     block_number = EXCLUDED.block_number, \
     transaction_index = EXCLUDED.transaction_index, \
     contract_address = EXCLUDED.contract_address, \
     event_name = EXCLUDED.event_name, \
     event_args = EXCLUDED.event_args, \
     block_hash = EXCLUDED.block_hash, \
     sort_key = EXCLUDED.sort_key";

#[derive(Clone)]
pub struct PostgreSqlStorage {
    conn: Pool<Postgres>,
}

/// PostgreSQL has no unsigned integers, numbers are bound as BIGINT.
struct PgEventRow<'a> {
    chain_id: i64,
    block_number: i64,
    transaction_index: i64,
    log_index: i64,
    row: &'a EventRow,
}

impl<'a> TryFrom<&'a EventRow> for PgEventRow<'a> {
    type Error = anyhow::Error;

    fn try_from(row: &'a EventRow) -> Result<Self> {
        let to_bigint = |value: u64, name: &str| {
            i64::try_from(value)
                .with_context(|| format!("The {name} of {} doesn't fit in a BIGINT", row.sort_key))
        };

        Ok(Self {
            chain_id: to_bigint(row.chain_id, "chain id")?,
            block_number: to_bigint(row.block_number, "block number")?,
            transaction_index: to_bigint(row.transaction_index, "transaction index")?,
            log_index: to_bigint(row.log_index, "log index")?,
            row,
        })
    }
}

impl PostgreSqlStorage {
    pub fn new(conn: Pool<Postgres>) -> Self {
        Self { conn }
    }

    pub async fn connect(database_url: &str) -> Result<Self> {
        let conn = PgPoolOptions::new()
            .max_connections(POSTGRES_MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .context("Failed to connect to PostgreSQL")?;

        debug!("Database connection successfully established");

        Ok(Self::new(conn))
    }
}

#[async_trait]
impl Storage for PostgreSqlStorage {
    async fn upsert_events(&self, rows: &[EventRow]) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let rows = rows
            .iter()
            .map(PgEventRow::try_from)
            .collect::<Result<Vec<_>>>()?;

        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(INSERT_EVENTS);
        query.push_values(&rows, |mut values, pg_row| {
            values
                .push_bind(pg_row.chain_id)
                .push_bind(pg_row.block_number)
                .push_bind(pg_row.transaction_index)
                .push_bind(pg_row.log_index)
                .push_bind(pg_row.row.contract_address.clone())
                .push_bind(pg_row.row.event_name.clone())
                .push_bind(pg_row.row.event_args.clone())
                .push_unseparated("::jsonb")
                .push_bind(pg_row.row.block_hash.clone())
                .push_bind(pg_row.row.transaction_hash.clone())
                .push_bind(pg_row.row.sort_key.clone());
        });
        query.push(ON_CONFLICT_UPDATE);

        let result = query
            .build()
            .execute(&self.conn)
            .await
            .context("Failed to upsert the events")?;

        Ok(result.rows_affected())
    }

    async fn close(&self) -> Result<()> {
        self.conn.close().await;
        Ok(())
    }
}
