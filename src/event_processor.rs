// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Module for the event processor.
//!
//! The processor projects the decoded events into rows and upserts them in fixed-size chunks. A chunk that can't be
//! projected or that the storage rejects is logged and skipped, the following chunks are still sent.

use crate::{Event, EventRow, Storage};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tokio::time::sleep;
use tracing::{debug, error, info};

pub struct EventProcessor {
    storage: Arc<dyn Storage>,
    batch_size: usize,
    chunk_delay: Duration,
}

impl EventProcessor {
    pub fn new(storage: Arc<dyn Storage>, batch_size: usize, chunk_delay: Duration) -> Self {
        Self {
            storage,
            batch_size: batch_size.max(1),
            chunk_delay,
        }
    }

    /// Upserts `events` and returns the number of rows affected by the chunks that succeeded.
    pub async fn load(&self, events: &[Event]) -> Result<u64> {
        if events.is_empty() {
            return Ok(0);
        }

        let chunk_count = events.len().div_ceil(self.batch_size);
        let mut record_count = 0;

        for (index, chunk) in events.chunks(self.batch_size).enumerate() {
            info!("Uploading {} events...", chunk.len());

            match self.upload_chunk(chunk).await {
                Ok(affected) => {
                    debug!("Chunk {}/{}: {} rows affected", index + 1, chunk_count, affected);
                    record_count += affected;
                }
                Err(e) => {
                    error!(
                        "Error inserting chunk {}/{} starting at [{}] {}: {e:#}",
                        index + 1,
                        chunk_count,
                        chunk[0].chain.id(),
                        chunk[0].sort_key()
                    );
                }
            }

            if !self.chunk_delay.is_zero() && index + 1 < chunk_count {
                sleep(self.chunk_delay).await;
            }
        }

        info!("Uploaded {record_count} events");

        Ok(record_count)
    }

    async fn upload_chunk(&self, chunk: &[Event]) -> Result<u64> {
        let rows = chunk
            .iter()
            .map(EventRow::try_from)
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to serialize the event arguments")?;

        self.storage.upsert_events(&rows).await
    }

    /// Closes the underlying storage.
    pub async fn shutdown(&self) -> Result<()> {
        self.storage.close().await
    }
}
