// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Module for the event collector.
//!
//! # Description
//!
//! The collector walks the history of a single job, from its start block to its end block (or the head of the chain
//! when the job is open ended), in consecutive windows of a fixed size. Windows are requested one after the other.
//! A window that fails to be fetched or decoded is logged and skipped; the remaining windows are still processed,
//! so a single bad range never aborts the replay of a job.

use crate::{
    Event,
    chain_client::{BlockWindow, ChainClient, ChainClientProvider},
    event_decoder::decode_log,
    registry::ContractJob,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{debug, error, info};

pub struct EventCollector {
    clients: Arc<dyn ChainClientProvider>,
    block_range: u64,
}

impl EventCollector {
    pub fn new(clients: Arc<dyn ChainClientProvider>, block_range: u64) -> Self {
        Self {
            clients,
            block_range: block_range.max(1),
        }
    }

    /// Fetches and decodes every log of `job`.
    ///
    /// # Description
    ///
    /// Only failures that prevent the history from being walked at all are returned as errors: a chain without a
    /// client, or a head that can't be retrieved. The events are returned in window order, and within a window in
    /// the order given by the node.
    pub async fn fetch(&self, job: &ContractJob) -> Result<Vec<Event>> {
        let config = &job.config;
        let client = self
            .clients
            .client(config.chain)
            .with_context(|| format!("Failed to get a client for {}", job.name))?;

        let upper_block = match config.end_block {
            Some(end_block) => end_block,
            None => client
                .block_number()
                .await
                .with_context(|| format!("Failed to resolve the upper block of {}", job.name))?,
        };

        info!(
            "[{}] Fetching events from block {} to {} from contract {} with signature {}",
            config.chain.id(),
            config.start_block,
            upper_block,
            config.contract_address,
            config.event_signature
        );

        let mut events = Vec::new();
        for window in block_windows(config.start_block, upper_block, self.block_range) {
            match self.fetch_window(client.as_ref(), job, window).await {
                Ok(window_events) => {
                    debug!(
                        "[{}] Blocks [{}-{}]: {} events",
                        config.chain.id(),
                        window.from_block,
                        window.to_block,
                        window_events.len()
                    );
                    events.extend(window_events);
                }
                Err(e) => {
                    error!(
                        "[{}] Error fetching history for blocks [{}-{}] of {}: {e:#}",
                        config.chain.id(),
                        window.from_block,
                        window.to_block,
                        job.name
                    );
                }
            }
        }

        info!("Found {} events for {}", events.len(), job.name);

        Ok(events)
    }

    /// A window is all or nothing: if a single log fails to decode, none of its events are kept.
    async fn fetch_window(
        &self,
        client: &dyn ChainClient,
        job: &ContractJob,
        window: BlockWindow,
    ) -> Result<Vec<Event>> {
        let logs = client
            .get_logs(job.config.contract_address, job.config.topic0(), window)
            .await?;

        logs.iter()
            .map(|log| {
                decode_log(job.config.chain, job.contract_name(), &job.config.event, log)
                    .map_err(anyhow::Error::from)
            })
            .collect()
    }
}

/// Splits `[start_block, end_block]` in consecutive windows of `block_range` blocks.
///
/// # Description
///
/// Every window but the last one spans exactly `block_range` blocks; the last one is clamped to `end_block`. The
/// windows don't overlap and leave no gaps. When `start_block > end_block` there is nothing to walk.
pub fn block_windows(
    start_block: u64,
    end_block: u64,
    block_range: u64,
) -> impl Iterator<Item = BlockWindow> {
    let block_range = block_range.max(1);
    let mut next_block = (start_block <= end_block).then_some(start_block);

    std::iter::from_fn(move || {
        let from_block = next_block?;
        let to_block = from_block.saturating_add(block_range - 1).min(end_block);
        next_block = (to_block < end_block).then(|| to_block + 1);
        Some(BlockWindow {
            from_block,
            to_block,
        })
    })
}
