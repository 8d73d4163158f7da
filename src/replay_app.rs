// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

use crate::{
    EventCollector, EventProcessor,
    chain_client::{ChainClientProvider, RpcClientProvider},
    configuration::ReplayConfiguration,
    error_codes,
    registry::{ContractRegistry, REPLAY_GROUPS, ReplayGroup},
    storage::open_storage,
};
use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

/// Outcome of the replay of a single group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSummary {
    pub label: &'static str,
    pub fetched: usize,
    pub stored: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub groups: Vec<GroupSummary>,
}

impl ReplaySummary {
    pub fn fetched(&self) -> usize {
        self.groups.iter().map(|group| group.fetched).sum()
    }

    pub fn stored(&self) -> u64 {
        self.groups.iter().map(|group| group.stored).sum()
    }
}

pub struct ReplayApp {
    registry: ContractRegistry,
    groups: Vec<ReplayGroup>,
    collector: EventCollector,
    processor: EventProcessor,
}

impl ReplayApp {
    /// Builds a new instance of the replay app using the configuration.
    pub async fn build_app(config: &ReplayConfiguration) -> Result<Self> {
        let registry = match ContractRegistry::new(&config.contracts) {
            Ok(registry) => registry,
            Err(e) => {
                error!("Failed to build the contract registry: {e:#}");
                std::process::exit(error_codes::ERROR_CODE_INVALID_REGISTRY);
            }
        };

        let storage = match open_storage(&config.database_url).await {
            Ok(storage) => storage,
            Err(e) => {
                error!("Failed to open the database: {e:#}");
                std::process::exit(error_codes::ERROR_CODE_DATABASE_UNAVAILABLE);
            }
        };

        let clients: Arc<dyn ChainClientProvider> = Arc::new(RpcClientProvider::new(
            config.rpc_endpoints.clone(),
            config.rpc_max_retries,
        ));

        Self::new(
            registry,
            REPLAY_GROUPS.to_vec(),
            EventCollector::new(clients, config.block_range),
            EventProcessor::new(storage, config.batch_size, config.chunk_delay),
        )
    }

    /// Every job referenced by `groups` must be registered.
    pub fn new(
        registry: ContractRegistry,
        groups: Vec<ReplayGroup>,
        collector: EventCollector,
        processor: EventProcessor,
    ) -> Result<Self> {
        if let Some(missing) = groups
            .iter()
            .flat_map(|group| group.jobs.iter())
            .find(|name| registry.get(name).is_none())
        {
            anyhow::bail!("The replay references the unknown job {missing}");
        }

        Ok(Self {
            registry,
            groups,
            collector,
            processor,
        })
    }

    /// Runs the replay.
    ///
    /// # Description
    ///
    /// Groups are replayed one after the other, in the configured order. The events of every job of a group are
    /// fetched and then loaded together, so a group is stored before the next one is fetched. Failures of a block
    /// window or a storage chunk are logged and skipped; any other error stops the replay, leaving the groups that
    /// were already loaded in the storage.
    pub async fn run(&self) -> Result<ReplaySummary> {
        info!(
            "Replaying {} groups from {} jobs",
            self.groups.len(),
            self.registry.len()
        );

        let mut summary = ReplaySummary::default();

        for group in &self.groups {
            info!("Fetching {} events...", group.label);

            let mut events = Vec::new();
            for name in group.jobs {
                let job = self
                    .registry
                    .get(name)
                    .ok_or_else(|| anyhow::anyhow!("Unknown job {name}"))?;
                events.extend(self.collector.fetch(job).await?);
            }

            info!("Fetched {} {} events", events.len(), group.label);

            let stored = self.processor.load(&events).await?;
            summary.groups.push(GroupSummary {
                label: group.label,
                fetched: events.len(),
                stored,
            });
        }

        info!(
            "Replay completed: {} events fetched, {} rows stored",
            summary.fetched(),
            summary.stored()
        );

        Ok(summary)
    }

    /// Releases the storage.
    pub async fn shutdown(&self) -> Result<()> {
        self.processor.shutdown().await
    }
}
