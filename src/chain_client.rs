// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Read clients for the supported chains.
//!
//! # Description
//!
//! The replay only needs two things from a chain: its latest block number and the logs of a contract for a block
//! range. Both are behind the [ChainClient] trait so the fetching logic can run against scripted clients in tests.
//! The [ChainClientProvider] resolves the client of a chain; the production implementation builds a new alloy HTTP
//! provider on every call, pointed at the endpoint configured for that chain.

use crate::{Chain, constants::*};
use alloy::{
    primitives::{Address, B256},
    providers::{Provider, ProviderBuilder},
    rpc::{
        client::RpcClient,
        types::{Filter, Log},
    },
    transports::{http::reqwest::Url, layers::RetryBackoffLayer},
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::{collections::HashMap, sync::Arc};
use tracing::debug;

/// Inclusive range of blocks requested in a single get_Logs call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockWindow {
    pub from_block: u64,
    pub to_block: u64,
}

impl BlockWindow {
    pub fn contains(&self, block_number: u64) -> bool {
        (self.from_block..=self.to_block).contains(&block_number)
    }
}

/// Read access to a chain.
#[async_trait]
pub trait ChainClient: Send + Sync {
    /// Latest block known by the node.
    async fn block_number(&self) -> Result<u64>;
    /// Logs emitted by `address` whose topic0 is `topic0` within the given window.
    async fn get_logs(&self, address: Address, topic0: B256, window: BlockWindow)
    -> Result<Vec<Log>>;
}

/// Resolves the client of a chain.
pub trait ChainClientProvider: Send + Sync {
    fn client(&self, chain: Chain) -> Result<Arc<dyn ChainClient>>;
}

/// [ChainClient] backed by an alloy provider.
pub struct RpcChainClient {
    chain: Chain,
    provider: Arc<dyn Provider + Send + Sync>,
}

impl RpcChainClient {
    pub fn new(chain: Chain, provider: Arc<dyn Provider + Send + Sync>) -> Self {
        Self { chain, provider }
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    async fn block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .with_context(|| format!("Failed to get the latest block of {}", self.chain))
    }

    async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        window: BlockWindow,
    ) -> Result<Vec<Log>> {
        let filter = Filter::new()
            .address(address)
            .event_signature(topic0)
            .from_block(window.from_block)
            .to_block(window.to_block);

        self.provider.get_logs(&filter).await.with_context(|| {
            format!(
                "get_Logs failed on {} for blocks [{}-{}]",
                self.chain, window.from_block, window.to_block
            )
        })
    }
}

/// Builds RPC clients out of the endpoints given in the configuration.
///
/// # Description
///
/// Providers are built on demand and not cached, the underlying HTTP client takes care of pooling the connections.
/// Requests rejected because of rate limiting are retried by the transport using a backoff; any other error is
/// returned to the caller right away.
pub struct RpcClientProvider {
    endpoints: HashMap<Chain, SecretString>,
    retry_layer: RetryBackoffLayer,
}

impl RpcClientProvider {
    pub fn new(endpoints: HashMap<Chain, SecretString>, max_retries: u32) -> Self {
        let retry_layer = RetryBackoffLayer::new(
            max_retries,
            DEFAULT_RPC_BACKOFF_TIME,
            DEFAULT_RPC_COMPUTE_UNITS,
        );

        Self {
            endpoints,
            retry_layer,
        }
    }
}

impl ChainClientProvider for RpcClientProvider {
    fn client(&self, chain: Chain) -> Result<Arc<dyn ChainClient>> {
        let endpoint = self
            .endpoints
            .get(&chain)
            .ok_or_else(|| anyhow::anyhow!("No RPC endpoint configured for {chain}"))?;

        // The URL may embed credentials, keep it out of the error message.
        let url = Url::parse(endpoint.expose_secret())
            .map_err(|e| anyhow::anyhow!("Invalid RPC endpoint for {chain}: {e}"))?;

        debug!("Creating provider for {} (chain_id: {})", chain, chain.id());

        let provider: Arc<dyn Provider + Send + Sync> = Arc::new(
            ProviderBuilder::new().connect_client(
                RpcClient::builder()
                    .layer(self.retry_layer.clone())
                    .http(url),
            ),
        );

        Ok(Arc::new(RpcChainClient::new(chain, provider)))
    }
}
