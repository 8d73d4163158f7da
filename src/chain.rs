// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Chains supported by the replay.

use strum_macros::Display;

/// Closed set of chains whose history is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display)]
pub enum Chain {
    #[strum(to_string = "ethereum")]
    Ethereum,
    #[strum(to_string = "optimism")]
    Optimism,
    #[strum(to_string = "base")]
    Base,
}

impl Chain {
    pub const ALL: [Chain; 3] = [Chain::Ethereum, Chain::Optimism, Chain::Base];

    /// EIP-155 chain id.
    pub const fn id(&self) -> u64 {
        match self {
            Chain::Ethereum => 1,
            Chain::Optimism => 10,
            Chain::Base => 8453,
        }
    }

    /// Name of the environment variable that holds the RPC endpoint for the chain.
    pub const fn rpc_url_variable(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ETH_RPC_URL",
            Chain::Optimism => "OP_RPC_URL",
            Chain::Base => "BASE_RPC_URL",
        }
    }
}

impl TryFrom<u64> for Chain {
    type Error = anyhow::Error;

    fn try_from(chain_id: u64) -> Result<Self, Self::Error> {
        Chain::ALL
            .into_iter()
            .find(|chain| chain.id() == chain_id)
            .ok_or_else(|| anyhow::anyhow!("Unsupported chain id: {chain_id}"))
    }
}

impl std::str::FromStr for Chain {
    type Err = anyhow::Error;

    /// Parses a chain from its decimal chain id, e.g. "8453".
    fn from_str(chain_id: &str) -> Result<Self, Self::Err> {
        let chain_id = chain_id
            .trim()
            .parse::<u64>()
            .map_err(|e| anyhow::anyhow!("Invalid chain id '{chain_id}': {e}"))?;
        Chain::try_from(chain_id)
    }
}
