// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Module for the contract registry.
//!
//! # Description
//!
//! The registry is the static list of replay jobs. A job is identified by a name of the form
//! `<Contract>_<Event>[_<Chain>]` and points to a [ContractConfig]: the chain, the contract address, the event
//! signature and the block range to replay. Contract addresses are the only values that come from the environment;
//! everything else is fixed at compile time.

use crate::Chain;
use alloy::{
    json_abi::Event,
    primitives::{Address, B256},
};
use anyhow::{Context, Result};
use std::{collections::BTreeMap, str::FromStr};

const LIST_OP_SIGNATURE: &str = "event ListOp(uint256 indexed slot, bytes op)";
const UPDATE_LIST_METADATA_SIGNATURE: &str =
    "event UpdateListMetadata(uint256 indexed slot, string key, bytes value)";
const UPDATE_ACCOUNT_METADATA_SIGNATURE: &str =
    "event UpdateAccountMetadata(address indexed addr, string key, bytes value)";
const UPDATE_LIST_STORAGE_LOCATION_SIGNATURE: &str =
    "event UpdateListStorageLocation(uint256 indexed tokenId, bytes listStorageLocation)";
const TRANSFER_SIGNATURE: &str =
    "event Transfer(address indexed from, address indexed to, uint256 indexed tokenId)";
const OWNERSHIP_TRANSFERRED_SIGNATURE: &str =
    "event OwnershipTransferred(address indexed previousOwner, address indexed newOwner)";

/// Deployment blocks of the contracts.
const BASE_START_BLOCK: u64 = 20_190_000;
const OP_START_BLOCK: u64 = 125_792_735;
const ETH_START_BLOCK: u64 = 20_820_743;

/// Ownership only changes right after the deployment, so those jobs stop early.
const BASE_OWNERSHIP_END_BLOCK: u64 = 20_200_000;
const OP_OWNERSHIP_END_BLOCK: u64 = 125_800_000;
const ETH_OWNERSHIP_END_BLOCK: u64 = 20_830_000;

/// Addresses of the replayed contracts, as provided by the configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub account_metadata: Address,
    pub registry: Address,
    pub list_records_base: Address,
    pub list_records_op: Address,
    pub list_records_eth: Address,
}

/// Identifies one (chain, contract, event signature) replay job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractConfig {
    pub chain: Chain,
    pub contract_address: Address,
    pub event_signature: String,
    /// Parsed form of `event_signature`.
    pub event: Event,
    /// First block to replay (inclusive).
    pub start_block: u64,
    /// Last block to replay (inclusive). When missing, the chain head at fetch time is used.
    pub end_block: Option<u64>,
}

impl ContractConfig {
    pub fn new(
        chain: Chain,
        contract_address: Address,
        event_signature: &str,
        start_block: u64,
        end_block: Option<u64>,
    ) -> Result<Self> {
        let event = Event::from_str(event_signature)
            .with_context(|| format!("Invalid event signature: {event_signature}"))?;

        if let Some(end_block) = end_block
            && start_block > end_block
        {
            anyhow::bail!(
                "Start block {start_block} is past the end block {end_block} for {event_signature}"
            );
        }

        Ok(Self {
            chain,
            contract_address,
            event_signature: event_signature.to_string(),
            event,
            start_block,
            end_block,
        })
    }

    /// Hash of the event signature, used as topic0 in the log filter.
    pub fn topic0(&self) -> B256 {
        self.event.selector()
    }
}

/// A named [ContractConfig].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractJob {
    pub name: String,
    pub config: ContractConfig,
}

impl ContractJob {
    /// Builds a job and checks that the event in its name is the one declared by the signature.
    pub fn new(name: impl Into<String>, config: ContractConfig) -> Result<Self> {
        let job = Self {
            name: name.into(),
            config,
        };

        if job.event_name() != job.config.event.name {
            anyhow::bail!(
                "Job {} expects the event {} but its signature declares {}",
                job.name,
                job.event_name(),
                job.config.event.name
            );
        }

        Ok(job)
    }

    /// Logical name of the contract, the part of the job name before the first underscore.
    pub fn contract_name(&self) -> &str {
        self.name.split('_').next().unwrap_or(&self.name)
    }

    /// Event part of the job name.
    pub fn event_name(&self) -> &str {
        self.name.split('_').nth(1).unwrap_or_default()
    }
}

/// Static definition of a job. The contract address is resolved once the configuration is loaded.
struct JobDefinition {
    name: &'static str,
    chain: Chain,
    address: fn(&ContractAddresses) -> Address,
    signature: &'static str,
    start_block: u64,
    end_block: Option<u64>,
}

const JOB_DEFINITIONS: [JobDefinition; 14] = [
    JobDefinition {
        name: "ListRecords_ListOp_Base",
        chain: Chain::Base,
        address: |a| a.list_records_base,
        signature: LIST_OP_SIGNATURE,
        start_block: BASE_START_BLOCK,
        end_block: None,
    },
    JobDefinition {
        name: "ListRecords_ListOp_Op",
        chain: Chain::Optimism,
        address: |a| a.list_records_op,
        signature: LIST_OP_SIGNATURE,
        start_block: OP_START_BLOCK,
        end_block: None,
    },
    JobDefinition {
        name: "ListRecords_ListOp_Eth",
        chain: Chain::Ethereum,
        address: |a| a.list_records_eth,
        signature: LIST_OP_SIGNATURE,
        start_block: ETH_START_BLOCK,
        end_block: None,
    },
    JobDefinition {
        name: "ListRecords_UpdateListMetadata_Base",
        chain: Chain::Base,
        address: |a| a.list_records_base,
        signature: UPDATE_LIST_METADATA_SIGNATURE,
        start_block: BASE_START_BLOCK,
        end_block: None,
    },
    JobDefinition {
        name: "ListRecords_UpdateListMetadata_Op",
        chain: Chain::Optimism,
        address: |a| a.list_records_op,
        signature: UPDATE_LIST_METADATA_SIGNATURE,
        start_block: OP_START_BLOCK,
        end_block: None,
    },
    JobDefinition {
        name: "ListRecords_UpdateListMetadata_Eth",
        chain: Chain::Ethereum,
        address: |a| a.list_records_eth,
        signature: UPDATE_LIST_METADATA_SIGNATURE,
        start_block: ETH_START_BLOCK,
        end_block: None,
    },
    JobDefinition {
        name: "AccountMetadata_UpdateAccountMetadata",
        chain: Chain::Base,
        address: |a| a.account_metadata,
        signature: UPDATE_ACCOUNT_METADATA_SIGNATURE,
        start_block: BASE_START_BLOCK,
        end_block: None,
    },
    JobDefinition {
        name: "Registry_UpdateListStorageLocation",
        chain: Chain::Base,
        address: |a| a.registry,
        signature: UPDATE_LIST_STORAGE_LOCATION_SIGNATURE,
        start_block: BASE_START_BLOCK,
        end_block: None,
    },
    JobDefinition {
        name: "Registry_Transfer",
        chain: Chain::Base,
        address: |a| a.registry,
        signature: TRANSFER_SIGNATURE,
        start_block: BASE_START_BLOCK,
        end_block: None,
    },
    JobDefinition {
        name: "ListRecords_OwnershipTransferred_Base",
        chain: Chain::Base,
        address: |a| a.list_records_base,
        signature: OWNERSHIP_TRANSFERRED_SIGNATURE,
        start_block: BASE_START_BLOCK,
        end_block: Some(BASE_OWNERSHIP_END_BLOCK),
    },
    JobDefinition {
        name: "ListRecords_OwnershipTransferred_Op",
        chain: Chain::Optimism,
        address: |a| a.list_records_op,
        signature: OWNERSHIP_TRANSFERRED_SIGNATURE,
        start_block: OP_START_BLOCK,
        end_block: Some(OP_OWNERSHIP_END_BLOCK),
    },
    JobDefinition {
        name: "ListRecords_OwnershipTransferred_Eth",
        chain: Chain::Ethereum,
        address: |a| a.list_records_eth,
        signature: OWNERSHIP_TRANSFERRED_SIGNATURE,
        start_block: ETH_START_BLOCK,
        end_block: Some(ETH_OWNERSHIP_END_BLOCK),
    },
    JobDefinition {
        name: "AccountMetadata_OwnershipTransferred",
        chain: Chain::Base,
        address: |a| a.account_metadata,
        signature: OWNERSHIP_TRANSFERRED_SIGNATURE,
        start_block: BASE_START_BLOCK,
        end_block: Some(BASE_OWNERSHIP_END_BLOCK),
    },
    JobDefinition {
        name: "Registry_OwnershipTransferred",
        chain: Chain::Base,
        address: |a| a.registry,
        signature: OWNERSHIP_TRANSFERRED_SIGNATURE,
        start_block: BASE_START_BLOCK,
        end_block: Some(BASE_OWNERSHIP_END_BLOCK),
    },
];

/// Ordered set of jobs whose events are loaded together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayGroup {
    /// Event name used in the logs, e.g. `OwnershipTransferred`.
    pub label: &'static str,
    pub jobs: &'static [&'static str],
}

/// Business order of the replay. Owners and tokens must exist before the list data that refers to them.
pub const REPLAY_GROUPS: [ReplayGroup; 6] = [
    ReplayGroup {
        label: "OwnershipTransferred",
        jobs: &[
            "ListRecords_OwnershipTransferred_Base",
            "ListRecords_OwnershipTransferred_Op",
            "ListRecords_OwnershipTransferred_Eth",
            "AccountMetadata_OwnershipTransferred",
            "Registry_OwnershipTransferred",
        ],
    },
    ReplayGroup {
        label: "Transfer",
        jobs: &["Registry_Transfer"],
    },
    ReplayGroup {
        label: "UpdateAccountMetadata",
        jobs: &["AccountMetadata_UpdateAccountMetadata"],
    },
    ReplayGroup {
        label: "UpdateListStorageLocation",
        jobs: &["Registry_UpdateListStorageLocation"],
    },
    ReplayGroup {
        label: "ListOp",
        jobs: &[
            "ListRecords_ListOp_Base",
            "ListRecords_ListOp_Op",
            "ListRecords_ListOp_Eth",
        ],
    },
    ReplayGroup {
        label: "UpdateListMetadata",
        jobs: &[
            "ListRecords_UpdateListMetadata_Base",
            "ListRecords_UpdateListMetadata_Op",
            "ListRecords_UpdateListMetadata_Eth",
        ],
    },
];

/// Lookup table from job name to job.
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    jobs: BTreeMap<String, ContractJob>,
}

impl ContractRegistry {
    /// Builds the registry of every known job using the given contract addresses.
    pub fn new(addresses: &ContractAddresses) -> Result<Self> {
        let jobs = JOB_DEFINITIONS
            .iter()
            .map(|definition| {
                let config = ContractConfig::new(
                    definition.chain,
                    (definition.address)(addresses),
                    definition.signature,
                    definition.start_block,
                    definition.end_block,
                )
                .with_context(|| format!("Invalid definition for job {}", definition.name))?;
                ContractJob::new(definition.name, config)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::from_jobs(jobs))
    }

    /// Builds a registry out of an arbitrary list of jobs.
    pub fn from_jobs(jobs: impl IntoIterator<Item = ContractJob>) -> Self {
        Self {
            jobs: jobs.into_iter().map(|job| (job.name.clone(), job)).collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ContractJob> {
        self.jobs.get(name)
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
