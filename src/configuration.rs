// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Module that handles the configuration of the application.
//!
//! # Description
//!
//! Values are looked up, from lowest to highest precedence, in: the built-in defaults, the optional configuration
//! file, the environment (including a `.env` file) and the command line. Environment variables are not prefixed,
//! e.g. `DATABASE_URL` or `BASE_RPC_URL`. Every variable without a default is required; a missing or malformed value
//! aborts the process before any RPC request is issued.

use crate::{
    Chain, cli::ReplayArgs, constants::*, error_codes, registry::ContractAddresses,
};
use alloy::{primitives::Address, transports::http::reqwest::Url};
use clap::Parser;
use config::{Config, ConfigError, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{collections::HashMap, path::Path, str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Failed to load the configuration: {0}")]
    Load(#[from] ConfigError),
    #[error("Missing required configuration value: {0}")]
    Missing(&'static str),
    #[error("Invalid address in {name}: {value}")]
    InvalidAddress { name: &'static str, value: String },
    #[error("Invalid URL in {name}: {reason}")]
    InvalidUrl { name: &'static str, reason: String },
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// Configuration as parsed from the file and the environment. Fields are optional to allow partial configs.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct FileConfiguration {
    pub database_url: Option<SecretString>,
    pub base_rpc_url: Option<SecretString>,
    pub op_rpc_url: Option<SecretString>,
    pub eth_rpc_url: Option<SecretString>,
    pub account_metadata: Option<String>,
    pub registry: Option<String>,
    pub list_records_base: Option<String>,
    pub list_records_op: Option<String>,
    pub list_records_eth: Option<String>,
    pub block_range: Option<u64>,
    pub batch_size: Option<usize>,
    pub chunk_delay_ms: Option<u64>,
    pub rpc_max_retries: Option<u32>,
}

/// Fully resolved configuration with all defaults applied.
#[derive(Debug, Clone)]
pub struct ReplayConfiguration {
    pub database_url: SecretString,
    pub rpc_endpoints: HashMap<Chain, SecretString>,
    pub contracts: ContractAddresses,
    pub block_range: u64,
    pub batch_size: usize,
    pub chunk_delay: Duration,
    pub rpc_max_retries: u32,
    pub verbosity: u8,
}

impl ReplayConfiguration {
    /// Parse CLI arguments and build the replay configuration.
    ///
    /// # Panics
    ///
    /// This function will log an error and exit the process if the configuration can't be loaded or a required
    /// value is missing or malformed.
    pub fn parse() -> Self {
        dotenv::dotenv().ok();
        let args = ReplayArgs::parse();

        match Self::from_args(args) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("\x1b[31merror:\x1b[0m {e}");
                std::process::exit(error_codes::ERROR_CODE_FAILED_TO_LOAD_CONFIGURATION);
            }
        }
    }

    /// Build the replay configuration from CLI arguments and the process environment.
    pub fn from_args(args: ReplayArgs) -> Result<Self, ConfigurationError> {
        if let Some(ref config_file) = args.config
            && args.verbosity >= 2
        {
            println!("Loading configuration from file: {config_file}");
        }

        let file_config = FileConfiguration::load(args.config.as_deref(), Environment::default())?;
        Self::resolve(file_config, &args)
    }

    /// Applies the CLI overrides and the defaults to `file_config`, and validates the result.
    pub fn resolve(
        file_config: FileConfiguration,
        args: &ReplayArgs,
    ) -> Result<Self, ConfigurationError> {
        let database_url = required_secret("DATABASE_URL", file_config.database_url)?;

        let mut rpc_endpoints = HashMap::new();
        for (chain, endpoint) in [
            (Chain::Base, file_config.base_rpc_url),
            (Chain::Optimism, file_config.op_rpc_url),
            (Chain::Ethereum, file_config.eth_rpc_url),
        ] {
            let name = chain.rpc_url_variable();
            let endpoint = required_secret(name, endpoint)?;
            // The reason given by the parser never includes the URL itself.
            Url::parse(endpoint.expose_secret()).map_err(|e| ConfigurationError::InvalidUrl {
                name,
                reason: e.to_string(),
            })?;
            rpc_endpoints.insert(chain, endpoint);
        }

        let contracts = ContractAddresses {
            account_metadata: required_address("ACCOUNT_METADATA", file_config.account_metadata)?,
            registry: required_address("REGISTRY", file_config.registry)?,
            list_records_base: required_address(
                "LIST_RECORDS_BASE",
                file_config.list_records_base,
            )?,
            list_records_op: required_address("LIST_RECORDS_OP", file_config.list_records_op)?,
            list_records_eth: required_address("LIST_RECORDS_ETH", file_config.list_records_eth)?,
        };

        let block_range = args
            .block_range
            .or(file_config.block_range)
            .unwrap_or(DEFAULT_BLOCK_RANGE);
        if block_range == 0 {
            return Err(ConfigurationError::InvalidValue {
                name: "BLOCK_RANGE",
                reason: "the block range must be at least 1".to_string(),
            });
        }

        let batch_size = args
            .batch_size
            .or(file_config.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(ConfigurationError::InvalidValue {
                name: "BATCH_SIZE",
                reason: "the batch size must be at least 1".to_string(),
            });
        }

        let chunk_delay = args
            .chunk_delay_ms
            .or(file_config.chunk_delay_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_CHUNK_DELAY);

        Ok(Self {
            database_url,
            rpc_endpoints,
            contracts,
            block_range,
            batch_size,
            chunk_delay,
            rpc_max_retries: file_config
                .rpc_max_retries
                .unwrap_or(DEFAULT_RPC_MAX_RETRIES),
            verbosity: args.verbosity,
        })
    }
}

impl FileConfiguration {
    /// Load from an optional YAML/JSON/TOML file, layered under the given environment.
    pub fn load(config_file: Option<&str>, environment: Environment) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(config_file) = config_file {
            builder = builder.add_source(File::from(Path::new(config_file)));
        }

        builder
            .add_source(environment)
            .build()?
            .try_deserialize()
    }
}

fn required_secret(
    name: &'static str,
    value: Option<SecretString>,
) -> Result<SecretString, ConfigurationError> {
    value
        .filter(|secret| !secret.expose_secret().trim().is_empty())
        .ok_or(ConfigurationError::Missing(name))
}

fn required_address(
    name: &'static str,
    value: Option<String>,
) -> Result<Address, ConfigurationError> {
    let value = value
        .filter(|value| !value.trim().is_empty())
        .ok_or(ConfigurationError::Missing(name))?;

    Address::from_str(value.trim())
        .map_err(|_| ConfigurationError::InvalidAddress { name, value })
}
