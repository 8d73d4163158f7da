// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Module with utilities for testing.

use crate::{
    Chain, Event, EventArg, EventArgs, EventRow, Storage,
    chain_client::{BlockWindow, ChainClient, ChainClientProvider},
    registry::ContractAddresses,
};
use alloy::{
    dyn_abi::DynSolValue,
    json_abi,
    primitives::{Address, B256, Bytes, U256},
    rpc::types::Log,
};
use anyhow::Result;
use async_trait::async_trait;
use fake::{Fake, Faker};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    str::FromStr,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

/// Generates a random Ethereum address.
pub fn fake_address() -> Address {
    let bytes: [u8; 20] = Faker.fake();
    Address::from(bytes)
}

/// Generates a random 32-byte word.
pub fn fake_word() -> B256 {
    let bytes: [u8; 32] = Faker.fake();
    B256::from(bytes)
}

/// Converts an Ethereum address to a topic.
pub fn address_to_topic(address: Address) -> B256 {
    address.into_word()
}

/// Addresses used to build the registry in tests. Every contract gets a different one.
pub fn contract_addresses() -> ContractAddresses {
    ContractAddresses {
        account_metadata: Address::repeat_byte(0x01),
        registry: Address::repeat_byte(0x02),
        list_records_base: Address::repeat_byte(0x03),
        list_records_op: Address::repeat_byte(0x04),
        list_records_eth: Address::repeat_byte(0x05),
    }
}

pub fn list_op_event() -> json_abi::Event {
    json_abi::Event::from_str("event ListOp(uint256 indexed slot, bytes op)")
        .expect("failed to parse ListOp event")
}

pub fn update_list_metadata_event() -> json_abi::Event {
    json_abi::Event::from_str(
        "event UpdateListMetadata(uint256 indexed slot, string key, bytes value)",
    )
    .expect("failed to parse UpdateListMetadata event")
}

pub fn update_account_metadata_event() -> json_abi::Event {
    json_abi::Event::from_str(
        "event UpdateAccountMetadata(address indexed addr, string key, bytes value)",
    )
    .expect("failed to parse UpdateAccountMetadata event")
}

pub fn update_list_storage_location_event() -> json_abi::Event {
    json_abi::Event::from_str(
        "event UpdateListStorageLocation(uint256 indexed tokenId, bytes listStorageLocation)",
    )
    .expect("failed to parse UpdateListStorageLocation event")
}

/// ERC721 Transfer event
pub fn transfer_event() -> json_abi::Event {
    json_abi::Event::from_str(
        "event Transfer(address indexed from, address indexed to, uint256 indexed tokenId)",
    )
    .expect("failed to parse Transfer event")
}

pub fn ownership_transferred_event() -> json_abi::Event {
    json_abi::Event::from_str(
        "event OwnershipTransferred(address indexed previousOwner, address indexed newOwner)",
    )
    .expect("failed to parse OwnershipTransferred event")
}

/// Builds a decoded ListOp event located at the given position of the chain.
pub fn sample_event(chain: Chain, block_number: u64, transaction_index: u64, log_index: u64) -> Event {
    let slot = U256::from(block_number);
    let op = Bytes::from(vec![0x01, 0x01, 0x01, 0x01]);

    let mut args = EventArgs::new();
    args.push("slot", EventArg::Uint(slot, 256));
    args.push("op", EventArg::Bytes(op.clone()));

    Event {
        chain,
        block_number,
        block_hash: B256::from(U256::from(block_number)),
        transaction_hash: B256::from((U256::from(block_number) << 64) | U256::from(transaction_index)),
        transaction_index,
        log_index,
        contract_address: Address::repeat_byte(0x03),
        contract_name: "ListRecords".to_string(),
        event_name: "ListOp".to_string(),
        args,
        data: Bytes::from(DynSolValue::Tuple(vec![DynSolValue::Bytes(op.to_vec())]).abi_encode_params()),
        topics: vec![list_op_event().selector(), B256::from(slot)],
    }
}

/// Enum that represents the kind of event for a log.
#[derive(Copy, Clone)]
pub enum LogEventKind {
    ListOp,
    RegistryTransfer,
    OwnershipTransferred,
}

/// Fixture for generating logs.
///
/// This fixture is used to generate logs for testing. It can be configured to generate logs for different
/// event kinds and contract addresses, and to leave some of the fields a mined log carries empty.
pub struct LogTestFixture {
    log_count: usize,
    start_block: u64,
    block_step: u64,
    event_kinds: Vec<LogEventKind>,
    contract_addresses: Vec<Address>,
    pending_fields: Vec<String>,
}

impl LogTestFixture {
    pub fn builder() -> Self {
        // Generate a random start block between 1 and 1_000_000
        let start_block: u64 = (Faker.fake::<u32>() % 1_000_000 + 1) as u64;
        Self {
            log_count: 1,
            start_block,
            block_step: 1,
            event_kinds: Vec::new(),
            contract_addresses: Vec::new(),
            pending_fields: Vec::new(),
        }
    }

    pub fn with_log_count(mut self, log_count: usize) -> Self {
        self.log_count = log_count;
        self
    }

    pub fn with_start_block(mut self, start_block: u64) -> Self {
        self.start_block = start_block;
        self
    }

    /// Distance in blocks between two consecutive logs.
    pub fn with_block_step(mut self, block_step: u64) -> Self {
        self.block_step = block_step;
        self
    }

    pub fn add_contract_address(mut self, address: Address) -> Self {
        self.contract_addresses.push(address);
        self
    }

    pub fn with_list_op(mut self) -> Self {
        self.event_kinds.push(LogEventKind::ListOp);
        self
    }

    pub fn with_registry_transfer(mut self) -> Self {
        self.event_kinds.push(LogEventKind::RegistryTransfer);
        self
    }

    pub fn with_ownership_transferred(mut self) -> Self {
        self.event_kinds.push(LogEventKind::OwnershipTransferred);
        self
    }

    /// Leaves the given field of the RPC log (camelCase, e.g. `logIndex`) empty.
    pub fn with_pending_field(mut self, field: &str) -> Self {
        self.pending_fields.push(field.to_string());
        self
    }

    pub fn build(self) -> Vec<Log> {
        let event_kinds = if self.event_kinds.is_empty() {
            vec![LogEventKind::ListOp]
        } else {
            self.event_kinds.clone()
        };

        (0..self.log_count)
            .map(|i| {
                let (topics, data) = match event_kinds[i % event_kinds.len()] {
                    LogEventKind::ListOp => list_op_parts(
                        U256::from(Faker.fake::<u64>()),
                        Bytes::from(Faker.fake::<[u8; 8]>().to_vec()),
                    ),
                    LogEventKind::RegistryTransfer => (
                        vec![
                            transfer_event().selector(),
                            address_to_topic(fake_address()),
                            address_to_topic(fake_address()),
                            fake_word(),
                        ],
                        Bytes::new(),
                    ),
                    LogEventKind::OwnershipTransferred => (
                        vec![
                            ownership_transferred_event().selector(),
                            address_to_topic(fake_address()),
                            address_to_topic(fake_address()),
                        ],
                        Bytes::new(),
                    ),
                };
                self.log_at(i, topics, data)
            })
            .collect()
    }

    /// Builds a single ListOp log with the given values.
    pub fn build_list_op(self, slot: U256, op: Bytes) -> Log {
        let (topics, data) = list_op_parts(slot, op);
        self.log_at(0, topics, data)
    }

    /// Builds a single UpdateListMetadata log with the given values.
    pub fn build_update_list_metadata(self, slot: U256, key: &str, value: Bytes) -> Log {
        let data = DynSolValue::Tuple(vec![
            DynSolValue::String(key.to_string()),
            DynSolValue::Bytes(value.to_vec()),
        ])
        .abi_encode_params();
        self.log_at(
            0,
            vec![update_list_metadata_event().selector(), B256::from(slot)],
            Bytes::from(data),
        )
    }

    /// Builds a single UpdateAccountMetadata log with the given values.
    pub fn build_update_account_metadata(self, addr: Address, key: &str, value: Bytes) -> Log {
        let data = DynSolValue::Tuple(vec![
            DynSolValue::String(key.to_string()),
            DynSolValue::Bytes(value.to_vec()),
        ])
        .abi_encode_params();
        self.log_at(
            0,
            vec![update_account_metadata_event().selector(), address_to_topic(addr)],
            Bytes::from(data),
        )
    }

    /// Builds a single UpdateListStorageLocation log with the given values.
    pub fn build_update_list_storage_location(self, token_id: U256, location: Bytes) -> Log {
        let data = DynSolValue::Tuple(vec![DynSolValue::Bytes(location.to_vec())]).abi_encode_params();
        self.log_at(
            0,
            vec![update_list_storage_location_event().selector(), B256::from(token_id)],
            Bytes::from(data),
        )
    }

    /// Builds a single log with raw topics and data, for payloads the typed builders can't encode.
    pub fn build_raw(self, topics: Vec<B256>, data: Bytes) -> Log {
        self.log_at(0, topics, data)
    }

    fn log_at(&self, i: usize, topics: Vec<B256>, data: Bytes) -> Log {
        let contract_address = if self.contract_addresses.is_empty() {
            Address::repeat_byte(0x03)
        } else {
            self.contract_addresses[i % self.contract_addresses.len()]
        };

        let block_number = self.start_block + i as u64 * self.block_step;
        let mut value = serde_json::json!({
            "address": contract_address,
            "topics": topics,
            "data": data,
            "blockNumber": format!("0x{:x}", block_number),
            "transactionHash": format!("0x{:064x}", block_number),
            "transactionIndex": "0x0",
            "blockHash": format!("0x{:064x}", 0xbabe_u64),
            "blockTimestamp": format!("0x{:x}", 1700000000 + block_number),
            "logIndex": format!("0x{:x}", i),
            "removed": false
        });
        for field in &self.pending_fields {
            value[field.as_str()] = serde_json::Value::Null;
        }

        serde_json::from_value(value).expect("failed to build log")
    }
}

fn list_op_parts(slot: U256, op: Bytes) -> (Vec<B256>, Bytes) {
    let data = DynSolValue::Tuple(vec![DynSolValue::Bytes(op.to_vec())]).abi_encode_params();
    (
        vec![list_op_event().selector(), B256::from(slot)],
        Bytes::from(data),
    )
}

/// Scripted [ChainClient].
///
/// # Description
///
/// By default, a get_Logs call returns the registered logs that match the address, topic0 and window of the request.
/// Windows can also be scripted by their first block, either to return a fixed set of logs or to fail.
#[derive(Default)]
pub struct MockChainClient {
    head: u64,
    fail_head: bool,
    logs: Vec<Log>,
    scripted: HashMap<u64, Vec<Log>>,
    failing: HashSet<u64>,
    requests: Mutex<Vec<BlockWindow>>,
}

impl MockChainClient {
    pub fn new(head: u64) -> Self {
        Self {
            head,
            ..Default::default()
        }
    }

    pub fn with_logs(mut self, logs: impl IntoIterator<Item = Log>) -> Self {
        self.logs.extend(logs);
        self
    }

    /// Returns `logs` for the window starting at `from_block`, no matter their content.
    pub fn with_window_logs(mut self, from_block: u64, logs: Vec<Log>) -> Self {
        self.scripted.insert(from_block, logs);
        self
    }

    pub fn failing_window(mut self, from_block: u64) -> Self {
        self.failing.insert(from_block);
        self
    }

    pub fn failing_head(mut self) -> Self {
        self.fail_head = true;
        self
    }

    /// Windows requested so far, in request order.
    pub fn requested_windows(&self) -> Vec<BlockWindow> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    async fn block_number(&self) -> Result<u64> {
        if self.fail_head {
            anyhow::bail!("scripted failure of eth_blockNumber");
        }
        Ok(self.head)
    }

    async fn get_logs(
        &self,
        address: Address,
        topic0: B256,
        window: BlockWindow,
    ) -> Result<Vec<Log>> {
        self.requests.lock().unwrap().push(window);

        if self.failing.contains(&window.from_block) {
            anyhow::bail!(
                "scripted failure for blocks [{}-{}]",
                window.from_block,
                window.to_block
            );
        }
        if let Some(logs) = self.scripted.get(&window.from_block) {
            return Ok(logs.clone());
        }

        Ok(self
            .logs
            .iter()
            .filter(|log| {
                log.address() == address
                    && log.topic0() == Some(&topic0)
                    && log.block_number.is_some_and(|block| window.contains(block))
            })
            .cloned()
            .collect())
    }
}

/// [ChainClientProvider] serving [MockChainClient]s.
#[derive(Default)]
pub struct MockClientProvider {
    clients: HashMap<Chain, Arc<MockChainClient>>,
}

impl MockClientProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(mut self, chain: Chain, client: Arc<MockChainClient>) -> Self {
        self.clients.insert(chain, client);
        self
    }
}

impl ChainClientProvider for MockClientProvider {
    fn client(&self, chain: Chain) -> Result<Arc<dyn ChainClient>> {
        self.clients
            .get(&chain)
            .cloned()
            .map(|client| client as Arc<dyn ChainClient>)
            .ok_or_else(|| anyhow::anyhow!("No RPC endpoint configured for {chain}"))
    }
}

/// [Storage] that keeps the rows in memory, keyed like the events table.
#[derive(Default)]
pub struct InMemoryStorage {
    rows: Mutex<BTreeMap<(u64, String, u64), EventRow>>,
    chunk_sizes: Mutex<Vec<usize>>,
    failing_sort_keys: HashSet<String>,
    closed: AtomicBool,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects every chunk that contains a row with the given sort key.
    pub fn failing_on(mut self, sort_key: &str) -> Self {
        self.failing_sort_keys.insert(sort_key.to_string());
        self
    }

    /// Stored rows ordered by chain and sort key.
    pub fn rows(&self) -> Vec<EventRow> {
        let mut rows = self
            .rows
            .lock()
            .unwrap()
            .values()
            .cloned()
            .collect::<Vec<_>>();
        rows.sort_by(|a, b| (a.chain_id, &a.sort_key).cmp(&(b.chain_id, &b.sort_key)));
        rows
    }

    /// Size of every chunk received, including the rejected ones.
    pub fn chunk_sizes(&self) -> Vec<usize> {
        self.chunk_sizes.lock().unwrap().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn upsert_events(&self, rows: &[EventRow]) -> Result<u64> {
        self.chunk_sizes.lock().unwrap().push(rows.len());

        if let Some(row) = rows
            .iter()
            .find(|row| self.failing_sort_keys.contains(&row.sort_key))
        {
            anyhow::bail!("scripted failure for row {}", row.sort_key);
        }

        let mut stored = self.rows.lock().unwrap();
        for row in rows {
            stored.insert(
                (row.chain_id, row.transaction_hash.clone(), row.log_index),
                row.clone(),
            );
        }
        Ok(rows.len() as u64)
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
