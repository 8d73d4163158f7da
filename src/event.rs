// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Canonical representation of a replayed event.
//!
//! # Description
//!
//! An [Event] is built by the decoder from a single log and never mutated afterwards. Two values are derived from
//! it on demand:
//!
//! - A sort key, a string whose byte-wise order matches the (block, transaction index, log index) order of the chain.
//! - The serialized arguments, a JSON object where every wide integer is written as a 32-byte hex string, so that the
//!   storage never receives a number it could round.
//!
//! The [EventRow] is the flat projection of an [Event] that is sent to the storage.

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, Bytes, I256, U256},
};
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::Chain;

/// Widest integer type, in bits, that is serialized as a plain JSON number.
///
/// Anything wider is written as a 32-byte hex string.
pub const MAX_SAFE_INTEGER_BITS: usize = 48;

/// Decoded value of a single event parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventArg {
    /// Unsigned integer along its bit width as declared in the ABI.
    Uint(U256, usize),
    /// Signed integer along its bit width as declared in the ABI.
    Int(I256, usize),
    Address(Address),
    Bool(bool),
    String(String),
    Bytes(Bytes),
    /// bytesN values. Indexed dynamic parameters also land here, as the topic only holds their hash.
    FixedBytes(Vec<u8>),
    /// Arrays and tuples.
    List(Vec<EventArg>),
}

impl From<DynSolValue> for EventArg {
    fn from(value: DynSolValue) -> Self {
        match value {
            DynSolValue::Uint(value, bits) => EventArg::Uint(value, bits),
            DynSolValue::Int(value, bits) => EventArg::Int(value, bits),
            DynSolValue::Address(address) => EventArg::Address(address),
            DynSolValue::Bool(flag) => EventArg::Bool(flag),
            DynSolValue::String(text) => EventArg::String(text),
            DynSolValue::Bytes(bytes) => EventArg::Bytes(Bytes::from(bytes)),
            DynSolValue::FixedBytes(word, size) => {
                EventArg::FixedBytes(word[..size.min(32)].to_vec())
            }
            // Function is 24 bytes: 20 bytes address + 4 bytes selector
            DynSolValue::Function(function) => EventArg::FixedBytes(function.as_slice().to_vec()),
            DynSolValue::Array(values)
            | DynSolValue::FixedArray(values)
            | DynSolValue::Tuple(values) => {
                EventArg::List(values.into_iter().map(EventArg::from).collect())
            }
            #[allow(unreachable_patterns)]
            other => EventArg::Bytes(Bytes::from(other.abi_encode())),
        }
    }
}

impl Serialize for EventArg {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            // Narrow values that overflow their declared width are stored like wide ones.
            EventArg::Uint(value, bits) => match u64::try_from(*value) {
                Ok(narrow) if *bits <= MAX_SAFE_INTEGER_BITS => serializer.serialize_u64(narrow),
                _ => serializer.serialize_str(&word_to_hex(value)),
            },
            // Negative values keep their two's complement representation.
            EventArg::Int(value, bits) => match i64::try_from(*value) {
                Ok(narrow) if *bits <= MAX_SAFE_INTEGER_BITS => serializer.serialize_i64(narrow),
                _ => serializer.serialize_str(&word_to_hex(&value.into_raw())),
            },
            EventArg::Address(address) => serializer.serialize_str(&address.to_checksum(None)),
            EventArg::Bool(flag) => serializer.serialize_bool(*flag),
            EventArg::String(text) => serializer.serialize_str(text),
            EventArg::Bytes(bytes) => serializer.serialize_str(&bytes_to_hex(bytes)),
            EventArg::FixedBytes(bytes) => serializer.serialize_str(&bytes_to_hex(bytes)),
            EventArg::List(values) => serializer.collect_seq(values),
        }
    }
}

/// Encodes a 256-bit integer as `0x` followed by 64 hex digits.
pub fn word_to_hex(value: &U256) -> String {
    bytes_to_hex(&value.to_be_bytes::<32>())
}

#[inline]
fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Ordered mapping from parameter name to decoded value.
///
/// The order is the order of the parameters in the event signature, which is also the order of the keys in the
/// serialized JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventArgs(Vec<(String, EventArg)>);

impl EventArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: EventArg) {
        self.0.push((name.into(), value));
    }

    pub fn get(&self, name: &str) -> Option<&EventArg> {
        self.0
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &EventArg)> {
        self.0.iter().map(|(name, value)| (name.as_str(), value))
    }
}

impl FromIterator<(String, EventArg)> for EventArgs {
    fn from_iter<I: IntoIterator<Item = (String, EventArg)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for EventArgs {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// One occurrence of a configured event on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub chain: Chain,
    pub block_number: u64,
    pub block_hash: B256,
    pub transaction_hash: B256,
    pub transaction_index: u64,
    pub log_index: u64,
    pub contract_address: Address,
    /// Logical name of the contract, e.g. `ListRecords`.
    pub contract_name: String,
    /// Name of the event as resolved by the decoder, e.g. `ListOp`.
    pub event_name: String,
    pub args: EventArgs,
    /// Raw log data, kept for auditing.
    pub data: Bytes,
    /// Raw log topics, kept for auditing.
    pub topics: Vec<B256>,
}

impl Event {
    /// Key that orders events of the same sequence as the chain does.
    pub fn sort_key(&self) -> String {
        sort_key(self.block_number, self.transaction_index, self.log_index)
    }

    /// Serializes the event arguments as a JSON object.
    pub fn serialize_args(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.args)
    }
}

/// Builds the sort key of a log.
///
/// # Description
///
/// The block number is padded to 12 digits and both indexes to 6 digits, so comparing two keys as strings gives the
/// same result as comparing the (block, transaction index, log index) triplets, as long as the values fit the
/// padding. The key does not include the chain.
pub fn sort_key(block_number: u64, transaction_index: u64, log_index: u64) -> String {
    format!("{block_number:012}-{transaction_index:06}-{log_index:06}")
}

/// Flat projection of an [Event] as stored in the `events` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    pub chain_id: u64,
    pub block_number: u64,
    pub transaction_index: u64,
    pub log_index: u64,
    pub contract_address: String,
    pub event_name: String,
    pub event_args: String,
    pub block_hash: String,
    pub transaction_hash: String,
    pub sort_key: String,
}

impl TryFrom<&Event> for EventRow {
    type Error = serde_json::Error;

    fn try_from(event: &Event) -> Result<Self, Self::Error> {
        Ok(Self {
            chain_id: event.chain.id(),
            block_number: event.block_number,
            transaction_index: event.transaction_index,
            log_index: event.log_index,
            contract_address: bytes_to_hex(event.contract_address.as_slice()),
            event_name: event.event_name.clone(),
            event_args: event.serialize_args()?,
            block_hash: event.block_hash.to_string(),
            transaction_hash: event.transaction_hash.to_string(),
            sort_key: event.sort_key(),
        })
    }
}
