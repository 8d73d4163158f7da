// Copyright (c) 2026 Bilinear Labs
// SPDX-License-Identifier: MIT

//! Module that turns raw logs into canonical events.

use crate::{Chain, Event, EventArg, EventArgs};
use alloy::{
    dyn_abi::{DecodedEvent, EventExt},
    json_abi,
    primitives::B256,
    rpc::types::Log,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Cannot decode pending log: the {0} is missing")]
    PendingLog(&'static str),
    #[error("Log with topic0 {found:?} does not belong to {event} ({expected})")]
    SelectorMismatch {
        event: String,
        expected: B256,
        found: Option<B256>,
    },
    #[error("Failed to decode the {event} log: {source}")]
    Abi {
        event: String,
        #[source]
        source: alloy::dyn_abi::Error,
    },
    #[error("The {event} log doesn't carry a value for the parameter at position {position}")]
    MissingParameter { event: String, position: usize },
}

/// Decodes a log emitted by `contract_name` on `chain` using the ABI of the event it was requested with.
///
/// # Description
///
/// A log is only accepted when it is mined, i.e. when the block number, block hash, transaction hash, transaction
/// index and log index are all present. The event name stored in the result is the one declared by `event_abi`;
/// logs whose topic0 is not the selector of `event_abi` are rejected instead of being stored under the wrong name.
pub fn decode_log(
    chain: Chain,
    contract_name: &str,
    event_abi: &json_abi::Event,
    log: &Log,
) -> Result<Event, DecodeError> {
    let block_number = log
        .block_number
        .ok_or(DecodeError::PendingLog("block number"))?;
    let block_hash = log.block_hash.ok_or(DecodeError::PendingLog("block hash"))?;
    let transaction_hash = log
        .transaction_hash
        .ok_or(DecodeError::PendingLog("transaction hash"))?;
    let transaction_index = log
        .transaction_index
        .ok_or(DecodeError::PendingLog("transaction index"))?;
    let log_index = log.log_index.ok_or(DecodeError::PendingLog("log index"))?;

    let selector = event_abi.selector();
    if !event_abi.anonymous && log.topic0() != Some(&selector) {
        return Err(DecodeError::SelectorMismatch {
            event: event_abi.name.clone(),
            expected: selector,
            found: log.topic0().copied(),
        });
    }

    let DecodedEvent { indexed, body, .. } = event_abi
        .decode_log_parts(log.topics().to_vec(), log.data().data.as_ref())
        .map_err(|source| DecodeError::Abi {
            event: event_abi.name.clone(),
            source,
        })?;

    // The decoder splits the values in indexed and non-indexed ones, merge them back following the signature.
    let mut indexed = indexed.into_iter();
    let mut body = body.into_iter();
    let mut args = EventArgs::new();
    for (position, param) in event_abi.inputs.iter().enumerate() {
        let value = if param.indexed {
            indexed.next()
        } else {
            body.next()
        }
        .ok_or_else(|| DecodeError::MissingParameter {
            event: event_abi.name.clone(),
            position,
        })?;

        let name = if param.name.is_empty() {
            position.to_string()
        } else {
            param.name.clone()
        };
        args.push(name, EventArg::from(value));
    }

    Ok(Event {
        chain,
        block_number,
        block_hash,
        transaction_hash,
        transaction_index,
        log_index,
        contract_address: log.address(),
        contract_name: contract_name.to_string(),
        event_name: event_abi.name.clone(),
        args,
        data: log.data().data.clone(),
        topics: log.topics().to_vec(),
    })
}
