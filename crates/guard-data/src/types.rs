//! Type definitions for chain entities seen by the fee guard.
//!
//! Every record here is populated once at the chain-client boundary and is
//! read through typed fields afterwards.

use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, B256};
use eyre::{eyre, Context, Result};
use serde::{Serialize, Serializer};

/// Canonical transaction reference: 32-byte hash rendered as `0x` + 64
/// lowercase hex characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TxHash(B256);

impl TxHash {
    /// Normalizes and validates user input.
    ///
    /// Surrounding whitespace is trimmed, the value is lower-cased and a
    /// missing `0x` prefix is added. The result must be exactly 66 characters
    /// of hex after the prefix.
    ///
    /// # Errors
    /// Returns error if the normalized value is not `0x` + 64 hex digits.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim().to_ascii_lowercase();
        let body = trimmed.strip_prefix("0x").unwrap_or(&trimmed);

        if body.len() != 64 || !body.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(eyre!(
                "invalid transaction hash {:?}: expected 0x + 64 hex characters",
                input.trim()
            ));
        }

        let hash = B256::from_str(body)
            .wrap_err_with(|| format!("invalid transaction hash {:?}", input.trim()))?;
        Ok(Self(hash))
    }

    /// Underlying 32 bytes.
    pub fn as_b256(&self) -> &B256 {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl FromStr for TxHash {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for TxHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Transaction as returned by `eth_getTransactionByHash`.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainTransaction {
    /// Transaction hash.
    pub hash: TxHash,
    /// Sender address.
    pub from: Option<Address>,
    /// Recipient address (None for contract creation).
    pub to: Option<Address>,
    /// Inclusion block (None while pending).
    pub block_number: Option<u64>,
    /// Offered gas price in Wei.
    pub gas_price: Option<u128>,
}

impl ChainTransaction {
    /// True when the node has not placed the transaction in a block yet.
    pub fn is_pending(&self) -> bool {
        self.block_number.is_none()
    }
}

/// Transaction receipt, present once the transaction is mined.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainReceipt {
    /// Execution status (true = success). None on pre-Byzantium receipts.
    pub status: Option<bool>,
    /// Gas consumed by execution.
    pub gas_used: u64,
    /// Price actually charged per gas in Wei, when the node reports it.
    pub effective_gas_price: Option<u128>,
    /// Inclusion block number.
    pub block_number: u64,
}

/// Fee-relevant view of a transaction inside a sampled block.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockTransaction {
    /// Effective gas price in Wei, if the block payload carries one.
    pub effective_gas_price: Option<u128>,
    /// Offered gas price in Wei.
    pub gas_price: Option<u128>,
}

/// Block header fields plus (optionally) its transactions.
#[derive(Clone, Debug, PartialEq)]
pub struct ChainBlock {
    /// Block number.
    pub number: u64,
    /// Timestamp in unix seconds.
    pub timestamp: u64,
    /// Transactions; empty when fetched without full transaction objects.
    pub transactions: Vec<BlockTransaction>,
}

/// Prefers the effective (charged) rate and falls back to the offered rate.
pub fn fee_rate(effective: Option<u128>, offered: Option<u128>) -> Option<u128> {
    effective.or(offered)
}

impl BlockTransaction {
    /// Fee rate used for sampling.
    pub fn fee_rate(&self) -> Option<u128> {
        fee_rate(self.effective_gas_price, self.gas_price)
    }
}

/// Execution status label used in reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Receipt status 1.
    Success,
    /// Receipt status 0.
    Failure,
    /// No status field on the receipt.
    Unknown,
}

impl From<Option<bool>> for ExecutionStatus {
    fn from(status: Option<bool>) -> Self {
        match status {
            Some(true) => Self::Success,
            Some(false) => Self::Failure,
            None => Self::Unknown,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}
