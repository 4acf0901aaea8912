//! In-memory [`ChainClient`] for tests.
//!
//! Only compiled with the `test-utils` feature (or inside this crate's own
//! tests). Interior mutability is `RefCell`/`Cell` since the fee guard drives
//! the client from a single task.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};

use alloy::primitives::Address;
use eyre::{eyre, Result};

use crate::client::ChainClient;
use crate::types::{BlockTransaction, ChainBlock, ChainReceipt, ChainTransaction, TxHash};

/// Scripted answer for one `receipt` call.
#[derive(Clone, Debug)]
pub enum ReceiptStep {
    /// Receipt not yet available.
    NotYet,
    /// Transport failure.
    Fail(String),
    /// Return the stored receipt.
    Ready,
}

/// Configurable in-memory chain.
#[derive(Debug, Default)]
pub struct MockChain {
    /// Chain id reported by `chain_id`.
    pub chain_id: Option<u64>,
    /// Head reported by `block_number`.
    pub head: u64,
    transactions: HashMap<TxHash, ChainTransaction>,
    receipts: HashMap<TxHash, ChainReceipt>,
    blocks: HashMap<u64, ChainBlock>,
    failing_blocks: HashSet<u64>,
    receipt_script: RefCell<VecDeque<ReceiptStep>>,
    receipt_calls: Cell<u32>,
    block_calls: RefCell<Vec<u64>>,
}

impl MockChain {
    /// Empty chain on mainnet at the given head.
    pub fn new(head: u64) -> Self {
        Self {
            chain_id: Some(1),
            head,
            ..Self::default()
        }
    }

    /// Registers a transaction.
    pub fn with_transaction(mut self, tx: ChainTransaction) -> Self {
        self.transactions.insert(tx.hash, tx);
        self
    }

    /// Registers a receipt for `hash`.
    pub fn with_receipt(mut self, hash: TxHash, receipt: ChainReceipt) -> Self {
        self.receipts.insert(hash, receipt);
        self
    }

    /// Registers a block whose transactions pay the given gas prices (Wei).
    pub fn with_block(mut self, number: u64, gas_prices: &[u128]) -> Self {
        let transactions = gas_prices
            .iter()
            .map(|price| BlockTransaction {
                effective_gas_price: None,
                gas_price: Some(*price),
            })
            .collect();
        self.blocks.insert(
            number,
            ChainBlock {
                number,
                timestamp: 1_708_617_600 + number * 12,
                transactions,
            },
        );
        self
    }

    /// Makes `block(number, _)` fail with a transport error.
    pub fn with_failing_block(mut self, number: u64) -> Self {
        self.failing_blocks.insert(number);
        self
    }

    /// Scripts successive `receipt` answers. Once the script runs out the
    /// stored receipt (if any) is returned.
    pub fn with_receipt_script(self, steps: impl IntoIterator<Item = ReceiptStep>) -> Self {
        self.receipt_script.borrow_mut().extend(steps);
        self
    }

    /// Number of `receipt` calls made so far.
    pub fn receipt_calls(&self) -> u32 {
        self.receipt_calls.get()
    }

    /// Block numbers requested so far, in call order.
    pub fn block_calls(&self) -> Vec<u64> {
        self.block_calls.borrow().clone()
    }
}

impl ChainClient for MockChain {
    async fn chain_id(&self) -> Option<u64> {
        self.chain_id
    }

    async fn block_number(&self) -> Result<u64> {
        Ok(self.head)
    }

    async fn transaction(&self, hash: &TxHash) -> Result<Option<ChainTransaction>> {
        Ok(self.transactions.get(hash).cloned())
    }

    async fn receipt(&self, hash: &TxHash) -> Result<Option<ChainReceipt>> {
        self.receipt_calls.set(self.receipt_calls.get() + 1);
        let step = self.receipt_script.borrow_mut().pop_front();
        match step {
            Some(ReceiptStep::NotYet) => Ok(None),
            Some(ReceiptStep::Fail(message)) => Err(eyre!(message)),
            Some(ReceiptStep::Ready) | None => Ok(self.receipts.get(hash).cloned()),
        }
    }

    async fn block(&self, number: u64, full_transactions: bool) -> Result<Option<ChainBlock>> {
        self.block_calls.borrow_mut().push(number);
        if self.failing_blocks.contains(&number) {
            return Err(eyre!("eth_getBlockByNumber request failed: connection reset"));
        }
        Ok(self.blocks.get(&number).map(|block| {
            let mut block = block.clone();
            if !full_transactions {
                block.transactions.clear();
            }
            block
        }))
    }
}

/// Deterministic hash built from a small seed.
pub fn sample_hash(seed: u8) -> TxHash {
    let hex = format!("0x{}", format!("{seed:02x}").repeat(32));
    TxHash::parse(&hex).expect("generated hash is well formed")
}

/// Mined legacy transaction at `block` paying `gas_price` Wei.
pub fn sample_transaction(hash: TxHash, block: Option<u64>, gas_price: u128) -> ChainTransaction {
    ChainTransaction {
        hash,
        from: Some(sample_address(0xf3)),
        to: Some(sample_address(0x70)),
        block_number: block,
        gas_price: Some(gas_price),
    }
}

/// Successful receipt for a plain 21000-gas transfer.
pub fn sample_receipt(block: u64, effective_gas_price: Option<u128>) -> ChainReceipt {
    ChainReceipt {
        status: Some(true),
        gas_used: 21_000,
        effective_gas_price,
        block_number: block,
    }
}

fn sample_address(seed: u8) -> Address {
    Address::repeat_byte(seed)
}
