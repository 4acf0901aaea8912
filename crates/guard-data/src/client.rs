//! Chain access capability consumed by the analysis crate.

use eyre::Result;

use crate::types::{ChainBlock, ChainReceipt, ChainTransaction, TxHash};

/// Read-only view of an EVM chain.
///
/// `Ok(None)` always means "the node has no record (yet)"; `Err` is reserved
/// for transport and decoding failures so callers can tell the two apart.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// Chain id reported by the node, or `None` if the lookup failed.
    async fn chain_id(&self) -> Option<u64>;

    /// Latest block number.
    async fn block_number(&self) -> Result<u64>;

    /// Transaction by hash.
    async fn transaction(&self, hash: &TxHash) -> Result<Option<ChainTransaction>>;

    /// Receipt by transaction hash; `None` while not mined or not indexed.
    async fn receipt(&self, hash: &TxHash) -> Result<Option<ChainReceipt>>;

    /// Block by number, with transaction objects when `full_transactions`.
    async fn block(&self, number: u64, full_transactions: bool) -> Result<Option<ChainBlock>>;
}
