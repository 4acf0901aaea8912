//! One-shot transaction resolution.

use eyre::{Context, Result};

use guard_data::{ChainClient, ChainReceipt, ChainTransaction, TxHash};

/// Note attached when a mined transaction has no receipt yet.
pub const RECEIPT_RACE_NOTE: &str = "receipt not yet available";

/// Where a transaction stands on chain.
#[derive(Clone, Debug, PartialEq)]
pub enum Resolution {
    /// The node has no record of the hash.
    NotFound,
    /// Known but not yet in a block.
    Pending(ChainTransaction),
    /// In a block, but the receipt is not indexed yet.
    ReceiptPending(ChainTransaction),
    /// Mined, with its receipt.
    Included(ChainTransaction, ChainReceipt),
}

impl Resolution {
    /// The transaction record, when the node knows the hash.
    pub fn transaction(&self) -> Option<&ChainTransaction> {
        match self {
            Self::NotFound => None,
            Self::Pending(tx) | Self::ReceiptPending(tx) | Self::Included(tx, _) => Some(tx),
        }
    }
}

/// Looks the transaction up once, without retrying.
///
/// Pending transactions are returned as [`Resolution::Pending`] straight
/// away; the receipt is only requested for mined transactions.
///
/// # Errors
/// Returns error on transport failures; "not found" is not an error.
#[tracing::instrument(skip(client, hash), fields(tx_hash = %hash))]
pub async fn resolve<C: ChainClient>(client: &C, hash: &TxHash) -> Result<Resolution> {
    let tx = client
        .transaction(hash)
        .await
        .wrap_err_with(|| format!("failed to fetch transaction {hash}"))?;

    let Some(tx) = tx else {
        tracing::debug!("transaction not found");
        return Ok(Resolution::NotFound);
    };

    if tx.is_pending() {
        tracing::debug!("transaction is pending");
        return Ok(Resolution::Pending(tx));
    }

    let receipt = client
        .receipt(hash)
        .await
        .wrap_err_with(|| format!("failed to fetch receipt for {hash}"))?;

    Ok(match receipt {
        Some(receipt) => Resolution::Included(tx, receipt),
        None => {
            tracing::warn!(block_number = ?tx.block_number, "{}", RECEIPT_RACE_NOTE);
            Resolution::ReceiptPending(tx)
        }
    })
}
