//! JSON-RPC chain client over HTTP.
//!
//! Issues raw `eth_*` calls with reqwest and maps the wire payloads into the
//! typed records in [`crate::types`]. Every request carries the timeout
//! configured at connect time.

use std::time::{Duration, Instant};

use alloy::primitives::Address;
use eyre::{eyre, Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::client::ChainClient;
use crate::network::network_label;
use crate::types::{BlockTransaction, ChainBlock, ChainReceipt, ChainTransaction, TxHash};

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTransaction {
    hash: String,
    from: Option<String>,
    to: Option<String>,
    block_number: Option<String>,
    gas_price: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireReceipt {
    status: Option<String>,
    gas_used: String,
    effective_gas_price: Option<String>,
    block_number: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlockTransaction {
    gas_price: Option<String>,
    effective_gas_price: Option<String>,
}

/// `transactions` is a list of hashes when fetched without full objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireBlockTransactions {
    Full(Vec<WireBlockTransaction>),
    Hashes(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireBlock {
    number: String,
    timestamp: String,
    #[serde(default)]
    transactions: Option<WireBlockTransactions>,
}

/// Parses a JSON-RPC hex quantity (`0x`-prefixed, no leading zero padding
/// required) into an integer.
pub fn parse_quantity_u128(value: &str, context: &str) -> Result<u128> {
    let hex = value
        .trim()
        .strip_prefix("0x")
        .ok_or_else(|| eyre!("{context}: quantity {value:?} is missing 0x prefix"))?;
    if hex.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(hex, 16)
        .wrap_err_with(|| format!("{context}: invalid hex quantity {value:?}"))
}

/// [`parse_quantity_u128`] narrowed to `u64`.
pub fn parse_quantity_u64(value: &str, context: &str) -> Result<u64> {
    let wide = parse_quantity_u128(value, context)?;
    u64::try_from(wide).map_err(|_| eyre!("{context}: quantity {value:?} overflows u64"))
}

fn parse_optional_quantity(value: Option<&str>, context: &str) -> Result<Option<u128>> {
    value.map(|v| parse_quantity_u128(v, context)).transpose()
}

fn parse_address(value: Option<&str>, context: &str) -> Result<Option<Address>> {
    value
        .map(|v| {
            v.parse::<Address>()
                .wrap_err_with(|| format!("{context}: invalid address {v:?}"))
        })
        .transpose()
}

impl TryFrom<WireTransaction> for ChainTransaction {
    type Error = eyre::Report;

    fn try_from(wire: WireTransaction) -> Result<Self> {
        Ok(Self {
            hash: TxHash::parse(&wire.hash)?,
            from: parse_address(wire.from.as_deref(), "transaction.from")?,
            to: parse_address(wire.to.as_deref(), "transaction.to")?,
            block_number: wire
                .block_number
                .as_deref()
                .map(|v| parse_quantity_u64(v, "transaction.blockNumber"))
                .transpose()?,
            gas_price: parse_optional_quantity(wire.gas_price.as_deref(), "transaction.gasPrice")?,
        })
    }
}

impl TryFrom<WireReceipt> for ChainReceipt {
    type Error = eyre::Report;

    fn try_from(wire: WireReceipt) -> Result<Self> {
        let status = wire
            .status
            .as_deref()
            .map(|v| parse_quantity_u64(v, "receipt.status"))
            .transpose()?
            .map(|s| s == 1);

        Ok(Self {
            status,
            gas_used: parse_quantity_u64(&wire.gas_used, "receipt.gasUsed")?,
            effective_gas_price: parse_optional_quantity(
                wire.effective_gas_price.as_deref(),
                "receipt.effectiveGasPrice",
            )?,
            block_number: parse_quantity_u64(&wire.block_number, "receipt.blockNumber")?,
        })
    }
}

impl TryFrom<WireBlock> for ChainBlock {
    type Error = eyre::Report;

    fn try_from(wire: WireBlock) -> Result<Self> {
        let transactions = match wire.transactions {
            Some(WireBlockTransactions::Full(txs)) => txs
                .into_iter()
                .map(|tx| {
                    Ok(BlockTransaction {
                        effective_gas_price: parse_optional_quantity(
                            tx.effective_gas_price.as_deref(),
                            "block.transactions.effectiveGasPrice",
                        )?,
                        gas_price: parse_optional_quantity(
                            tx.gas_price.as_deref(),
                            "block.transactions.gasPrice",
                        )?,
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(WireBlockTransactions::Hashes(_)) | None => Vec::new(),
        };

        Ok(Self {
            number: parse_quantity_u64(&wire.number, "block.number")?,
            timestamp: parse_quantity_u64(&wire.timestamp, "block.timestamp")?,
            transactions,
        })
    }
}

/// HTTP JSON-RPC client.
pub struct RpcClient {
    client: Client,
    rpc_url: String,
}

impl RpcClient {
    /// Builds the client without contacting the node.
    ///
    /// # Errors
    /// Returns error if the URL is not http(s) or the HTTP client cannot be built.
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self> {
        let url: reqwest::Url = rpc_url.parse().wrap_err("invalid RPC URL format")?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(eyre!(
                "unsupported RPC URL scheme {:?}; expected http or https",
                url.scheme()
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .wrap_err("failed to build HTTP client")?;

        Ok(Self {
            client,
            rpc_url: rpc_url.to_string(),
        })
    }

    /// Creates a client and tests connectivity with `eth_blockNumber`.
    ///
    /// Logs chain id, network label, tip, and connect latency on success.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the liveness check fails.
    #[tracing::instrument(skip_all, fields(rpc_url = %rpc_url))]
    pub async fn connect(rpc_url: &str, timeout: Duration) -> Result<Self> {
        let started = Instant::now();
        let client = Self::new(rpc_url, timeout)?;

        let tip = client
            .block_number()
            .await
            .wrap_err_with(|| format!("failed to connect to RPC endpoint {rpc_url}"))?;
        let chain_id = client.chain_id().await;

        tracing::info!(
            chain_id = ?chain_id,
            network = %network_label(chain_id),
            tip,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "RPC connection successful"
        );

        Ok(client)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<Option<T>> {
        let payload = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| eyre!("{} request failed: {}", method, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(eyre!("{} HTTP status: {}", method, status));
        }

        let rpc: RpcResponse<T> = response
            .json()
            .await
            .map_err(|e| eyre!("failed to decode {} response: {}", method, e))?;

        if let Some(error) = rpc.error {
            return Err(eyre!(
                "{} RPC error {}: {}",
                method,
                error.code,
                error.message
            ));
        }

        Ok(rpc.result)
    }
}

impl ChainClient for RpcClient {
    async fn chain_id(&self) -> Option<u64> {
        let result = self
            .call::<String>("eth_chainId", json!([]))
            .await
            .and_then(|hex| {
                let hex = hex.ok_or_else(|| eyre!("eth_chainId missing result"))?;
                parse_quantity_u64(&hex, "eth_chainId")
            });

        match result {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::debug!(error = %e, "chain id lookup failed");
                None
            }
        }
    }

    async fn block_number(&self) -> Result<u64> {
        let hex = self
            .call::<String>("eth_blockNumber", json!([]))
            .await?
            .ok_or_else(|| eyre!("eth_blockNumber missing result"))?;
        parse_quantity_u64(&hex, "eth_blockNumber")
    }

    #[tracing::instrument(skip(self, hash), fields(tx_hash = %hash))]
    async fn transaction(&self, hash: &TxHash) -> Result<Option<ChainTransaction>> {
        self.call::<WireTransaction>("eth_getTransactionByHash", json!([hash.to_string()]))
            .await?
            .map(ChainTransaction::try_from)
            .transpose()
            .wrap_err_with(|| format!("failed to decode transaction {hash}"))
    }

    #[tracing::instrument(skip(self, hash), fields(tx_hash = %hash))]
    async fn receipt(&self, hash: &TxHash) -> Result<Option<ChainReceipt>> {
        self.call::<WireReceipt>("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?
            .map(ChainReceipt::try_from)
            .transpose()
            .wrap_err_with(|| format!("failed to decode receipt for {hash}"))
    }

    #[tracing::instrument(skip(self))]
    async fn block(&self, number: u64, full_transactions: bool) -> Result<Option<ChainBlock>> {
        self.call::<WireBlock>(
            "eth_getBlockByNumber",
            json!([format!("0x{number:x}"), full_transactions]),
        )
        .await?
        .map(ChainBlock::try_from)
        .transpose()
        .wrap_err_with(|| format!("failed to decode block {number}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

    #[test]
    fn quantity_parsing() {
        assert_eq!(parse_quantity_u128("0x0", "t").unwrap(), 0);
        assert_eq!(parse_quantity_u128("0xba43b7400", "t").unwrap(), 50_000_000_000);
        assert_eq!(parse_quantity_u64("0x5208", "t").unwrap(), 21_000);
        assert!(parse_quantity_u128("5208", "t").is_err());
        assert!(parse_quantity_u128("0xzz", "t").is_err());
        assert!(parse_quantity_u64("0x1ffffffffffffffff", "t").is_err());
    }

    #[test]
    fn maps_mined_transaction() {
        let wire: WireTransaction = serde_json::from_value(json!({
            "hash": HASH,
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "to": null,
            "blockNumber": "0x112a880",
            "gasPrice": "0xba43b7400",
            "nonce": "0x1"
        }))
        .unwrap();

        let tx = ChainTransaction::try_from(wire).unwrap();
        assert_eq!(tx.hash.to_string(), HASH);
        assert!(tx.from.is_some());
        assert_eq!(tx.to, None);
        assert_eq!(tx.block_number, Some(18_000_000));
        assert_eq!(tx.gas_price, Some(50_000_000_000));
        assert!(!tx.is_pending());
    }

    #[test]
    fn maps_pending_transaction() {
        let wire: WireTransaction = serde_json::from_value(json!({
            "hash": HASH,
            "from": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
            "to": "0x70997970c51812e339d9b73b0245ad59e15ebbf9",
            "blockNumber": null,
            "gasPrice": "0x3b9aca00"
        }))
        .unwrap();

        let tx = ChainTransaction::try_from(wire).unwrap();
        assert!(tx.is_pending());
    }

    #[test]
    fn maps_receipt_with_and_without_effective_price() {
        let wire: WireReceipt = serde_json::from_value(json!({
            "status": "0x1",
            "gasUsed": "0x5208",
            "effectiveGasPrice": "0xba43b7400",
            "blockNumber": "0x3e8"
        }))
        .unwrap();
        let receipt = ChainReceipt::try_from(wire).unwrap();
        assert_eq!(receipt.status, Some(true));
        assert_eq!(receipt.gas_used, 21_000);
        assert_eq!(receipt.effective_gas_price, Some(50_000_000_000));
        assert_eq!(receipt.block_number, 1_000);

        let legacy: WireReceipt = serde_json::from_value(json!({
            "status": "0x0",
            "gasUsed": "0x5208",
            "blockNumber": "0x3e8"
        }))
        .unwrap();
        let receipt = ChainReceipt::try_from(legacy).unwrap();
        assert_eq!(receipt.status, Some(false));
        assert_eq!(receipt.effective_gas_price, None);
    }

    #[test]
    fn maps_block_with_full_and_hash_only_transactions() {
        let full: WireBlock = serde_json::from_value(json!({
            "number": "0x10",
            "timestamp": "0x65d73740",
            "transactions": [
                { "gasPrice": "0x3b9aca00" },
                { "gasPrice": "0x77359400", "effectiveGasPrice": "0x3b9aca00" }
            ]
        }))
        .unwrap();
        let block = ChainBlock::try_from(full).unwrap();
        assert_eq!(block.number, 16);
        assert_eq!(block.timestamp, 1_708_603_200);
        assert_eq!(block.transactions.len(), 2);
        assert_eq!(block.transactions[1].fee_rate(), Some(1_000_000_000));

        let hashes: WireBlock = serde_json::from_value(json!({
            "number": "0x10",
            "timestamp": "0x65d73740",
            "transactions": [HASH]
        }))
        .unwrap();
        assert!(ChainBlock::try_from(hashes).unwrap().transactions.is_empty());
    }

    #[test]
    fn rejects_non_http_url() {
        assert!(RpcClient::new("invalid://url", Duration::from_secs(1)).is_err());
        assert!(RpcClient::new("not a url", Duration::from_secs(1)).is_err());
        assert!(RpcClient::new("http://127.0.0.1:8545", Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn connect_fails_for_unreachable_endpoint() {
        let result = RpcClient::connect("http://127.0.0.1:1", Duration::from_millis(500)).await;
        assert!(result.is_err(), "should fail liveness check");
    }
}
