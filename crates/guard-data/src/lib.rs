//! guard-data crate
//!
//! Chain-facing half of the fee guard: typed chain records, the
//! [`ChainClient`] capability and its JSON-RPC implementation, plus unit and
//! network-label helpers.

pub mod client;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod network;
pub mod rpc;
pub mod types;
pub mod units;

pub use client::ChainClient;
pub use rpc::RpcClient;
pub use types::{BlockTransaction, ChainBlock, ChainReceipt, ChainTransaction, ExecutionStatus, TxHash};
