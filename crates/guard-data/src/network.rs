//! Human labels for well-known chain ids.

/// Known chain ids and their display labels.
pub const NETWORKS: &[(u64, &str)] = &[
    (1, "Ethereum Mainnet"),
    (5, "Goerli Testnet"),
    (10, "Optimism"),
    (56, "BNB Chain"),
    (137, "Polygon PoS"),
    (8453, "Base"),
    (42161, "Arbitrum One"),
    (43114, "Avalanche C-Chain"),
    (11155111, "Sepolia Testnet"),
];

/// Label for a chain id; `None` means the node did not report one.
pub fn network_label(chain_id: Option<u64>) -> String {
    match chain_id {
        None => "Unknown network".to_string(),
        Some(id) => NETWORKS
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(_, label)| (*label).to_string())
            .unwrap_or_else(|| format!("Chain {id}")),
    }
}
