// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Default wallet matrix: the (currency, network) pairs every verified user
//! receives.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::config::env_or_default;

/// One (currency, network) pair to provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MatrixEntry {
    pub currency: String,
    pub network: String,
}

impl MatrixEntry {
    fn new(currency: &str, network: &str) -> Self {
        Self {
            currency: currency.to_string(),
            network: network.to_string(),
        }
    }
}

/// Production matrix: ten pairs across mainnet networks.
pub fn production_matrix() -> Vec<MatrixEntry> {
    vec![
        MatrixEntry::new("BTC", "Bitcoin"),
        MatrixEntry::new("ETH", "Ethereum"),
        MatrixEntry::new("USDT", "Ethereum"),
        MatrixEntry::new("USDC", "Ethereum"),
        MatrixEntry::new("SOL", "Solana"),
        MatrixEntry::new("USDT", "Solana"),
        MatrixEntry::new("USDC", "Solana"),
        MatrixEntry::new("USDT", "ArbitrumOne"),
        MatrixEntry::new("USDT", "Optimism"),
        MatrixEntry::new("USDT", "Base"),
    ]
}

/// Testnet matrix used in development and against the custodian sandbox.
pub fn testnet_matrix() -> Vec<MatrixEntry> {
    vec![
        MatrixEntry::new("USDT", "EthereumSepolia"),
        MatrixEntry::new("USDC", "EthereumSepolia"),
    ]
}

/// Select the matrix from the environment: testnet for development/staging
/// deployments or when the custody base URL points at the sandbox.
pub fn matrix_from_env() -> Vec<MatrixEntry> {
    let environment = env_or_default("ENVIRONMENT", "development").to_ascii_lowercase();
    let sandbox_custody = env_or_default("CUSTODY_BASE_URL", "")
        .trim_end_matches('/')
        .ends_with("sandbox");

    if environment == "development" || environment == "staging" || sandbox_custody {
        testnet_matrix()
    } else {
        production_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_matrix_has_unique_pairs() {
        let matrix = production_matrix();
        assert_eq!(matrix.len(), 10);

        let mut pairs: Vec<_> = matrix
            .iter()
            .map(|e| (e.currency.as_str(), e.network.as_str()))
            .collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 10);
    }

    #[test]
    fn testnet_matrix_targets_sepolia() {
        let matrix = testnet_matrix();
        assert_eq!(matrix.len(), 2);
        assert!(matrix.iter().all(|e| e.network == "EthereumSepolia"));
    }
}
