// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local wallet mirror of custodian-held wallets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Lifecycle status of a mirrored wallet.
///
/// `Deleted` is only set after a confirmatory lookup against the custodian;
/// a wallet missing from a single list response is not enough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WalletStatus {
    Active,
    Deleted,
}

/// One (currency, network) wallet owned by a user.
///
/// Uniqueness over `(owner_user_id, currency, network)` is enforced by the
/// store's composite key.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletRecord {
    pub owner_user_id: String,
    pub currency: String,
    pub network: String,
    /// Wallet id assigned by the custodian.
    pub custodian_wallet_id: String,
    pub address: Option<String>,
    pub balance: f64,
    pub available_balance: f64,
    pub frozen_balance: f64,
    pub status: WalletStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletRecord {
    pub fn new(
        owner_user_id: impl Into<String>,
        currency: impl Into<String>,
        network: impl Into<String>,
        custodian_wallet_id: impl Into<String>,
        address: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            owner_user_id: owner_user_id.into(),
            currency: currency.into(),
            network: network.into(),
            custodian_wallet_id: custodian_wallet_id.into(),
            address,
            balance: 0.0,
            available_balance: 0.0,
            frozen_balance: 0.0,
            status: WalletStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wallet_is_active_with_zero_balances() {
        let wallet = WalletRecord::new("user-1", "USDT", "Ethereum", "wa-123", None);
        assert_eq!(wallet.status, WalletStatus::Active);
        assert_eq!(wallet.balance, 0.0);
        assert_eq!(wallet.available_balance, 0.0);
        assert_eq!(wallet.frozen_balance, 0.0);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&WalletStatus::Deleted).unwrap(),
            "\"deleted\""
        );
    }
}
