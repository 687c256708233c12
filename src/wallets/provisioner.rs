// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet matrix provisioning.
//!
//! Runs once per user, on first verification: one custodian wallet per
//! matrix entry. A failing pair never aborts the run; failures are
//! accounted per pair and the successes stand.

use tracing::{info, warn};

use super::matrix::MatrixEntry;
use crate::custody::{CustodyError, CustodyProvider};
use crate::signals::external_user_id;
use crate::storage::{AuditAction, AuditLogEntry, DbError, OnboardingDb, WalletRecord};

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("User already has wallets provisioned")]
    AlreadyProvisioned,

    #[error("storage failure: {0}")]
    Persistence(#[from] DbError),
}

#[derive(Debug, thiserror::Error)]
pub enum TopUpError {
    #[error("Wallet for this currency and network already exists")]
    AlreadyExists,

    #[error(transparent)]
    Custody(#[from] CustodyError),

    #[error("storage failure: {0}")]
    Persistence(#[from] DbError),
}

/// One matrix pair that failed to provision.
#[derive(Debug)]
pub struct PairFailure {
    pub currency: String,
    pub network: String,
    pub error: CustodyError,
}

/// Accounting for one provisioning run.
#[derive(Debug, Default)]
pub struct ProvisionOutcome {
    pub created: Vec<WalletRecord>,
    pub failures: Vec<PairFailure>,
}

/// Provision the full matrix for a user. Refuses to run when the user
/// already holds any wallet; otherwise walks every pair to the end and
/// reports per-pair failures instead of aborting.
pub async fn provision_wallets<C: CustodyProvider>(
    db: &OnboardingDb,
    custody: &C,
    matrix: &[MatrixEntry],
    user_id: &str,
) -> Result<ProvisionOutcome, ProvisionError> {
    if db.wallet_count(user_id)? > 0 {
        return Err(ProvisionError::AlreadyProvisioned);
    }

    let external_id = external_user_id(user_id);
    let mut outcome = ProvisionOutcome::default();

    for entry in matrix {
        match custody.create_wallet(&entry.network, &external_id).await {
            Ok(created) => {
                let wallet = WalletRecord::new(
                    user_id,
                    &entry.currency,
                    &entry.network,
                    created.id,
                    created.address,
                );
                match db.insert_wallet(&wallet) {
                    Ok(()) => outcome.created.push(wallet),
                    // A concurrent run won the pair; its row stands.
                    Err(DbError::AlreadyExists(key)) => {
                        warn!(user_id, key, "wallet pair already present, skipping");
                    }
                    Err(e) => return Err(e.into()),
                }
            }
            Err(error) => {
                warn!(
                    user_id,
                    currency = entry.currency,
                    network = entry.network,
                    %error,
                    "wallet creation failed for pair"
                );
                outcome.failures.push(PairFailure {
                    currency: entry.currency.clone(),
                    network: entry.network.clone(),
                    error,
                });
            }
        }
    }

    info!(
        user_id,
        created = outcome.created.len(),
        failed = outcome.failures.len(),
        "wallet provisioning run finished"
    );
    let audit = AuditLogEntry::new(user_id, "system", AuditAction::WalletsProvisioned)
        .with_comment(format!(
            "Provisioned {} of {} wallets",
            outcome.created.len(),
            matrix.len()
        ));
    db.append_audit(audit)?;

    Ok(outcome)
}

/// Provision a single extra pair the user does not hold yet.
pub async fn top_up_wallet<C: CustodyProvider>(
    db: &OnboardingDb,
    custody: &C,
    user_id: &str,
    currency: &str,
    network: &str,
) -> Result<WalletRecord, TopUpError> {
    let held = db.list_wallets(user_id)?;
    if held
        .iter()
        .any(|w| w.currency == currency && w.network == network)
    {
        return Err(TopUpError::AlreadyExists);
    }

    let created = custody
        .create_wallet(network, &external_user_id(user_id))
        .await?;
    let wallet = WalletRecord::new(user_id, currency, network, created.id, created.address);
    match db.insert_wallet(&wallet) {
        Ok(()) => {}
        Err(DbError::AlreadyExists(_)) => return Err(TopUpError::AlreadyExists),
        Err(e) => return Err(e.into()),
    }

    let audit = AuditLogEntry::new(user_id, "system", AuditAction::WalletsProvisioned)
        .with_comment(format!("Added {currency} wallet on {network}"));
    db.append_audit(audit)?;

    Ok(wallet)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallets::testing::ScriptedCustody;
    use tempfile::tempdir;

    fn open_db() -> (tempfile::TempDir, OnboardingDb) {
        let dir = tempdir().unwrap();
        let db = OnboardingDb::open(&dir.path().join("test.redb")).unwrap();
        (dir, db)
    }

    fn matrix() -> Vec<MatrixEntry> {
        vec![
            MatrixEntry {
                currency: "BTC".to_string(),
                network: "Bitcoin".to_string(),
            },
            MatrixEntry {
                currency: "USDT".to_string(),
                network: "Ethereum".to_string(),
            },
            MatrixEntry {
                currency: "USDC".to_string(),
                network: "Ethereum".to_string(),
            },
        ]
    }

    #[tokio::test]
    async fn partial_failure_keeps_successes() {
        let (_dir, db) = open_db();
        let custody = ScriptedCustody::new().fail_network("Bitcoin");

        let outcome = provision_wallets(&db, &custody, &matrix(), "u1")
            .await
            .unwrap();
        assert_eq!(outcome.created.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].network, "Bitcoin");
        assert_eq!(db.wallet_count("u1").unwrap(), 2);
    }

    #[tokio::test]
    async fn second_run_is_rejected() {
        let (_dir, db) = open_db();
        let custody = ScriptedCustody::new();

        provision_wallets(&db, &custody, &matrix(), "u1")
            .await
            .unwrap();
        assert!(matches!(
            provision_wallets(&db, &custody, &matrix(), "u1").await,
            Err(ProvisionError::AlreadyProvisioned)
        ));
    }

    #[tokio::test]
    async fn top_up_rejects_held_pair() {
        let (_dir, db) = open_db();
        let custody = ScriptedCustody::new();

        provision_wallets(&db, &custody, &matrix(), "u1")
            .await
            .unwrap();

        assert!(matches!(
            top_up_wallet(&db, &custody, "u1", "USDT", "Ethereum").await,
            Err(TopUpError::AlreadyExists)
        ));

        let wallet = top_up_wallet(&db, &custody, "u1", "USDT", "Base")
            .await
            .unwrap();
        assert_eq!(wallet.network, "Base");
        assert_eq!(db.wallet_count("u1").unwrap(), 4);
    }
}
