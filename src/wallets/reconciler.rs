// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wallet reconciliation against the custodian.
//!
//! The custodian's listing is the source of truth for wallet existence.
//! A wallet absent from one list response is not declared dead on that
//! alone: a confirmatory per-wallet lookup must also report it gone before
//! the local row flips to `deleted`. Rows are never removed, only flipped.

use std::collections::HashSet;

use tracing::info;

use crate::custody::{CustodyError, CustodyProvider};
use crate::signals::external_user_id;
use crate::storage::{AuditAction, AuditLogEntry, DbError, OnboardingDb, WalletStatus};

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Custody(#[from] CustodyError),

    #[error("storage failure: {0}")]
    Persistence(#[from] DbError),
}

/// Partition of the user's local wallets by custodian wallet id. Repeated
/// runs against an unchanged custodian yield an identical report.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Wallets the custodian still knows.
    pub active: Vec<String>,
    /// Wallets the custodian confirmed gone.
    pub deleted: Vec<String>,
}

/// Reconcile the user's local wallet mirror with the custodian and flip
/// local statuses to match. Idempotent.
pub async fn reconcile_wallets<C: CustodyProvider>(
    db: &OnboardingDb,
    custody: &C,
    user_id: &str,
) -> Result<ReconcileReport, ReconcileError> {
    let local = db.list_wallets(user_id)?;
    if local.is_empty() {
        return Ok(ReconcileReport::default());
    }

    let remote = custody.list_wallets(&external_user_id(user_id)).await?;
    let remote_ids: HashSet<&str> = remote.iter().map(|w| w.id.as_str()).collect();

    let mut report = ReconcileReport::default();
    let mut changed = 0usize;
    for wallet in &local {
        let id = wallet.custodian_wallet_id.as_str();

        // Absent from the listing is only a suspicion; the by-id lookup is
        // the verdict.
        let alive = remote_ids.contains(id) || custody.get_wallet(id).await?.is_some();

        let status = if alive {
            report.active.push(id.to_string());
            WalletStatus::Active
        } else {
            report.deleted.push(id.to_string());
            WalletStatus::Deleted
        };
        if db.update_wallet_status(user_id, id, status)? {
            changed += 1;
        }
    }

    if changed > 0 {
        info!(
            user_id,
            active = report.active.len(),
            deleted = report.deleted.len(),
            changed,
            "wallet reconciliation applied changes"
        );
        let audit = AuditLogEntry::new(user_id, "system", AuditAction::WalletsReconciled)
            .with_comment(format!(
                "Reconciled wallets: {} active, {} deleted",
                report.active.len(),
                report.deleted.len()
            ));
        db.append_audit(audit)?;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::WalletRecord;
    use crate::wallets::testing::ScriptedCustody;
    use tempfile::tempdir;

    fn open_db() -> (tempfile::TempDir, OnboardingDb) {
        let dir = tempdir().unwrap();
        let db = OnboardingDb::open(&dir.path().join("test.redb")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn confirmed_missing_wallet_flips_to_deleted() {
        let (_dir, db) = open_db();
        let custody = ScriptedCustody::new();

        let kept = custody
            .create_wallet("Ethereum", "user_u1")
            .await
            .unwrap();
        db.insert_wallet(&WalletRecord::new(
            "u1",
            "USDT",
            "Ethereum",
            kept.id.clone(),
            None,
        ))
        .unwrap();
        // Local row the custodian has never heard of.
        db.insert_wallet(&WalletRecord::new("u1", "BTC", "Bitcoin", "wa-gone", None))
            .unwrap();

        let report = reconcile_wallets(&db, &custody, "u1").await.unwrap();
        assert_eq!(report.active, vec![kept.id.clone()]);
        assert_eq!(report.deleted, vec!["wa-gone".to_string()]);

        let statuses: Vec<_> = db
            .list_wallets("u1")
            .unwrap()
            .into_iter()
            .map(|w| (w.custodian_wallet_id, w.status))
            .collect();
        assert!(statuses.contains(&("wa-gone".to_string(), WalletStatus::Deleted)));
        assert!(statuses.contains(&(kept.id, WalletStatus::Active)));
    }

    #[tokio::test]
    async fn wallet_absent_from_listing_but_confirmed_alive_stays_active() {
        let (_dir, db) = open_db();
        let custody = ScriptedCustody::new();

        let wallet = custody
            .create_wallet("Ethereum", "user_u1")
            .await
            .unwrap();
        db.insert_wallet(&WalletRecord::new(
            "u1",
            "USDT",
            "Ethereum",
            wallet.id.clone(),
            None,
        ))
        .unwrap();

        // Listing omits the wallet but the direct lookup still finds it.
        custody.hide_from_listing(&wallet.id);
        let report = reconcile_wallets(&db, &custody, "u1").await.unwrap();
        assert_eq!(report.active, vec![wallet.id]);
        assert!(report.deleted.is_empty());
        assert_eq!(
            db.list_wallets("u1").unwrap()[0].status,
            WalletStatus::Active
        );
    }

    #[tokio::test]
    async fn repeated_runs_yield_identical_reports() {
        let (_dir, db) = open_db();
        let custody = ScriptedCustody::new();

        db.insert_wallet(&WalletRecord::new("u1", "BTC", "Bitcoin", "wa-gone", None))
            .unwrap();

        let first = reconcile_wallets(&db, &custody, "u1").await.unwrap();
        assert_eq!(first.deleted, vec!["wa-gone".to_string()]);

        let second = reconcile_wallets(&db, &custody, "u1").await.unwrap();
        assert_eq!(first, second);

        // Only the first run flipped anything, so only one audit entry.
        let trail = db.list_audit_for_user("u1").unwrap();
        assert_eq!(trail.len(), 1);
    }
}
