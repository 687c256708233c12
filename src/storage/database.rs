// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded onboarding database backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `verification_records`: user_id → serialized VerificationRecord
//! - `user_verification`: user_id → serialized UserVerification
//! - `wallets`: composite key (owner|currency|network) → serialized WalletRecord
//! - `audit_log`: monotonic u64 → serialized AuditLogEntry
//! - `signal_events`: monotonic u64 → serialized SignalEvent
//!
//! Every logical mutation commits in a single write transaction, so a step
//! save and its audit entry (or a status transition, its step-2 side effect
//! and its audit entry) land atomically or not at all.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::audit::AuditLogEntry;
use super::events::SignalEvent;
use super::records::VerificationRecord;
use super::wallets::{WalletRecord, WalletStatus};
use crate::verification::UserVerification;

// =============================================================================
// Table Definitions
// =============================================================================

/// Primary record table: user_id → serialized VerificationRecord (JSON bytes).
const VERIFICATION_RECORDS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("verification_records");

/// Identity verification state: user_id → serialized UserVerification.
const USER_VERIFICATION: TableDefinition<&str, &[u8]> = TableDefinition::new("user_verification");

/// Wallet mirror: composite key `owner|currency|network` → serialized WalletRecord.
const WALLETS: TableDefinition<&str, &[u8]> = TableDefinition::new("wallets");

/// Append-only audit trail: monotonic id → serialized AuditLogEntry.
const AUDIT_LOG: TableDefinition<u64, &[u8]> = TableDefinition::new("audit_log");

/// Raw signal log: monotonic id → serialized SignalEvent.
const SIGNAL_EVENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("signal_events");

// =============================================================================
// Error Type
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),
}

pub type DbResult<T> = Result<T, DbError>;

// =============================================================================
// Key Helpers
// =============================================================================

/// Composite wallet key: `owner|currency|network`.
fn wallet_key(owner: &str, currency: &str, network: &str) -> String {
    format!("{owner}|{currency}|{network}")
}

/// Prefix for range-scanning all wallets of an owner.
fn wallet_prefix(owner: &str) -> String {
    format!("{owner}|")
}

// =============================================================================
// OnboardingDb
// =============================================================================

/// Embedded ACID onboarding database.
pub struct OnboardingDb {
    db: Database,
}

impl OnboardingDb {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> DbResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create all tables so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(VERIFICATION_RECORDS)?;
            let _ = write_txn.open_table(USER_VERIFICATION)?;
            let _ = write_txn.open_table(WALLETS)?;
            let _ = write_txn.open_table(AUDIT_LOG)?;
            let _ = write_txn.open_table(SIGNAL_EVENTS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }

    // =========================================================================
    // Verification Records
    // =========================================================================

    pub fn get_record(&self, user_id: &str) -> DbResult<Option<VerificationRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(VERIFICATION_RECORDS)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Persist a step save: the updated record plus its audit entry, in one
    /// transaction.
    pub fn commit_step(
        &self,
        record: &VerificationRecord,
        audit: AuditLogEntry,
    ) -> DbResult<u64> {
        let json = serde_json::to_vec(record)?;

        let write_txn = self.db.begin_write()?;
        let audit_id;
        {
            let mut records = write_txn.open_table(VERIFICATION_RECORDS)?;
            records.insert(record.user_id.as_str(), json.as_slice())?;

            let mut log = write_txn.open_table(AUDIT_LOG)?;
            audit_id = append_entry(&mut log, audit)?;
        }
        write_txn.commit()?;
        Ok(audit_id)
    }

    // =========================================================================
    // User Verification State
    // =========================================================================

    pub fn get_user_verification(&self, user_id: &str) -> DbResult<Option<UserVerification>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(USER_VERIFICATION)?;
        match table.get(user_id)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Fetch the user's verification row, creating the default `not_started`
    /// row if this is the first time the user is seen.
    pub fn ensure_user(&self, user_id: &str) -> DbResult<UserVerification> {
        if let Some(existing) = self.get_user_verification(user_id)? {
            return Ok(existing);
        }

        let state = UserVerification::new(user_id, chrono::Utc::now());
        let json = serde_json::to_vec(&state)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(USER_VERIFICATION)?;
            // Another writer may have raced us; keep the first row.
            if table.get(user_id)?.is_none() {
                table.insert(user_id, json.as_slice())?;
            }
        }
        write_txn.commit()?;

        // Re-read so a racing writer's row wins.
        Ok(self
            .get_user_verification(user_id)?
            .unwrap_or(state))
    }

    /// Persist a verification state change, an optional record update (the
    /// step-2 side effect of an approval), and its audit entry atomically.
    pub fn commit_verification(
        &self,
        state: &UserVerification,
        record: Option<&VerificationRecord>,
        audit: AuditLogEntry,
    ) -> DbResult<u64> {
        let state_json = serde_json::to_vec(state)?;
        let record_json = record.map(serde_json::to_vec).transpose()?;

        let write_txn = self.db.begin_write()?;
        let audit_id;
        {
            let mut table = write_txn.open_table(USER_VERIFICATION)?;
            table.insert(state.user_id.as_str(), state_json.as_slice())?;

            if let (Some(record), Some(json)) = (record, record_json.as_ref()) {
                let mut records = write_txn.open_table(VERIFICATION_RECORDS)?;
                records.insert(record.user_id.as_str(), json.as_slice())?;
            }

            let mut log = write_txn.open_table(AUDIT_LOG)?;
            audit_id = append_entry(&mut log, audit)?;
        }
        write_txn.commit()?;
        Ok(audit_id)
    }

    // =========================================================================
    // Audit Trail
    // =========================================================================

    pub fn append_audit(&self, entry: AuditLogEntry) -> DbResult<u64> {
        let write_txn = self.db.begin_write()?;
        let id;
        {
            let mut log = write_txn.open_table(AUDIT_LOG)?;
            id = append_entry(&mut log, entry)?;
        }
        write_txn.commit()?;
        Ok(id)
    }

    /// All audit entries for a user, newest first.
    pub fn list_audit_for_user(&self, user_id: &str) -> DbResult<Vec<AuditLogEntry>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUDIT_LOG)?;

        let mut entries = Vec::new();
        for item in table.iter()?.rev() {
            let (_, value) = item?;
            let entry: AuditLogEntry = serde_json::from_slice(value.value())?;
            if entry.user_id == user_id {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    // =========================================================================
    // Signal Events
    // =========================================================================

    pub fn append_signal_event(&self, mut event: SignalEvent) -> DbResult<u64> {
        let write_txn = self.db.begin_write()?;
        let id;
        {
            let mut table = write_txn.open_table(SIGNAL_EVENTS)?;
            id = table.last()?.map(|(k, _)| k.value() + 1).unwrap_or(0);
            event.id = id;
            let json = serde_json::to_vec(&event)?;
            table.insert(id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(id)
    }

    /// All recorded signals mapped to a user, newest first.
    pub fn list_events_for_user(&self, user_id: &str) -> DbResult<Vec<SignalEvent>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SIGNAL_EVENTS)?;

        let mut events = Vec::new();
        for item in table.iter()?.rev() {
            let (_, value) = item?;
            let event: SignalEvent = serde_json::from_slice(value.value())?;
            if event.user_id.as_deref() == Some(user_id) {
                events.push(event);
            }
        }
        Ok(events)
    }

    // =========================================================================
    // Wallets
    // =========================================================================

    /// Insert a wallet. Fails with `AlreadyExists` when the owner already has
    /// a wallet for the same (currency, network) pair; the check and the
    /// insert share one write transaction.
    pub fn insert_wallet(&self, wallet: &WalletRecord) -> DbResult<()> {
        let key = wallet_key(&wallet.owner_user_id, &wallet.currency, &wallet.network);
        let json = serde_json::to_vec(wallet)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WALLETS)?;
            if table.get(key.as_str())?.is_some() {
                return Err(DbError::AlreadyExists(key));
            }
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn wallet_count(&self, owner: &str) -> DbResult<usize> {
        Ok(self.list_wallets(owner)?.len())
    }

    /// All wallets of an owner, in (currency, network) key order.
    pub fn list_wallets(&self, owner: &str) -> DbResult<Vec<WalletRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(WALLETS)?;

        let prefix = wallet_prefix(owner);
        let mut wallets = Vec::new();
        for item in table.range(prefix.as_str()..)? {
            let (key, value) = item?;
            if !key.value().starts_with(prefix.as_str()) {
                break;
            }
            wallets.push(serde_json::from_slice(value.value())?);
        }
        Ok(wallets)
    }

    /// Flip the status of the owner's wallet with the given custodian id.
    /// Returns `true` when a row was found and its status actually changed.
    pub fn update_wallet_status(
        &self,
        owner: &str,
        custodian_wallet_id: &str,
        status: WalletStatus,
    ) -> DbResult<bool> {
        // Locate the composite key outside the write transaction; wallet keys
        // are immutable so the lookup cannot go stale.
        let target = self
            .list_wallets(owner)?
            .into_iter()
            .find(|w| w.custodian_wallet_id == custodian_wallet_id);
        let Some(wallet) = target else {
            return Ok(false);
        };
        if wallet.status == status {
            return Ok(false);
        }

        let key = wallet_key(owner, &wallet.currency, &wallet.network);
        let mut updated = wallet;
        updated.status = status;
        updated.updated_at = chrono::Utc::now();
        let json = serde_json::to_vec(&updated)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(WALLETS)?;
            table.insert(key.as_str(), json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(true)
    }
}

/// Append an entry to a monotonic-key table, assigning the next id.
fn append_entry(
    table: &mut redb::Table<'_, u64, &[u8]>,
    mut entry: AuditLogEntry,
) -> DbResult<u64> {
    let id = table.last()?.map(|(k, _)| k.value() + 1).unwrap_or(0);
    entry.id = id;
    let json = serde_json::to_vec(&entry)?;
    table.insert(id, json.as_slice())?;
    Ok(id)
}
