// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Persistence layer: embedded redb database plus the stored data model.

pub mod audit;
pub mod database;
pub mod events;
pub mod records;
pub mod wallets;

pub use audit::{AuditAction, AuditLogEntry};
pub use database::{DbError, DbResult, OnboardingDb};
pub use events::SignalEvent;
pub use records::{
    AccountPurpose, Address, DueDiligence, EmploymentStatus, PepStatus, PersonalInfo, SourceOfFunds,
    StepState, TaxInfo, VerificationRecord, VolumeCurrency, STEP_COUNT,
};
pub use wallets::{WalletRecord, WalletStatus};
