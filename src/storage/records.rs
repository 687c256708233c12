// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-user verification record: collected disclosure fields plus the four
//! step flags driving the onboarding pipeline.
//!
//! ## Invariants
//!
//! - `step_N.completed` implies `step_(N-1).completed` (enforced by the step
//!   state machine before `mark_step` is reached).
//! - Step flags are monotonic; nothing clears them except an explicit
//!   provider reset of the whole record, which never happens here.
//! - `all_steps_completed` is true iff all four flags are true, and is set
//!   exactly once together with its timestamp.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Postal address collected in step 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Address {
    pub address_line1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_line2: Option<String>,
    pub postal_code: String,
    pub city: String,
    /// ISO 3166-1 alpha-2 country code, uppercased.
    pub country_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_code: Option<String>,
    pub country: String,
}

/// Step 1 — personal identity fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// ISO 3166-1 alpha-2 nationality code, uppercased.
    pub nationality: String,
    pub email_address: String,
    pub phone_number: String,
    pub address: Address,
}

/// Step 3 — tax fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TaxInfo {
    /// SSN/ITIN for US residents, national tax id otherwise.
    pub tax_identification_number: String,
    /// ISO 3166-1 alpha-2 tax residence country code, uppercased.
    pub tax_residence_country_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmploymentStatus {
    SelfEmployed,
    Salaried,
    Unemployed,
    Retired,
    NotProvided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceOfFunds {
    Salary,
    Pension,
    Savings,
    SelfEmployment,
    CryptoTrading,
    Gambling,
    RealEstate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PepStatus {
    NotPep,
    #[serde(rename = "FORMER_PEP_2_YEARS")]
    FormerPep2Years,
    FormerPepOlder,
    DomesticPep,
    ForeignPep,
    CloseAssociates,
    FamilyMembers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountPurpose {
    TransfersOwnWallet,
    TransfersFamilyFriends,
    Investments,
    GoodsServices,
    Donations,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum VolumeCurrency {
    Usd,
    Eur,
}

/// Step 4 — customer due diligence disclosure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DueDiligence {
    pub employment_status: EmploymentStatus,
    pub source_of_funds: SourceOfFunds,
    pub pep_status: PepStatus,
    pub account_purpose: AccountPurpose,
    /// Expected monthly transaction volume in whole currency units.
    pub expected_monthly_volume: u64,
    pub expected_monthly_volume_currency: VolumeCurrency,
}

/// Completion flag + timestamp for a single step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StepState {
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Number of steps in the onboarding pipeline.
pub const STEP_COUNT: u8 = 4;

/// Per-user verification record. Created lazily on first access; never
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VerificationRecord {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub personal: Option<PersonalInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax: Option<TaxInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_diligence: Option<DueDiligence>,
    /// Step states for steps 1..=4, in order.
    pub steps: [StepState; STEP_COUNT as usize],
    pub all_steps_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            personal: None,
            tax: None,
            due_diligence: None,
            steps: [StepState::default(); STEP_COUNT as usize],
            all_steps_completed: false,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Step state for step `n` (1-based). Panics on out-of-range `n`;
    /// callers go through the step state machine which only produces 1..=4.
    pub fn step(&self, n: u8) -> &StepState {
        &self.steps[(n - 1) as usize]
    }

    pub fn is_step_complete(&self, n: u8) -> bool {
        self.step(n).completed
    }

    /// Lowest incomplete step, or `None` when all four are complete.
    pub fn first_incomplete_step(&self) -> Option<u8> {
        (1..=STEP_COUNT).find(|&n| !self.is_step_complete(n))
    }

    /// Mark step `n` complete. Idempotent: an already-set flag and its
    /// timestamp are left untouched.
    pub fn mark_step(&mut self, n: u8, now: DateTime<Utc>) {
        let state = &mut self.steps[(n - 1) as usize];
        if !state.completed {
            state.completed = true;
            state.completed_at = Some(now);
        }
        self.updated_at = now;
    }

    /// Re-evaluate the aggregate flag. Sets `all_steps_completed` and its
    /// timestamp exactly once, when all four flags hold. Returns the current
    /// aggregate value.
    pub fn evaluate_completion(&mut self, now: DateTime<Utc>) -> bool {
        if !self.all_steps_completed && self.steps.iter().all(|s| s.completed) {
            self.all_steps_completed = true;
            self.completed_at = Some(now);
            self.updated_at = now;
        }
        self.all_steps_completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_record_has_no_progress() {
        let rec = VerificationRecord::new("user-1", Utc::now());
        assert_eq!(rec.first_incomplete_step(), Some(1));
        assert!(!rec.all_steps_completed);
        assert!(rec.completed_at.is_none());
        for n in 1..=STEP_COUNT {
            assert!(!rec.is_step_complete(n));
        }
    }

    #[test]
    fn mark_step_is_idempotent() {
        let mut rec = VerificationRecord::new("user-1", Utc::now());
        let first = Utc::now();
        rec.mark_step(2, first);
        let stamped = rec.step(2).completed_at;

        rec.mark_step(2, Utc::now());
        assert!(rec.is_step_complete(2));
        assert_eq!(rec.step(2).completed_at, stamped);
    }

    #[test]
    fn aggregate_set_exactly_once() {
        let mut rec = VerificationRecord::new("user-1", Utc::now());
        for n in 1..=STEP_COUNT {
            rec.mark_step(n, Utc::now());
        }

        let now = Utc::now();
        assert!(rec.evaluate_completion(now));
        let stamped = rec.completed_at;
        assert!(stamped.is_some());

        // Re-evaluation keeps the original timestamp.
        assert!(rec.evaluate_completion(Utc::now()));
        assert_eq!(rec.completed_at, stamped);
    }

    #[test]
    fn aggregate_requires_all_four_flags() {
        let mut rec = VerificationRecord::new("user-1", Utc::now());
        for n in 1..=3 {
            rec.mark_step(n, Utc::now());
        }
        assert!(!rec.evaluate_completion(Utc::now()));
        assert!(rec.completed_at.is_none());
        assert_eq!(rec.first_incomplete_step(), Some(4));
    }

    #[test]
    fn pep_wire_names_match_provider_catalog() {
        let json = serde_json::to_string(&PepStatus::FormerPep2Years).unwrap();
        assert_eq!(json, "\"FORMER_PEP_2_YEARS\"");
        let json = serde_json::to_string(&PepStatus::NotPep).unwrap();
        assert_eq!(json, "\"NOT_PEP\"");
        let json = serde_json::to_string(&SourceOfFunds::CryptoTrading).unwrap();
        assert_eq!(json, "\"CRYPTO_TRADING\"");
    }
}
