// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Four-step onboarding pipeline.
//!
//! Steps must complete in order; a submission for step N is rejected while
//! any earlier step is incomplete, naming the lowest missing one. Step 2 is
//! never submitted directly: it flips when the identity provider approves
//! the user, and its endpoint only confirms the current identity verdict.
//! Re-submitting a completed step overwrites its data without clearing any
//! flags.

use chrono::{Datelike, Utc};

use crate::storage::{
    AuditAction, AuditLogEntry, DbError, DueDiligence, OnboardingDb, PersonalInfo, TaxInfo,
    VerificationRecord,
};
use crate::verification::status::{ReviewResult, VerificationStatus};

/// Display names for steps 1..=4, in order.
pub const STEP_NAMES: [&str; 4] = [
    "Personal Information",
    "Identity Verification",
    "Tax Information",
    "Customer Due Diligence",
];

/// Expected monthly volume ceiling, in whole currency units.
const MAX_MONTHLY_VOLUME: u64 = 10_000_000;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("Step {missing} ({name}) must be completed first")]
    SequenceViolation { missing: u8, name: &'static str },

    #[error("{0}")]
    Validation(String),

    #[error("Identity verification has not been approved yet")]
    IdentityNotApproved,

    #[error("Verification is not in a failed state, nothing to retry")]
    RetryNotAllowed,

    #[error("storage failure: {0}")]
    Persistence(#[from] DbError),
}

/// A validated step submission. Step 2 carries no data: its flag is owned by
/// the identity verdict.
#[derive(Debug, Clone)]
pub enum StepSubmission {
    Personal(PersonalInfo),
    Identity,
    Tax(TaxInfo),
    DueDiligence(DueDiligence),
}

impl StepSubmission {
    pub fn step_number(&self) -> u8 {
        match self {
            Self::Personal(_) => 1,
            Self::Identity => 2,
            Self::Tax(_) => 3,
            Self::DueDiligence(_) => 4,
        }
    }

    pub fn step_name(&self) -> &'static str {
        STEP_NAMES[(self.step_number() - 1) as usize]
    }
}

/// Result of a successful step save.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub step_number: u8,
    /// Lowest incomplete step after this save, `None` when done.
    pub next_step: Option<u8>,
    pub all_steps_completed: bool,
}

/// Validate and persist a step submission for `user_id`.
///
/// The record update and its audit entry commit in one transaction; the
/// aggregate completion flag is re-evaluated inside the same commit.
pub fn save_step(
    db: &OnboardingDb,
    user_id: &str,
    mut submission: StepSubmission,
) -> Result<StepOutcome, VerificationError> {
    let step = submission.step_number();
    normalize(&mut submission);
    validate(&submission)?;

    let now = Utc::now();
    let state = db.ensure_user(user_id)?;
    let mut record = db
        .get_record(user_id)?
        .unwrap_or_else(|| VerificationRecord::new(user_id, now));

    // Gate on the lowest incomplete prior step.
    if let Some(missing) = record.first_incomplete_step().filter(|&m| m < step) {
        return Err(VerificationError::SequenceViolation {
            missing,
            name: STEP_NAMES[(missing - 1) as usize],
        });
    }

    match submission {
        StepSubmission::Personal(info) => record.personal = Some(info),
        StepSubmission::Identity => {
            // Confirmation only: the flag follows the provider verdict.
            let approved = state.status == VerificationStatus::Completed
                && state.result == Some(ReviewResult::Green)
                && state.is_verified;
            if !approved {
                return Err(VerificationError::IdentityNotApproved);
            }
        }
        StepSubmission::Tax(info) => record.tax = Some(info),
        StepSubmission::DueDiligence(info) => record.due_diligence = Some(info),
    }

    record.mark_step(step, now);
    let all_done = record.evaluate_completion(now);

    let step_name = STEP_NAMES[(step - 1) as usize];
    let mut comment = format!("User updated {} (Step {step})", step_name.to_lowercase());
    if all_done && step == 4 {
        comment.push_str(" - All steps completed!");
    }
    let audit = AuditLogEntry::new(user_id, user_id, AuditAction::DataUpdated)
        .with_step(step, step_name)
        .with_comment(comment);

    db.commit_step(&record, audit)?;

    Ok(StepOutcome {
        step_number: step,
        next_step: record.first_incomplete_step(),
        all_steps_completed: all_done,
    })
}

/// User-initiated retry after a failed verification.
pub fn retry_verification(db: &OnboardingDb, user_id: &str) -> Result<(), VerificationError> {
    let mut state = db.ensure_user(user_id)?;
    if !state.can_retry() {
        return Err(VerificationError::RetryNotAllowed);
    }

    let old_status = state.status;
    let old_result = state.result;
    state.reset_for_retry(Utc::now());

    let audit = AuditLogEntry::new(user_id, user_id, AuditAction::RetryRequested)
        .with_status_change(Some(old_status), state.status)
        .with_result_change(old_result, state.result)
        .with_comment("User requested verification retry");
    db.commit_verification(&state, None, audit)?;
    Ok(())
}

// =============================================================================
// Field Validation
// =============================================================================

/// Country codes are accepted in any case and stored uppercased.
fn normalize(submission: &mut StepSubmission) {
    match submission {
        StepSubmission::Personal(info) => {
            info.nationality = info.nationality.trim().to_ascii_uppercase();
            info.address.country_code = info.address.country_code.trim().to_ascii_uppercase();
        }
        StepSubmission::Tax(info) => {
            info.tax_residence_country_code =
                info.tax_residence_country_code.trim().to_ascii_uppercase();
        }
        StepSubmission::Identity | StepSubmission::DueDiligence(_) => {}
    }
}

fn validate(submission: &StepSubmission) -> Result<(), VerificationError> {
    match submission {
        StepSubmission::Personal(info) => validate_personal(info),
        StepSubmission::Identity => Ok(()),
        StepSubmission::Tax(info) => validate_tax(info),
        StepSubmission::DueDiligence(info) => validate_due_diligence(info),
    }
}

fn invalid(msg: impl Into<String>) -> VerificationError {
    VerificationError::Validation(msg.into())
}

fn validate_country_code(code: &str, field: &str) -> Result<(), VerificationError> {
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(invalid(format!(
            "{field} must be an uppercase ISO 3166-1 alpha-2 code"
        )))
    }
}

fn validate_personal(info: &PersonalInfo) -> Result<(), VerificationError> {
    if info.first_name.trim().is_empty() || info.last_name.trim().is_empty() {
        return Err(invalid("First and last name are required"));
    }

    // Age bounds from the date of birth; rough year arithmetic is enough
    // since both bounds have a year of slack built in.
    let today = Utc::now().date_naive();
    let age = today.year() - info.date_of_birth.year()
        - i32::from(
            (today.month(), today.day())
                < (info.date_of_birth.month(), info.date_of_birth.day()),
        );
    if !(18..=120).contains(&age) {
        return Err(invalid("Date of birth must correspond to an age of 18-120"));
    }

    validate_country_code(&info.nationality, "nationality")?;
    validate_country_code(&info.address.country_code, "address country_code")?;

    if !info.email_address.contains('@') {
        return Err(invalid("Email address is not valid"));
    }

    let phone_digits = info
        .phone_number
        .chars()
        .filter(|c| c.is_ascii_digit())
        .count();
    if !(7..=20).contains(&phone_digits) {
        return Err(invalid("Phone number must contain 7-20 digits"));
    }

    if info.address.address_line1.trim().is_empty()
        || info.address.postal_code.trim().is_empty()
        || info.address.city.trim().is_empty()
    {
        return Err(invalid("Address line 1, postal code and city are required"));
    }

    Ok(())
}

fn validate_tax(info: &TaxInfo) -> Result<(), VerificationError> {
    let tin = info.tax_identification_number.trim();
    if tin.is_empty() || tin.len() > 50 {
        return Err(invalid(
            "Tax identification number must be 1-50 characters",
        ));
    }
    validate_country_code(&info.tax_residence_country_code, "tax_residence_country_code")
}

fn validate_due_diligence(info: &DueDiligence) -> Result<(), VerificationError> {
    if info.expected_monthly_volume == 0 {
        return Err(invalid("Expected monthly volume must be positive"));
    }
    if info.expected_monthly_volume > MAX_MONTHLY_VOLUME {
        return Err(invalid(format!(
            "Expected monthly volume must not exceed {MAX_MONTHLY_VOLUME}"
        )));
    }
    Ok(())
}
