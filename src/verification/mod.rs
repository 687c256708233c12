// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification domain: the status machine fed by provider signals and the
//! four-step onboarding pipeline built on top of it.

pub mod status;
pub mod steps;

pub use status::{
    transition, ProviderEvent, ReviewOutcome, ReviewResult, Transition, UserVerification,
    VerificationStatus,
};
pub use steps::{
    retry_verification, save_step, StepOutcome, StepSubmission, VerificationError, STEP_NAMES,
};
