// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Verification status machine.
//!
//! The per-user verification state is mutated from exactly three places:
//! provider signal ingestion, the admin override path, and the user retry
//! path. Signal ingestion goes through [`transition`], a total function over
//! (current state, provider event), so every event maps to a well-defined
//! next state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Provider-facing verification status of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    NotStarted,
    Pending,
    OnHold,
    AwaitingUser,
    AwaitingService,
    Completed,
    Failed,
    Deactivated,
    Deleted,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::Pending => "pending",
            Self::OnHold => "on_hold",
            Self::AwaitingUser => "awaiting_user",
            Self::AwaitingService => "awaiting_service",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Deactivated => "deactivated",
            Self::Deleted => "deleted",
        }
    }
}

/// Final review answer from the verification provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReviewResult {
    Green,
    Red,
}

/// Per-user verification state.
///
/// Also serves as the known-user set for signal ingestion: registration is
/// out of scope, so a row is created lazily the first time a user touches
/// the verification surface.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserVerification {
    pub user_id: String,
    pub status: VerificationStatus,
    pub result: Option<ReviewResult>,
    pub is_verified: bool,
    pub error_message: Option<String>,
    /// Applicant id assigned by the provider.
    pub applicant_id: Option<String>,
    /// Inspection id assigned by the provider.
    pub inspection_id: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserVerification {
    pub fn new(user_id: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.into(),
            status: VerificationStatus::NotStarted,
            result: None,
            is_verified: false,
            error_message: None,
            applicant_id: None,
            inspection_id: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Retry is allowed only from failed/error states.
    pub fn can_retry(&self) -> bool {
        self.status == VerificationStatus::Failed || self.error_message.is_some()
    }

    /// Reset to `not_started` for a user-initiated retry.
    pub fn reset_for_retry(&mut self, now: DateTime<Utc>) {
        self.status = VerificationStatus::NotStarted;
        self.result = None;
        self.is_verified = false;
        self.error_message = None;
        self.completed_at = None;
        self.updated_at = now;
    }
}

/// Provider signal event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderEvent {
    Created,
    Activated,
    Pending,
    Reviewed,
    OnHold,
    AwaitingUser,
    AwaitingService,
    WorkflowCompleted,
    WorkflowFailed,
    Reset,
    Deactivated,
    Deleted,
}

impl ProviderEvent {
    /// Parse the provider's wire event type. Unknown types return `None`
    /// and are acknowledged without mutation.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "applicantCreated" => Some(Self::Created),
            "applicantActivated" => Some(Self::Activated),
            "applicantPending" => Some(Self::Pending),
            "applicantReviewed" => Some(Self::Reviewed),
            "applicantOnHold" => Some(Self::OnHold),
            "applicantAwaitingUser" => Some(Self::AwaitingUser),
            "applicantAwaitingService" => Some(Self::AwaitingService),
            "applicantWorkflowCompleted" => Some(Self::WorkflowCompleted),
            "applicantWorkflowFailed" => Some(Self::WorkflowFailed),
            "applicantReset" => Some(Self::Reset),
            "applicantDeactivated" => Some(Self::Deactivated),
            "applicantDeleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// Review outcome attached to terminal provider events.
#[derive(Debug, Clone, Default)]
pub struct ReviewOutcome {
    pub answer: Option<ReviewResult>,
    pub reject_labels: Vec<String>,
}

/// Computed next state for a (state, event) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub status: VerificationStatus,
    pub result: Option<ReviewResult>,
    pub is_verified: bool,
    pub error_message: Option<String>,
    /// Whether `completed_at` should be stamped with the transition time.
    pub stamps_completed_at: bool,
}

/// Total transition function over (current state, provider event).
pub fn transition(
    current: &UserVerification,
    event: ProviderEvent,
    review: &ReviewOutcome,
) -> Transition {
    match event {
        ProviderEvent::Created | ProviderEvent::Pending => Transition {
            status: VerificationStatus::Pending,
            result: None,
            is_verified: false,
            error_message: None,
            stamps_completed_at: false,
        },
        ProviderEvent::Activated | ProviderEvent::Reset => Transition {
            status: VerificationStatus::NotStarted,
            result: None,
            is_verified: false,
            error_message: None,
            stamps_completed_at: false,
        },
        ProviderEvent::OnHold => Transition {
            status: VerificationStatus::OnHold,
            result: current.result,
            is_verified: false,
            error_message: current.error_message.clone(),
            stamps_completed_at: false,
        },
        // Waiting states keep the current verdict.
        ProviderEvent::AwaitingUser => Transition {
            status: VerificationStatus::AwaitingUser,
            result: current.result,
            is_verified: current.is_verified,
            error_message: current.error_message.clone(),
            stamps_completed_at: false,
        },
        ProviderEvent::AwaitingService => Transition {
            status: VerificationStatus::AwaitingService,
            result: current.result,
            is_verified: current.is_verified,
            error_message: current.error_message.clone(),
            stamps_completed_at: false,
        },
        ProviderEvent::Reviewed | ProviderEvent::WorkflowCompleted => match review.answer {
            Some(ReviewResult::Green) => Transition {
                status: VerificationStatus::Completed,
                result: Some(ReviewResult::Green),
                is_verified: true,
                error_message: None,
                stamps_completed_at: true,
            },
            Some(ReviewResult::Red) => Transition {
                status: VerificationStatus::Completed,
                result: Some(ReviewResult::Red),
                is_verified: false,
                error_message: rejection_message("Rejected", &review.reject_labels),
                stamps_completed_at: true,
            },
            // Review concluded without a verdict: record completion, keep
            // whatever verdict we already hold.
            None => Transition {
                status: VerificationStatus::Completed,
                result: current.result,
                is_verified: current.is_verified,
                error_message: current.error_message.clone(),
                stamps_completed_at: false,
            },
        },
        ProviderEvent::WorkflowFailed => Transition {
            status: VerificationStatus::Failed,
            result: Some(ReviewResult::Red),
            is_verified: false,
            error_message: rejection_message("Failed", &review.reject_labels),
            stamps_completed_at: false,
        },
        ProviderEvent::Deactivated => Transition {
            status: VerificationStatus::Deactivated,
            result: current.result,
            is_verified: false,
            error_message: current.error_message.clone(),
            stamps_completed_at: false,
        },
        ProviderEvent::Deleted => Transition {
            status: VerificationStatus::Deleted,
            result: current.result,
            is_verified: false,
            error_message: current.error_message.clone(),
            stamps_completed_at: false,
        },
    }
}

fn rejection_message(prefix: &str, labels: &[String]) -> Option<String> {
    if labels.is_empty() {
        None
    } else {
        Some(format!("{prefix}: {}", labels.join(", ")))
    }
}
