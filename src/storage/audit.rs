// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Append-only audit trail of onboarding state changes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::verification::{ReviewResult, VerificationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    DataUpdated,
    StatusChanged,
    AdminOverride,
    RetryRequested,
    WalletsProvisioned,
    WalletsReconciled,
}

/// A single audit trail entry. `id` is assigned by the store on append.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditLogEntry {
    #[serde(default)]
    pub id: u64,
    pub user_id: String,
    /// Who caused the change: the user themselves, `"system"` for
    /// provider-driven transitions, or an admin id.
    pub actor_id: String,
    pub action: AuditAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_status: Option<VerificationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<VerificationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_result: Option<ReviewResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_result: Option<ReviewResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(
        user_id: impl Into<String>,
        actor_id: impl Into<String>,
        action: AuditAction,
    ) -> Self {
        Self {
            id: 0,
            user_id: user_id.into(),
            actor_id: actor_id.into(),
            action,
            old_status: None,
            new_status: None,
            old_result: None,
            new_result: None,
            step_number: None,
            step_name: None,
            comment: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_status_change(
        mut self,
        old: Option<VerificationStatus>,
        new: VerificationStatus,
    ) -> Self {
        self.old_status = old;
        self.new_status = Some(new);
        self
    }

    pub fn with_result_change(
        mut self,
        old: Option<ReviewResult>,
        new: Option<ReviewResult>,
    ) -> Self {
        self.old_result = old;
        self.new_result = new;
        self
    }

    pub fn with_step(mut self, number: u8, name: impl Into<String>) -> Self {
        self.step_number = Some(number);
        self.step_name = Some(name.into());
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_populates_optional_fields() {
        let entry = AuditLogEntry::new("user-1", "user-1", AuditAction::DataUpdated)
            .with_step(1, "Personal Information")
            .with_comment("User updated personal information (Step 1)");

        assert_eq!(entry.step_number, Some(1));
        assert_eq!(entry.step_name.as_deref(), Some("Personal Information"));
        assert!(entry.old_status.is_none());
        assert!(entry.comment.is_some());
    }

    #[test]
    fn action_serializes_snake_case() {
        let json = serde_json::to_string(&AuditAction::WalletsProvisioned).unwrap();
        assert_eq!(json, "\"wallets_provisioned\"");
    }
}
