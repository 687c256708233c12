// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Admin override for stuck or disputed verifications. Authorization is the
//! upstream gateway's job; the acting admin arrives in the same identity
//! header as any user.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    state::AppState,
    storage::{AuditAction, AuditLogEntry},
    verification::{ReviewResult, UserVerification, VerificationStatus},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct OverrideRequest {
    pub status: VerificationStatus,
    #[serde(default)]
    pub result: Option<ReviewResult>,
    #[serde(default)]
    pub is_verified: Option<bool>,
    pub comment: String,
}

#[utoipa::path(
    post,
    path = "/v1/admin/verification/{user_id}/override",
    request_body = OverrideRequest,
    params(("user_id" = String, Path, description = "User whose verification is overridden")),
    tag = "Admin",
    responses((status = 200, body = UserVerification))
)]
pub async fn override_verification(
    State(state): State<AppState>,
    CurrentUser(admin_id): CurrentUser,
    Path(user_id): Path<String>,
    Json(request): Json<OverrideRequest>,
) -> Result<Json<UserVerification>, ApiError> {
    if request.comment.trim().is_empty() {
        return Err(ApiError::bad_request("An override comment is required"));
    }

    let current = state.db.ensure_user(&user_id)?;
    let now = chrono::Utc::now();

    let mut updated = current.clone();
    updated.status = request.status;
    updated.result = request.result;
    updated.is_verified = request
        .is_verified
        .unwrap_or(request.result == Some(ReviewResult::Green));
    if updated.status == VerificationStatus::Completed && updated.completed_at.is_none() {
        updated.completed_at = Some(now);
    }
    if updated.is_verified {
        updated.error_message = None;
    }
    updated.updated_at = now;

    let audit = AuditLogEntry::new(&user_id, &admin_id, AuditAction::AdminOverride)
        .with_status_change(Some(current.status), updated.status)
        .with_result_change(current.result, updated.result)
        .with_comment(request.comment);
    state.db.commit_verification(&updated, None, audit)?;

    Ok(Json(updated))
}
