// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    auth::CurrentUser,
    error::ApiError,
    state::AppState,
    storage::{DueDiligence, PersonalInfo, SignalEvent, TaxInfo, VerificationRecord},
    verification::{
        retry_verification, save_step, StepSubmission, UserVerification, STEP_NAMES,
    },
};

/// Response to a successful step submission.
#[derive(Debug, Serialize, ToSchema)]
pub struct StepResponse {
    pub success: bool,
    pub message: String,
    pub step_number: u8,
    pub step_completed: bool,
    /// Lowest incomplete step, `null` once onboarding is done.
    pub next_step: Option<u8>,
    pub all_steps_completed: bool,
}

/// Per-step progress line.
#[derive(Debug, Serialize, ToSchema)]
pub struct StepProgress {
    pub step_number: u8,
    pub name: &'static str,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProgressResponse {
    pub steps: Vec<StepProgress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_step: Option<u8>,
    pub all_steps_completed: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RetryResponse {
    pub status: String,
    pub message: String,
}

fn step_response(outcome: crate::verification::StepOutcome) -> Json<StepResponse> {
    let message = if outcome.all_steps_completed {
        "All verification steps completed".to_string()
    } else {
        format!(
            "Step {} saved, continue with step {}",
            outcome.step_number,
            outcome.next_step.unwrap_or(outcome.step_number)
        )
    };
    Json(StepResponse {
        success: true,
        message,
        step_number: outcome.step_number,
        step_completed: true,
        next_step: outcome.next_step,
        all_steps_completed: outcome.all_steps_completed,
    })
}

#[utoipa::path(
    post,
    path = "/v1/verification/step-1/personal-info",
    request_body = PersonalInfo,
    tag = "Verification",
    responses(
        (status = 200, body = StepResponse),
        (status = 422, description = "Field validation failed")
    )
)]
pub async fn submit_personal_info(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<PersonalInfo>,
) -> Result<Json<StepResponse>, ApiError> {
    let outcome = save_step(&state.db, &user_id, StepSubmission::Personal(request))?;
    Ok(step_response(outcome))
}

#[utoipa::path(
    post,
    path = "/v1/verification/step-2/identity",
    tag = "Verification",
    responses(
        (status = 200, body = StepResponse),
        (status = 400, description = "Identity verification not approved yet")
    )
)]
pub async fn confirm_identity(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<StepResponse>, ApiError> {
    let outcome = save_step(&state.db, &user_id, StepSubmission::Identity)?;
    Ok(step_response(outcome))
}

#[utoipa::path(
    post,
    path = "/v1/verification/step-3/tax-info",
    request_body = TaxInfo,
    tag = "Verification",
    responses(
        (status = 200, body = StepResponse),
        (status = 400, description = "Earlier step incomplete")
    )
)]
pub async fn submit_tax_info(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<TaxInfo>,
) -> Result<Json<StepResponse>, ApiError> {
    let outcome = save_step(&state.db, &user_id, StepSubmission::Tax(request))?;
    Ok(step_response(outcome))
}

#[utoipa::path(
    post,
    path = "/v1/verification/step-4/due-diligence",
    request_body = DueDiligence,
    tag = "Verification",
    responses(
        (status = 200, body = StepResponse),
        (status = 400, description = "Earlier step incomplete")
    )
)]
pub async fn submit_due_diligence(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<DueDiligence>,
) -> Result<Json<StepResponse>, ApiError> {
    let outcome = save_step(&state.db, &user_id, StepSubmission::DueDiligence(request))?;
    Ok(step_response(outcome))
}

#[utoipa::path(
    get,
    path = "/v1/verification/progress",
    tag = "Verification",
    responses((status = 200, body = ProgressResponse))
)]
pub async fn get_progress(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ProgressResponse>, ApiError> {
    let record = state
        .db
        .get_record(&user_id)?
        .unwrap_or_else(|| VerificationRecord::new(&user_id, chrono::Utc::now()));

    let steps = STEP_NAMES
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let n = (i + 1) as u8;
            let step = record.step(n);
            StepProgress {
                step_number: n,
                name,
                completed: step.completed,
                completed_at: step.completed_at,
            }
        })
        .collect();

    Ok(Json(ProgressResponse {
        steps,
        next_step: record.first_incomplete_step(),
        all_steps_completed: record.all_steps_completed,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/verification/data",
    tag = "Verification",
    responses(
        (status = 200, body = VerificationRecord),
        (status = 404, description = "No data submitted yet")
    )
)]
pub async fn get_data(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<VerificationRecord>, ApiError> {
    state
        .db
        .get_record(&user_id)?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("No verification data submitted yet"))
}

#[utoipa::path(
    get,
    path = "/v1/verification/status",
    tag = "Verification",
    responses((status = 200, body = UserVerification))
)]
pub async fn get_status(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserVerification>, ApiError> {
    Ok(Json(state.db.ensure_user(&user_id)?))
}

#[utoipa::path(
    get,
    path = "/v1/verification/events",
    tag = "Verification",
    responses((status = 200, body = [SignalEvent]))
)]
pub async fn list_events(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<SignalEvent>>, ApiError> {
    Ok(Json(state.db.list_events_for_user(&user_id)?))
}

#[utoipa::path(
    post,
    path = "/v1/verification/retry",
    tag = "Verification",
    responses(
        (status = 200, body = RetryResponse),
        (status = 400, description = "Verification is not in a failed state")
    )
)]
pub async fn retry(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<(StatusCode, Json<RetryResponse>), ApiError> {
    retry_verification(&state.db, &user_id)?;
    Ok((
        StatusCode::OK,
        Json(RetryResponse {
            status: "success".to_string(),
            message: "Verification reset, you can start again".to_string(),
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verification::StepOutcome;

    #[test]
    fn step_response_emits_success_flag_and_explicit_next_step() {
        let Json(response) = step_response(StepOutcome {
            step_number: 1,
            next_step: Some(2),
            all_steps_completed: false,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["success"], serde_json::json!(true));
        assert_eq!(json["step_completed"], serde_json::json!(true));
        assert_eq!(json["next_step"], serde_json::json!(2));
        assert!(json.get("status").is_none());
    }

    #[test]
    fn final_step_response_serializes_null_next_step() {
        let Json(response) = step_response(StepOutcome {
            step_number: 4,
            next_step: None,
            all_steps_completed: true,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert!(json["all_steps_completed"].as_bool().unwrap());
        // The key is present with an explicit null, not omitted.
        assert!(json.as_object().unwrap().contains_key("next_step"));
        assert!(json["next_step"].is_null());
    }
}
