// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::CurrentUser,
    custody::CustodyClient,
    error::ApiError,
    state::AppState,
    storage::WalletRecord,
    wallets::{provision_wallets, reconcile_wallets, top_up_wallet},
};

/// One matrix pair that failed during a provisioning run.
#[derive(Debug, Serialize, ToSchema)]
pub struct FailedPair {
    pub currency: String,
    pub network: String,
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProvisionResponse {
    pub created: Vec<WalletRecord>,
    pub failures: Vec<FailedPair>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TopUpRequest {
    pub currency: String,
    pub network: String,
}

/// Partition of the caller's wallets by custodian wallet id.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileResponse {
    pub active: Vec<String>,
    pub deleted: Vec<String>,
}

fn custody_or_unavailable(state: &AppState) -> Result<&CustodyClient, ApiError> {
    state.custody.as_deref().ok_or_else(|| {
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Wallet custody is not configured",
        )
    })
}

fn require_verified(state: &AppState, user_id: &str) -> Result<(), ApiError> {
    let verification = state.db.ensure_user(user_id)?;
    if verification.is_verified {
        Ok(())
    } else {
        Err(ApiError::bad_request(
            "Identity verification must be approved before wallets can be provisioned",
        ))
    }
}

#[utoipa::path(
    get,
    path = "/v1/wallets",
    tag = "Wallets",
    responses((status = 200, body = [WalletRecord]))
)]
pub async fn list_wallets(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<WalletRecord>>, ApiError> {
    Ok(Json(state.db.list_wallets(&user_id)?))
}

#[utoipa::path(
    post,
    path = "/v1/wallets/provision",
    tag = "Wallets",
    responses(
        (status = 201, body = ProvisionResponse),
        (status = 409, description = "Wallets already provisioned"),
        (status = 503, description = "Custody not configured")
    )
)]
pub async fn provision(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<(StatusCode, Json<ProvisionResponse>), ApiError> {
    let custody = custody_or_unavailable(&state)?;
    require_verified(&state, &user_id)?;

    let outcome = provision_wallets(&state.db, custody, &state.matrix, &user_id).await?;
    Ok((
        StatusCode::CREATED,
        Json(ProvisionResponse {
            created: outcome.created,
            failures: outcome
                .failures
                .into_iter()
                .map(|f| FailedPair {
                    currency: f.currency,
                    network: f.network,
                    error: f.error.to_string(),
                })
                .collect(),
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/v1/wallets/topup",
    request_body = TopUpRequest,
    tag = "Wallets",
    responses(
        (status = 201, body = WalletRecord),
        (status = 409, description = "Wallet for this pair already exists"),
        (status = 503, description = "Custody not configured")
    )
)]
pub async fn top_up(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Json(request): Json<TopUpRequest>,
) -> Result<(StatusCode, Json<WalletRecord>), ApiError> {
    let custody = custody_or_unavailable(&state)?;
    require_verified(&state, &user_id)?;

    let wallet = top_up_wallet(
        &state.db,
        custody,
        &user_id,
        &request.currency,
        &request.network,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(wallet)))
}

#[utoipa::path(
    post,
    path = "/v1/wallets/reconcile",
    tag = "Wallets",
    responses(
        (status = 200, body = ReconcileResponse),
        (status = 503, description = "Custody not configured")
    )
)]
pub async fn reconcile(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let custody = custody_or_unavailable(&state)?;
    let report = reconcile_wallets(&state.db, custody, &user_id).await?;
    Ok(Json(ReconcileResponse {
        active: report.active,
        deleted: report.deleted,
    }))
}
