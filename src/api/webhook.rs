// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::{
    error::ApiError,
    signals::{ingest_signal, SignalError, SIGNATURE_HEADER},
    state::AppState,
};

/// Acknowledgement returned to the identity provider.
#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookResponse {
    pub status: String,
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/v1/webhooks/identity",
    tag = "Webhooks",
    request_body(content = Vec<u8>, content_type = "application/json"),
    responses(
        (status = 200, body = WebhookResponse),
        (status = 401, description = "Invalid or missing signature")
    )
)]
pub async fn identity_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Some(secret) = state.webhook_secret.as_ref() else {
        warn!("identity webhook called but no webhook secret is configured");
        return Err(ApiError::unauthorized("Webhook is not configured"));
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = ingest_signal(
        &state.db,
        state.custody.as_deref(),
        &state.matrix,
        secret,
        &body,
        signature,
    )
    .await
    .map_err(|e| match e {
        SignalError::Unauthenticated => {
            ApiError::unauthorized("Invalid or missing webhook signature")
        }
    })?;

    Ok(Json(WebhookResponse {
        status: outcome.status.to_string(),
        message: outcome.message,
    }))
}
