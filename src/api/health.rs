// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use serde::Serialize;
use std::path::Path;
use utoipa::ToSchema;

use crate::config::{DATA_DIR_ENV, DEFAULT_DATA_DIR};
use crate::state::AppState;

/// Simple health check response for liveness probes.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Health check response with individual component status.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Overall health status ("ok" or "degraded").
    pub status: String,
    pub checks: HealthChecks,
}

/// Individual health check results.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthChecks {
    pub service: String,
    /// Data directory availability.
    pub data_dir: String,
    /// "ok" when custody is configured, "disabled" otherwise.
    pub custody: String,
    /// "ok" when the webhook secret is configured, "disabled" otherwise.
    pub webhook: String,
}

fn check_data_dir() -> String {
    let dir = std::env::var(DATA_DIR_ENV).unwrap_or_else(|_| DEFAULT_DATA_DIR.to_string());
    if Path::new(&dir).exists() {
        "ok".to_string()
    } else {
        "missing".to_string()
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses((status = 200, body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/ready",
    tag = "Health",
    responses((status = 200, body = ReadyResponse))
)]
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let data_dir = check_data_dir();
    let checks = HealthChecks {
        service: "ok".to_string(),
        data_dir: data_dir.clone(),
        custody: if state.custody.is_some() {
            "ok".to_string()
        } else {
            "disabled".to_string()
        },
        webhook: if state.webhook_secret.is_some() {
            "ok".to_string()
        } else {
            "disabled".to_string()
        },
    };

    let status = if data_dir == "ok" { "ok" } else { "degraded" };
    Json(ReadyResponse {
        status: status.to_string(),
        checks,
    })
}
