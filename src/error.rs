// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::DbError;
use crate::verification::VerificationError;
use crate::wallets::{ProvisionError, ReconcileError, TopUpError};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unprocessable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        ApiError::internal(format!("storage failure: {e}"))
    }
}

impl From<VerificationError> for ApiError {
    fn from(e: VerificationError) -> Self {
        match &e {
            VerificationError::SequenceViolation { .. } => ApiError::bad_request(e.to_string()),
            VerificationError::Validation(_) => ApiError::unprocessable(e.to_string()),
            VerificationError::IdentityNotApproved => ApiError::bad_request(e.to_string()),
            VerificationError::RetryNotAllowed => ApiError::bad_request(e.to_string()),
            VerificationError::Persistence(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<ProvisionError> for ApiError {
    fn from(e: ProvisionError) -> Self {
        match &e {
            ProvisionError::AlreadyProvisioned => ApiError::conflict(e.to_string()),
            ProvisionError::Persistence(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<TopUpError> for ApiError {
    fn from(e: TopUpError) -> Self {
        match &e {
            TopUpError::AlreadyExists => ApiError::conflict(e.to_string()),
            TopUpError::Custody(_) => ApiError::bad_gateway(e.to_string()),
            TopUpError::Persistence(_) => ApiError::internal(e.to_string()),
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(e: ReconcileError) -> Self {
        match &e {
            ReconcileError::Custody(_) => ApiError::bad_gateway(e.to_string()),
            ReconcileError::Persistence(_) => ApiError::internal(e.to_string()),
        }
    }
}
