// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the gateway-authenticated user.
//!
//! Authentication proper (login, sessions, 2FA) lives in the upstream
//! gateway; by the time a request reaches this service the user identity
//! arrives in the `X-User-Id` header. Use the `CurrentUser` extractor in
//! handlers to require it:
//!
//! ```rust,ignore
//! async fn my_handler(CurrentUser(user_id): CurrentUser) -> impl IntoResponse {
//!     // user_id is the authenticated user's id
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

/// Header carrying the gateway-authenticated user id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Extractor for the authenticated user id.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub String);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::unauthorized("Missing authenticated user identity"))?;

        Ok(CurrentUser(user_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[tokio::test]
    async fn extracts_user_id_from_header() {
        let request = Request::builder()
            .header(USER_ID_HEADER, "NF-012025001")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let CurrentUser(user_id) = CurrentUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(user_id, "NF-012025001");
    }

    #[tokio::test]
    async fn rejects_missing_or_blank_header() {
        let request = Request::builder().body(()).unwrap();
        let (mut parts, _) = request.into_parts();
        assert!(CurrentUser::from_request_parts(&mut parts, &())
            .await
            .is_err());

        let request = Request::builder()
            .header(USER_ID_HEADER, "   ")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();
        assert!(CurrentUser::from_request_parts(&mut parts, &())
            .await
            .is_err());
    }
}
