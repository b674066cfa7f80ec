// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rejections produced by the `Auth` and `StaffOnly` extractors.
//!
//! Bearer tokens are checked against `JWT_SECRET` (HS256). Without a secret
//! only `dev` and test builds accept tokens, decoded unverified; other
//! builds answer [`AuthError::VerificationUnconfigured`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Authorization header with a bearer token is required")]
    MissingBearer,

    #[error("Authorization header must have the form 'Bearer <token>'")]
    NotBearer,

    #[error("Bearer token could not be decoded")]
    MalformedToken,

    /// HS256 signature does not match the configured secret.
    #[error("Bearer token signature does not match")]
    BadSignature,

    #[error("Bearer token has expired")]
    Expired,

    #[error("Bearer token is not valid yet")]
    NotYetValid,

    /// `iss` differs from the configured issuer.
    #[error("Bearer token was issued for another service")]
    IssuerMismatch,

    /// No `JWT_SECRET` in a build that cannot decode unverified tokens.
    #[error("Token verification is not configured on this server")]
    VerificationUnconfigured,

    #[error("Only staff may perform this operation")]
    StaffRequired,
}

#[derive(Serialize)]
struct AuthErrorBody {
    error: String,
    error_code: &'static str,
}

impl AuthError {
    /// Machine-readable code sent alongside the message.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingBearer => "missing_bearer_token",
            AuthError::NotBearer => "not_a_bearer_token",
            AuthError::MalformedToken => "malformed_token",
            AuthError::BadSignature => "bad_signature",
            AuthError::Expired => "token_expired",
            AuthError::NotYetValid => "token_not_yet_valid",
            AuthError::IssuerMismatch => "issuer_mismatch",
            AuthError::VerificationUnconfigured => "verification_unconfigured",
            AuthError::StaffRequired => "staff_required",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::StaffRequired => StatusCode::FORBIDDEN,
            AuthError::VerificationUnconfigured => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = AuthErrorBody {
            error: self.to_string(),
            error_code: self.error_code(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[tokio::test]
    async fn missing_bearer_is_401_with_code() {
        let response = AuthError::MissingBearer.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body_bytes).unwrap();
        assert_eq!(body["error_code"], "missing_bearer_token");
        assert!(body["error"].as_str().unwrap().contains("bearer token"));
    }

    #[test]
    fn staff_and_configuration_errors_are_not_401() {
        assert_eq!(AuthError::StaffRequired.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            AuthError::VerificationUnconfigured.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AuthError::IssuerMismatch.status_code(), StatusCode::UNAUTHORIZED);
    }
}
