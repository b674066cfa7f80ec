// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};

use super::{claims::Claims, AuthError, AuthenticatedUser};
use crate::state::{AppState, AuthConfig};

/// Clock skew tolerance (60 seconds).
const CLOCK_SKEW_LEEWAY: u64 = 60;

/// Extractor for authenticated users.
///
/// ## Verification Modes
///
/// - **`JWT_SECRET` set**: HS256 signature, `exp` and (if configured) `iss`
///   are verified.
/// - **No secret**: tokens are decoded without signature verification in
///   builds with the `dev` feature; other builds reject every token.
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // An upstream layer may already have authenticated the request
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>().cloned() {
            return Ok(Auth(user));
        }

        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingBearer)?
            .to_str()
            .map_err(|_| AuthError::NotBearer)?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(AuthError::NotBearer)?;

        let user = verify_jwt(token, &state.auth_config)?;

        Ok(Auth(user))
    }
}

/// Verify a JWT and extract user information.
pub fn verify_jwt(token: &str, auth_config: &AuthConfig) -> Result<AuthenticatedUser, AuthError> {
    match auth_config.jwt_secret {
        Some(ref secret) => verify_jwt_hs256(token, secret, auth_config.issuer.as_deref()),
        None => verify_jwt_unconfigured(token),
    }
}

fn verify_jwt_hs256(
    token: &str,
    secret: &str,
    issuer: Option<&str>,
) -> Result<AuthenticatedUser, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = CLOCK_SKEW_LEEWAY;
    validation.validate_aud = false;
    if let Some(issuer) = issuer {
        validation.set_issuer(&[issuer]);
    }

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        ErrorKind::InvalidSignature => AuthError::BadSignature,
        ErrorKind::InvalidIssuer => AuthError::IssuerMismatch,
        ErrorKind::ImmatureSignature => AuthError::NotYetValid,
        _ => AuthError::MalformedToken,
    })?;

    Ok(AuthenticatedUser::from_claims(token_data.claims))
}

/// Decode without signature verification (no check of who signed it).
///
/// WARNING: This must only be used in development environments.
#[cfg(any(test, feature = "dev"))]
fn verify_jwt_unconfigured(token: &str) -> Result<AuthenticatedUser, AuthError> {
    let token_data = jsonwebtoken::dangerous::insecure_decode::<Claims>(token)
        .map_err(|_e| AuthError::MalformedToken)?;

    let claims = token_data.claims;
    let now = chrono::Utc::now().timestamp();
    if claims.exp < now - CLOCK_SKEW_LEEWAY as i64 {
        return Err(AuthError::Expired);
    }

    Ok(AuthenticatedUser::from_claims(claims))
}

#[cfg(not(any(test, feature = "dev")))]
fn verify_jwt_unconfigured(_token: &str) -> Result<AuthenticatedUser, AuthError> {
    tracing::error!("Rejecting bearer token: JWT_SECRET is not configured");
    Err(AuthError::VerificationUnconfigured)
}

/// Extractor that requires the staff role.
pub struct StaffOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for StaffOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_staff() {
            return Err(AuthError::StaffRequired);
        }

        Ok(StaffOnly(user))
    }
}
