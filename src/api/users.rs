// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::{Auth, Role},
    error::ApiError,
    state::AppState,
    storage::{AuditEventType, ProfileRepository, UserProfile},
};

/// Response for the current user endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub user_id: String,
    pub role: Role,
    /// Session id from the token, when present
    pub session_id: Option<String>,
}

/// Editable profile fields. Omitted fields are cleared.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub blood_type: String,
    #[serde(default)]
    pub hobbies: Option<String>,
    /// `name-relation-phone`
    #[serde(default)]
    pub emergency_contact: String,
}

/// Get current authenticated user info.
#[utoipa::path(
    get,
    path = "/v1/users/me",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current user info", body = MeResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn me(Auth(user): Auth) -> Json<MeResponse> {
    Json(MeResponse {
        user_id: user.user_id,
        role: user.role,
        session_id: user.session_id,
    })
}

/// The caller's profile, or an empty one if never saved.
#[utoipa::path(
    get,
    path = "/v1/users/me/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Profile", body = UserProfile),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserProfile>, ApiError> {
    let storage = state.storage();
    let profile = ProfileRepository::new(&storage).get_or_default(&user.user_id)?;
    Ok(Json(profile))
}

#[utoipa::path(
    put,
    path = "/v1/users/me/profile",
    tag = "Users",
    security(("bearer_auth" = [])),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile saved", body = UserProfile),
        (status = 400, description = "Invalid profile"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn update_profile(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, ApiError> {
    let storage = state.storage();
    let repo = ProfileRepository::new(&storage);
    let mut profile = repo.get_or_default(&user.user_id)?;

    if let Some(username) = request.username.filter(|u| !u.trim().is_empty()) {
        profile.username = username;
    }
    profile.email = request.email;
    profile.first_name = request.first_name;
    profile.last_name = request.last_name;
    profile.phone = request.phone;
    profile.birth_date = request.birth_date;
    profile.blood_type = request.blood_type;
    profile.hobbies = request.hobbies;
    profile.emergency_contact = request.emergency_contact;

    let now = Utc::now();
    profile.updated_at = now;
    repo.upsert(&profile, now.date_naive())?;

    audit_log!(
        &storage,
        AuditEventType::ProfileUpdated,
        &user,
        "profile",
        &user.user_id
    );

    Ok(Json(profile))
}
