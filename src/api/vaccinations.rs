// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::Auth,
    error::ApiError,
    state::AppState,
    storage::{
        AuditEventType, OwnershipCheck, VaccinationRecord, VaccinationRepository,
        VaccinationStats, VaccineType,
    },
};

/// Request to create or replace a vaccination record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VaccinationRequest {
    pub vaccine_type: VaccineType,
    pub dose_number: u8,
    pub vaccination_date: NaiveDate,
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
    pub institution: String,
    #[serde(default)]
    pub batch_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VaccinationListResponse {
    pub vaccinations: Vec<VaccinationRecord>,
    pub total: usize,
}

fn apply_request(vaccination: &mut VaccinationRecord, request: VaccinationRequest) {
    vaccination.vaccine_type = request.vaccine_type;
    vaccination.dose_number = request.dose_number;
    vaccination.vaccination_date = request.vaccination_date;
    vaccination.next_due_date = request.next_due_date;
    vaccination.institution = request.institution;
    vaccination.batch_number = request.batch_number;
}

#[utoipa::path(
    post,
    path = "/v1/vaccinations",
    tag = "Vaccinations",
    security(("bearer_auth" = [])),
    request_body = VaccinationRequest,
    responses(
        (status = 201, description = "Vaccination recorded", body = VaccinationRecord),
        (status = 400, description = "Invalid vaccination"),
        (status = 409, description = "Dose already recorded")
    )
)]
pub async fn create_vaccination(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<VaccinationRequest>,
) -> Result<(StatusCode, Json<VaccinationRecord>), ApiError> {
    let storage = state.storage();
    let now = Utc::now();
    let mut vaccination = VaccinationRecord {
        id: uuid::Uuid::new_v4().to_string(),
        owner_user_id: user.user_id.clone(),
        vaccine_type: request.vaccine_type,
        dose_number: request.dose_number,
        vaccination_date: request.vaccination_date,
        next_due_date: None,
        institution: String::new(),
        batch_number: String::new(),
        created_at: now,
        updated_at: now,
    };
    apply_request(&mut vaccination, request);

    VaccinationRepository::new(&storage).create(&vaccination)?;

    audit_log!(
        &storage,
        AuditEventType::VaccinationCreated,
        &user,
        "vaccination",
        &vaccination.id,
        serde_json::json!({
            "vaccine_type": vaccination.vaccine_type.label(),
            "dose_number": vaccination.dose_number,
        })
    );

    Ok((StatusCode::CREATED, Json(vaccination)))
}

/// List the caller's vaccinations, most recent first.
#[utoipa::path(
    get,
    path = "/v1/vaccinations",
    tag = "Vaccinations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Vaccinations", body = VaccinationListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_vaccinations(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<VaccinationListResponse>, ApiError> {
    let storage = state.storage();
    let vaccinations = VaccinationRepository::new(&storage).list_by_owner(&user.user_id)?;
    let total = vaccinations.len();
    Ok(Json(VaccinationListResponse {
        vaccinations,
        total,
    }))
}

#[utoipa::path(
    get,
    path = "/v1/vaccinations/{vaccination_id}",
    tag = "Vaccinations",
    security(("bearer_auth" = [])),
    params(("vaccination_id" = String, Path, description = "Vaccination ID")),
    responses(
        (status = 200, description = "Vaccination details", body = VaccinationRecord),
        (status = 403, description = "Forbidden - not your vaccination"),
        (status = 404, description = "Vaccination not found")
    )
)]
pub async fn get_vaccination(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(vaccination_id): Path<String>,
) -> Result<Json<VaccinationRecord>, ApiError> {
    let storage = state.storage();
    let vaccination = VaccinationRepository::new(&storage)
        .get(&vaccination_id)
        .verify_owner(&user)?;
    Ok(Json(vaccination))
}

#[utoipa::path(
    put,
    path = "/v1/vaccinations/{vaccination_id}",
    tag = "Vaccinations",
    security(("bearer_auth" = [])),
    params(("vaccination_id" = String, Path, description = "Vaccination ID")),
    request_body = VaccinationRequest,
    responses(
        (status = 200, description = "Vaccination updated", body = VaccinationRecord),
        (status = 400, description = "Invalid vaccination"),
        (status = 403, description = "Forbidden - not your vaccination"),
        (status = 404, description = "Vaccination not found"),
        (status = 409, description = "Dose already recorded")
    )
)]
pub async fn update_vaccination(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(vaccination_id): Path<String>,
    Json(request): Json<VaccinationRequest>,
) -> Result<Json<VaccinationRecord>, ApiError> {
    let storage = state.storage();
    let repo = VaccinationRepository::new(&storage);
    let mut vaccination = repo.get(&vaccination_id).verify_owner(&user)?;

    apply_request(&mut vaccination, request);
    vaccination.updated_at = Utc::now();
    repo.update(&vaccination)?;

    audit_log!(
        &storage,
        AuditEventType::VaccinationUpdated,
        &user,
        "vaccination",
        &vaccination_id
    );

    Ok(Json(vaccination))
}

#[utoipa::path(
    delete,
    path = "/v1/vaccinations/{vaccination_id}",
    tag = "Vaccinations",
    security(("bearer_auth" = [])),
    params(("vaccination_id" = String, Path, description = "Vaccination ID")),
    responses(
        (status = 204, description = "Vaccination deleted"),
        (status = 403, description = "Forbidden - not your vaccination"),
        (status = 404, description = "Vaccination not found")
    )
)]
pub async fn delete_vaccination(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(vaccination_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let storage = state.storage();
    let repo = VaccinationRepository::new(&storage);
    repo.get(&vaccination_id).verify_owner(&user)?;
    repo.delete(&vaccination_id)?;

    audit_log!(
        &storage,
        AuditEventType::VaccinationDeleted,
        &user,
        "vaccination",
        &vaccination_id
    );

    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/vaccinations/statistics",
    tag = "Vaccinations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Vaccination statistics", body = VaccinationStats),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn vaccination_statistics(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<VaccinationStats>, ApiError> {
    let storage = state.storage();
    let vaccinations = VaccinationRepository::new(&storage).list_by_owner(&user.user_id)?;
    Ok(Json(VaccinationStats::from_records(&vaccinations)))
}
