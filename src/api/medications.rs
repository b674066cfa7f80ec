// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Medication schedule endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::Auth,
    error::ApiError,
    state::AppState,
    storage::{
        AuditEventType, Frequency, MedicalRecordRepository, MedicationRecord,
        MedicationRepository, MedicationStats, OwnershipCheck,
    },
};

/// Request to create or replace a medication.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MedicationRequest {
    /// Medical record the prescription came from
    pub medical_record_id: String,
    pub drug_name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub reminder_enabled: bool,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "08:30:00")]
    pub reminder_time: Option<NaiveTime>,
}

/// A medication with its derived day counts.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MedicationResponse {
    #[serde(flatten)]
    pub medication: MedicationRecord,
    /// Days until the end date, never negative
    pub remaining_days: Option<i64>,
    /// Course length in days, counting both ends
    pub duration_days: Option<i64>,
}

impl MedicationResponse {
    fn new(medication: MedicationRecord, today: NaiveDate) -> Self {
        Self {
            remaining_days: medication.remaining_days(today),
            duration_days: medication.duration_days(),
            medication,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MedicationListResponse {
    pub medications: Vec<MedicationResponse>,
    pub total: usize,
}

fn apply_request(medication: &mut MedicationRecord, request: MedicationRequest) {
    medication.medical_record_id = request.medical_record_id;
    medication.drug_name = request.drug_name;
    medication.dosage = request.dosage;
    medication.frequency = request.frequency;
    medication.start_date = request.start_date;
    medication.end_date = request.end_date;
    medication.reminder_enabled = request.reminder_enabled;
    medication.reminder_time = request.reminder_time;
}

/// Create a medication linked to one of the caller's medical records.
#[utoipa::path(
    post,
    path = "/v1/medications",
    tag = "Medications",
    security(("bearer_auth" = [])),
    request_body = MedicationRequest,
    responses(
        (status = 201, description = "Medication created", body = MedicationResponse),
        (status = 400, description = "Invalid medication"),
        (status = 403, description = "Forbidden - medical record is not yours"),
        (status = 404, description = "Medical record not found")
    )
)]
pub async fn create_medication(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<MedicationRequest>,
) -> Result<(StatusCode, Json<MedicationResponse>), ApiError> {
    let storage = state.storage();
    let record = MedicalRecordRepository::new(&storage)
        .get(&request.medical_record_id)
        .verify_owner(&user)?;

    let now = Utc::now();
    let mut medication = MedicationRecord {
        id: uuid::Uuid::new_v4().to_string(),
        owner_user_id: record.owner_user_id,
        medical_record_id: String::new(),
        drug_name: String::new(),
        dosage: String::new(),
        frequency: Frequency::default(),
        start_date: request.start_date,
        end_date: None,
        reminder_enabled: false,
        reminder_time: None,
        created_at: now,
        updated_at: now,
    };
    apply_request(&mut medication, request);

    MedicationRepository::new(&storage).create(&medication)?;

    audit_log!(
        &storage,
        AuditEventType::MedicationCreated,
        &user,
        "medication",
        &medication.id
    );

    let today = now.date_naive();
    Ok((
        StatusCode::CREATED,
        Json(MedicationResponse::new(medication, today)),
    ))
}

/// List the caller's medications, latest start date first.
#[utoipa::path(
    get,
    path = "/v1/medications",
    tag = "Medications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Medications", body = MedicationListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_medications(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<MedicationListResponse>, ApiError> {
    let storage = state.storage();
    let today = Utc::now().date_naive();
    let medications: Vec<MedicationResponse> = MedicationRepository::new(&storage)
        .list_by_owner(&user.user_id)?
        .into_iter()
        .map(|m| MedicationResponse::new(m, today))
        .collect();
    let total = medications.len();
    Ok(Json(MedicationListResponse { medications, total }))
}

#[utoipa::path(
    get,
    path = "/v1/medications/{medication_id}",
    tag = "Medications",
    security(("bearer_auth" = [])),
    params(("medication_id" = String, Path, description = "Medication ID")),
    responses(
        (status = 200, description = "Medication details", body = MedicationResponse),
        (status = 403, description = "Forbidden - not your medication"),
        (status = 404, description = "Medication not found")
    )
)]
pub async fn get_medication(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(medication_id): Path<String>,
) -> Result<Json<MedicationResponse>, ApiError> {
    let storage = state.storage();
    let medication = MedicationRepository::new(&storage)
        .get(&medication_id)
        .verify_owner(&user)?;
    Ok(Json(MedicationResponse::new(medication, Utc::now().date_naive())))
}

#[utoipa::path(
    put,
    path = "/v1/medications/{medication_id}",
    tag = "Medications",
    security(("bearer_auth" = [])),
    params(("medication_id" = String, Path, description = "Medication ID")),
    request_body = MedicationRequest,
    responses(
        (status = 200, description = "Medication updated", body = MedicationResponse),
        (status = 400, description = "Invalid medication"),
        (status = 403, description = "Forbidden - not your medication"),
        (status = 404, description = "Medication not found")
    )
)]
pub async fn update_medication(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(medication_id): Path<String>,
    Json(request): Json<MedicationRequest>,
) -> Result<Json<MedicationResponse>, ApiError> {
    let storage = state.storage();
    let repo = MedicationRepository::new(&storage);
    let mut medication = repo.get(&medication_id).verify_owner(&user)?;

    // Moving to another record requires access to that record too
    if request.medical_record_id != medication.medical_record_id {
        let record = MedicalRecordRepository::new(&storage)
            .get(&request.medical_record_id)
            .verify_owner(&user)?;
        if record.owner_user_id != medication.owner_user_id {
            return Err(ApiError::bad_request(
                "medical record belongs to a different user",
            ));
        }
    }

    apply_request(&mut medication, request);
    medication.updated_at = Utc::now();
    repo.update(&medication)?;

    audit_log!(
        &storage,
        AuditEventType::MedicationUpdated,
        &user,
        "medication",
        &medication_id
    );

    Ok(Json(MedicationResponse::new(medication, Utc::now().date_naive())))
}

#[utoipa::path(
    delete,
    path = "/v1/medications/{medication_id}",
    tag = "Medications",
    security(("bearer_auth" = [])),
    params(("medication_id" = String, Path, description = "Medication ID")),
    responses(
        (status = 204, description = "Medication deleted"),
        (status = 403, description = "Forbidden - not your medication"),
        (status = 404, description = "Medication not found")
    )
)]
pub async fn delete_medication(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(medication_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let storage = state.storage();
    let repo = MedicationRepository::new(&storage);
    repo.get(&medication_id).verify_owner(&user)?;
    repo.delete(&medication_id)?;

    audit_log!(
        &storage,
        AuditEventType::MedicationDeleted,
        &user,
        "medication",
        &medication_id
    );

    Ok(StatusCode::NO_CONTENT)
}

/// Totals and active medications for the caller.
#[utoipa::path(
    get,
    path = "/v1/medications/statistics",
    tag = "Medications",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Medication statistics", body = MedicationStats),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn medication_statistics(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<MedicationStats>, ApiError> {
    let storage = state.storage();
    let medications = MedicationRepository::new(&storage).list_by_owner(&user.user_id)?;
    Ok(Json(MedicationStats::from_records(
        &medications,
        Utc::now().date_naive(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::medical::{create_medical_record, delete_medical_record, tests::visit};
    use crate::api::test_support::member;
    use crate::state::test_support::test_state;

    async fn record_for(state: &AppState, user: &str) -> String {
        let (_, Json(record)) = create_medical_record(
            Auth(member(user)),
            State(state.clone()),
            Json(visit("2024-03-01", "City Hospital")),
        )
        .await
        .unwrap();
        record.id
    }

    fn request(record_id: &str, end: Option<NaiveDate>) -> MedicationRequest {
        MedicationRequest {
            medical_record_id: record_id.to_string(),
            drug_name: "Amoxicillin".to_string(),
            dosage: "500mg/tablet".to_string(),
            frequency: Frequency::Tid,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end_date: end,
            reminder_enabled: false,
            reminder_time: None,
        }
    }

    #[tokio::test]
    async fn create_reports_derived_days() {
        let (state, _temp) = test_state();
        let record_id = record_for(&state, "alice").await;

        let (status, Json(created)) = create_medication(
            Auth(member("alice")),
            State(state.clone()),
            Json(request(&record_id, NaiveDate::from_ymd_opt(2024, 3, 7))),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.duration_days, Some(7));
        // The course ended long before the test runs
        assert_eq!(created.remaining_days, Some(0));
        assert_eq!(created.medication.owner_user_id, "alice");
    }

    #[tokio::test]
    async fn medication_on_foreign_record_is_forbidden() {
        let (state, _temp) = test_state();
        let record_id = record_for(&state, "alice").await;

        let err = create_medication(
            Auth(member("mallory")),
            State(state.clone()),
            Json(request(&record_id, None)),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn reminder_without_time_is_rejected() {
        let (state, _temp) = test_state();
        let record_id = record_for(&state, "alice").await;
        let mut req = request(&record_id, None);
        req.reminder_enabled = true;

        let err = create_medication(Auth(member("alice")), State(state.clone()), Json(req))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn statistics_count_open_courses_as_active() {
        let (state, _temp) = test_state();
        let record_id = record_for(&state, "alice").await;
        for end in [None, NaiveDate::from_ymd_opt(2024, 3, 10)] {
            create_medication(
                Auth(member("alice")),
                State(state.clone()),
                Json(request(&record_id, end)),
            )
            .await
            .unwrap();
        }

        let Json(stats) = medication_statistics(Auth(member("alice")), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active_medications, 1);
    }

    #[tokio::test]
    async fn deleting_record_removes_its_medications() {
        let (state, _temp) = test_state();
        let record_id = record_for(&state, "alice").await;
        create_medication(
            Auth(member("alice")),
            State(state.clone()),
            Json(request(&record_id, None)),
        )
        .await
        .unwrap();

        let Json(result) = delete_medical_record(
            Auth(member("alice")),
            State(state.clone()),
            Path(record_id),
        )
        .await
        .unwrap();
        assert_eq!(result.medications_deleted, 1);

        let Json(list) = list_medications(Auth(member("alice")), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(list.total, 0);
    }
}
