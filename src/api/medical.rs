// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Medical record API endpoints.
//!
//! All operations require authentication. Reads and writes of a single
//! record enforce owner-or-staff access; listings only return the caller's
//! own records.

use axum::{
    extract::{Path, Query, State},
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
        AttachmentError, AttachmentRepository, AuditEventType, Department, MedicalRecord,
        MedicalRecordFilter, MedicalRecordRepository, MedicalRecordStats, MedicationRepository,
        OwnershipCheck,
    },
};

/// Request to create or replace a medical record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MedicalRecordRequest {
    pub visit_date: NaiveDate,
    pub hospital: String,
    #[serde(default)]
    pub department: Department,
    #[serde(default)]
    pub doctor: String,
    #[serde(default)]
    pub chief_complaint: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub treatment: String,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub notes: String,
}

/// Response containing a list of medical records.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MedicalRecordListResponse {
    pub records: Vec<MedicalRecord>,
    pub total: usize,
}

/// Response after deleting a record and everything attached to it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteMedicalRecordResponse {
    pub record_id: String,
    pub attachments_deleted: usize,
    pub medications_deleted: usize,
}

fn apply_request(record: &mut MedicalRecord, request: MedicalRecordRequest) {
    record.visit_date = request.visit_date;
    record.hospital = request.hospital;
    record.department = request.department;
    record.doctor = request.doctor;
    record.chief_complaint = request.chief_complaint;
    record.diagnosis = request.diagnosis;
    record.treatment = request.treatment;
    record.follow_up_date = request.follow_up_date;
    record.cost = (request.cost * 100.0).round() / 100.0;
    record.notes = request.notes;
}

/// Create a medical record for the authenticated user.
#[utoipa::path(
    post,
    path = "/v1/medical-records",
    tag = "Medical Records",
    security(("bearer_auth" = [])),
    request_body = MedicalRecordRequest,
    responses(
        (status = 201, description = "Record created", body = MedicalRecord),
        (status = 400, description = "Invalid record"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn create_medical_record(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<MedicalRecordRequest>,
) -> Result<(StatusCode, Json<MedicalRecord>), ApiError> {
    let storage = state.storage();
    let now = Utc::now();

    let mut record = MedicalRecord {
        id: uuid::Uuid::new_v4().to_string(),
        owner_user_id: user.user_id.clone(),
        visit_date: request.visit_date,
        hospital: String::new(),
        department: Department::default(),
        doctor: String::new(),
        chief_complaint: String::new(),
        diagnosis: String::new(),
        treatment: String::new(),
        follow_up_date: None,
        cost: 0.0,
        notes: String::new(),
        created_at: now,
        updated_at: now,
    };
    apply_request(&mut record, request);

    MedicalRecordRepository::new(&storage).create(&record)?;

    audit_log!(
        &storage,
        AuditEventType::MedicalRecordCreated,
        &user,
        "medical_record",
        &record.id
    );

    Ok((StatusCode::CREATED, Json(record)))
}

/// List the authenticated user's medical records.
#[utoipa::path(
    get,
    path = "/v1/medical-records",
    tag = "Medical Records",
    security(("bearer_auth" = [])),
    params(MedicalRecordFilter),
    responses(
        (status = 200, description = "Matching records, newest visit first", body = MedicalRecordListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_medical_records(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(filter): Query<MedicalRecordFilter>,
) -> Result<Json<MedicalRecordListResponse>, ApiError> {
    let storage = state.storage();
    let records = MedicalRecordRepository::new(&storage).list_by_owner(&user.user_id, &filter)?;
    let total = records.len();
    Ok(Json(MedicalRecordListResponse { records, total }))
}

/// Get a medical record by ID.
#[utoipa::path(
    get,
    path = "/v1/medical-records/{record_id}",
    tag = "Medical Records",
    security(("bearer_auth" = [])),
    params(("record_id" = String, Path, description = "Medical record ID")),
    responses(
        (status = 200, description = "Record details", body = MedicalRecord),
        (status = 403, description = "Forbidden - not your record"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn get_medical_record(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let storage = state.storage();
    let record = MedicalRecordRepository::new(&storage)
        .get(&record_id)
        .verify_owner(&user)?;
    Ok(Json(record))
}

/// Replace a medical record's fields.
#[utoipa::path(
    put,
    path = "/v1/medical-records/{record_id}",
    tag = "Medical Records",
    security(("bearer_auth" = [])),
    params(("record_id" = String, Path, description = "Medical record ID")),
    request_body = MedicalRecordRequest,
    responses(
        (status = 200, description = "Record updated", body = MedicalRecord),
        (status = 400, description = "Invalid record"),
        (status = 403, description = "Forbidden - not your record"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn update_medical_record(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    Json(request): Json<MedicalRecordRequest>,
) -> Result<Json<MedicalRecord>, ApiError> {
    let storage = state.storage();
    let repo = MedicalRecordRepository::new(&storage);

    let mut record = repo.get(&record_id).verify_owner(&user)?;
    apply_request(&mut record, request);
    record.updated_at = Utc::now();
    repo.update(&record)?;

    audit_log!(
        &storage,
        AuditEventType::MedicalRecordUpdated,
        &user,
        "medical_record",
        &record_id
    );

    Ok(Json(record))
}

/// Delete a medical record with its attachments and medications.
#[utoipa::path(
    delete,
    path = "/v1/medical-records/{record_id}",
    tag = "Medical Records",
    security(("bearer_auth" = [])),
    params(("record_id" = String, Path, description = "Medical record ID")),
    responses(
        (status = 200, description = "Record and dependents deleted", body = DeleteMedicalRecordResponse),
        (status = 403, description = "Forbidden - not your record"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn delete_medical_record(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<DeleteMedicalRecordResponse>, ApiError> {
    let storage = state.storage();
    MedicalRecordRepository::new(&storage)
        .get(&record_id)
        .verify_owner(&user)?;

    let attachments = AttachmentRepository::new(&storage);
    let record_attachments = attachments.list_by_record(&record_id)?;
    for attachment in &record_attachments {
        match state.attachments.delete(&attachment.blob_key) {
            Ok(()) => {}
            Err(AttachmentError::NotFound(key)) => {
                tracing::warn!(blob_key = %key, "Attachment blob already missing");
            }
            Err(e) => return Err(e.into()),
        }
        attachments.delete(&attachment.id)?;
    }

    let medications = MedicationRepository::new(&storage);
    let record_medications = medications.list_by_record(&record_id)?;
    for medication in &record_medications {
        medications.delete(&medication.id)?;
    }

    MedicalRecordRepository::new(&storage).delete(&record_id)?;

    tracing::info!(
        record_id = %record_id,
        attachments = record_attachments.len(),
        medications = record_medications.len(),
        "Deleted medical record"
    );
    audit_log!(
        &storage,
        AuditEventType::MedicalRecordDeleted,
        &user,
        "medical_record",
        &record_id,
        serde_json::json!({
            "attachments_deleted": record_attachments.len(),
            "medications_deleted": record_medications.len(),
        })
    );

    Ok(Json(DeleteMedicalRecordResponse {
        record_id,
        attachments_deleted: record_attachments.len(),
        medications_deleted: record_medications.len(),
    }))
}

/// Aggregate counts over the caller's records matching the filter.
#[utoipa::path(
    get,
    path = "/v1/medical-records/statistics",
    tag = "Medical Records",
    security(("bearer_auth" = [])),
    params(MedicalRecordFilter),
    responses(
        (status = 200, description = "Record statistics", body = MedicalRecordStats),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn medical_record_statistics(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(filter): Query<MedicalRecordFilter>,
) -> Result<Json<MedicalRecordStats>, ApiError> {
    let storage = state.storage();
    let stats = MedicalRecordRepository::new(&storage).statistics(&user.user_id, &filter)?;
    Ok(Json(stats))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::api::test_support::{member, staff};
    use crate::state::test_support::test_state;

    pub(crate) fn visit(date: &str, hospital: &str) -> MedicalRecordRequest {
        MedicalRecordRequest {
            visit_date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            hospital: hospital.to_string(),
            department: Department::Internal,
            doctor: "Dr. Chen".to_string(),
            chief_complaint: "Cough".to_string(),
            diagnosis: "Bronchitis".to_string(),
            treatment: "Rest".to_string(),
            follow_up_date: None,
            cost: 88.456,
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn create_then_list_own_records() {
        let (state, _temp) = test_state();

        let (status, Json(created)) = create_medical_record(
            Auth(member("alice")),
            State(state.clone()),
            Json(visit("2024-03-01", "City Hospital")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.owner_user_id, "alice");
        assert_eq!(created.cost, 88.46);

        create_medical_record(
            Auth(member("bob")),
            State(state.clone()),
            Json(visit("2024-03-02", "Other Hospital")),
        )
        .await
        .unwrap();

        let Json(list) = list_medical_records(
            Auth(member("alice")),
            State(state.clone()),
            Query(MedicalRecordFilter::default()),
        )
        .await
        .unwrap();
        assert_eq!(list.total, 1);
        assert_eq!(list.records[0].id, created.id);
    }

    #[tokio::test]
    async fn other_users_record_is_forbidden_but_staff_may_read() {
        let (state, _temp) = test_state();
        let (_, Json(created)) = create_medical_record(
            Auth(member("alice")),
            State(state.clone()),
            Json(visit("2024-03-01", "City Hospital")),
        )
        .await
        .unwrap();

        let err = get_medical_record(
            Auth(member("mallory")),
            State(state.clone()),
            Path(created.id.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let Json(record) = get_medical_record(
            Auth(staff("nurse")),
            State(state.clone()),
            Path(created.id.clone()),
        )
        .await
        .unwrap();
        assert_eq!(record.id, created.id);
    }

    #[tokio::test]
    async fn invalid_follow_up_is_bad_request() {
        let (state, _temp) = test_state();
        let mut request = visit("2024-03-10", "City Hospital");
        request.follow_up_date = NaiveDate::from_ymd_opt(2024, 3, 1);

        let err = create_medical_record(Auth(member("alice")), State(state), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_replaces_fields() {
        let (state, _temp) = test_state();
        let (_, Json(created)) = create_medical_record(
            Auth(member("alice")),
            State(state.clone()),
            Json(visit("2024-03-01", "City Hospital")),
        )
        .await
        .unwrap();

        let mut request = visit("2024-03-01", "Renamed Hospital");
        request.department = Department::Dental;
        let Json(updated) = update_medical_record(
            Auth(member("alice")),
            State(state.clone()),
            Path(created.id.clone()),
            Json(request),
        )
        .await
        .unwrap();
        assert_eq!(updated.hospital, "Renamed Hospital");
        assert_eq!(updated.department, Department::Dental);
        assert_eq!(updated.created_at, created.created_at);
    }

    #[tokio::test]
    async fn statistics_respect_filters() {
        let (state, _temp) = test_state();
        for (date, hospital) in [
            ("2024-01-05", "City Hospital"),
            ("2024-02-05", "City Hospital"),
            ("2024-03-05", "Union Clinic"),
        ] {
            create_medical_record(
                Auth(member("alice")),
                State(state.clone()),
                Json(visit(date, hospital)),
            )
            .await
            .unwrap();
        }

        let Json(all) = medical_record_statistics(
            Auth(member("alice")),
            State(state.clone()),
            Query(MedicalRecordFilter::default()),
        )
        .await
        .unwrap();
        assert_eq!(all.total, 3);
        assert_eq!(all.hospital_count, 2);
        assert_eq!(all.department_count, 1);

        let Json(city) = medical_record_statistics(
            Auth(member("alice")),
            State(state.clone()),
            Query(MedicalRecordFilter {
                hospital: Some("city".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(city.total, 2);
    }
}
