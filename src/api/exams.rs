// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Physical exam endpoints, including the PDF report and the assessment
//! report built from the exam values.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::upload::{
    file_response, read_file_field, require_pdf, validate_file_name, UploadedFile,
    MAX_STORED_NAME_LEN,
};
use crate::{
    assessment::{age_on, assess, Finding},
    audit_log,
    auth::{Auth, AuthenticatedUser},
    error::ApiError,
    state::AppState,
    storage::{
        AuditEventType, OwnershipCheck, PhysicalExam, PhysicalExamRepository, PhysicalExamStats,
        ProfileRepository,
    },
};

/// Request to create or replace exam values.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PhysicalExamRequest {
    pub exam_date: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    #[schema(example = "120/80")]
    pub blood_pressure: String,
    pub heart_rate: u16,
    #[serde(default)]
    pub blood_glucose: Option<f64>,
    #[serde(default)]
    pub cholesterol: Option<f64>,
}

/// Exam values with derived BMI.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PhysicalExamResponse {
    pub id: String,
    pub owner_user_id: String,
    pub exam_date: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub blood_pressure: String,
    pub heart_rate: u16,
    pub blood_glucose: Option<f64>,
    pub cholesterol: Option<f64>,
    pub bmi: Option<f64>,
    /// Original name of the uploaded PDF report
    pub report_name: Option<String>,
    /// Link to the encrypted report
    pub report_url: Option<String>,
}

impl PhysicalExamResponse {
    fn new(state: &AppState, exam: PhysicalExam) -> Result<Self, ApiError> {
        let report_url = exam
            .report_key
            .as_deref()
            .map(|key| state.attachments.url(key))
            .transpose()?;
        Ok(Self {
            bmi: exam.bmi(),
            id: exam.id,
            owner_user_id: exam.owner_user_id,
            exam_date: exam.exam_date,
            height_cm: exam.height_cm,
            weight_kg: exam.weight_kg,
            blood_pressure: exam.blood_pressure,
            heart_rate: exam.heart_rate,
            blood_glucose: exam.blood_glucose,
            cholesterol: exam.cholesterol,
            report_name: exam.report_name,
            report_url,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PhysicalExamListResponse {
    pub exams: Vec<PhysicalExamResponse>,
    pub total: usize,
}

/// Who the exam belongs to, for the report header.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExamSubject {
    pub user_id: String,
    pub name: String,
    /// Age in whole years on the day the report is built
    pub age: Option<u32>,
}

/// Exam values, subject and abnormal findings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExamReport {
    pub exam: PhysicalExamResponse,
    pub subject: ExamSubject,
    pub findings: Vec<Finding>,
}

fn apply_request(exam: &mut PhysicalExam, request: PhysicalExamRequest) {
    exam.exam_date = request.exam_date;
    exam.height_cm = request.height_cm;
    exam.weight_kg = request.weight_kg;
    exam.blood_pressure = request.blood_pressure;
    exam.heart_rate = request.heart_rate;
    exam.blood_glucose = request.blood_glucose;
    exam.cholesterol = request.cholesterol;
}

fn remove_report_blob(state: &AppState, key: &str) -> Result<(), ApiError> {
    match state.attachments.delete(key) {
        Ok(()) => Ok(()),
        Err(crate::storage::AttachmentError::NotFound(_)) => {
            tracing::warn!(blob_key = %key, "Exam report blob already missing");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/v1/physical-exams",
    tag = "Physical Exams",
    security(("bearer_auth" = [])),
    request_body = PhysicalExamRequest,
    responses(
        (status = 201, description = "Exam recorded", body = PhysicalExamResponse),
        (status = 400, description = "Invalid exam values")
    )
)]
pub async fn create_exam(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<PhysicalExamRequest>,
) -> Result<(StatusCode, Json<PhysicalExamResponse>), ApiError> {
    let storage = state.storage();
    let now = Utc::now();
    let mut exam = PhysicalExam {
        id: uuid::Uuid::new_v4().to_string(),
        owner_user_id: user.user_id.clone(),
        exam_date: request.exam_date,
        height_cm: 0.0,
        weight_kg: 0.0,
        blood_pressure: String::new(),
        heart_rate: 0,
        blood_glucose: None,
        cholesterol: None,
        report_key: None,
        report_name: None,
        created_at: now,
        updated_at: now,
    };
    apply_request(&mut exam, request);

    PhysicalExamRepository::new(&storage).create(&exam, now.date_naive())?;

    audit_log!(
        &storage,
        AuditEventType::PhysicalExamCreated,
        &user,
        "physical_exam",
        &exam.id
    );

    Ok((StatusCode::CREATED, Json(PhysicalExamResponse::new(&state, exam)?)))
}

/// List the caller's exams, newest first.
#[utoipa::path(
    get,
    path = "/v1/physical-exams",
    tag = "Physical Exams",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Exams", body = PhysicalExamListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_exams(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<PhysicalExamListResponse>, ApiError> {
    let storage = state.storage();
    let exams = PhysicalExamRepository::new(&storage)
        .list_by_owner(&user.user_id)?
        .into_iter()
        .map(|e| PhysicalExamResponse::new(&state, e))
        .collect::<Result<Vec<_>, _>>()?;
    let total = exams.len();
    Ok(Json(PhysicalExamListResponse { exams, total }))
}

#[utoipa::path(
    get,
    path = "/v1/physical-exams/{exam_id}",
    tag = "Physical Exams",
    security(("bearer_auth" = [])),
    params(("exam_id" = String, Path, description = "Exam ID")),
    responses(
        (status = 200, description = "Exam details", body = PhysicalExamResponse),
        (status = 403, description = "Forbidden - not your exam"),
        (status = 404, description = "Exam not found")
    )
)]
pub async fn get_exam(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<PhysicalExamResponse>, ApiError> {
    let storage = state.storage();
    let exam = PhysicalExamRepository::new(&storage)
        .get(&exam_id)
        .verify_owner(&user)?;
    Ok(Json(PhysicalExamResponse::new(&state, exam)?))
}

#[utoipa::path(
    put,
    path = "/v1/physical-exams/{exam_id}",
    tag = "Physical Exams",
    security(("bearer_auth" = [])),
    params(("exam_id" = String, Path, description = "Exam ID")),
    request_body = PhysicalExamRequest,
    responses(
        (status = 200, description = "Exam updated", body = PhysicalExamResponse),
        (status = 400, description = "Invalid exam values"),
        (status = 403, description = "Forbidden - not your exam"),
        (status = 404, description = "Exam not found")
    )
)]
pub async fn update_exam(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    Json(request): Json<PhysicalExamRequest>,
) -> Result<Json<PhysicalExamResponse>, ApiError> {
    let storage = state.storage();
    let repo = PhysicalExamRepository::new(&storage);
    let mut exam = repo.get(&exam_id).verify_owner(&user)?;

    apply_request(&mut exam, request);
    let now = Utc::now();
    exam.updated_at = now;
    repo.update(&exam, now.date_naive())?;

    audit_log!(
        &storage,
        AuditEventType::PhysicalExamUpdated,
        &user,
        "physical_exam",
        &exam_id
    );

    Ok(Json(PhysicalExamResponse::new(&state, exam)?))
}

/// Delete an exam and its report blob.
#[utoipa::path(
    delete,
    path = "/v1/physical-exams/{exam_id}",
    tag = "Physical Exams",
    security(("bearer_auth" = [])),
    params(("exam_id" = String, Path, description = "Exam ID")),
    responses(
        (status = 204, description = "Exam deleted"),
        (status = 403, description = "Forbidden - not your exam"),
        (status = 404, description = "Exam not found")
    )
)]
pub async fn delete_exam(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let storage = state.storage();
    let repo = PhysicalExamRepository::new(&storage);
    let exam = repo.get(&exam_id).verify_owner(&user)?;

    if let Some(key) = exam.report_key.as_deref() {
        remove_report_blob(&state, key)?;
    }
    repo.delete(&exam_id)?;

    tracing::info!(exam_id = %exam_id, "Deleted physical exam");
    audit_log!(
        &storage,
        AuditEventType::PhysicalExamDeleted,
        &user,
        "physical_exam",
        &exam_id
    );

    Ok(StatusCode::NO_CONTENT)
}

/// The caller's most recent exam.
#[utoipa::path(
    get,
    path = "/v1/physical-exams/latest",
    tag = "Physical Exams",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Latest exam", body = PhysicalExamResponse),
        (status = 404, description = "No exams recorded")
    )
)]
pub async fn latest_exam(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<PhysicalExamResponse>, ApiError> {
    let storage = state.storage();
    let exam = PhysicalExamRepository::new(&storage).latest(&user.user_id)?;
    Ok(Json(PhysicalExamResponse::new(&state, exam)?))
}

#[utoipa::path(
    get,
    path = "/v1/physical-exams/statistics",
    tag = "Physical Exams",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Exam statistics", body = PhysicalExamStats),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn exam_statistics(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<PhysicalExamStats>, ApiError> {
    let storage = state.storage();
    let exams = PhysicalExamRepository::new(&storage).list_by_owner(&user.user_id)?;
    Ok(Json(PhysicalExamStats::from_exams(&exams)))
}

/// Exam values with the subject's name and age and any abnormal findings.
#[utoipa::path(
    get,
    path = "/v1/physical-exams/{exam_id}/report",
    tag = "Physical Exams",
    security(("bearer_auth" = [])),
    params(("exam_id" = String, Path, description = "Exam ID")),
    responses(
        (status = 200, description = "Assessment report", body = ExamReport),
        (status = 403, description = "Forbidden - not your exam"),
        (status = 404, description = "Exam not found")
    )
)]
pub async fn exam_report(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Json<ExamReport>, ApiError> {
    let storage = state.storage();
    let exam = PhysicalExamRepository::new(&storage)
        .get(&exam_id)
        .verify_owner(&user)?;
    let profile = ProfileRepository::new(&storage).get_or_default(&exam.owner_user_id)?;

    let today = Utc::now().date_naive();
    let findings = assess(&exam);
    Ok(Json(ExamReport {
        subject: ExamSubject {
            user_id: profile.user_id.clone(),
            name: profile.display_name(),
            age: profile.birth_date.and_then(|birth| age_on(birth, today)),
        },
        exam: PhysicalExamResponse::new(&state, exam)?,
        findings,
    }))
}

/// Encrypt and attach a PDF report to an exam, replacing any earlier one.
pub(crate) fn store_report(
    state: &AppState,
    user: &AuthenticatedUser,
    exam_id: &str,
    file: UploadedFile,
) -> Result<PhysicalExam, ApiError> {
    let storage = state.storage();
    let repo = PhysicalExamRepository::new(&storage);
    let mut exam = repo.get(exam_id).verify_owner(user)?;

    validate_file_name(&file.file_name)?;
    require_pdf(&file.file_name)?;

    let now = Utc::now();
    let logical_name = format!(
        "physical_exams/{:04}/{:02}/{}/{}",
        now.year(),
        now.month(),
        exam.id,
        file.file_name
    );
    let blob_key =
        state
            .attachments
            .save_available(&logical_name, file.data.as_slice(), Some(MAX_STORED_NAME_LEN))?;

    let previous = exam.report_key.replace(blob_key.clone());
    exam.report_name = Some(file.file_name);
    exam.updated_at = now;

    if let Err(e) = repo.update(&exam, now.date_naive()) {
        if let Err(cleanup) = state.attachments.delete(&blob_key) {
            tracing::warn!(error = %cleanup, blob_key = %blob_key, "Failed to remove orphaned blob");
        }
        return Err(e.into());
    }
    if let Some(previous) = previous {
        remove_report_blob(state, &previous)?;
    }

    tracing::info!(exam_id = %exam.id, size = file.data.len(), "Stored encrypted exam report");
    audit_log!(
        &storage,
        AuditEventType::ExamReportUploaded,
        user,
        "physical_exam",
        &exam.id,
        serde_json::json!({ "size": file.data.len() })
    );

    Ok(exam)
}

/// Upload the PDF report (multipart field `report_pdf`).
#[utoipa::path(
    post,
    path = "/v1/physical-exams/{exam_id}/report-pdf",
    tag = "Physical Exams",
    security(("bearer_auth" = [])),
    params(("exam_id" = String, Path, description = "Exam ID")),
    request_body(content_type = "multipart/form-data", description = "Multipart form with a `report_pdf` part"),
    responses(
        (status = 200, description = "Report stored", body = PhysicalExamResponse),
        (status = 400, description = "No file, not a PDF or invalid file name"),
        (status = 403, description = "Forbidden - not your exam"),
        (status = 404, description = "Exam not found"),
        (status = 413, description = "File exceeds 10 MB")
    )
)]
pub async fn upload_report(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<PhysicalExamResponse>, ApiError> {
    let file = read_file_field(&mut multipart, "report_pdf").await?;
    let exam = store_report(&state, &user, &exam_id, file)?;
    Ok(Json(PhysicalExamResponse::new(&state, exam)?))
}

/// Download the decrypted PDF report.
#[utoipa::path(
    get,
    path = "/v1/physical-exams/{exam_id}/report-pdf",
    tag = "Physical Exams",
    security(("bearer_auth" = [])),
    params(("exam_id" = String, Path, description = "Exam ID")),
    responses(
        (status = 200, description = "Decrypted PDF", content_type = "application/pdf"),
        (status = 403, description = "Forbidden - not your exam"),
        (status = 404, description = "Exam or report not found"),
        (status = 500, description = "Stored file failed to decrypt")
    )
)]
pub async fn download_report(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(exam_id): Path<String>,
) -> Result<Response, ApiError> {
    let storage = state.storage();
    let exam = PhysicalExamRepository::new(&storage)
        .get(&exam_id)
        .verify_owner(&user)?;
    let key = exam
        .report_key
        .as_deref()
        .ok_or_else(|| ApiError::not_found("No report uploaded for this exam"))?;

    let data = state.attachments.read(key)?;

    audit_log!(
        &storage,
        AuditEventType::ExamReportDownloaded,
        &user,
        "physical_exam",
        &exam_id
    );

    let name = exam.report_name.as_deref().unwrap_or("report.pdf");
    Ok(file_response(name, "application/pdf", data))
}
