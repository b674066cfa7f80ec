// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Medical-record attachment endpoints.
//!
//! Files are encrypted by the attachment store under
//! `medical_records/{record_id}/`. Access follows the parent record.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::upload::{
    content_type_for, file_response, read_file_field, validate_file_name, UploadedFile,
    MAX_STORED_NAME_LEN,
};
use crate::{
    audit_log,
    auth::{Auth, AuthenticatedUser},
    error::ApiError,
    state::AppState,
    storage::{
        AttachmentRepository, AuditEventType, MedicalAttachment, MedicalRecordRepository,
        OwnershipCheck,
    },
};

/// Attachment metadata returned to clients. The blob key stays internal.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentResponse {
    pub id: String,
    pub record_id: String,
    pub name: String,
    /// Plaintext size in bytes
    pub size: u64,
    pub content_type: String,
    /// Link built from the logical file name
    pub url: String,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttachmentListResponse {
    pub attachments: Vec<AttachmentResponse>,
    pub total: usize,
}

fn to_response(state: &AppState, attachment: MedicalAttachment) -> Result<AttachmentResponse, ApiError> {
    let url = state.attachments.url(&attachment.blob_key)?;
    Ok(AttachmentResponse {
        id: attachment.id,
        record_id: attachment.record_id,
        name: attachment.name,
        size: attachment.size,
        content_type: attachment.content_type,
        url,
        uploaded_at: attachment.uploaded_at,
    })
}

/// Encrypt and store an uploaded file for a record the user may modify.
pub(crate) fn store_attachment(
    state: &AppState,
    user: &AuthenticatedUser,
    record_id: &str,
    file: UploadedFile,
) -> Result<MedicalAttachment, ApiError> {
    let storage = state.storage();
    let record = MedicalRecordRepository::new(&storage)
        .get(record_id)
        .verify_owner(user)?;

    validate_file_name(&file.file_name)?;

    let logical_name = format!("medical_records/{}/{}", record.id, file.file_name);
    let blob_key =
        state
            .attachments
            .save_available(&logical_name, file.data.as_slice(), Some(MAX_STORED_NAME_LEN))?;

    let attachment = MedicalAttachment {
        id: uuid::Uuid::new_v4().to_string(),
        record_id: record.id.clone(),
        owner_user_id: record.owner_user_id.clone(),
        content_type: file
            .content_type
            .unwrap_or_else(|| content_type_for(&file.file_name).to_string()),
        name: file.file_name,
        blob_key,
        size: file.data.len() as u64,
        uploaded_at: Utc::now(),
    };

    if let Err(e) = AttachmentRepository::new(&storage).create(&attachment) {
        // Metadata failed: do not leave an orphaned blob behind
        if let Err(cleanup) = state.attachments.delete(&attachment.blob_key) {
            tracing::warn!(error = %cleanup, blob_key = %attachment.blob_key, "Failed to remove orphaned blob");
        }
        return Err(e.into());
    }

    tracing::info!(
        attachment_id = %attachment.id,
        record_id = %attachment.record_id,
        size = attachment.size,
        "Stored encrypted attachment"
    );
    audit_log!(
        &storage,
        AuditEventType::AttachmentUploaded,
        user,
        "attachment",
        &attachment.id,
        serde_json::json!({ "record_id": attachment.record_id, "size": attachment.size })
    );

    Ok(attachment)
}

/// Upload an attachment (multipart field `file`) to a medical record.
#[utoipa::path(
    post,
    path = "/v1/medical-records/{record_id}/attachments",
    tag = "Attachments",
    security(("bearer_auth" = [])),
    params(("record_id" = String, Path, description = "Medical record ID")),
    request_body(content_type = "multipart/form-data", description = "Multipart form with a `file` part"),
    responses(
        (status = 201, description = "Attachment stored", body = AttachmentResponse),
        (status = 400, description = "No file or invalid file name"),
        (status = 403, description = "Forbidden - not your record"),
        (status = 404, description = "Record not found"),
        (status = 413, description = "File exceeds 10 MB")
    )
)]
pub async fn upload_attachment(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(record_id): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AttachmentResponse>), ApiError> {
    let file = read_file_field(&mut multipart, "file").await?;
    let attachment = store_attachment(&state, &user, &record_id, file)?;
    Ok((StatusCode::CREATED, Json(to_response(&state, attachment)?)))
}

/// List a record's attachments, newest first.
#[utoipa::path(
    get,
    path = "/v1/medical-records/{record_id}/attachments",
    tag = "Attachments",
    security(("bearer_auth" = [])),
    params(("record_id" = String, Path, description = "Medical record ID")),
    responses(
        (status = 200, description = "Attachments of the record", body = AttachmentListResponse),
        (status = 403, description = "Forbidden - not your record"),
        (status = 404, description = "Record not found")
    )
)]
pub async fn list_attachments(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(record_id): Path<String>,
) -> Result<Json<AttachmentListResponse>, ApiError> {
    let storage = state.storage();
    MedicalRecordRepository::new(&storage)
        .get(&record_id)
        .verify_owner(&user)?;

    let attachments = AttachmentRepository::new(&storage)
        .list_by_record(&record_id)?
        .into_iter()
        .map(|a| to_response(&state, a))
        .collect::<Result<Vec<_>, _>>()?;
    let total = attachments.len();
    Ok(Json(AttachmentListResponse { attachments, total }))
}

/// Download the decrypted content of an attachment.
#[utoipa::path(
    get,
    path = "/v1/attachments/{attachment_id}/download",
    tag = "Attachments",
    security(("bearer_auth" = [])),
    params(("attachment_id" = String, Path, description = "Attachment ID")),
    responses(
        (status = 200, description = "Decrypted file content", content_type = "application/octet-stream"),
        (status = 403, description = "Forbidden - not your attachment"),
        (status = 404, description = "Attachment not found"),
        (status = 500, description = "Stored file failed to decrypt")
    )
)]
pub async fn download_attachment(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(attachment_id): Path<String>,
) -> Result<Response, ApiError> {
    let storage = state.storage();
    let attachment = AttachmentRepository::new(&storage)
        .get(&attachment_id)
        .verify_owner(&user)?;

    let data = state.attachments.read(&attachment.blob_key)?;

    audit_log!(
        &storage,
        AuditEventType::AttachmentDownloaded,
        &user,
        "attachment",
        &attachment_id
    );

    Ok(file_response(&attachment.name, &attachment.content_type, data))
}

/// Delete an attachment and its encrypted file.
#[utoipa::path(
    delete,
    path = "/v1/attachments/{attachment_id}",
    tag = "Attachments",
    security(("bearer_auth" = [])),
    params(("attachment_id" = String, Path, description = "Attachment ID")),
    responses(
        (status = 204, description = "Attachment deleted"),
        (status = 403, description = "Forbidden - not your attachment"),
        (status = 404, description = "Attachment not found")
    )
)]
pub async fn delete_attachment(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(attachment_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let storage = state.storage();
    let repo = AttachmentRepository::new(&storage);
    let attachment = repo.get(&attachment_id).verify_owner(&user)?;

    if state.attachments.exists(&attachment.blob_key) {
        state.attachments.delete(&attachment.blob_key)?;
    } else {
        tracing::warn!(blob_key = %attachment.blob_key, "Attachment blob already missing");
    }
    repo.delete(&attachment_id)?;

    tracing::info!(attachment_id = %attachment_id, "Deleted attachment");
    audit_log!(
        &storage,
        AuditEventType::AttachmentDeleted,
        &user,
        "attachment",
        &attachment_id
    );

    Ok(StatusCode::NO_CONTENT)
}
