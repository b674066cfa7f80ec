// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::storage::{AttachmentError, StorageError};

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

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        Self::new(StatusCode::PAYLOAD_TOO_LARGE, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => Self::not_found(format!("{what} not found")),
            StorageError::AlreadyExists(what) => Self::conflict(what),
            StorageError::PermissionDenied { .. } => Self::forbidden(err.to_string()),
            StorageError::Validation(msg) => Self::bad_request(msg),
            other => {
                tracing::error!(error = %other, "Record storage failure");
                Self::internal("Storage error")
            }
        }
    }
}

impl From<AttachmentError> for ApiError {
    fn from(err: AttachmentError) -> Self {
        match err {
            AttachmentError::NotFound(_) => Self::not_found("Attachment file not found"),
            AttachmentError::InvalidName { .. } => Self::bad_request(err.to_string()),
            AttachmentError::Crypto(_) => {
                tracing::warn!(error = %err, "Attachment failed to decrypt");
                Self::internal("Attachment could not be decrypted")
            }
            AttachmentError::Io(_) => {
                tracing::error!(error = %err, "Attachment storage failure");
                Self::internal("Attachment storage error")
            }
        }
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

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    #[test]
    fn constructors_set_status_and_message() {
        let nf = ApiError::not_found("missing");
        assert_eq!(nf.status, StatusCode::NOT_FOUND);
        assert_eq!(nf.message, "missing");

        let bad = ApiError::bad_request("bad");
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);

        assert_eq!(ApiError::forbidden("no").status, StatusCode::FORBIDDEN);
        assert_eq!(ApiError::conflict("dup").status, StatusCode::CONFLICT);
        assert_eq!(
            ApiError::payload_too_large("big").status,
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::internal("boom").status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn storage_errors_map_to_statuses() {
        let cases = [
            (StorageError::NotFound("Medical record r1".into()), StatusCode::NOT_FOUND),
            (StorageError::AlreadyExists("dup".into()), StatusCode::CONFLICT),
            (
                StorageError::PermissionDenied {
                    user_id: "u".into(),
                    resource: "medical record".into(),
                },
                StatusCode::FORBIDDEN,
            ),
            (StorageError::Validation("bad".into()), StatusCode::BAD_REQUEST),
            (StorageError::NotInitialized, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn attachment_errors_map_to_statuses() {
        assert_eq!(
            ApiError::from(AttachmentError::NotFound("k".into())).status,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(AttachmentError::InvalidName {
                name: "../x".into(),
                reason: "traversal".into(),
            })
            .status,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(AttachmentError::Crypto("tag".into())).status,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn into_response_returns_json_body() {
        let response = ApiError::bad_request("bad data").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body_bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = String::from_utf8(body_bytes.to_vec()).unwrap();
        assert_eq!(body, r#"{"error":"bad data"}"#);
    }
}
