// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Multipart upload and file download helpers shared by the attachment and
//! exam-report endpoints.
//!
//! Axum's default request body limit is 2 MiB; routes that accept uploads
//! must be mounted with `DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)`.

use axum::{
    extract::{multipart::MultipartError, Multipart},
    http::header,
    response::{IntoResponse, Response},
};

use crate::error::ApiError;

/// Largest accepted file (10 MiB).
pub const MAX_UPLOAD_SIZE: usize = 10 * 1024 * 1024;

/// Request body limit for upload routes: one file plus multipart framing.
pub const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_SIZE + 64 * 1024;

/// Longest logical name handed to the attachment store.
pub const MAX_STORED_NAME_LEN: usize = 255;

/// A file part read fully into memory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

fn multipart_error(err: MultipartError) -> ApiError {
    ApiError::new(err.status(), err.body_text())
}

/// Read the file part named `field_name`, rejecting files over
/// [`MAX_UPLOAD_SIZE`] as soon as the limit is crossed.
pub async fn read_file_field(
    multipart: &mut Multipart,
    field_name: &str,
) -> Result<UploadedFile, ApiError> {
    while let Some(mut field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(field_name) {
            continue;
        }

        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request(format!("Field '{field_name}' is not a file")))?;
        let content_type = field.content_type().map(str::to_string);

        let mut data = Vec::new();
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            if data.len() + chunk.len() > MAX_UPLOAD_SIZE {
                return Err(ApiError::payload_too_large(format!(
                    "File must not exceed {} MB",
                    MAX_UPLOAD_SIZE / (1024 * 1024)
                )));
            }
            data.extend_from_slice(&chunk);
        }

        return Ok(UploadedFile {
            file_name,
            content_type,
            data,
        });
    }

    Err(ApiError::bad_request(format!(
        "No file uploaded in field '{field_name}'"
    )))
}

/// Accept `stem.ext` where the stem is word characters, commas, spaces or
/// hyphens and the extension is three ASCII letters.
pub fn validate_file_name(name: &str) -> Result<(), ApiError> {
    let valid = match name.rsplit_once('.') {
        Some((stem, ext)) => {
            !stem.is_empty()
                && stem
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == ',' || c == '-' || c.is_whitespace())
                && ext.len() == 3
                && ext.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::bad_request(format!("Invalid file name: {name}")));
    }
    Ok(())
}

/// Exam reports must be PDFs.
pub fn require_pdf(name: &str) -> Result<(), ApiError> {
    let is_pdf = name
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(ApiError::bad_request("Only PDF files are accepted"));
    }
    Ok(())
}

/// Content type for a download, from the file extension.
pub fn content_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "txt" => "text/plain; charset=utf-8",
        "doc" => "application/msword",
        _ => "application/octet-stream",
    }
}

/// RFC 5987 `ext-value` encoding for a `filename*` parameter.
fn encode_ext_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{byte:02X}"));
        }
    }
    out
}

/// `Content-Disposition` value with an ASCII fallback name and the exact
/// UTF-8 name.
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        encode_ext_value(file_name)
    )
}

/// Download response for decrypted file content.
pub fn file_response(file_name: &str, content_type: &str, data: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, content_disposition(file_name)),
        ],
        data,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::FromRequest, http::Request, http::StatusCode};

    const BOUNDARY: &str = "X-HEALTH-VAULT-BOUNDARY";

    fn multipart_request(field: &str, file_name: &str, data: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n\
                 --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn reads_named_file_field() {
        let request = multipart_request("file", "report.pdf", b"%PDF-1.4 test");
        let mut multipart = Multipart::from_request(request, &()).await.unwrap();

        let file = read_file_field(&mut multipart, "file").await.unwrap();
        assert_eq!(file.file_name, "report.pdf");
        assert_eq!(file.content_type.as_deref(), Some("application/pdf"));
        assert_eq!(file.data, b"%PDF-1.4 test");
    }

    #[tokio::test]
    async fn missing_field_is_bad_request() {
        let request = multipart_request("other", "report.pdf", b"data");
        let mut multipart = Multipart::from_request(request, &()).await.unwrap();

        let err = read_file_field(&mut multipart, "file").await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn file_name_rules() {
        for ok in ["report.pdf", "blood test, 2024-03.pdf", "体检报告.pdf", "scan_01.PNG"] {
            assert!(validate_file_name(ok).is_ok(), "{ok}");
        }
        for bad in ["report", ".pdf", "report.jpeg", "a.b.pdf", "../x.pdf", "x.p1f"] {
            assert!(validate_file_name(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn pdf_check_is_case_insensitive() {
        assert!(require_pdf("report.PDF").is_ok());
        assert!(require_pdf("report.png").is_err());
        assert!(require_pdf("report").is_err());
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(content_type_for("a.pdf"), "application/pdf");
        assert_eq!(content_type_for("a.JPG"), "image/jpeg");
        assert_eq!(content_type_for("a.xyz"), "application/octet-stream");
    }

    #[test]
    fn disposition_keeps_unicode_name() {
        let value = content_disposition("报告 1.pdf");
        assert!(value.starts_with("attachment; filename=\"__ 1.pdf\""));
        assert!(value.ends_with("filename*=UTF-8''%E6%8A%A5%E5%91%8A%201.pdf"));
    }

    #[test]
    fn file_response_sets_headers() {
        let response = file_response("report.pdf", "application/pdf", b"%PDF".to_vec());
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        assert!(response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("filename=\"report.pdf\""));
    }
}
