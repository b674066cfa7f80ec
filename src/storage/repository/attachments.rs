// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Metadata for medical-record attachments.
//!
//! The file content lives in the encrypted attachment store under
//! `blob_key`; this repository only tracks which blob belongs to which
//! record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{OwnedResource, RecordStorage, StorageError, StorageResult};

/// Attachment metadata stored as JSON.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MedicalAttachment {
    /// Unique attachment identifier (UUID)
    pub id: String,
    /// Parent medical record
    pub record_id: String,
    /// Owner of the parent record
    pub owner_user_id: String,
    /// Original file name as uploaded
    pub name: String,
    /// Physical key in the attachment store
    pub blob_key: String,
    /// Plaintext size in bytes
    pub size: u64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

impl OwnedResource for MedicalAttachment {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }

    fn resource_kind(&self) -> &'static str {
        "attachment"
    }
}

/// Repository for attachment metadata.
pub struct AttachmentRepository<'a> {
    storage: &'a RecordStorage,
}

impl<'a> AttachmentRepository<'a> {
    pub fn new(storage: &'a RecordStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, attachment_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().attachment(attachment_id))
    }

    pub fn get(&self, attachment_id: &str) -> StorageResult<MedicalAttachment> {
        let path = self.storage.paths().attachment(attachment_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Attachment {attachment_id}")));
        }
        self.storage.read_json(path)
    }

    pub fn create(&self, attachment: &MedicalAttachment) -> StorageResult<()> {
        if self.exists(&attachment.id) {
            return Err(StorageError::AlreadyExists(format!(
                "Attachment {}",
                attachment.id
            )));
        }
        self.storage
            .write_json(self.storage.paths().attachment(&attachment.id), attachment)
    }

    pub fn delete(&self, attachment_id: &str) -> StorageResult<()> {
        if !self.exists(attachment_id) {
            return Err(StorageError::NotFound(format!("Attachment {attachment_id}")));
        }
        self.storage
            .delete(self.storage.paths().attachment(attachment_id))
    }

    /// Attachments of one record, newest upload first.
    pub fn list_by_record(&self, record_id: &str) -> StorageResult<Vec<MedicalAttachment>> {
        let mut attachments: Vec<MedicalAttachment> = self
            .storage
            .read_all::<MedicalAttachment>(self.storage.paths().attachments_dir())?
            .into_iter()
            .filter(|a| a.record_id == record_id)
            .collect();
        attachments.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(attachments)
    }
}
