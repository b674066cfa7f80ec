// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent storage for the health vault. Two stores live under the
//! data directory:
//!
//! - [`RecordStorage`]: plain JSON documents for records, profiles,
//!   relationships and the audit trail.
//! - [`EncryptedAttachmentStore`]: file content (exam reports, record
//!   attachments), always AES-256-GCM ciphertext on disk.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   medical_records/{record_id}.json
//!   attachments/{attachment_id}.json     # metadata only
//!   medications/{medication_id}.json
//!   vaccinations/{vaccination_id}.json
//!   physical_exams/{exam_id}.json
//!   profiles/{user_id}.json
//!   family/{relationship_id}.json
//!   audit/{date}/events.jsonl            # Daily audit logs
//!   media/                               # EncryptedAttachmentStore root
//!     physical_exams/{YYYY}/{MM}/{exam_id}/{name}.pdf.encrypted
//!     medical_records/{record_id}/{name}.encrypted
//! ```
//!
//! ## Important Notes
//!
//! - JSON records are written atomically (temp file + rename).
//! - Blob writes are not atomic; see [`attachments`].
//! - Every record carries its owner's user id; access goes through
//!   [`OwnershipEnforcer`].

pub mod attachments;
pub mod audit;
pub mod ownership;
pub mod paths;
pub mod record_fs;
pub mod repository;

pub use attachments::{AttachmentError, AttachmentKey, AttachmentResult, EncryptedAttachmentStore};
pub use audit::{AuditEvent, AuditEventType, AuditRepository};
pub use ownership::{OwnedResource, OwnershipCheck, OwnershipEnforcer};
pub use paths::StoragePaths;
pub use record_fs::{RecordStorage, StorageError, StorageResult};
pub use repository::{
    AttachmentRepository, Department, FamilyRepository, Frequency, MedicalAttachment,
    MedicalRecord, MedicalRecordFilter, MedicalRecordRepository, MedicalRecordStats,
    MedicationRecord, MedicationRepository, MedicationStats, PhysicalExam, PhysicalExamRepository,
    PhysicalExamStats, ProfileRepository, RelationType, FamilyRelationship, UserProfile,
    VaccinationRecord, VaccinationRepository, VaccinationStats, VaccineType,
};
