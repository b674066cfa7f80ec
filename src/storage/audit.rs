// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for health-record operations.
//!
//! Every create, update, delete and download of a record or attachment is
//! appended to a daily JSONL file and mirrored as a `record_audit_log`
//! tracing event.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{RecordStorage, StorageError, StorageResult};

/// Longest date range, in days, a single range read may cover.
pub const MAX_RANGE_DAYS: i64 = 366;

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // Medical record events
    MedicalRecordCreated,
    MedicalRecordUpdated,
    MedicalRecordDeleted,

    // Attachment events
    AttachmentUploaded,
    AttachmentDownloaded,
    AttachmentDeleted,

    // Medication events
    MedicationCreated,
    MedicationUpdated,
    MedicationDeleted,

    // Vaccination events
    VaccinationCreated,
    VaccinationUpdated,
    VaccinationDeleted,

    // Physical exam events
    PhysicalExamCreated,
    PhysicalExamUpdated,
    PhysicalExamDeleted,
    ExamReportUploaded,
    ExamReportDownloaded,

    // User events
    ProfileUpdated,
    FamilyRelationCreated,
    FamilyRelationVerified,
    FamilyRelationDeleted,

    // Access events
    PermissionDenied,
    AuditLogAccessed,
}

impl AuditEventType {
    /// Stable snake_case name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::MedicalRecordCreated => "medical_record_created",
            AuditEventType::MedicalRecordUpdated => "medical_record_updated",
            AuditEventType::MedicalRecordDeleted => "medical_record_deleted",
            AuditEventType::AttachmentUploaded => "attachment_uploaded",
            AuditEventType::AttachmentDownloaded => "attachment_downloaded",
            AuditEventType::AttachmentDeleted => "attachment_deleted",
            AuditEventType::MedicationCreated => "medication_created",
            AuditEventType::MedicationUpdated => "medication_updated",
            AuditEventType::MedicationDeleted => "medication_deleted",
            AuditEventType::VaccinationCreated => "vaccination_created",
            AuditEventType::VaccinationUpdated => "vaccination_updated",
            AuditEventType::VaccinationDeleted => "vaccination_deleted",
            AuditEventType::PhysicalExamCreated => "physical_exam_created",
            AuditEventType::PhysicalExamUpdated => "physical_exam_updated",
            AuditEventType::PhysicalExamDeleted => "physical_exam_deleted",
            AuditEventType::ExamReportUploaded => "exam_report_uploaded",
            AuditEventType::ExamReportDownloaded => "exam_report_downloaded",
            AuditEventType::ProfileUpdated => "profile_updated",
            AuditEventType::FamilyRelationCreated => "family_relation_created",
            AuditEventType::FamilyRelationVerified => "family_relation_verified",
            AuditEventType::FamilyRelationDeleted => "family_relation_deleted",
            AuditEventType::PermissionDenied => "permission_denied",
            AuditEventType::AuditLogAccessed => "audit_log_accessed",
        }
    }
}

/// An audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuditEvent {
    /// Unique event ID.
    pub event_id: String,
    /// When the event occurred.
    pub timestamp: DateTime<Utc>,
    /// Type of event.
    pub event_type: AuditEventType,
    /// User who triggered the event (if known).
    pub user_id: Option<String>,
    /// Resource affected (record id, attachment id, etc.).
    pub resource_id: Option<String>,
    /// Resource type (medical_record, physical_exam, etc.).
    pub resource_type: Option<String>,
    /// Additional details as JSON.
    #[schema(value_type = Option<Object>)]
    pub details: Option<serde_json::Value>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message if operation failed.
    pub error: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event.
    pub fn new(event_type: AuditEventType) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type,
            user_id: None,
            resource_id: None,
            resource_type: None,
            details: None,
            success: true,
            error: None,
        }
    }

    /// Set the user ID.
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Set the resource.
    pub fn with_resource(
        mut self,
        resource_type: impl Into<String>,
        resource_id: impl Into<String>,
    ) -> Self {
        self.resource_type = Some(resource_type.into());
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Add details.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Mark as failed with error message.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// Repository for audit events.
pub struct AuditRepository<'a> {
    storage: &'a RecordStorage,
}

impl<'a> AuditRepository<'a> {
    /// Create a new audit repository.
    pub fn new(storage: &'a RecordStorage) -> Self {
        Self { storage }
    }

    /// Log an audit event.
    ///
    /// Events are appended to a daily log file in JSONL format.
    pub fn log(&self, event: &AuditEvent) -> StorageResult<()> {
        tracing::info!(
            event_id = %event.event_id,
            action = event.event_type.as_str(),
            user_id = event.user_id.as_deref().unwrap_or("-"),
            model = event.resource_type.as_deref().unwrap_or("-"),
            object_id = event.resource_id.as_deref().unwrap_or("-"),
            success = event.success,
            "record_audit_log"
        );

        let date = event.timestamp.format("%Y-%m-%d").to_string();
        let path = self.storage.paths().audit_events_file(&date);

        // First event of the day starts a new file
        let mut content = match self.storage.read_raw(&path) {
            Ok(content) => content,
            Err(StorageError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let event_json = serde_json::to_string(event).map_err(|e| {
            StorageError::SerializationError(format!("Failed to serialize audit event: {e}"))
        })?;

        if !content.is_empty() && !content.ends_with(b"\n") {
            content.push(b'\n');
        }
        content.extend_from_slice(event_json.as_bytes());
        content.push(b'\n');

        self.storage.write_raw(&path, &content)
    }

    /// Read audit events for a specific date.
    pub fn read_events(&self, date: &str) -> StorageResult<Vec<AuditEvent>> {
        let path = self.storage.paths().audit_events_file(date);
        let content = self.storage.read_raw(&path)?;

        let content_str = String::from_utf8(content).map_err(|e| {
            StorageError::SerializationError(format!("Invalid UTF-8 in audit log: {e}"))
        })?;

        let mut events = Vec::new();
        for line in content_str.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let event: AuditEvent = serde_json::from_str(line).map_err(|e| {
                StorageError::SerializationError(format!("Failed to deserialize audit event: {e}"))
            })?;
            events.push(event);
        }

        Ok(events)
    }

    /// Read events for an inclusive date range (`YYYY-MM-DD`) of at most
    /// [`MAX_RANGE_DAYS`] days. Days without a log file are skipped; an
    /// unreadable or corrupt day file is an error.
    pub fn read_events_range(
        &self,
        start_date: &str,
        end_date: &str,
    ) -> StorageResult<Vec<AuditEvent>> {
        let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d")
            .map_err(|e| StorageError::Validation(format!("Invalid start date: {e}")))?;
        let end = NaiveDate::parse_from_str(end_date, "%Y-%m-%d")
            .map_err(|e| StorageError::Validation(format!("Invalid end date: {e}")))?;

        if start > end {
            return Err(StorageError::Validation(
                "start date must not be after end date".to_string(),
            ));
        }
        if (end - start).num_days() >= MAX_RANGE_DAYS {
            return Err(StorageError::Validation(format!(
                "date range exceeds {MAX_RANGE_DAYS} days"
            )));
        }

        let mut all_events = Vec::new();
        let mut current = start;

        while current <= end {
            let date_str = current.format("%Y-%m-%d").to_string();
            match self.read_events(&date_str) {
                Ok(events) => all_events.extend(events),
                Err(StorageError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }
            current = current
                .succ_opt()
                .ok_or_else(|| StorageError::Validation("Date overflow".to_string()))?;
        }

        Ok(all_events)
    }

    /// Events for one resource on a given date.
    pub fn search_by_resource(
        &self,
        resource_type: &str,
        resource_id: &str,
        date: &str,
    ) -> StorageResult<Vec<AuditEvent>> {
        let events = self.read_events(date)?;
        Ok(events
            .into_iter()
            .filter(|e| {
                e.resource_type.as_deref() == Some(resource_type)
                    && e.resource_id.as_deref() == Some(resource_id)
            })
            .collect())
    }
}

/// Helper macro for logging audit events.
///
/// Audit failures are logged and never fail the request.
#[macro_export]
macro_rules! audit_log {
    ($storage:expr, $event_type:expr, $user:expr) => {{
        let repo = $crate::storage::AuditRepository::new($storage);
        let event = $crate::storage::AuditEvent::new($event_type).with_user(&$user.user_id);
        if let Err(e) = repo.log(&event) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
    ($storage:expr, $event_type:expr, $user:expr, $resource_type:expr, $resource_id:expr) => {{
        let repo = $crate::storage::AuditRepository::new($storage);
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_user(&$user.user_id)
            .with_resource($resource_type, $resource_id);
        if let Err(e) = repo.log(&event) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
    ($storage:expr, $event_type:expr, $user:expr, $resource_type:expr, $resource_id:expr, $details:expr) => {{
        let repo = $crate::storage::AuditRepository::new($storage);
        let event = $crate::storage::AuditEvent::new($event_type)
            .with_user(&$user.user_id)
            .with_resource($resource_type, $resource_id)
            .with_details($details);
        if let Err(e) = repo.log(&event) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
    }};
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoragePaths;
    use tempfile::TempDir;

    fn setup() -> (TempDir, RecordStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = RecordStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().unwrap();
        (temp, storage)
    }

    fn today() -> String {
        Utc::now().format("%Y-%m-%d").to_string()
    }

    #[test]
    fn create_audit_event() {
        let event = AuditEvent::new(AuditEventType::ExamReportUploaded)
            .with_user("user_123")
            .with_resource("physical_exam", "exam_abc")
            .with_details(serde_json::json!({ "size": 1024 }));

        assert_eq!(event.event_type, AuditEventType::ExamReportUploaded);
        assert_eq!(event.user_id, Some("user_123".to_string()));
        assert_eq!(event.resource_type, Some("physical_exam".to_string()));
        assert_eq!(event.resource_id, Some("exam_abc".to_string()));
        assert!(event.success);
    }

    #[test]
    fn failed_event() {
        let event = AuditEvent::new(AuditEventType::PermissionDenied)
            .with_user("user_123")
            .failed("Not authorized");

        assert!(!event.success);
        assert_eq!(event.error, Some("Not authorized".to_string()));
    }

    #[test]
    fn event_type_name_matches_serde() {
        let json = serde_json::to_string(&AuditEventType::AttachmentDownloaded).unwrap();
        assert_eq!(json, format!("\"{}\"", AuditEventType::AttachmentDownloaded.as_str()));
    }

    #[test]
    fn log_and_read_events() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);

        repo.log(
            &AuditEvent::new(AuditEventType::MedicalRecordCreated)
                .with_user("user_1")
                .with_resource("medical_record", "r1"),
        )
        .unwrap();
        repo.log(
            &AuditEvent::new(AuditEventType::AttachmentUploaded)
                .with_user("user_1")
                .with_resource("attachment", "a1"),
        )
        .unwrap();

        let events = repo.read_events(&today()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, AuditEventType::MedicalRecordCreated);
        assert_eq!(events[1].event_type, AuditEventType::AttachmentUploaded);

        let ranged = repo.read_events_range(&today(), &today()).unwrap();
        assert_eq!(ranged.len(), 2);
    }

    #[test]
    fn search_by_resource() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);

        for event_type in [
            AuditEventType::PhysicalExamCreated,
            AuditEventType::ExamReportDownloaded,
        ] {
            repo.log(
                &AuditEvent::new(event_type)
                    .with_user("user_1")
                    .with_resource("physical_exam", "target"),
            )
            .unwrap();
        }
        repo.log(
            &AuditEvent::new(AuditEventType::VaccinationCreated)
                .with_user("user_1")
                .with_resource("vaccination", "v1"),
        )
        .unwrap();

        let events = repo
            .search_by_resource("physical_exam", "target", &today())
            .unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn range_longer_than_limit_is_rejected() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);

        assert!(matches!(
            repo.read_events_range("0001-01-01", "9999-12-31"),
            Err(StorageError::Validation(_))
        ));
        assert!(matches!(
            repo.read_events_range("2024-01-01", "2025-01-01"),
            Err(StorageError::Validation(_))
        ));
        // 2024 is a leap year: 366 days inclusive
        assert!(repo.read_events_range("2024-01-01", "2024-12-31").unwrap().is_empty());
    }

    #[test]
    fn corrupt_day_file_fails_range_read() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);
        repo.log(&AuditEvent::new(AuditEventType::MedicalRecordCreated).with_user("user_1"))
            .unwrap();
        storage
            .write_raw(storage.paths().audit_events_file(&today()), b"{not json\n")
            .unwrap();

        assert!(matches!(
            repo.read_events_range(&today(), &today()),
            Err(StorageError::SerializationError(_))
        ));
    }

    #[test]
    fn invalid_range_is_validation_error() {
        let (_temp, storage) = setup();
        let repo = AuditRepository::new(&storage);
        assert!(matches!(
            repo.read_events_range("yesterday", "today"),
            Err(StorageError::Validation(_))
        ));
    }
}
