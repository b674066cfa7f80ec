// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path constants and utilities for the storage layout.

use std::path::{Path, PathBuf};

/// Default base directory for all persistent storage.
pub const DATA_ROOT: &str = "/data";

/// Storage path utilities.
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with a custom root (useful for testing).
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Root directory for all data.
    pub fn root(&self) -> &Path {
        &self.root
    }

    // ========== Medical Record Paths ==========

    pub fn medical_records_dir(&self) -> PathBuf {
        self.root.join("medical_records")
    }

    pub fn medical_record(&self, record_id: &str) -> PathBuf {
        self.medical_records_dir().join(format!("{record_id}.json"))
    }

    pub fn attachments_dir(&self) -> PathBuf {
        self.root.join("attachments")
    }

    pub fn attachment(&self, attachment_id: &str) -> PathBuf {
        self.attachments_dir().join(format!("{attachment_id}.json"))
    }

    // ========== Medication / Vaccination Paths ==========

    pub fn medications_dir(&self) -> PathBuf {
        self.root.join("medications")
    }

    pub fn medication(&self, medication_id: &str) -> PathBuf {
        self.medications_dir().join(format!("{medication_id}.json"))
    }

    pub fn vaccinations_dir(&self) -> PathBuf {
        self.root.join("vaccinations")
    }

    pub fn vaccination(&self, vaccination_id: &str) -> PathBuf {
        self.vaccinations_dir().join(format!("{vaccination_id}.json"))
    }

    // ========== Physical Exam Paths ==========

    pub fn physical_exams_dir(&self) -> PathBuf {
        self.root.join("physical_exams")
    }

    pub fn physical_exam(&self, exam_id: &str) -> PathBuf {
        self.physical_exams_dir().join(format!("{exam_id}.json"))
    }

    // ========== User Paths ==========

    pub fn profiles_dir(&self) -> PathBuf {
        self.root.join("profiles")
    }

    pub fn profile(&self, user_id: &str) -> PathBuf {
        self.profiles_dir().join(format!("{user_id}.json"))
    }

    pub fn family_dir(&self) -> PathBuf {
        self.root.join("family")
    }

    pub fn family_relationship(&self, relationship_id: &str) -> PathBuf {
        self.family_dir().join(format!("{relationship_id}.json"))
    }

    // ========== Encrypted Media ==========

    /// Root of the encrypted attachment store.
    pub fn media_dir(&self) -> PathBuf {
        self.root.join("media")
    }

    // ========== Audit Log Paths ==========

    /// Directory containing audit logs.
    pub fn audit_dir(&self) -> PathBuf {
        self.root.join("audit")
    }

    /// Directory for a specific date's audit logs.
    pub fn audit_date_dir(&self, date: &str) -> PathBuf {
        self.audit_dir().join(date)
    }

    /// Path to a daily audit events file (JSONL format).
    pub fn audit_events_file(&self, date: &str) -> PathBuf {
        self.audit_date_dir(date).join("events.jsonl")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_paths_use_data_root() {
        let paths = StoragePaths::default();
        assert_eq!(paths.root(), Path::new("/data"));
    }

    #[test]
    fn custom_root_for_testing() {
        let paths = StoragePaths::new("/tmp/test-data");
        assert_eq!(paths.root(), Path::new("/tmp/test-data"));
        assert_eq!(
            paths.medical_record("rec-123"),
            PathBuf::from("/tmp/test-data/medical_records/rec-123.json")
        );
    }

    #[test]
    fn record_paths_are_correct() {
        let paths = StoragePaths::default();
        assert_eq!(
            paths.attachment("att-1"),
            PathBuf::from("/data/attachments/att-1.json")
        );
        assert_eq!(
            paths.medication("med-1"),
            PathBuf::from("/data/medications/med-1.json")
        );
        assert_eq!(
            paths.vaccination("vac-1"),
            PathBuf::from("/data/vaccinations/vac-1.json")
        );
        assert_eq!(
            paths.physical_exam("pe-1"),
            PathBuf::from("/data/physical_exams/pe-1.json")
        );
    }

    #[test]
    fn user_paths_are_correct() {
        let paths = StoragePaths::default();
        assert_eq!(paths.profile("u1"), PathBuf::from("/data/profiles/u1.json"));
        assert_eq!(
            paths.family_relationship("fr-1"),
            PathBuf::from("/data/family/fr-1.json")
        );
    }

    #[test]
    fn media_and_audit_paths_are_correct() {
        let paths = StoragePaths::default();
        assert_eq!(paths.media_dir(), PathBuf::from("/data/media"));
        assert_eq!(
            paths.audit_events_file("2024-03-01"),
            PathBuf::from("/data/audit/2024-03-01/events.jsonl")
        );
    }
}
