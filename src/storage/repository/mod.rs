// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Repository layer providing typed access to record storage.
//!
//! Each repository provides CRUD operations for a specific entity type,
//! using the RecordStorage for all file operations.

pub mod attachments;
pub mod exams;
pub mod family;
pub mod medical;
pub mod medications;
pub mod profiles;
pub mod vaccinations;

pub use attachments::{AttachmentRepository, MedicalAttachment};
pub use exams::{PhysicalExam, PhysicalExamRepository, PhysicalExamStats};
pub use family::{FamilyRelationship, FamilyRepository, RelationType};
pub use medical::{
    Department, MedicalRecord, MedicalRecordFilter, MedicalRecordRepository, MedicalRecordStats,
};
pub use medications::{Frequency, MedicationRecord, MedicationRepository, MedicationStats};
pub use profiles::{ProfileRepository, UserProfile};
pub use vaccinations::{VaccinationRecord, VaccinationRepository, VaccinationStats, VaccineType};

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::TempDir;

    use crate::storage::{RecordStorage, StoragePaths};

    pub fn test_storage() -> (TempDir, RecordStorage) {
        let temp = TempDir::new().unwrap();
        let mut storage = RecordStorage::new(StoragePaths::new(temp.path()));
        storage.initialize().expect("Failed to initialize");
        (temp, storage)
    }

    pub fn date(s: &str) -> chrono::NaiveDate {
        chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }
}
