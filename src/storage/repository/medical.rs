// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Medical visit records.
//!
//! One JSON file per visit under `/data/medical_records/`. Attachments and
//! medications reference a record by id and are removed with it; the
//! cascade itself is driven by the API layer because it spans the
//! attachment store.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::super::{OwnedResource, RecordStorage, StorageError, StorageResult};

/// Hospital department of a visit.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "lowercase")]
pub enum Department {
    #[default]
    Internal,
    Surgery,
    Pediatrics,
    Obstetrics,
    Ophthalmology,
    Ent,
    Dental,
    Dermatology,
    Psychiatry,
    Tcm,
}

impl Department {
    /// Human-readable department name.
    pub fn label(&self) -> &'static str {
        match self {
            Department::Internal => "Internal Medicine",
            Department::Surgery => "Surgery",
            Department::Pediatrics => "Pediatrics",
            Department::Obstetrics => "Obstetrics & Gynecology",
            Department::Ophthalmology => "Ophthalmology",
            Department::Ent => "ENT",
            Department::Dental => "Dental",
            Department::Dermatology => "Dermatology",
            Department::Psychiatry => "Psychiatry",
            Department::Tcm => "Traditional Chinese Medicine",
        }
    }
}

/// A hospital visit.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MedicalRecord {
    /// Unique record identifier (UUID)
    pub id: String,
    /// Owner user ID
    pub owner_user_id: String,
    pub visit_date: NaiveDate,
    pub hospital: String,
    pub department: Department,
    pub doctor: String,
    pub chief_complaint: String,
    pub diagnosis: String,
    pub treatment: String,
    #[serde(default)]
    pub follow_up_date: Option<NaiveDate>,
    /// Visit cost, two decimal places
    pub cost: f64,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicalRecord {
    /// Check field-level rules.
    pub fn validate(&self) -> StorageResult<()> {
        if self.hospital.trim().is_empty() {
            return Err(StorageError::Validation("hospital must not be empty".into()));
        }
        if self.hospital.chars().count() > 100 {
            return Err(StorageError::Validation(
                "hospital must be at most 100 characters".into(),
            ));
        }
        if self.doctor.chars().count() > 50 {
            return Err(StorageError::Validation(
                "doctor must be at most 50 characters".into(),
            ));
        }
        if !self.cost.is_finite() || self.cost < 0.0 {
            return Err(StorageError::Validation("cost must not be negative".into()));
        }
        if let Some(follow_up) = self.follow_up_date {
            if follow_up < self.visit_date {
                return Err(StorageError::Validation(
                    "follow_up_date must not be before visit_date".into(),
                ));
            }
        }
        Ok(())
    }
}

impl OwnedResource for MedicalRecord {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }

    fn resource_kind(&self) -> &'static str {
        "medical record"
    }
}

/// List filters for medical records.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MedicalRecordFilter {
    /// Case-insensitive substring of the hospital name
    pub hospital: Option<String>,
    pub department: Option<Department>,
    /// Earliest visit date (inclusive)
    #[serde(alias = "startDate")]
    pub start_date: Option<NaiveDate>,
    /// Latest visit date (inclusive)
    #[serde(alias = "endDate")]
    pub end_date: Option<NaiveDate>,
}

impl MedicalRecordFilter {
    pub fn matches(&self, record: &MedicalRecord) -> bool {
        if let Some(hospital) = self.hospital.as_deref().filter(|h| !h.is_empty()) {
            if !record
                .hospital
                .to_lowercase()
                .contains(&hospital.to_lowercase())
            {
                return false;
            }
        }
        if self.department.is_some_and(|d| d != record.department) {
            return false;
        }
        if self.start_date.is_some_and(|start| record.visit_date < start) {
            return false;
        }
        if self.end_date.is_some_and(|end| record.visit_date > end) {
            return false;
        }
        true
    }
}

/// Aggregate counts over a user's medical records.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MedicalRecordStats {
    pub total: usize,
    pub hospital_count: usize,
    pub department_count: usize,
}

impl MedicalRecordStats {
    pub fn from_records(records: &[MedicalRecord]) -> Self {
        let hospitals: HashSet<&str> = records.iter().map(|r| r.hospital.as_str()).collect();
        let departments: HashSet<Department> = records.iter().map(|r| r.department).collect();
        Self {
            total: records.len(),
            hospital_count: hospitals.len(),
            department_count: departments.len(),
        }
    }
}

/// Repository for medical record operations.
pub struct MedicalRecordRepository<'a> {
    storage: &'a RecordStorage,
}

impl<'a> MedicalRecordRepository<'a> {
    pub fn new(storage: &'a RecordStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, record_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().medical_record(record_id))
    }

    pub fn get(&self, record_id: &str) -> StorageResult<MedicalRecord> {
        let path = self.storage.paths().medical_record(record_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Medical record {record_id}")));
        }
        self.storage.read_json(path)
    }

    pub fn create(&self, record: &MedicalRecord) -> StorageResult<()> {
        record.validate()?;
        if self.exists(&record.id) {
            return Err(StorageError::AlreadyExists(format!(
                "Medical record {}",
                record.id
            )));
        }
        self.storage
            .write_json(self.storage.paths().medical_record(&record.id), record)
    }

    pub fn update(&self, record: &MedicalRecord) -> StorageResult<()> {
        record.validate()?;
        if !self.exists(&record.id) {
            return Err(StorageError::NotFound(format!("Medical record {}", record.id)));
        }
        self.storage
            .write_json(self.storage.paths().medical_record(&record.id), record)
    }

    /// Delete the record document only.
    pub fn delete(&self, record_id: &str) -> StorageResult<()> {
        if !self.exists(record_id) {
            return Err(StorageError::NotFound(format!("Medical record {record_id}")));
        }
        self.storage
            .delete(self.storage.paths().medical_record(record_id))
    }

    /// A user's records matching `filter`, newest visit first.
    pub fn list_by_owner(
        &self,
        owner_user_id: &str,
        filter: &MedicalRecordFilter,
    ) -> StorageResult<Vec<MedicalRecord>> {
        let mut records: Vec<MedicalRecord> = self
            .storage
            .read_all::<MedicalRecord>(self.storage.paths().medical_records_dir())?
            .into_iter()
            .filter(|r| r.owner_user_id == owner_user_id && filter.matches(r))
            .collect();
        records.sort_by(|a, b| {
            b.visit_date
                .cmp(&a.visit_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(records)
    }

    pub fn statistics(
        &self,
        owner_user_id: &str,
        filter: &MedicalRecordFilter,
    ) -> StorageResult<MedicalRecordStats> {
        let records = self.list_by_owner(owner_user_id, filter)?;
        Ok(MedicalRecordStats::from_records(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::test_support::{date, test_storage};

    fn sample_record(id: &str, owner: &str, visit: &str) -> MedicalRecord {
        MedicalRecord {
            id: id.to_string(),
            owner_user_id: owner.to_string(),
            visit_date: date(visit),
            hospital: "City General Hospital".to_string(),
            department: Department::Internal,
            doctor: "Dr. Chen".to_string(),
            chief_complaint: "Cough".to_string(),
            diagnosis: "Bronchitis".to_string(),
            treatment: "Rest".to_string(),
            follow_up_date: None,
            cost: 120.5,
            notes: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_get_record() {
        let (_temp, storage) = test_storage();
        let repo = MedicalRecordRepository::new(&storage);

        let record = sample_record("r1", "user-1", "2024-03-01");
        repo.create(&record).unwrap();

        assert_eq!(repo.get("r1").unwrap(), record);
        assert!(matches!(
            repo.create(&record),
            Err(StorageError::AlreadyExists(_))
        ));
    }

    #[test]
    fn validation_rejects_bad_cost_and_follow_up() {
        let mut record = sample_record("r1", "user-1", "2024-03-01");
        record.cost = -1.0;
        assert!(matches!(record.validate(), Err(StorageError::Validation(_))));

        let mut record = sample_record("r1", "user-1", "2024-03-01");
        record.follow_up_date = Some(date("2024-02-28"));
        assert!(matches!(record.validate(), Err(StorageError::Validation(_))));

        record.follow_up_date = Some(date("2024-03-01"));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn list_filters_and_orders_by_visit_date() {
        let (_temp, storage) = test_storage();
        let repo = MedicalRecordRepository::new(&storage);

        let mut a = sample_record("a", "user-1", "2024-01-10");
        a.hospital = "Peking Union Hospital".to_string();
        let mut b = sample_record("b", "user-1", "2024-03-05");
        b.department = Department::Dental;
        let c = sample_record("c", "user-1", "2024-02-20");
        let other = sample_record("d", "user-2", "2024-02-21");
        for r in [&a, &b, &c, &other] {
            repo.create(r).unwrap();
        }

        let all = repo
            .list_by_owner("user-1", &MedicalRecordFilter::default())
            .unwrap();
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);

        let by_hospital = repo
            .list_by_owner("user-1", &MedicalRecordFilter {
                hospital: Some("union".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(by_hospital.len(), 1);
        assert_eq!(by_hospital[0].id, "a");

        let ranged = repo
            .list_by_owner("user-1", &MedicalRecordFilter {
                start_date: Some(date("2024-02-01")),
                end_date: Some(date("2024-03-05")),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(ranged.len(), 2);

        let dental = repo
            .list_by_owner("user-1", &MedicalRecordFilter {
                department: Some(Department::Dental),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(dental.len(), 1);
    }

    #[test]
    fn statistics_count_distinct_values() {
        let (_temp, storage) = test_storage();
        let repo = MedicalRecordRepository::new(&storage);

        let a = sample_record("a", "user-1", "2024-01-10");
        let mut b = sample_record("b", "user-1", "2024-02-10");
        b.department = Department::Surgery;
        let mut c = sample_record("c", "user-1", "2024-03-10");
        c.hospital = "Other Clinic".to_string();
        for r in [&a, &b, &c] {
            repo.create(r).unwrap();
        }

        let stats = repo
            .statistics("user-1", &MedicalRecordFilter::default())
            .unwrap();
        assert_eq!(stats, MedicalRecordStats {
            total: 3,
            hospital_count: 2,
            department_count: 2,
        });
    }

    #[test]
    fn department_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Department::Tcm).unwrap(), "\"tcm\"");
        let parsed: Department = serde_json::from_str("\"ophthalmology\"").unwrap();
        assert_eq!(parsed, Department::Ophthalmology);
    }

    #[test]
    fn delete_missing_record_is_not_found() {
        let (_temp, storage) = test_storage();
        let repo = MedicalRecordRepository::new(&storage);
        assert!(matches!(repo.delete("nope"), Err(StorageError::NotFound(_))));
    }
}
