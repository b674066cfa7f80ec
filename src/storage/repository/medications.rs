// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Medication schedules attached to a medical record.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{OwnedResource, RecordStorage, StorageError, StorageResult};

/// Dosing frequency.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Frequency {
    /// Once a day
    #[default]
    Qd,
    /// Twice a day
    Bid,
    /// Three times a day
    Tid,
    /// Once a week
    Qw,
    /// As needed
    Prn,
}

/// A medication course.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct MedicationRecord {
    /// Unique medication identifier (UUID)
    pub id: String,
    pub owner_user_id: String,
    /// Medical record this prescription belongs to
    pub medical_record_id: String,
    pub drug_name: String,
    /// e.g. `500mg/tablet`
    pub dosage: String,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub reminder_enabled: bool,
    #[serde(default)]
    #[schema(value_type = Option<String>, example = "08:30:00")]
    pub reminder_time: Option<NaiveTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MedicationRecord {
    pub fn validate(&self) -> StorageResult<()> {
        if self.drug_name.trim().is_empty() {
            return Err(StorageError::Validation("drug_name must not be empty".into()));
        }
        if self.drug_name.chars().count() > 100 {
            return Err(StorageError::Validation(
                "drug_name must be at most 100 characters".into(),
            ));
        }
        if self.dosage.chars().count() > 50 {
            return Err(StorageError::Validation(
                "dosage must be at most 50 characters".into(),
            ));
        }
        if self.end_date.is_some_and(|end| end < self.start_date) {
            return Err(StorageError::Validation(
                "end_date must not be before start_date".into(),
            ));
        }
        if self.reminder_enabled && self.reminder_time.is_none() {
            return Err(StorageError::Validation(
                "reminder_time is required when reminders are enabled".into(),
            ));
        }
        Ok(())
    }

    /// Days left until `end_date`, never negative. `None` without an end date.
    pub fn remaining_days(&self, today: NaiveDate) -> Option<i64> {
        self.end_date
            .map(|end| (end - today).num_days().max(0))
    }

    /// Course length in days, counting both ends.
    pub fn duration_days(&self) -> Option<i64> {
        self.end_date
            .map(|end| (end - self.start_date).num_days() + 1)
    }

    /// Open-ended, or ending today or later.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        self.end_date.is_none_or(|end| end >= today)
    }
}

impl OwnedResource for MedicationRecord {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }

    fn resource_kind(&self) -> &'static str {
        "medication"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct MedicationStats {
    pub total: usize,
    pub active_medications: usize,
}

impl MedicationStats {
    pub fn from_records(records: &[MedicationRecord], today: NaiveDate) -> Self {
        Self {
            total: records.len(),
            active_medications: records.iter().filter(|m| m.is_active(today)).count(),
        }
    }
}

/// Repository for medication operations.
pub struct MedicationRepository<'a> {
    storage: &'a RecordStorage,
}

impl<'a> MedicationRepository<'a> {
    pub fn new(storage: &'a RecordStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, medication_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().medication(medication_id))
    }

    pub fn get(&self, medication_id: &str) -> StorageResult<MedicationRecord> {
        let path = self.storage.paths().medication(medication_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Medication {medication_id}")));
        }
        self.storage.read_json(path)
    }

    pub fn create(&self, medication: &MedicationRecord) -> StorageResult<()> {
        medication.validate()?;
        if self.exists(&medication.id) {
            return Err(StorageError::AlreadyExists(format!(
                "Medication {}",
                medication.id
            )));
        }
        self.storage
            .write_json(self.storage.paths().medication(&medication.id), medication)
    }

    pub fn update(&self, medication: &MedicationRecord) -> StorageResult<()> {
        medication.validate()?;
        if !self.exists(&medication.id) {
            return Err(StorageError::NotFound(format!("Medication {}", medication.id)));
        }
        self.storage
            .write_json(self.storage.paths().medication(&medication.id), medication)
    }

    pub fn delete(&self, medication_id: &str) -> StorageResult<()> {
        if !self.exists(medication_id) {
            return Err(StorageError::NotFound(format!("Medication {medication_id}")));
        }
        self.storage
            .delete(self.storage.paths().medication(medication_id))
    }

    /// A user's medications, latest start date first.
    pub fn list_by_owner(&self, owner_user_id: &str) -> StorageResult<Vec<MedicationRecord>> {
        let mut medications: Vec<MedicationRecord> = self
            .storage
            .read_all::<MedicationRecord>(self.storage.paths().medications_dir())?
            .into_iter()
            .filter(|m| m.owner_user_id == owner_user_id)
            .collect();
        medications.sort_by(|a, b| b.start_date.cmp(&a.start_date));
        Ok(medications)
    }

    pub fn list_by_record(&self, record_id: &str) -> StorageResult<Vec<MedicationRecord>> {
        Ok(self
            .storage
            .read_all::<MedicationRecord>(self.storage.paths().medications_dir())?
            .into_iter()
            .filter(|m| m.medical_record_id == record_id)
            .collect())
    }
}
