// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Vaccination history.
//!
//! A user has at most one record per (vaccine type, dose number).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{OwnedResource, RecordStorage, StorageError, StorageResult};

/// Highest accepted dose number.
pub const MAX_DOSE_NUMBER: u8 = 10;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
pub enum VaccineType {
    #[serde(rename = "CV")]
    Covid,
    #[serde(rename = "FL")]
    Flu,
    #[serde(rename = "HPV")]
    Hpv,
    #[serde(rename = "HB")]
    HepatitisB,
}

impl VaccineType {
    pub fn label(&self) -> &'static str {
        match self {
            VaccineType::Covid => "COVID-19",
            VaccineType::Flu => "Influenza",
            VaccineType::Hpv => "HPV",
            VaccineType::HepatitisB => "Hepatitis B",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VaccinationRecord {
    /// Unique vaccination identifier (UUID)
    pub id: String,
    pub owner_user_id: String,
    pub vaccine_type: VaccineType,
    /// Which dose of the series (1-10)
    pub dose_number: u8,
    pub vaccination_date: NaiveDate,
    #[serde(default)]
    pub next_due_date: Option<NaiveDate>,
    pub institution: String,
    pub batch_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VaccinationRecord {
    pub fn validate(&self) -> StorageResult<()> {
        if !(1..=MAX_DOSE_NUMBER).contains(&self.dose_number) {
            return Err(StorageError::Validation(format!(
                "dose_number must be between 1 and {MAX_DOSE_NUMBER}"
            )));
        }
        if self.institution.trim().is_empty() {
            return Err(StorageError::Validation("institution must not be empty".into()));
        }
        if self.institution.chars().count() > 200 {
            return Err(StorageError::Validation(
                "institution must be at most 200 characters".into(),
            ));
        }
        if self.batch_number.chars().count() > 50 {
            return Err(StorageError::Validation(
                "batch_number must be at most 50 characters".into(),
            ));
        }
        Ok(())
    }

    fn same_dose(&self, other: &VaccinationRecord) -> bool {
        self.owner_user_id == other.owner_user_id
            && self.vaccine_type == other.vaccine_type
            && self.dose_number == other.dose_number
    }
}

impl OwnedResource for VaccinationRecord {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }

    fn resource_kind(&self) -> &'static str {
        "vaccination"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct VaccinationStats {
    pub total: usize,
    /// Records that schedule a next dose
    pub pending_next_dose: usize,
}

impl VaccinationStats {
    pub fn from_records(records: &[VaccinationRecord]) -> Self {
        Self {
            total: records.len(),
            pending_next_dose: records.iter().filter(|v| v.next_due_date.is_some()).count(),
        }
    }
}

/// Repository for vaccination operations.
pub struct VaccinationRepository<'a> {
    storage: &'a RecordStorage,
}

impl<'a> VaccinationRepository<'a> {
    pub fn new(storage: &'a RecordStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, vaccination_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().vaccination(vaccination_id))
    }

    pub fn get(&self, vaccination_id: &str) -> StorageResult<VaccinationRecord> {
        let path = self.storage.paths().vaccination(vaccination_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Vaccination {vaccination_id}")));
        }
        self.storage.read_json(path)
    }

    /// Create a record, enforcing one record per (user, type, dose).
    pub fn create(&self, vaccination: &VaccinationRecord) -> StorageResult<()> {
        vaccination.validate()?;
        if self.exists(&vaccination.id) {
            return Err(StorageError::AlreadyExists(format!(
                "Vaccination {}",
                vaccination.id
            )));
        }
        self.ensure_unique_dose(vaccination)?;
        self.storage
            .write_json(self.storage.paths().vaccination(&vaccination.id), vaccination)
    }

    pub fn update(&self, vaccination: &VaccinationRecord) -> StorageResult<()> {
        vaccination.validate()?;
        if !self.exists(&vaccination.id) {
            return Err(StorageError::NotFound(format!(
                "Vaccination {}",
                vaccination.id
            )));
        }
        self.ensure_unique_dose(vaccination)?;
        self.storage
            .write_json(self.storage.paths().vaccination(&vaccination.id), vaccination)
    }

    pub fn delete(&self, vaccination_id: &str) -> StorageResult<()> {
        if !self.exists(vaccination_id) {
            return Err(StorageError::NotFound(format!("Vaccination {vaccination_id}")));
        }
        self.storage
            .delete(self.storage.paths().vaccination(vaccination_id))
    }

    /// A user's vaccinations, most recent first.
    pub fn list_by_owner(&self, owner_user_id: &str) -> StorageResult<Vec<VaccinationRecord>> {
        let mut vaccinations: Vec<VaccinationRecord> = self
            .storage
            .read_all::<VaccinationRecord>(self.storage.paths().vaccinations_dir())?
            .into_iter()
            .filter(|v| v.owner_user_id == owner_user_id)
            .collect();
        vaccinations.sort_by(|a, b| b.vaccination_date.cmp(&a.vaccination_date));
        Ok(vaccinations)
    }

    fn ensure_unique_dose(&self, vaccination: &VaccinationRecord) -> StorageResult<()> {
        let duplicate = self
            .list_by_owner(&vaccination.owner_user_id)?
            .iter()
            .any(|v| v.id != vaccination.id && v.same_dose(vaccination));
        if duplicate {
            return Err(StorageError::AlreadyExists(format!(
                "{} dose {} is already recorded",
                vaccination.vaccine_type.label(),
                vaccination.dose_number
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::repository::test_support::{date, test_storage};

    fn sample(id: &str, vaccine_type: VaccineType, dose: u8) -> VaccinationRecord {
        VaccinationRecord {
            id: id.to_string(),
            owner_user_id: "user-1".to_string(),
            vaccine_type,
            dose_number: dose,
            vaccination_date: date("2024-03-01"),
            next_due_date: None,
            institution: "Community Health Center".to_string(),
            batch_number: "B-2024-001".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn dose_number_must_be_in_range() {
        assert!(sample("v", VaccineType::Flu, 1).validate().is_ok());
        assert!(sample("v", VaccineType::Flu, 10).validate().is_ok());
        for dose in [0, 11] {
            assert!(matches!(
                sample("v", VaccineType::Flu, dose).validate(),
                Err(StorageError::Validation(_))
            ));
        }
    }

    #[test]
    fn duplicate_dose_is_rejected() {
        let (_temp, storage) = test_storage();
        let repo = VaccinationRepository::new(&storage);

        repo.create(&sample("v1", VaccineType::Hpv, 1)).unwrap();
        assert!(matches!(
            repo.create(&sample("v2", VaccineType::Hpv, 1)),
            Err(StorageError::AlreadyExists(_))
        ));

        // Next dose, other vaccine and other user are all fine
        repo.create(&sample("v3", VaccineType::Hpv, 2)).unwrap();
        repo.create(&sample("v4", VaccineType::Covid, 1)).unwrap();
        let mut other_user = sample("v5", VaccineType::Hpv, 1);
        other_user.owner_user_id = "user-2".to_string();
        repo.create(&other_user).unwrap();
    }

    #[test]
    fn update_may_keep_its_own_dose_but_not_take_another() {
        let (_temp, storage) = test_storage();
        let repo = VaccinationRepository::new(&storage);

        let mut first = sample("v1", VaccineType::HepatitisB, 1);
        repo.create(&first).unwrap();
        repo.create(&sample("v2", VaccineType::HepatitisB, 2)).unwrap();

        first.batch_number = "B-2024-999".to_string();
        repo.update(&first).unwrap();

        first.dose_number = 2;
        assert!(matches!(repo.update(&first), Err(StorageError::AlreadyExists(_))));
    }

    #[test]
    fn statistics_count_pending_doses() {
        let mut a = sample("a", VaccineType::Covid, 1);
        a.next_due_date = Some(date("2024-09-01"));
        let b = sample("b", VaccineType::Covid, 2);
        assert_eq!(VaccinationStats::from_records(&[a, b]), VaccinationStats {
            total: 2,
            pending_next_dose: 1,
        });
    }

    #[test]
    fn vaccine_codes() {
        assert_eq!(serde_json::to_string(&VaccineType::HepatitisB).unwrap(), "\"HB\"");
        let cv: VaccineType = serde_json::from_str("\"CV\"").unwrap();
        assert_eq!(cv, VaccineType::Covid);
    }
}
