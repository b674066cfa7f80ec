// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Physical exam results.
//!
//! The optional PDF report lives in the encrypted attachment store under
//! `physical_exams/{YYYY}/{MM}/{exam_id}/`; the exam document keeps its physical key.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{OwnedResource, RecordStorage, StorageError, StorageResult};

/// Accepted systolic range (mmHg).
pub const SYSTOLIC_RANGE: std::ops::RangeInclusive<u16> = 60..=200;
/// Accepted diastolic range (mmHg).
pub const DIASTOLIC_RANGE: std::ops::RangeInclusive<u16> = 40..=120;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PhysicalExam {
    /// Unique exam identifier (UUID)
    pub id: String,
    pub owner_user_id: String,
    pub exam_date: NaiveDate,
    pub height_cm: f64,
    pub weight_kg: f64,
    /// `systolic/diastolic`, e.g. `120/80`
    pub blood_pressure: String,
    /// Beats per minute
    pub heart_rate: u16,
    /// Fasting glucose (mmol/L)
    #[serde(default)]
    pub blood_glucose: Option<f64>,
    /// Total cholesterol (mmol/L)
    #[serde(default)]
    pub cholesterol: Option<f64>,
    /// Physical key of the encrypted PDF report
    #[serde(default)]
    pub report_key: Option<String>,
    /// Original report file name
    #[serde(default)]
    pub report_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parse `"systolic/diastolic"` into integers, checking both ranges.
pub fn parse_blood_pressure(value: &str) -> Result<(u16, u16), String> {
    let (systolic, diastolic) = value
        .split_once('/')
        .ok_or_else(|| "blood_pressure must be formatted as 'systolic/diastolic'".to_string())?;
    let systolic: u16 = systolic
        .trim()
        .parse()
        .map_err(|_| "blood pressure values must be integers".to_string())?;
    let diastolic: u16 = diastolic
        .trim()
        .parse()
        .map_err(|_| "blood pressure values must be integers".to_string())?;
    if !SYSTOLIC_RANGE.contains(&systolic) || !DIASTOLIC_RANGE.contains(&diastolic) {
        return Err("blood pressure values are out of range".to_string());
    }
    Ok((systolic, diastolic))
}

impl PhysicalExam {
    pub fn validate(&self, today: NaiveDate) -> StorageResult<()> {
        if self.exam_date > today {
            return Err(StorageError::Validation(
                "exam_date must not be in the future".into(),
            ));
        }
        if !(self.height_cm.is_finite() && self.height_cm > 0.0 && self.height_cm < 1000.0) {
            return Err(StorageError::Validation("height_cm is out of range".into()));
        }
        if !(self.weight_kg.is_finite() && self.weight_kg > 0.0 && self.weight_kg < 1000.0) {
            return Err(StorageError::Validation("weight_kg is out of range".into()));
        }
        parse_blood_pressure(&self.blood_pressure).map_err(StorageError::Validation)?;
        for (field, value) in [
            ("blood_glucose", self.blood_glucose),
            ("cholesterol", self.cholesterol),
        ] {
            if value.is_some_and(|v| !(v.is_finite() && v > 0.0)) {
                return Err(StorageError::Validation(format!("{field} must be positive")));
            }
        }
        Ok(())
    }

    /// Body mass index rounded to one decimal.
    pub fn bmi(&self) -> Option<f64> {
        if self.height_cm <= 0.0 || self.weight_kg <= 0.0 {
            return None;
        }
        let meters = self.height_cm / 100.0;
        Some((self.weight_kg / (meters * meters) * 10.0).round() / 10.0)
    }

    /// Systolic and diastolic pressure, if the stored value parses.
    pub fn pressures(&self) -> Option<(u16, u16)> {
        parse_blood_pressure(&self.blood_pressure).ok()
    }
}

impl OwnedResource for PhysicalExam {
    fn owner_user_id(&self) -> &str {
        &self.owner_user_id
    }

    fn resource_kind(&self) -> &'static str {
        "physical exam"
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PhysicalExamStats {
    pub total: usize,
    /// Exams with at least one abnormal finding
    pub abnormal_count: usize,
}

impl PhysicalExamStats {
    pub fn from_exams(exams: &[PhysicalExam]) -> Self {
        Self {
            total: exams.len(),
            abnormal_count: exams
                .iter()
                .filter(|e| !crate::assessment::assess(e).is_empty())
                .count(),
        }
    }
}

/// Repository for physical exam operations.
pub struct PhysicalExamRepository<'a> {
    storage: &'a RecordStorage,
}

impl<'a> PhysicalExamRepository<'a> {
    pub fn new(storage: &'a RecordStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, exam_id: &str) -> bool {
        self.storage.exists(self.storage.paths().physical_exam(exam_id))
    }

    pub fn get(&self, exam_id: &str) -> StorageResult<PhysicalExam> {
        let path = self.storage.paths().physical_exam(exam_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Physical exam {exam_id}")));
        }
        self.storage.read_json(path)
    }

    pub fn create(&self, exam: &PhysicalExam, today: NaiveDate) -> StorageResult<()> {
        exam.validate(today)?;
        if self.exists(&exam.id) {
            return Err(StorageError::AlreadyExists(format!("Physical exam {}", exam.id)));
        }
        self.storage
            .write_json(self.storage.paths().physical_exam(&exam.id), exam)
    }

    pub fn update(&self, exam: &PhysicalExam, today: NaiveDate) -> StorageResult<()> {
        exam.validate(today)?;
        if !self.exists(&exam.id) {
            return Err(StorageError::NotFound(format!("Physical exam {}", exam.id)));
        }
        self.storage
            .write_json(self.storage.paths().physical_exam(&exam.id), exam)
    }

    pub fn delete(&self, exam_id: &str) -> StorageResult<()> {
        if !self.exists(exam_id) {
            return Err(StorageError::NotFound(format!("Physical exam {exam_id}")));
        }
        self.storage.delete(self.storage.paths().physical_exam(exam_id))
    }

    /// A user's exams, most recent exam date first.
    pub fn list_by_owner(&self, owner_user_id: &str) -> StorageResult<Vec<PhysicalExam>> {
        let mut exams: Vec<PhysicalExam> = self
            .storage
            .read_all::<PhysicalExam>(self.storage.paths().physical_exams_dir())?
            .into_iter()
            .filter(|e| e.owner_user_id == owner_user_id)
            .collect();
        exams.sort_by(|a, b| {
            b.exam_date
                .cmp(&a.exam_date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        Ok(exams)
    }

    /// The user's most recent exam.
    pub fn latest(&self, owner_user_id: &str) -> StorageResult<PhysicalExam> {
        self.list_by_owner(owner_user_id)?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::NotFound("No physical exams recorded".to_string()))
    }
}
