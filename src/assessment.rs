// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Rule-based flags for physical exam values.
//!
//! Thresholds:
//!
//! | Check | Moderate | Mild |
//! |-------|----------|------|
//! | Blood pressure | systolic > 140 or diastolic > 90 | systolic < 90 or diastolic < 60 |
//! | BMI | > 28 | > 24 |
//! | Fasting glucose (mmol/L) | > 6.1 | < 3.9 |
//! | Total cholesterol (mmol/L) | > 5.2 | |
//!
//! Each finding carries a position on the front-facing body map (percent
//! from top and left) so the frontend can place a marker.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::PhysicalExam;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Mild,
    Moderate,
}

/// Marker position on the body map, in percent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct BodyPosition {
    pub top: u8,
    pub left: u8,
}

const HEART: BodyPosition = BodyPosition { top: 35, left: 58 };
const ABDOMEN: BodyPosition = BodyPosition { top: 45, left: 50 };
const PANCREAS: BodyPosition = BodyPosition { top: 55, left: 45 };
const LIVER: BodyPosition = BodyPosition { top: 45, left: 68 };

/// One abnormal exam item.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Finding {
    pub name: String,
    pub severity: Severity,
    pub description: String,
    pub suggestion: String,
    pub position: BodyPosition,
}

impl Finding {
    fn new(
        name: &str,
        severity: Severity,
        description: String,
        suggestion: &str,
        position: BodyPosition,
    ) -> Self {
        Self {
            name: name.to_string(),
            severity,
            description,
            suggestion: suggestion.to_string(),
            position,
        }
    }
}

/// All abnormal findings for an exam, in a fixed order.
pub fn assess(exam: &PhysicalExam) -> Vec<Finding> {
    let mut findings = Vec::new();

    if let Some((systolic, diastolic)) = exam.pressures() {
        if systolic > 140 || diastolic > 90 {
            findings.push(Finding::new(
                "Hypertension",
                Severity::Moderate,
                format!(
                    "Blood pressure {} mmHg is high; normal is below 140/90 mmHg.",
                    exam.blood_pressure
                ),
                "Reduce salt intake, exercise regularly and follow up with cardiology.",
                HEART,
            ));
        } else if systolic < 90 || diastolic < 60 {
            findings.push(Finding::new(
                "Hypotension",
                Severity::Mild,
                format!(
                    "Blood pressure {} mmHg is low; normal is above 90/60 mmHg.",
                    exam.blood_pressure
                ),
                "Drink more fluids and seek care if dizziness occurs.",
                HEART,
            ));
        }
    }

    if let Some(bmi) = exam.bmi() {
        if bmi > 28.0 {
            findings.push(Finding::new(
                "Obesity",
                Severity::Moderate,
                format!("BMI is {bmi}, in the obese range."),
                "Control diet, increase exercise and consult a nutritionist.",
                ABDOMEN,
            ));
        } else if bmi > 24.0 {
            findings.push(Finding::new(
                "Overweight",
                Severity::Mild,
                format!("BMI is {bmi}, in the overweight range."),
                "Eat a balanced diet and exercise moderately.",
                ABDOMEN,
            ));
        }
    }

    // A non-positive lab value means "not recorded"
    if let Some(glucose) = exam.blood_glucose.filter(|v| *v > 0.0) {
        if glucose > 6.1 {
            findings.push(Finding::new(
                "High blood glucose",
                Severity::Moderate,
                format!("Fasting glucose is {glucose} mmol/L; normal is 3.9-6.1 mmol/L."),
                "Limit carbohydrate intake and follow up with endocrinology.",
                PANCREAS,
            ));
        } else if glucose < 3.9 {
            findings.push(Finding::new(
                "Low blood glucose",
                Severity::Mild,
                format!("Fasting glucose is {glucose} mmol/L; normal is 3.9-6.1 mmol/L."),
                "Eat regular meals and avoid fasting.",
                PANCREAS,
            ));
        }
    }

    if let Some(cholesterol) = exam.cholesterol.filter(|v| *v > 0.0) {
        if cholesterol > 5.2 {
            findings.push(Finding::new(
                "High cholesterol",
                Severity::Moderate,
                format!("Total cholesterol is {cholesterol} mmol/L; normal is below 5.2 mmol/L."),
                "Reduce fat intake, eat more fibre and follow up with cardiology.",
                LIVER,
            ));
        }
    }

    findings
}

/// Whole years between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> Option<u32> {
    if birth_date > today {
        return None;
    }
    let before_birthday = (today.month(), today.day()) < (birth_date.month(), birth_date.day());
    let years = today.year() - birth_date.year() - i32::from(before_birthday);
    u32::try_from(years).ok()
}
