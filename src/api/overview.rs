// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cross-record overview: totals, exam trends and recent activity.

use std::collections::BTreeMap;

use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    auth::Auth,
    error::ApiError,
    state::AppState,
    storage::{
        Department, MedicalRecord, MedicalRecordFilter, MedicalRecordRepository, MedicationRecord,
        MedicationRepository, MedicationStats, PhysicalExam, PhysicalExamRepository,
        PhysicalExamStats, RecordStorage, StorageResult, VaccinationRecord, VaccinationRepository,
        VaccinationStats,
    },
};

/// Records listed as "recent" per type.
pub const RECENT_PER_TYPE: usize = 5;
/// Entries returned by the activity feed.
pub const MAX_ACTIVITIES: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DepartmentCount {
    pub department: Department,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MedicalRecordOverview {
    pub total: usize,
    pub recent: Vec<MedicalRecord>,
    pub by_department: Vec<DepartmentCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MedicationOverview {
    pub total: usize,
    pub active: usize,
    pub recent: Vec<MedicationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VaccinationOverview {
    pub total: usize,
    pub pending_next_dose: usize,
    pub recent: Vec<VaccinationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PhysicalExamOverview {
    pub total: usize,
    /// Exams with at least one abnormal finding
    pub abnormal: usize,
    pub recent: Vec<PhysicalExam>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OverviewStatistics {
    pub medical_records: MedicalRecordOverview,
    pub medications: MedicationOverview,
    pub vaccinations: VaccinationOverview,
    pub physical_exams: PhysicalExamOverview,
}

/// Exam series in date order. All vectors have the same length.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct HealthTrends {
    pub dates: Vec<NaiveDate>,
    pub weight: Vec<f64>,
    pub systolic_pressure: Vec<Option<u16>>,
    pub diastolic_pressure: Vec<Option<u16>>,
    pub heart_rate: Vec<u16>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Medical,
    Medication,
    Vaccination,
    Physical,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct Activity {
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub date: NaiveDate,
    pub description: String,
    pub id: String,
}

struct Records {
    medical: Vec<MedicalRecord>,
    medications: Vec<MedicationRecord>,
    vaccinations: Vec<VaccinationRecord>,
    exams: Vec<PhysicalExam>,
}

/// Every record of the user, each list newest first.
fn load_records(storage: &RecordStorage, user_id: &str) -> StorageResult<Records> {
    Ok(Records {
        medical: MedicalRecordRepository::new(storage)
            .list_by_owner(user_id, &MedicalRecordFilter::default())?,
        medications: MedicationRepository::new(storage).list_by_owner(user_id)?,
        vaccinations: VaccinationRepository::new(storage).list_by_owner(user_id)?,
        exams: PhysicalExamRepository::new(storage).list_by_owner(user_id)?,
    })
}

fn recent<T: Clone>(items: &[T]) -> Vec<T> {
    items.iter().take(RECENT_PER_TYPE).cloned().collect()
}

fn statistics(records: &Records, today: NaiveDate) -> OverviewStatistics {
    let mut departments: BTreeMap<Department, usize> = BTreeMap::new();
    for record in &records.medical {
        *departments.entry(record.department).or_default() += 1;
    }

    let medication_stats = MedicationStats::from_records(&records.medications, today);
    let vaccination_stats = VaccinationStats::from_records(&records.vaccinations);
    let exam_stats = PhysicalExamStats::from_exams(&records.exams);

    OverviewStatistics {
        medical_records: MedicalRecordOverview {
            total: records.medical.len(),
            recent: recent(&records.medical),
            by_department: departments
                .into_iter()
                .map(|(department, count)| DepartmentCount { department, count })
                .collect(),
        },
        medications: MedicationOverview {
            total: medication_stats.total,
            active: medication_stats.active_medications,
            recent: recent(&records.medications),
        },
        vaccinations: VaccinationOverview {
            total: vaccination_stats.total,
            pending_next_dose: vaccination_stats.pending_next_dose,
            recent: recent(&records.vaccinations),
        },
        physical_exams: PhysicalExamOverview {
            total: exam_stats.total,
            abnormal: exam_stats.abnormal_count,
            recent: recent(&records.exams),
        },
    }
}

fn trends(exams: &[PhysicalExam]) -> HealthTrends {
    let mut trends = HealthTrends::default();
    for exam in exams.iter().rev() {
        let pressures = exam.pressures();
        trends.dates.push(exam.exam_date);
        trends.weight.push(exam.weight_kg);
        trends.systolic_pressure.push(pressures.map(|(s, _)| s));
        trends.diastolic_pressure.push(pressures.map(|(_, d)| d));
        trends.heart_rate.push(exam.heart_rate);
    }
    trends
}

fn activities(records: &Records) -> Vec<Activity> {
    let medical = records.medical.iter().take(RECENT_PER_TYPE).map(|r| Activity {
        kind: ActivityKind::Medical,
        date: r.visit_date,
        description: format!("Visited {} ({})", r.hospital, r.department.label()),
        id: r.id.clone(),
    });
    let medications = records.medications.iter().take(RECENT_PER_TYPE).map(|m| Activity {
        kind: ActivityKind::Medication,
        date: m.start_date,
        description: format!("Started taking {}", m.drug_name),
        id: m.id.clone(),
    });
    let vaccinations = records.vaccinations.iter().take(RECENT_PER_TYPE).map(|v| Activity {
        kind: ActivityKind::Vaccination,
        date: v.vaccination_date,
        description: format!("{} vaccine, dose {}", v.vaccine_type.label(), v.dose_number),
        id: v.id.clone(),
    });
    let exams = records.exams.iter().take(RECENT_PER_TYPE).map(|e| Activity {
        kind: ActivityKind::Physical,
        date: e.exam_date,
        description: "Physical exam".to_string(),
        id: e.id.clone(),
    });

    let mut activities: Vec<Activity> = medical
        .chain(medications)
        .chain(vaccinations)
        .chain(exams)
        .collect();
    // Stable: same-day entries keep type order
    activities.sort_by(|a, b| b.date.cmp(&a.date));
    activities.truncate(MAX_ACTIVITIES);
    activities
}

/// Totals and recent records across all record types.
#[utoipa::path(
    get,
    path = "/v1/overview/statistics",
    tag = "Overview",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Overview statistics", body = OverviewStatistics),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn overview_statistics(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<OverviewStatistics>, ApiError> {
    let storage = state.storage();
    let records = load_records(&storage, &user.user_id)?;
    Ok(Json(statistics(&records, Utc::now().date_naive())))
}

/// Weight, blood pressure and heart rate over time.
#[utoipa::path(
    get,
    path = "/v1/overview/health-trends",
    tag = "Overview",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Exam series, oldest first", body = HealthTrends),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn health_trends(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<HealthTrends>, ApiError> {
    let storage = state.storage();
    let exams = PhysicalExamRepository::new(&storage).list_by_owner(&user.user_id)?;
    Ok(Json(trends(&exams)))
}

#[utoipa::path(
    get,
    path = "/v1/overview/recent-activities",
    tag = "Overview",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Latest activities, newest first", body = Vec<Activity>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn recent_activities(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<Activity>>, ApiError> {
    let storage = state.storage();
    let records = load_records(&storage, &user.user_id)?;
    Ok(Json(activities(&records)))
}
