// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP handlers (Axum) and the OpenAPI document.
//!
//! Handlers take `State<AppState>` and are mounted by the embedding
//! service. Upload handlers (`attachments::upload_attachment`,
//! `exams::upload_report`) need `DefaultBodyLimit::max(upload::UPLOAD_BODY_LIMIT)`.

use utoipa::OpenApi;

use crate::{
    assessment::{BodyPosition, Finding, Severity},
    auth::Role,
    storage::{
        AuditEvent, AuditEventType, Department, FamilyRelationship, Frequency, MedicalRecord,
        MedicalRecordStats, MedicationRecord, MedicationStats, PhysicalExam, PhysicalExamStats,
        RelationType, UserProfile, VaccinationRecord, VaccinationStats, VaccineType,
    },
};

pub mod attachments;
pub mod audit;
pub mod exams;
pub mod family;
pub mod health;
pub mod medical;
pub mod medications;
pub mod overview;
pub mod upload;
pub mod users;
pub mod vaccinations;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        users::me,
        users::get_profile,
        users::update_profile,
        family::list_family_relations,
        family::list_pending_family_relations,
        family::create_family_relation,
        family::verify_family_relation,
        family::delete_family_relation,
        medical::create_medical_record,
        medical::list_medical_records,
        medical::get_medical_record,
        medical::update_medical_record,
        medical::delete_medical_record,
        medical::medical_record_statistics,
        attachments::upload_attachment,
        attachments::list_attachments,
        attachments::download_attachment,
        attachments::delete_attachment,
        medications::create_medication,
        medications::list_medications,
        medications::get_medication,
        medications::update_medication,
        medications::delete_medication,
        medications::medication_statistics,
        vaccinations::create_vaccination,
        vaccinations::list_vaccinations,
        vaccinations::get_vaccination,
        vaccinations::update_vaccination,
        vaccinations::delete_vaccination,
        vaccinations::vaccination_statistics,
        exams::create_exam,
        exams::list_exams,
        exams::get_exam,
        exams::update_exam,
        exams::delete_exam,
        exams::latest_exam,
        exams::exam_statistics,
        exams::exam_report,
        exams::upload_report,
        exams::download_report,
        overview::overview_statistics,
        overview::health_trends,
        overview::recent_activities,
        audit::query_audit_events,
        audit::resource_history
    ),
    components(
        schemas(
            Role,
            UserProfile,
            FamilyRelationship,
            RelationType,
            MedicalRecord,
            Department,
            MedicalRecordStats,
            MedicationRecord,
            Frequency,
            MedicationStats,
            VaccinationRecord,
            VaccineType,
            VaccinationStats,
            PhysicalExam,
            PhysicalExamStats,
            Finding,
            Severity,
            BodyPosition,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            users::MeResponse,
            users::UpdateProfileRequest,
            family::CreateFamilyRelationRequest,
            family::FamilyRelationListResponse,
            medical::MedicalRecordRequest,
            medical::MedicalRecordListResponse,
            medical::DeleteMedicalRecordResponse,
            attachments::AttachmentResponse,
            attachments::AttachmentListResponse,
            medications::MedicationRequest,
            medications::MedicationResponse,
            medications::MedicationListResponse,
            vaccinations::VaccinationRequest,
            vaccinations::VaccinationListResponse,
            exams::PhysicalExamRequest,
            exams::PhysicalExamResponse,
            exams::PhysicalExamListResponse,
            exams::ExamSubject,
            exams::ExamReport,
            overview::OverviewStatistics,
            overview::MedicalRecordOverview,
            overview::MedicationOverview,
            overview::VaccinationOverview,
            overview::PhysicalExamOverview,
            overview::DepartmentCount,
            overview::HealthTrends,
            overview::Activity,
            overview::ActivityKind,
            audit::AuditLogResponse,
            AuditEvent,
            AuditEventType
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Users", description = "Current user and profile"),
        (name = "Family", description = "Family relationships"),
        (name = "Medical Records", description = "Hospital visits"),
        (name = "Attachments", description = "Encrypted medical record attachments"),
        (name = "Medications", description = "Medication schedules"),
        (name = "Vaccinations", description = "Vaccination history"),
        (name = "Physical Exams", description = "Exam values, reports and assessments"),
        (name = "Overview", description = "Cross-record statistics and trends"),
        (name = "Audit", description = "Audit trail queries")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::auth::{AuthenticatedUser, Role};

    fn user(user_id: &str, role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: user_id.to_string(),
            role,
            session_id: None,
            issuer: String::new(),
            expires_at: 0,
        }
    }

    pub fn member(user_id: &str) -> AuthenticatedUser {
        user(user_id, Role::Member)
    }

    pub fn staff(user_id: &str) -> AuthenticatedUser {
        user(user_id, Role::Staff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_every_resource() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/v1/users/me/profile",
            "/v1/family/{relationship_id}/verify",
            "/v1/medical-records/{record_id}/attachments",
            "/v1/attachments/{attachment_id}/download",
            "/v1/medications/statistics",
            "/v1/vaccinations/{vaccination_id}",
            "/v1/physical-exams/{exam_id}/report-pdf",
            "/v1/overview/recent-activities",
            "/v1/audit/resources/{resource_type}/{resource_id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn upload_paths_document_multipart_bodies() {
        let json = ApiDoc::openapi().to_json().unwrap();
        assert!(json.contains("multipart/form-data"));
    }
}
