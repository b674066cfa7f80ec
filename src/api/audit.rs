// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit trail queries.
//!
//! Members read their own trail; staff may read anyone's and look up the
//! history of a single resource.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    audit_log,
    auth::{Auth, StaffOnly},
    error::ApiError,
    state::AppState,
    storage::{audit::MAX_RANGE_DAYS, AuditEvent, AuditEventType, AuditRepository},
};

/// Default page size.
const DEFAULT_LIMIT: usize = 100;
/// Largest page size.
const MAX_LIMIT: usize = 1000;

/// Query parameters for audit event listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AuditQueryParams {
    /// First day (inclusive). Defaults to today.
    pub start_date: Option<NaiveDate>,
    /// Last day (inclusive). Defaults to today.
    pub end_date: Option<NaiveDate>,
    /// Whose events to list. Defaults to the caller; other users need staff.
    pub user_id: Option<String>,
    /// Event type, e.g. `attachment_downloaded`.
    pub event_type: Option<String>,
    /// Maximum number of results (default 100, at most 1000).
    pub limit: Option<usize>,
    /// Offset for pagination.
    pub offset: Option<usize>,
}

/// Query parameters for a resource history lookup.
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ResourceHistoryParams {
    /// Day to search. Defaults to today.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuditLogResponse {
    pub events: Vec<AuditEvent>,
    /// Matching events before limit/offset
    pub total: usize,
    pub has_more: bool,
}

/// List audit events for a user over a date range.
#[utoipa::path(
    get,
    path = "/v1/audit/events",
    tag = "Audit",
    security(("bearer_auth" = [])),
    params(AuditQueryParams),
    responses(
        (status = 200, description = "Audit events, oldest first", body = AuditLogResponse),
        (status = 400, description = "Inverted range or longer than 366 days"),
        (status = 403, description = "Only staff may read another user's events")
    )
)]
pub async fn query_audit_events(
    Auth(user): Auth,
    State(state): State<AppState>,
    Query(params): Query<AuditQueryParams>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let storage = state.storage();
    let target = params.user_id.unwrap_or_else(|| user.user_id.clone());

    if target != user.user_id && !user.is_staff() {
        let denied = AuditEvent::new(AuditEventType::PermissionDenied)
            .with_user(&user.user_id)
            .with_resource("audit_log", &target)
            .failed("audit events of another user");
        if let Err(e) = AuditRepository::new(&storage).log(&denied) {
            tracing::warn!(error = %e, "Failed to write audit event");
        }
        return Err(ApiError::forbidden("Only staff may read another user's audit events"));
    }

    let today = Utc::now().date_naive();
    let start = params.start_date.unwrap_or(today);
    let end = params.end_date.unwrap_or(today);
    if start > end {
        return Err(ApiError::bad_request("start_date must not be after end_date"));
    }
    if (end - start).num_days() >= MAX_RANGE_DAYS {
        return Err(ApiError::bad_request(format!(
            "date range may cover at most {MAX_RANGE_DAYS} days"
        )));
    }

    let mut events = AuditRepository::new(&storage).read_events_range(
        &start.format("%Y-%m-%d").to_string(),
        &end.format("%Y-%m-%d").to_string(),
    )?;
    events.retain(|e| e.user_id.as_deref() == Some(target.as_str()));
    if let Some(event_type) = params.event_type.as_deref() {
        events.retain(|e| e.event_type.as_str() == event_type);
    }

    let total = events.len();
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT);
    let offset = params.offset.unwrap_or(0);
    let has_more = offset.saturating_add(limit) < total;
    let events: Vec<AuditEvent> = events.into_iter().skip(offset).take(limit).collect();

    audit_log!(
        &storage,
        AuditEventType::AuditLogAccessed,
        &user,
        "audit_log",
        &target
    );

    Ok(Json(AuditLogResponse {
        events,
        total,
        has_more,
    }))
}

/// Every audited action on one resource during a day. Staff only.
#[utoipa::path(
    get,
    path = "/v1/audit/resources/{resource_type}/{resource_id}",
    tag = "Audit",
    security(("bearer_auth" = [])),
    params(
        ("resource_type" = String, Path, description = "Resource type, e.g. `physical_exam`"),
        ("resource_id" = String, Path, description = "Resource ID"),
        ResourceHistoryParams
    ),
    responses(
        (status = 200, description = "Events for the resource", body = AuditLogResponse),
        (status = 403, description = "Staff only")
    )
)]
pub async fn resource_history(
    StaffOnly(user): StaffOnly,
    State(state): State<AppState>,
    Path((resource_type, resource_id)): Path<(String, String)>,
    Query(params): Query<ResourceHistoryParams>,
) -> Result<Json<AuditLogResponse>, ApiError> {
    let storage = state.storage();
    let date = params
        .date
        .unwrap_or_else(|| Utc::now().date_naive())
        .format("%Y-%m-%d")
        .to_string();

    // No log file for the day means no events
    let events = if storage.exists(storage.paths().audit_events_file(&date)) {
        AuditRepository::new(&storage).search_by_resource(&resource_type, &resource_id, &date)?
    } else {
        Vec::new()
    };

    audit_log!(
        &storage,
        AuditEventType::AuditLogAccessed,
        &user,
        &resource_type,
        &resource_id
    );

    let total = events.len();
    Ok(Json(AuditLogResponse {
        events,
        total,
        has_more: false,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{member, staff};
    use crate::api::vaccinations::{create_vaccination, tests::dose};
    use crate::state::test_support::test_state;
    use crate::storage::VaccineType;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn members_read_their_own_trail() {
        let (state, _temp) = test_state();
        create_vaccination(
            Auth(member("alice")),
            State(state.clone()),
            Json(dose(VaccineType::Flu, 1)),
        )
        .await
        .unwrap();
        create_vaccination(
            Auth(member("bob")),
            State(state.clone()),
            Json(dose(VaccineType::Flu, 1)),
        )
        .await
        .unwrap();

        let Json(page) = query_audit_events(
            Auth(member("alice")),
            State(state.clone()),
            Query(AuditQueryParams::default()),
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.events[0].event_type, AuditEventType::VaccinationCreated);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn reading_another_users_trail_requires_staff() {
        let (state, _temp) = test_state();
        let params = || AuditQueryParams {
            user_id: Some("alice".to_string()),
            ..Default::default()
        };

        let err = query_audit_events(Auth(member("mallory")), State(state.clone()), Query(params()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        // The refusal itself is on mallory's trail
        let Json(page) = query_audit_events(
            Auth(member("mallory")),
            State(state.clone()),
            Query(AuditQueryParams {
                event_type: Some("permission_denied".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(page.total, 1);
        assert!(!page.events[0].success);

        query_audit_events(Auth(staff("auditor")), State(state.clone()), Query(params()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn inverted_range_is_rejected() {
        let (state, _temp) = test_state();
        let err = query_audit_events(
            Auth(member("alice")),
            State(state.clone()),
            Query(AuditQueryParams {
                start_date: NaiveDate::from_ymd_opt(2024, 3, 2),
                end_date: NaiveDate::from_ymd_opt(2024, 3, 1),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn overlong_range_is_rejected() {
        let (state, _temp) = test_state();
        let err = query_audit_events(
            Auth(member("alice")),
            State(state.clone()),
            Query(AuditQueryParams {
                start_date: NaiveDate::from_ymd_opt(1, 1, 1),
                end_date: NaiveDate::from_ymd_opt(9999, 12, 31),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn pagination_reports_more() {
        let (state, _temp) = test_state();
        for n in 1..=3 {
            create_vaccination(
                Auth(member("alice")),
                State(state.clone()),
                Json(dose(VaccineType::HepatitisB, n)),
            )
            .await
            .unwrap();
        }

        let Json(page) = query_audit_events(
            Auth(member("alice")),
            State(state.clone()),
            Query(AuditQueryParams {
                limit: Some(2),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.events.len(), 2);
        assert!(page.has_more);
    }

    #[tokio::test]
    async fn resource_history_finds_events() {
        let (state, _temp) = test_state();
        let (_, Json(created)) = create_vaccination(
            Auth(member("alice")),
            State(state.clone()),
            Json(dose(VaccineType::Covid, 1)),
        )
        .await
        .unwrap();

        let Json(history) = resource_history(
            StaffOnly(staff("auditor")),
            State(state.clone()),
            Path(("vaccination".to_string(), created.id)),
            Query(ResourceHistoryParams::default()),
        )
        .await
        .unwrap();
        assert_eq!(history.total, 1);
        assert_eq!(history.events[0].user_id.as_deref(), Some("alice"));

        let Json(empty) = resource_history(
            StaffOnly(staff("auditor")),
            State(state.clone()),
            Path(("vaccination".to_string(), "missing".to_string())),
            Query(ResourceHistoryParams {
                date: NaiveDate::from_ymd_opt(2020, 1, 1),
            }),
        )
        .await
        .unwrap();
        assert_eq!(empty.total, 0);
    }
}
