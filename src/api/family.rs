// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Family relationship endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    audit_log,
    auth::Auth,
    error::ApiError,
    state::AppState,
    storage::{AuditEventType, FamilyRelationship, FamilyRepository, OwnershipCheck, RelationType},
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateFamilyRelationRequest {
    /// User being added as a relative
    pub to_user_id: String,
    pub relation_type: RelationType,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FamilyRelationListResponse {
    pub relationships: Vec<FamilyRelationship>,
    pub total: usize,
}

/// Add a relative. The caller is always the `from` side.
#[utoipa::path(
    post,
    path = "/v1/family",
    tag = "Family",
    security(("bearer_auth" = [])),
    request_body = CreateFamilyRelationRequest,
    responses(
        (status = 201, description = "Relationship created", body = FamilyRelationship),
        (status = 400, description = "Self relation, unknown user or reverse duplicate"),
        (status = 409, description = "Relationship already exists")
    )
)]
pub async fn create_family_relation(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreateFamilyRelationRequest>,
) -> Result<(StatusCode, Json<FamilyRelationship>), ApiError> {
    let storage = state.storage();
    let relationship = FamilyRelationship {
        id: uuid::Uuid::new_v4().to_string(),
        from_user_id: user.user_id.clone(),
        to_user_id: request.to_user_id,
        relation_type: request.relation_type,
        verified: false,
        created_at: Utc::now(),
    };

    FamilyRepository::new(&storage).create(&relationship)?;

    audit_log!(
        &storage,
        AuditEventType::FamilyRelationCreated,
        &user,
        "family_relationship",
        &relationship.id,
        serde_json::json!({ "to_user_id": relationship.to_user_id })
    );

    Ok((StatusCode::CREATED, Json(relationship)))
}

/// Relationships the caller created, newest first.
#[utoipa::path(
    get,
    path = "/v1/family",
    tag = "Family",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Relationships", body = FamilyRelationListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_family_relations(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<FamilyRelationListResponse>, ApiError> {
    let storage = state.storage();
    let relationships = FamilyRepository::new(&storage).list_by_from(&user.user_id)?;
    let total = relationships.len();
    Ok(Json(FamilyRelationListResponse {
        relationships,
        total,
    }))
}

/// Relationships other users created that await the caller's confirmation.
#[utoipa::path(
    get,
    path = "/v1/family/pending",
    tag = "Family",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending relationships", body = FamilyRelationListResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_pending_family_relations(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<FamilyRelationListResponse>, ApiError> {
    let storage = state.storage();
    let relationships = FamilyRepository::new(&storage).list_pending_for(&user.user_id)?;
    let total = relationships.len();
    Ok(Json(FamilyRelationListResponse {
        relationships,
        total,
    }))
}

#[utoipa::path(
    post,
    path = "/v1/family/{relationship_id}/verify",
    tag = "Family",
    security(("bearer_auth" = [])),
    params(("relationship_id" = String, Path, description = "Relationship ID")),
    responses(
        (status = 200, description = "Relationship verified", body = FamilyRelationship),
        (status = 403, description = "Only the added relative can verify"),
        (status = 404, description = "Relationship not found")
    )
)]
pub async fn verify_family_relation(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(relationship_id): Path<String>,
) -> Result<Json<FamilyRelationship>, ApiError> {
    let storage = state.storage();
    let relationship = FamilyRepository::new(&storage).verify(&relationship_id, &user.user_id)?;

    audit_log!(
        &storage,
        AuditEventType::FamilyRelationVerified,
        &user,
        "family_relationship",
        &relationship_id
    );

    Ok(Json(relationship))
}

#[utoipa::path(
    delete,
    path = "/v1/family/{relationship_id}",
    tag = "Family",
    security(("bearer_auth" = [])),
    params(("relationship_id" = String, Path, description = "Relationship ID")),
    responses(
        (status = 204, description = "Relationship deleted"),
        (status = 400, description = "Verified relationships cannot be deleted"),
        (status = 403, description = "Forbidden - not your relationship"),
        (status = 404, description = "Relationship not found")
    )
)]
pub async fn delete_family_relation(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(relationship_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let storage = state.storage();
    let repo = FamilyRepository::new(&storage);
    repo.get(&relationship_id).verify_owner(&user)?;
    repo.delete(&relationship_id)?;

    audit_log!(
        &storage,
        AuditEventType::FamilyRelationDeleted,
        &user,
        "family_relationship",
        &relationship_id
    );

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::member;
    use crate::state::test_support::test_state;
    use crate::storage::{ProfileRepository, UserProfile};

    fn with_profiles(state: &AppState, users: &[&str]) {
        let storage = state.storage();
        let repo = ProfileRepository::new(&storage);
        for user in users {
            repo.upsert(&UserProfile::default_for(user), Utc::now().date_naive())
                .unwrap();
        }
    }

    fn add(to: &str, relation_type: RelationType) -> Json<CreateFamilyRelationRequest> {
        Json(CreateFamilyRelationRequest {
            to_user_id: to.to_string(),
            relation_type,
        })
    }

    #[tokio::test]
    async fn create_and_list_from_caller() {
        let (state, _temp) = test_state();
        with_profiles(&state, &["alice", "bob"]);

        let (status, Json(created)) = create_family_relation(
            Auth(member("alice")),
            State(state.clone()),
            add("bob", RelationType::Spouse),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created.from_user_id, "alice");
        assert!(!created.verified);

        let Json(list) = list_family_relations(Auth(member("alice")), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(list.total, 1);
        let Json(list) = list_family_relations(Auth(member("bob")), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(list.total, 0);
    }

    #[tokio::test]
    async fn invalid_relations_are_rejected() {
        let (state, _temp) = test_state();
        with_profiles(&state, &["alice", "bob"]);

        let err = create_family_relation(
            Auth(member("alice")),
            State(state.clone()),
            add("alice", RelationType::Other),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = create_family_relation(
            Auth(member("alice")),
            State(state.clone()),
            add("ghost", RelationType::Sibling),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        create_family_relation(
            Auth(member("alice")),
            State(state.clone()),
            add("bob", RelationType::Sibling),
        )
        .await
        .unwrap();
        let err = create_family_relation(
            Auth(member("alice")),
            State(state.clone()),
            add("bob", RelationType::Sibling),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let err = create_family_relation(
            Auth(member("bob")),
            State(state.clone()),
            add("alice", RelationType::Sibling),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn verified_relation_cannot_be_deleted() {
        let (state, _temp) = test_state();
        with_profiles(&state, &["alice", "bob"]);
        let (_, Json(created)) = create_family_relation(
            Auth(member("alice")),
            State(state.clone()),
            add("bob", RelationType::Child),
        )
        .await
        .unwrap();

        let Json(pending) = list_pending_family_relations(Auth(member("bob")), State(state.clone()))
            .await
            .unwrap();
        assert_eq!(pending.total, 1);

        let err = verify_family_relation(
            Auth(member("alice")),
            State(state.clone()),
            Path(created.id.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let Json(verified) = verify_family_relation(
            Auth(member("bob")),
            State(state.clone()),
            Path(created.id.clone()),
        )
        .await
        .unwrap();
        assert!(verified.verified);

        let err = delete_family_relation(
            Auth(member("alice")),
            State(state.clone()),
            Path(created.id.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn only_creator_deletes_pending_relation() {
        let (state, _temp) = test_state();
        with_profiles(&state, &["alice", "bob"]);
        let (_, Json(created)) = create_family_relation(
            Auth(member("alice")),
            State(state.clone()),
            add("bob", RelationType::Parent),
        )
        .await
        .unwrap();

        let err = delete_family_relation(
            Auth(member("bob")),
            State(state.clone()),
            Path(created.id.clone()),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let status = delete_family_relation(
            Auth(member("alice")),
            State(state.clone()),
            Path(created.id),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
