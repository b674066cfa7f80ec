// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Family relationships between users.
//!
//! A relationship is created by `from_user_id` and becomes verified once
//! `to_user_id` confirms it. Verified relationships cannot be deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::profiles::ProfileRepository;
use super::super::{OwnedResource, RecordStorage, StorageError, StorageResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Parent,
    Child,
    Spouse,
    Sibling,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct FamilyRelationship {
    /// Unique relationship identifier (UUID)
    pub id: String,
    pub from_user_id: String,
    pub to_user_id: String,
    pub relation_type: RelationType,
    /// Set once the other party confirms
    #[serde(default)]
    pub verified: bool,
    pub created_at: DateTime<Utc>,
}

impl OwnedResource for FamilyRelationship {
    fn owner_user_id(&self) -> &str {
        &self.from_user_id
    }

    fn resource_kind(&self) -> &'static str {
        "family relationship"
    }
}

/// Repository for family relationship operations.
pub struct FamilyRepository<'a> {
    storage: &'a RecordStorage,
}

impl<'a> FamilyRepository<'a> {
    pub fn new(storage: &'a RecordStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, relationship_id: &str) -> bool {
        self.storage
            .exists(self.storage.paths().family_relationship(relationship_id))
    }

    pub fn get(&self, relationship_id: &str) -> StorageResult<FamilyRelationship> {
        let path = self.storage.paths().family_relationship(relationship_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!(
                "Family relationship {relationship_id}"
            )));
        }
        self.storage.read_json(path)
    }

    /// Create a relationship.
    ///
    /// The target user must have a profile. Self-relations, duplicates of
    /// (from, to, type) and the mirror of an existing relation with the same
    /// type are rejected.
    pub fn create(&self, relationship: &FamilyRelationship) -> StorageResult<()> {
        if relationship.from_user_id == relationship.to_user_id {
            return Err(StorageError::Validation(
                "cannot create a relationship with yourself".into(),
            ));
        }
        if !ProfileRepository::new(self.storage).exists(&relationship.to_user_id) {
            return Err(StorageError::Validation(format!(
                "user {} does not exist",
                relationship.to_user_id
            )));
        }
        if self.exists(&relationship.id) {
            return Err(StorageError::AlreadyExists(format!(
                "Family relationship {}",
                relationship.id
            )));
        }

        let all = self.list_all()?;
        let same_type = |r: &&FamilyRelationship| r.relation_type == relationship.relation_type;
        if all.iter().filter(same_type).any(|r| {
            r.from_user_id == relationship.from_user_id && r.to_user_id == relationship.to_user_id
        }) {
            return Err(StorageError::AlreadyExists(
                "this relationship already exists".into(),
            ));
        }
        if all.iter().filter(same_type).any(|r| {
            r.from_user_id == relationship.to_user_id && r.to_user_id == relationship.from_user_id
        }) {
            return Err(StorageError::Validation(
                "the reverse relationship already exists".into(),
            ));
        }

        self.storage.write_json(
            self.storage
                .paths()
                .family_relationship(&relationship.id),
            relationship,
        )
    }

    /// Confirm a relationship. Only the target user may verify.
    pub fn verify(&self, relationship_id: &str, user_id: &str) -> StorageResult<FamilyRelationship> {
        let mut relationship = self.get(relationship_id)?;
        if relationship.to_user_id != user_id {
            return Err(StorageError::PermissionDenied {
                user_id: user_id.to_string(),
                resource: "family relationship".to_string(),
            });
        }
        relationship.verified = true;
        self.storage.write_json(
            self.storage.paths().family_relationship(relationship_id),
            &relationship,
        )?;
        Ok(relationship)
    }

    pub fn delete(&self, relationship_id: &str) -> StorageResult<()> {
        let relationship = self.get(relationship_id)?;
        if relationship.verified {
            return Err(StorageError::Validation(
                "verified relationships cannot be deleted".into(),
            ));
        }
        self.storage
            .delete(self.storage.paths().family_relationship(relationship_id))
    }

    /// Relationships created by a user, newest first.
    pub fn list_by_from(&self, from_user_id: &str) -> StorageResult<Vec<FamilyRelationship>> {
        let mut relationships: Vec<FamilyRelationship> = self
            .list_all()?
            .into_iter()
            .filter(|r| r.from_user_id == from_user_id)
            .collect();
        relationships.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(relationships)
    }

    /// Relationships awaiting a user's confirmation.
    pub fn list_pending_for(&self, to_user_id: &str) -> StorageResult<Vec<FamilyRelationship>> {
        Ok(self
            .list_all()?
            .into_iter()
            .filter(|r| r.to_user_id == to_user_id && !r.verified)
            .collect())
    }

    fn list_all(&self) -> StorageResult<Vec<FamilyRelationship>> {
        self.storage
            .read_all(self.storage.paths().family_dir())
    }
}
