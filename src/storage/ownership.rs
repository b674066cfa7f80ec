// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ownership enforcement for record access.
//!
//! Every record read or write passes an owner-or-staff check: the owning
//! user may touch the record, and so may any staff user. List endpoints do
//! not go through here; they filter by owner directly.

use crate::auth::AuthenticatedUser;

use super::{StorageError, StorageResult};

/// Trait for resources that have an owner.
pub trait OwnedResource {
    /// Get the owner's user ID.
    fn owner_user_id(&self) -> &str;

    /// Short resource label used in permission errors.
    fn resource_kind(&self) -> &'static str {
        "resource"
    }
}

/// Trait for enforcing ownership on storage operations.
pub trait OwnershipEnforcer {
    /// Verify that the user owns this resource or is staff.
    ///
    /// # Errors
    /// Returns `StorageError::PermissionDenied` otherwise.
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()>;
}

impl<T: OwnedResource> OwnershipEnforcer for T {
    fn verify_ownership(&self, user: &AuthenticatedUser) -> StorageResult<()> {
        if user.is_staff() || self.owner_user_id() == user.user_id {
            Ok(())
        } else {
            Err(StorageError::PermissionDenied {
                user_id: user.user_id.clone(),
                resource: self.resource_kind().to_string(),
            })
        }
    }
}

/// Ownership check on a lookup result.
pub trait OwnershipCheck<T> {
    /// Verify ownership and return the resource if authorized.
    fn verify_owner(self, user: &AuthenticatedUser) -> StorageResult<T>;
}

impl<T: OwnedResource> OwnershipCheck<T> for StorageResult<T> {
    fn verify_owner(self, user: &AuthenticatedUser) -> StorageResult<T> {
        let resource = self?;
        resource.verify_ownership(user)?;
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;

    struct TestResource {
        owner: String,
    }

    impl OwnedResource for TestResource {
        fn owner_user_id(&self) -> &str {
            &self.owner
        }

        fn resource_kind(&self) -> &'static str {
            "test record"
        }
    }

    fn make_user(user_id: &str, role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id: user_id.to_string(),
            role,
            session_id: None,
            issuer: "test".to_string(),
            expires_at: 0,
        }
    }

    fn resource(owner: &str) -> TestResource {
        TestResource {
            owner: owner.to_string(),
        }
    }

    #[test]
    fn ownership_verification_passes_for_owner() {
        let user = make_user("user_123", Role::Member);
        assert!(resource("user_123").verify_ownership(&user).is_ok());
    }

    #[test]
    fn ownership_verification_fails_for_non_owner() {
        let user = make_user("user_456", Role::Member);

        let result = resource("user_123").verify_ownership(&user);
        match result {
            Err(StorageError::PermissionDenied { user_id, resource }) => {
                assert_eq!(user_id, "user_456");
                assert_eq!(resource, "test record");
            }
            other => panic!("expected PermissionDenied, got {other:?}"),
        }
    }

    #[test]
    fn staff_may_access_any_record() {
        let staff = make_user("nurse_1", Role::Staff);
        assert!(resource("user_123").verify_ownership(&staff).is_ok());
    }

    #[test]
    fn ownership_check_on_result() {
        let owner = make_user("user_123", Role::Member);
        let stranger = make_user("user_999", Role::Member);

        let ok: StorageResult<TestResource> = Ok(resource("user_123"));
        assert!(ok.verify_owner(&owner).is_ok());

        let denied: StorageResult<TestResource> = Ok(resource("user_123"));
        assert!(matches!(
            denied.verify_owner(&stranger),
            Err(StorageError::PermissionDenied { .. })
        ));
    }

    #[test]
    fn ownership_check_keeps_lookup_errors() {
        let user = make_user("user_123", Role::Staff);
        let missing: StorageResult<TestResource> =
            Err(StorageError::NotFound("Medical record 1".to_string()));
        assert!(matches!(missing.verify_owner(&user), Err(StorageError::NotFound(_))));
    }
}
