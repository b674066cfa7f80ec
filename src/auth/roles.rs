// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User roles for authorization.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// User roles for authorization.
///
/// - `Staff` - Clinic/support staff, may read and modify any user's records
/// - `Member` - Normal user, may only access own records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Staff,
    /// Least privilege for authenticated users
    #[default]
    Member,
}

impl Role {
    /// Role carried by a token's `is_staff` claim.
    pub fn from_staff_flag(is_staff: bool) -> Self {
        if is_staff {
            Role::Staff
        } else {
            Role::Member
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Staff)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Staff => write!(f, "staff"),
            Role::Member => write!(f, "member"),
        }
    }
}
