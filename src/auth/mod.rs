// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Bearer-token authentication for the health vault API.
//!
//! ## Auth Flow
//!
//! 1. The login service issues an HS256 access token
//! 2. Clients send `Authorization: Bearer <token>`
//! 3. This service:
//!    - Verifies signature and expiry (issuer too, when configured)
//!    - Extracts:
//!      - `user_id` (or `sub`) → canonical user id
//!      - `is_staff` → [`Role::Staff`]
//!
//! Token issuance and refresh happen elsewhere.
//!
//! ## Security
//!
//! - All non-health endpoints require authentication
//! - Clock skew tolerance is 60 seconds
//! - Unverified decoding exists only in `dev` builds

pub mod claims;
pub mod error;
pub mod extractor;
pub mod roles;

pub use claims::{AuthenticatedUser, Claims};
pub use error::AuthError;
pub use extractor::{Auth, StaffOnly};
pub use roles::Role;
