// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Health Vault - Personal Health Record Backend
//!
//! Stores medical records, medications, vaccinations and physical exams per
//! user, with attachments and exam reports encrypted at rest (AES-256-GCM).
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum) and the OpenAPI document
//! - `assessment` - Abnormal-value rules for physical exams
//! - `auth` - Bearer token authentication and roles
//! - `config` - Environment configuration
//! - `storage` - JSON record store and encrypted attachment store

pub mod api;
pub mod assessment;
pub mod auth;
pub mod config;
pub mod error;
pub mod state;
pub mod storage;
