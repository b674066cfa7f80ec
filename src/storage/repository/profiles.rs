// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User profile storage.
//!
//! Profiles are keyed by the authenticated user id. A user without a stored
//! profile is presented with an empty default one.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::super::{OwnedResource, RecordStorage, StorageError, StorageResult};

/// Accepted blood types. Empty means unknown.
pub const BLOOD_TYPES: [&str; 5] = ["", "A", "B", "AB", "O"];

pub const MAX_HOBBIES: usize = 10;
pub const MAX_HOBBY_LEN: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    /// One of `A`, `B`, `AB`, `O`, or empty
    #[serde(default)]
    pub blood_type: String,
    /// Comma-separated list
    #[serde(default)]
    pub hobbies: Option<String>,
    /// `name-relation-phone`
    #[serde(default)]
    pub emergency_contact: String,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn default_for(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
            email: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            phone: String::new(),
            birth_date: None,
            blood_type: String::new(),
            hobbies: None,
            emergency_contact: String::new(),
            updated_at: Utc::now(),
        }
    }

    /// Full name when set, username otherwise.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }

    pub fn validate(&self, today: NaiveDate) -> StorageResult<()> {
        if self.birth_date.is_some_and(|birth| birth > today) {
            return Err(StorageError::Validation(
                "birth_date must not be in the future".into(),
            ));
        }
        if !BLOOD_TYPES.contains(&self.blood_type.as_str()) {
            return Err(StorageError::Validation(
                "blood_type must be one of A, B, AB, O".into(),
            ));
        }
        if let Some(hobbies) = &self.hobbies {
            validate_hobbies(hobbies)?;
        }
        if !self.emergency_contact.is_empty() {
            validate_emergency_contact(&self.emergency_contact)?;
        }
        if !self.email.is_empty() && !looks_like_email(&self.email) {
            return Err(StorageError::Validation("email is not valid".into()));
        }
        Ok(())
    }
}

impl OwnedResource for UserProfile {
    fn owner_user_id(&self) -> &str {
        &self.user_id
    }

    fn resource_kind(&self) -> &'static str {
        "profile"
    }
}

fn validate_hobbies(hobbies: &str) -> StorageResult<()> {
    let items: Vec<&str> = hobbies
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .collect();
    if items.len() > MAX_HOBBIES {
        return Err(StorageError::Validation(format!(
            "at most {MAX_HOBBIES} hobbies are allowed"
        )));
    }
    if items.iter().any(|h| h.chars().count() > MAX_HOBBY_LEN) {
        return Err(StorageError::Validation(format!(
            "each hobby must be at most {MAX_HOBBY_LEN} characters"
        )));
    }
    Ok(())
}

fn is_cjk(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

fn is_cjk_word(s: &str) -> bool {
    let len = s.chars().count();
    (2..=10).contains(&len) && s.chars().all(is_cjk)
}

/// Mainland mobile number: 11 digits, `1` then `3`-`9`.
fn is_mobile_number(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 11
        && bytes.iter().all(u8::is_ascii_digit)
        && bytes[0] == b'1'
        && (b'3'..=b'9').contains(&bytes[1])
}

fn validate_emergency_contact(contact: &str) -> StorageResult<()> {
    let mut parts = contact.splitn(3, '-');
    let valid = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(relation), Some(phone)) => {
            is_cjk_word(name) && is_cjk_word(relation) && is_mobile_number(phone)
        }
        _ => false,
    };
    if !valid {
        return Err(StorageError::Validation(
            "emergency_contact must be formatted as name-relation-phone".into(),
        ));
    }
    Ok(())
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

/// Repository for profile operations.
pub struct ProfileRepository<'a> {
    storage: &'a RecordStorage,
}

impl<'a> ProfileRepository<'a> {
    pub fn new(storage: &'a RecordStorage) -> Self {
        Self { storage }
    }

    pub fn exists(&self, user_id: &str) -> bool {
        self.storage.exists(self.storage.paths().profile(user_id))
    }

    pub fn get(&self, user_id: &str) -> StorageResult<UserProfile> {
        let path = self.storage.paths().profile(user_id);
        if !self.storage.exists(&path) {
            return Err(StorageError::NotFound(format!("Profile {user_id}")));
        }
        self.storage.read_json(path)
    }

    /// Stored profile, or an empty one for users who never saved theirs.
    pub fn get_or_default(&self, user_id: &str) -> StorageResult<UserProfile> {
        match self.get(user_id) {
            Ok(profile) => Ok(profile),
            Err(StorageError::NotFound(_)) => Ok(UserProfile::default_for(user_id)),
            Err(e) => Err(e),
        }
    }

    /// Validate and store, replacing any previous profile.
    pub fn upsert(&self, profile: &UserProfile, today: NaiveDate) -> StorageResult<()> {
        profile.validate(today)?;
        self.storage
            .write_json(self.storage.paths().profile(&profile.user_id), profile)
    }
}
