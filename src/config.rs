// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once, when the embedding
//! binary builds its [`AppState`](crate::state::AppState).
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root directory for records, audit log and media | `/data` |
//! | `MEDIA_URL` | Absolute base URL for attachment links | `http://localhost:8000/media/` |
//! | `FILE_ENCRYPTION_KEY` | URL-safe base64 of a 32-byte attachment key | Required |
//! | `JWT_SECRET` | HS256 secret for bearer-token verification | Optional |
//! | `JWT_ISSUER` | Expected JWT issuer claim | Optional |

use std::path::PathBuf;

use url::Url;

use crate::storage::{AttachmentKey, StoragePaths};

/// Environment variable name for the data directory path.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Environment variable name for the media base URL.
pub const MEDIA_URL_ENV: &str = "MEDIA_URL";

/// Environment variable name for the attachment encryption key.
///
/// Generate a value with `AttachmentKey::generate()?.encode()`.
pub const FILE_ENCRYPTION_KEY_ENV: &str = "FILE_ENCRYPTION_KEY";

/// Environment variable name for the JWT signing secret.
pub const JWT_SECRET_ENV: &str = "JWT_SECRET";

/// Environment variable name for the expected JWT issuer.
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";

pub const DEFAULT_MEDIA_URL: &str = "http://localhost:8000/media/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{FILE_ENCRYPTION_KEY_ENV} is not set")]
    MissingEncryptionKey,

    #[error("{FILE_ENCRYPTION_KEY_ENV} is invalid: {0}")]
    InvalidEncryptionKey(String),

    #[error("{MEDIA_URL_ENV} is not a valid absolute URL: {0}")]
    InvalidMediaUrl(String),
}

/// Validated process configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub media_url: Url,
    pub encryption_key: AttachmentKey,
    pub jwt_secret: Option<String>,
    pub jwt_issuer: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let encoded_key = get(FILE_ENCRYPTION_KEY_ENV).ok_or(ConfigError::MissingEncryptionKey)?;
        let encryption_key = AttachmentKey::parse(encoded_key.trim())
            .map_err(|e| ConfigError::InvalidEncryptionKey(e.to_string()))?;

        let raw_url = get(MEDIA_URL_ENV).unwrap_or_else(|| DEFAULT_MEDIA_URL.to_string());
        let media_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidMediaUrl(format!("{raw_url}: {e}")))?;
        if media_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidMediaUrl(raw_url));
        }

        let data_dir = get(DATA_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| StoragePaths::default().root().to_path_buf());

        Ok(Self {
            data_dir,
            media_url,
            encryption_key,
            jwt_secret: get(JWT_SECRET_ENV),
            jwt_issuer: get(JWT_ISSUER_ENV),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    fn key() -> String {
        AttachmentKey::from_bytes([7u8; 32]).encode()
    }

    #[test]
    fn missing_key_fails_fast() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEncryptionKey));

        let err = AppConfig::from_lookup(lookup(&[(FILE_ENCRYPTION_KEY_ENV, "  ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEncryptionKey));
    }

    #[test]
    fn invalid_key_is_rejected() {
        let err =
            AppConfig::from_lookup(lookup(&[(FILE_ENCRYPTION_KEY_ENV, "too-short")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEncryptionKey(_)));
    }

    #[test]
    fn defaults_apply() {
        let key = key();
        let config = AppConfig::from_lookup(lookup(&[(FILE_ENCRYPTION_KEY_ENV, &key)])).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/data"));
        assert_eq!(config.media_url.as_str(), DEFAULT_MEDIA_URL);
        assert!(config.jwt_secret.is_none());
        assert!(config.jwt_issuer.is_none());
    }

    #[test]
    fn explicit_values_are_used() {
        let key = key();
        let config = AppConfig::from_lookup(lookup(&[
            (FILE_ENCRYPTION_KEY_ENV, &key),
            (DATA_DIR_ENV, "/srv/vault"),
            (MEDIA_URL_ENV, "https://cdn.example.com/files/"),
            (JWT_SECRET_ENV, "s3cret"),
            (JWT_ISSUER_ENV, "https://auth.example.com"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/vault"));
        assert_eq!(config.media_url.host_str(), Some("cdn.example.com"));
        assert_eq!(config.jwt_secret.as_deref(), Some("s3cret"));
        assert_eq!(config.jwt_issuer.as_deref(), Some("https://auth.example.com"));
    }

    #[test]
    fn relative_media_url_is_rejected() {
        let key = key();
        let err = AppConfig::from_lookup(lookup(&[
            (FILE_ENCRYPTION_KEY_ENV, &key),
            (MEDIA_URL_ENV, "/media/"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidMediaUrl(_)));
    }
}
