// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::config::{AppConfig, ConfigError};
use crate::storage::{
    AttachmentError, EncryptedAttachmentStore, RecordStorage, StorageError, StoragePaths,
};

/// Bearer-token verification settings.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// HS256 secret. Without one, tokens are only accepted in development builds.
    pub jwt_secret: Option<String>,
    /// Expected issuer, checked when set.
    pub issuer: Option<String>,
}

// The secret never appears in logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("issuer", &self.issuer)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to initialize record storage: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to initialize attachment store: {0}")]
    Attachments(#[from] AttachmentError),
}

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<RecordStorage>,
    pub attachments: Arc<EncryptedAttachmentStore>,
    pub auth_config: AuthConfig,
}

impl AppState {
    pub fn new(storage: RecordStorage, attachments: EncryptedAttachmentStore) -> Self {
        Self {
            storage: Arc::new(storage),
            attachments: Arc::new(attachments),
            auth_config: AuthConfig::default(),
        }
    }

    pub fn with_auth_config(mut self, auth_config: AuthConfig) -> Self {
        self.auth_config = auth_config;
        self
    }

    /// Build the state from validated configuration, creating the data
    /// directory layout on first start.
    pub fn from_config(config: &AppConfig) -> Result<Self, StateError> {
        let mut storage = RecordStorage::new(StoragePaths::new(&config.data_dir));
        storage.initialize()?;

        let attachments = EncryptedAttachmentStore::new(
            storage.paths().media_dir(),
            &config.media_url,
            &config.encryption_key,
        )?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            media_url = %config.media_url,
            jwt_verification = config.jwt_secret.is_some(),
            "Application state initialized"
        );

        Ok(Self::new(storage, attachments).with_auth_config(AuthConfig {
            jwt_secret: config.jwt_secret.clone(),
            issuer: config.jwt_issuer.clone(),
        }))
    }

    pub fn storage(&self) -> Arc<RecordStorage> {
        Arc::clone(&self.storage)
    }
}
