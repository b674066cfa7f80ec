// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Encrypted Attachment Store
//!
//! File storage for exam reports and medical-record attachments whose
//! on-disk representation is always ciphertext.
//!
//! ## Naming
//!
//! Callers work with **logical names** (`physical_exams/2024/03/report.pdf`).
//! Bytes live under the **physical key**, the logical name plus
//! `.encrypted`. Every operation accepts either form and normalises through
//! [`naming::logical_to_physical`] / [`naming::physical_to_logical`];
//! names and URLs handed back to callers never carry the suffix, except
//! the key returned by `save`, which is the physical key.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//!   physical_exams/{YYYY}/{MM}/{exam_id}/{name}.pdf.encrypted
//!   medical_records/{record_id}/{name}.encrypted
//! ```
//!
//! ## Behaviour
//!
//! - Whole payloads are read into memory and sealed with AES-256-GCM.
//! - `save` overwrites: concurrent writers to one name resolve as
//!   last-writer-wins. `save_available` claims its name with `create_new`
//!   and never shares a key between callers.
//! - No decrypted-content caching: every `open` re-reads and re-decrypts.
//! - Writes are not atomic. A half-written payload fails `open` with
//!   [`AttachmentError::Crypto`] and should be removed by an operator.
//! - This module does not log; callers map errors to responses.

pub mod cipher;
pub mod naming;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};

use ring::rand::{SecureRandom, SystemRandom};
use url::Url;

pub use cipher::{AttachmentKey, BlobCipher, PAYLOAD_OVERHEAD};
pub use naming::{logical_to_physical, physical_to_logical, ENCRYPTED_SUFFIX};

/// Length of the random suffix used to de-duplicate names.
const UNIQUE_SUFFIX_LEN: usize = 7;

const UNIQUE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Error type for attachment store operations.
#[derive(Debug, thiserror::Error)]
pub enum AttachmentError {
    /// Directory/file creation, read or write failure.
    #[error("attachment storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// Encryption or decryption failure (wrong key, tampered or truncated payload).
    #[error("attachment crypto error: {0}")]
    Crypto(String),

    /// No payload stored under the physical key.
    #[error("attachment not found: {0}")]
    NotFound(String),

    /// Name rejected before touching the filesystem.
    #[error("invalid attachment name {name:?}: {reason}")]
    InvalidName { name: String, reason: String },
}

/// Result type for attachment store operations.
pub type AttachmentResult<T> = Result<T, AttachmentError>;

/// Encrypted file store.
///
/// The key is fixed at construction and shared read-only by every request.
#[derive(Debug)]
pub struct EncryptedAttachmentStore {
    root: PathBuf,
    base_url: Url,
    cipher: BlobCipher,
}

impl EncryptedAttachmentStore {
    /// Create a store rooted at `root`, building URLs under `base_url`.
    ///
    /// `base_url` must be absolute; a missing trailing `/` is added so
    /// names are joined below it rather than replacing its last segment.
    pub fn new(
        root: impl AsRef<Path>,
        base_url: &Url,
        key: &AttachmentKey,
    ) -> AttachmentResult<Self> {
        let mut base_url = base_url.clone();
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self {
            root: root.as_ref().to_path_buf(),
            base_url,
            cipher: BlobCipher::new(key)?,
        })
    }

    /// Storage root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Physical path for a logical name or physical key.
    pub fn path(&self, name: &str) -> AttachmentResult<PathBuf> {
        naming::validate_name(name)?;
        Ok(self.root.join(logical_to_physical(name)))
    }

    /// Encrypt `content` and write it under `name`, overwriting any
    /// existing payload. Returns the physical key.
    pub fn save(&self, name: &str, mut content: impl Read) -> AttachmentResult<String> {
        naming::validate_name(name)?;
        let physical_key = logical_to_physical(name);

        let mut plaintext = Vec::new();
        content.read_to_end(&mut plaintext)?;
        let path = self.root.join(&physical_key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        self.write_sealed(File::create(&path)?, &physical_key, &plaintext)?;

        Ok(physical_key)
    }

    /// Encrypt `content` and write it under a free name derived from
    /// `name`. Returns the physical key.
    ///
    /// The target file is created with `create_new`, so two concurrent
    /// callers never end up sharing a key; the loser of a race picks
    /// another name.
    pub fn save_available(
        &self,
        name: &str,
        mut content: impl Read,
        max_length: Option<usize>,
    ) -> AttachmentResult<String> {
        let mut plaintext = Vec::new();
        content.read_to_end(&mut plaintext)?;

        loop {
            let candidate = self.available_name(name, max_length)?;
            let physical_key = logical_to_physical(&candidate);
            let path = self.root.join(&physical_key);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }

            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                // Claimed between the availability check and the open
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            if let Err(e) = self.write_sealed(file, &physical_key, &plaintext) {
                let _ = fs::remove_file(&path);
                return Err(e);
            }
            return Ok(physical_key);
        }
    }

    /// Read and decrypt the payload stored under `key`.
    ///
    /// Returns the plaintext as a reader positioned at the start.
    pub fn open(&self, key: &str) -> AttachmentResult<Cursor<Vec<u8>>> {
        naming::validate_name(key)?;
        let physical_key = logical_to_physical(key);

        let payload = match fs::read(self.root.join(&physical_key)) {
            Ok(payload) => payload,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(AttachmentError::NotFound(physical_key))
            }
            Err(e) => return Err(e.into()),
        };

        let plaintext = self.cipher.open(&physical_key, &payload)?;
        Ok(Cursor::new(plaintext))
    }

    /// Read and decrypt the whole payload into memory.
    pub fn read(&self, key: &str) -> AttachmentResult<Vec<u8>> {
        Ok(self.open(key)?.into_inner())
    }

    /// Check that a payload exists and authenticates, without returning it.
    pub fn verify(&self, key: &str) -> AttachmentResult<()> {
        self.open(key).map(|_| ())
    }

    /// Whether a payload exists for `name` (logical or physical form).
    pub fn exists(&self, name: &str) -> bool {
        match self.path(name) {
            Ok(path) => path.is_file(),
            Err(_) => false,
        }
    }

    /// Size in bytes of the encrypted payload on disk.
    ///
    /// This is the ciphertext size: plaintext length plus
    /// [`PAYLOAD_OVERHEAD`].
    pub fn size(&self, name: &str) -> AttachmentResult<u64> {
        let path = self.path(name)?;
        match fs::metadata(&path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AttachmentError::NotFound(logical_to_physical(name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the payload stored under `name`.
    pub fn delete(&self, name: &str) -> AttachmentResult<()> {
        let path = self.path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AttachmentError::NotFound(logical_to_physical(name)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Public URL for a stored payload, built from its logical name.
    pub fn url(&self, key: &str) -> AttachmentResult<String> {
        naming::validate_name(key)?;
        // `join` would treat these as query/fragment delimiters
        let logical = physical_to_logical(key)
            .replace('%', "%25")
            .replace('?', "%3F")
            .replace('#', "%23");
        let url = self
            .base_url
            .join(&logical)
            .map_err(|e| AttachmentError::InvalidName {
                name: key.to_string(),
                reason: format!("cannot build URL: {e}"),
            })?;
        Ok(url.to_string())
    }

    /// Return a logical name, derived from `name`, that is not in use.
    ///
    /// A trailing `.encrypted` is stripped first, so collision checks run
    /// against the logical identity. While the name is taken (or longer
    /// than `max_length`) a `_xxxxxxx` random suffix is appended to the
    /// file stem, truncating the stem to fit `max_length`.
    pub fn available_name(&self, name: &str, max_length: Option<usize>) -> AttachmentResult<String> {
        naming::validate_name(name)?;
        let logical = physical_to_logical(name);
        naming::validate_name(logical)?;

        let (dir, stem, ext) = naming::split_name(logical);
        let mut stem = stem.to_string();
        let mut candidate = logical.to_string();

        loop {
            let too_long = max_length.is_some_and(|max| candidate.len() > max);
            if !too_long && !self.exists(&candidate) {
                return Ok(candidate);
            }

            let suffix = self.random_suffix()?;
            candidate = format!("{dir}{stem}_{suffix}{ext}");

            if let Some(max) = max_length {
                let excess = candidate.len().saturating_sub(max);
                if excess > 0 {
                    stem = truncate_chars(&stem, stem.len().saturating_sub(excess));
                    if stem.is_empty() {
                        return Err(AttachmentError::InvalidName {
                            name: name.to_string(),
                            reason: format!("no available name fits within {max} characters"),
                        });
                    }
                    candidate = format!("{dir}{stem}_{suffix}{ext}");
                }
            }
        }
    }

    /// Round-trip a probe payload through the cipher and filesystem.
    pub fn health_check(&self) -> AttachmentResult<()> {
        let probe = ".health_check";
        let data = b"attachment_health_check";
        self.save(probe, &data[..])?;
        let read = self.read(probe);
        self.delete(probe)?;
        if read? != data {
            return Err(AttachmentError::Crypto("health check payload mismatch".into()));
        }
        Ok(())
    }

    fn write_sealed(&self, mut file: File, physical_key: &str, plaintext: &[u8]) -> AttachmentResult<()> {
        let payload = self.cipher.seal(physical_key, plaintext)?;
        file.write_all(&payload)?;
        file.flush()?;
        Ok(())
    }

    fn random_suffix(&self) -> AttachmentResult<String> {
        let mut bytes = [0u8; UNIQUE_SUFFIX_LEN];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| AttachmentError::Crypto("system random source failed".into()))?;
        Ok(bytes
            .iter()
            .map(|b| UNIQUE_ALPHABET[*b as usize % UNIQUE_ALPHABET.len()] as char)
            .collect())
    }
}

/// Truncate to at most `max_bytes` without splitting a UTF-8 character.
fn truncate_chars(s: &str, max_bytes: usize) -> String {
    let mut end = max_bytes.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    s[..end].to_string()
}
