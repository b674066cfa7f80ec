// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! AES-256-GCM sealing for attachment payloads.
//!
//! Payload format:
//!
//! ```text
//! version (1 byte) || nonce (12 bytes) || ciphertext || tag (16 bytes)
//! ```
//!
//! The physical key of the blob is bound as associated data, so a payload
//! copied to a different path fails authentication.

use base64ct::{Base64Url, Base64UrlUnpadded, Encoding};
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};

use super::{AttachmentError, AttachmentResult};

/// Current payload format version.
pub const FORMAT_VERSION: u8 = 1;

/// Length of the raw key in bytes.
pub const KEY_LEN: usize = 32;

/// GCM authentication tag length.
const TAG_LEN: usize = 16;

/// Bytes added to every plaintext (version + nonce + tag).
pub const PAYLOAD_OVERHEAD: usize = 1 + NONCE_LEN + TAG_LEN;

/// Raw 256-bit attachment key.
///
/// Parsed from the `FILE_ENCRYPTION_KEY` setting. The `Debug` impl never
/// prints key bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct AttachmentKey([u8; KEY_LEN]);

impl AttachmentKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }

    /// Parse a URL-safe base64 key (padded or unpadded).
    pub fn parse(encoded: &str) -> AttachmentResult<Self> {
        let encoded = encoded.trim();
        let decoded = Base64Url::decode_vec(encoded)
            .or_else(|_| Base64UrlUnpadded::decode_vec(encoded))
            .map_err(|_| AttachmentError::Crypto("key is not valid URL-safe base64".into()))?;

        let bytes: [u8; KEY_LEN] = decoded.try_into().map_err(|v: Vec<u8>| {
            AttachmentError::Crypto(format!(
                "key must decode to {KEY_LEN} bytes, got {}",
                v.len()
            ))
        })?;
        Ok(Self(bytes))
    }

    /// Generate a fresh random key.
    ///
    /// Blobs written under a generated key are lost when the key is, so
    /// callers outside tests must persist `encode()` somewhere durable.
    pub fn generate() -> AttachmentResult<Self> {
        let mut bytes = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|_| AttachmentError::Crypto("system random source failed".into()))?;
        Ok(Self(bytes))
    }

    /// Encode as padded URL-safe base64, the format `parse` expects.
    pub fn encode(&self) -> String {
        Base64Url::encode_string(&self.0)
    }
}

impl std::fmt::Debug for AttachmentKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AttachmentKey(<redacted>)")
    }
}

/// Seals and opens payloads with one process-wide key.
pub struct BlobCipher {
    key: LessSafeKey,
    rng: SystemRandom,
}

impl BlobCipher {
    /// Build a cipher from a key.
    pub fn new(key: &AttachmentKey) -> AttachmentResult<Self> {
        let unbound = UnboundKey::new(&AES_256_GCM, &key.0)
            .map_err(|_| AttachmentError::Crypto("invalid AES-256-GCM key".into()))?;
        Ok(Self {
            key: LessSafeKey::new(unbound),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt `plaintext`, binding it to `physical_key`.
    pub fn seal(&self, physical_key: &str, plaintext: &[u8]) -> AttachmentResult<Vec<u8>> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| AttachmentError::Crypto("nonce generation failed".into()))?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(physical_key.as_bytes()),
                &mut in_out,
            )
            .map_err(|_| AttachmentError::Crypto("encryption failed".into()))?;

        let mut payload = Vec::with_capacity(1 + NONCE_LEN + in_out.len());
        payload.push(FORMAT_VERSION);
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&in_out);
        Ok(payload)
    }

    /// Decrypt a payload produced by [`seal`](Self::seal) for the same key.
    pub fn open(&self, physical_key: &str, payload: &[u8]) -> AttachmentResult<Vec<u8>> {
        if payload.len() < PAYLOAD_OVERHEAD {
            return Err(AttachmentError::Crypto(format!(
                "payload too short ({} bytes)",
                payload.len()
            )));
        }
        let (version, rest) = payload.split_at(1);
        if version[0] != FORMAT_VERSION {
            return Err(AttachmentError::Crypto(format!(
                "unsupported payload version {}",
                version[0]
            )));
        }
        let (nonce_bytes, sealed) = rest.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
            .map_err(|_| AttachmentError::Crypto("malformed nonce".into()))?;

        let mut in_out = sealed.to_vec();
        let plaintext_len = self
            .key
            .open_in_place(nonce, Aad::from(physical_key.as_bytes()), &mut in_out)
            .map_err(|_| {
                AttachmentError::Crypto("authentication failed (wrong key or tampered payload)".into())
            })?
            .len();
        in_out.truncate(plaintext_len);
        Ok(in_out)
    }
}

impl std::fmt::Debug for BlobCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobCipher")
            .field("algorithm", &"AES-256-GCM")
            .finish()
    }
}
