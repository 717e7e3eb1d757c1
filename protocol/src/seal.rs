//! # Sealed Payloads
//!
//! Hides a record's detail (courses, marks) behind AES-256-GCM under a key
//! that anyone holding the student's seat number can rederive:
//!
//! ```text
//! key = SHA-256(trim(seat_number))
//! ```
//!
//! No key is ever stored or exchanged. This is a low-assurance scheme: the
//! seat number is the password, and seat numbers are short and often
//! guessable. It is also what every sealed note on the ledger was produced
//! with, so a stronger KDF would make all of them unreadable. Don't swap it
//! without a versioned envelope and a migration story.
//!
//! ## Failure modes
//!
//! [`unseal`] reports [`SealError::Decryption`] when the envelope is malformed,
//! the GCM tag does not verify (wrong seat number, tampering) or the plaintext
//! is not the expected JSON. [`unseal_record`] additionally compares the seat
//! number embedded in the decrypted record with the one supplied and reports
//! [`SealError::IdentifierMismatch`] when they differ, so callers can tell
//! "wrong key" apart from "wrong record".

use std::fmt;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::config::AES_KEY_LENGTH;
use crate::crypto::encryption::{self, EncryptionError};
use crate::crypto::hash::{b64_decode, b64_encode, sha256_array};
use crate::record::{identifiers_match, RecordError, SealedRecord};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a sealed payload could not be opened.
#[derive(Debug, Error)]
pub enum DecryptionError {
    /// The iv or ciphertext is not valid base64, or has the wrong shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// GCM authentication failed: wrong identifier or modified ciphertext.
    #[error("authentication failed -- wrong identifier or tampered ciphertext")]
    Authentication,

    /// The tag verified but the plaintext is not the expected JSON document.
    #[error("decrypted payload is not a valid record: {0}")]
    InvalidPlaintext(String),
}

/// Errors from sealing or unsealing a payload.
#[derive(Debug, Error)]
pub enum SealError {
    #[error("decryption failed: {0}")]
    Decryption(#[from] DecryptionError),

    /// Decryption succeeded but the record belongs to a different student.
    #[error("identifier mismatch: payload was issued to a different student")]
    IdentifierMismatch,

    #[error("record rejected: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("failed to serialize record: {0}")]
    Serialization(String),

    #[error("encryption failed: {0}")]
    Encryption(EncryptionError),
}

impl SealError {
    /// True for failures a verifier should present as "wrong key".
    pub fn is_decryption(&self) -> bool {
        matches!(self, Self::Decryption(_))
    }
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// A 256-bit AES key derived from a student identifier.
#[derive(Clone, PartialEq, Eq)]
pub struct SymmetricKey([u8; AES_KEY_LENGTH]);

impl SymmetricKey {
    pub fn as_bytes(&self) -> &[u8; AES_KEY_LENGTH] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

/// SHA-256 of the trimmed identifier, used directly as the AES-256 key.
///
/// Case is preserved: `"2021-cs-01"` and `"2021-CS-01"` are different keys.
pub fn derive_key(identifier: &str) -> SymmetricKey {
    SymmetricKey(sha256_array(identifier.trim().as_bytes()))
}

// ---------------------------------------------------------------------------
// SealedPayload
// ---------------------------------------------------------------------------

/// IV and ciphertext (tag appended), both standard base64.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    pub iv: String,
    pub ciphertext: String,
}

/// Serializes `record` to JSON and encrypts it under the key derived from
/// `identifier`, with a fresh random IV.
pub fn seal<T: Serialize + ?Sized>(record: &T, identifier: &str) -> Result<SealedPayload, SealError> {
    let plaintext =
        serde_json::to_vec(record).map_err(|e| SealError::Serialization(e.to_string()))?;
    let key = derive_key(identifier);
    let (iv, ciphertext) =
        encryption::encrypt(key.as_bytes(), &plaintext).map_err(SealError::Encryption)?;

    tracing::debug!(plaintext_len = plaintext.len(), "sealed payload");

    Ok(SealedPayload {
        iv: b64_encode(iv),
        ciphertext: b64_encode(ciphertext),
    })
}

/// Validates a record and seals it under its own embedded identifier.
pub fn seal_record<R: SealedRecord + Serialize>(record: &R) -> Result<SealedPayload, SealError> {
    record.validate()?;
    seal(record, record.identifier())
}

/// Decrypts a payload with the key derived from `identifier` and parses the
/// plaintext as `T`.
pub fn unseal<T: DeserializeOwned>(payload: &SealedPayload, identifier: &str) -> Result<T, SealError> {
    let iv = b64_decode(&payload.iv)
        .map_err(|e| DecryptionError::MalformedPayload(format!("iv: {e}")))?;
    let ciphertext = b64_decode(&payload.ciphertext)
        .map_err(|e| DecryptionError::MalformedPayload(format!("ciphertext: {e}")))?;

    let key = derive_key(identifier);
    let plaintext = encryption::decrypt(key.as_bytes(), &iv, &ciphertext).map_err(|e| match e {
        EncryptionError::DecryptFailed => DecryptionError::Authentication,
        other => DecryptionError::MalformedPayload(other.to_string()),
    })?;

    let value = serde_json::from_slice(&plaintext)
        .map_err(|e| DecryptionError::InvalidPlaintext(e.to_string()))?;

    tracing::debug!(plaintext_len = plaintext.len(), "unsealed payload");
    Ok(value)
}

/// [`unseal`] followed by the embedded-identifier check.
pub fn unseal_record<R: SealedRecord + DeserializeOwned>(
    payload: &SealedPayload,
    identifier: &str,
) -> Result<R, SealError> {
    let record: R = unseal(payload, identifier)?;
    if !identifiers_match(record.identifier(), identifier) {
        tracing::warn!("sealed payload decrypted but embedded identifier differs");
        return Err(SealError::IdentifierMismatch);
    }
    Ok(record)
}
