//! # Note Envelope
//!
//! The JSON document written into a token's free-form note field:
//!
//! ```text
//! {
//!   "standard": "arc69",
//!   "description": "...",
//!   "properties": {
//!     "enc": { "alg": "AES-GCM-256", "iv": "<base64>", "ciphertext": "<base64>" },
//!     "sha256": "<base64, optional>"
//!   }
//! }
//! ```
//!
//! Notes are immutable once minted, so these key names are a compatibility
//! contract. Indexers hand notes back either as raw bytes or as a base64
//! string of those bytes; [`NoteEnvelope::from_note_bytes`] takes both.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ENVELOPE_CIPHER_ALG, NOTE_STANDARD, SEMESTER_NOTE_DESCRIPTION};
use crate::crypto::hash::b64_decode;
use crate::fingerprint::Fingerprint;
use crate::seal::SealedPayload;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("note is not a JSON envelope: {0}")]
    InvalidJson(String),

    #[error("envelope has no encrypted payload")]
    MissingPayload,

    #[error("unsupported cipher `{0}` (expected {ENVELOPE_CIPHER_ALG})")]
    UnsupportedAlgorithm(String),

    #[error("failed to serialize envelope: {0}")]
    Serialization(String),
}

/// `properties.enc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedBlob {
    pub alg: String,
    pub iv: String,
    pub ciphertext: String,
}

/// `properties`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvelopeProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enc: Option<EncryptedBlob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// The whole note document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteEnvelope {
    pub standard: String,
    pub description: String,
    pub properties: EnvelopeProperties,
}

impl NoteEnvelope {
    /// Wraps a sealed payload with the given description.
    pub fn new(description: impl Into<String>, payload: SealedPayload) -> Self {
        Self {
            standard: NOTE_STANDARD.to_string(),
            description: description.into(),
            properties: EnvelopeProperties {
                enc: Some(EncryptedBlob {
                    alg: ENVELOPE_CIPHER_ALG.to_string(),
                    iv: payload.iv,
                    ciphertext: payload.ciphertext,
                }),
                sha256: None,
            },
        }
    }

    /// A semester proforma envelope.
    pub fn semester(payload: SealedPayload) -> Self {
        Self::new(SEMESTER_NOTE_DESCRIPTION, payload)
    }

    /// Attaches the fingerprint as `properties.sha256`.
    pub fn with_digest(mut self, fingerprint: &Fingerprint) -> Self {
        self.properties.sha256 = Some(fingerprint.to_base64());
        self
    }

    /// Serializes the envelope to note bytes.
    pub fn to_note_bytes(&self) -> Result<Vec<u8>, EnvelopeError> {
        serde_json::to_vec(self).map_err(|e| EnvelopeError::Serialization(e.to_string()))
    }

    /// Parses a note as returned by a ledger: raw JSON bytes, or base64 text
    /// of the JSON bytes.
    pub fn from_note_bytes(note: &[u8]) -> Result<Self, EnvelopeError> {
        match serde_json::from_slice::<Self>(note) {
            Ok(envelope) => Ok(envelope),
            Err(json_err) => {
                let decoded = std::str::from_utf8(note)
                    .ok()
                    .and_then(|text| b64_decode(text).ok())
                    .ok_or_else(|| EnvelopeError::InvalidJson(json_err.to_string()))?;
                serde_json::from_slice(&decoded).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))
            }
        }
    }

    /// The sealed payload, provided the cipher label is the one we speak.
    pub fn sealed_payload(&self) -> Result<SealedPayload, EnvelopeError> {
        let enc = self
            .properties
            .enc
            .as_ref()
            .ok_or(EnvelopeError::MissingPayload)?;
        if enc.alg != ENVELOPE_CIPHER_ALG {
            return Err(EnvelopeError::UnsupportedAlgorithm(enc.alg.clone()));
        }
        if enc.iv.is_empty() || enc.ciphertext.is_empty() {
            return Err(EnvelopeError::MissingPayload);
        }
        Ok(SealedPayload {
            iv: enc.iv.clone(),
            ciphertext: enc.ciphertext.clone(),
        })
    }

    /// `properties.sha256`, if present and well-formed.
    pub fn digest(&self) -> Option<Fingerprint> {
        self.properties
            .sha256
            .as_deref()
            .and_then(Fingerprint::from_base64)
    }
}
