//! # Hashing & Encoding Utilities
//!
//! SHA-256 is the only hash AlgoCred uses. It anchors fingerprints on the
//! ledger and it is the (deliberately weak) key derivation for sealed
//! payloads. Both uses have to match bytes minted by browser clients using
//! WebCrypto, so there is no room for a faster or fancier function here.
//!
//! The base64 helpers use the standard alphabet with padding, which is what
//! `btoa` produces and what every existing note on the ledger contains.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use sha2::{Digest, Sha256};

use crate::config::HASH_OUTPUT_LENGTH;

/// Compute the SHA-256 hash of the input data.
///
/// A fixed-size array is the form both fingerprints and derived keys want,
/// since a ledger metadata hash slot and an AES-256 key are both exactly
/// 32 bytes.
///
/// # Example
///
/// ```
/// use algocred_protocol::crypto::sha256_array;
///
/// let hash = sha256_array(b"algocred");
/// assert_eq!(hash.len(), 32);
/// ```
pub fn sha256_array(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; HASH_OUTPUT_LENGTH];
    output.copy_from_slice(&result);
    output
}

/// Encode bytes as standard, padded base64.
pub fn b64_encode(data: impl AsRef<[u8]>) -> String {
    BASE64.encode(data)
}

/// Decode standard, padded base64.
pub fn b64_decode(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(encoded.trim())
}
