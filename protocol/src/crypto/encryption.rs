//! # AES-256-GCM Encryption
//!
//! Authenticated encryption for sealed credential payloads.
//!
//! GCM appends a 16-byte tag to the ciphertext and checks it on decrypt, so a
//! wrong key, a flipped bit or a truncated blob all fail the same way. That
//! is the tamper detection sealed payloads rely on.
//!
//! ## Nonce management
//!
//! Nonce reuse under one key is fatal for GCM. Keys here are derived from a
//! seat number, so the same key is used for every semester of a student.
//! Every call to [`encrypt`] therefore draws a fresh 96-bit nonce from the OS
//! CSPRNG. [`encrypt_with_nonce`] exists for reproducible test vectors only.
//!
//! ## Wire format
//!
//! Unlike a packed `nonce || ciphertext` blob, the ledger note stores the IV
//! and the ciphertext as two separate base64 strings. [`encrypt`] returns them
//! as a pair and [`decrypt`] takes them apart for the same reason.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use thiserror::Error;

use crate::config::{AES_KEY_LENGTH, AES_NONCE_LENGTH, AES_TAG_LENGTH};

/// Errors that can occur during encryption/decryption.
///
/// Decryption failures are one variant on purpose. A wrong seat number and a
/// corrupted ciphertext are indistinguishable to GCM and should stay that way.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("encryption failed")]
    EncryptFailed,

    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    DecryptFailed,

    #[error("invalid nonce length: expected {AES_NONCE_LENGTH} bytes, got {0}")]
    InvalidNonceLength(usize),

    #[error("ciphertext too short: must be at least {AES_TAG_LENGTH} bytes")]
    CiphertextTooShort,
}

/// Encrypt plaintext with AES-256-GCM under a fresh random nonce.
///
/// Returns `(nonce, ciphertext)`; the ciphertext includes the GCM tag.
///
/// # Example
///
/// ```
/// use algocred_protocol::crypto::encryption::{encrypt, decrypt};
///
/// let key = [0x42u8; 32];
/// let (nonce, sealed) = encrypt(&key, b"marks").unwrap();
/// assert_eq!(decrypt(&key, &nonce, &sealed).unwrap(), b"marks");
/// ```
pub fn encrypt(
    key: &[u8; AES_KEY_LENGTH],
    plaintext: &[u8],
) -> Result<([u8; AES_NONCE_LENGTH], Vec<u8>), EncryptionError> {
    let mut nonce_bytes = [0u8; AES_NONCE_LENGTH];
    rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
    let ciphertext = encrypt_with_nonce(key, &nonce_bytes, plaintext)?;
    Ok((nonce_bytes, ciphertext))
}

/// Encrypt with a caller-chosen nonce.
///
/// Never call this twice with the same key and nonce on different
/// plaintexts. Production paths go through [`encrypt`].
pub fn encrypt_with_nonce(
    key: &[u8; AES_KEY_LENGTH],
    nonce: &[u8; AES_NONCE_LENGTH],
    plaintext: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::EncryptFailed)?;
    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|_| EncryptionError::EncryptFailed)
}

/// Decrypt a ciphertext produced by [`encrypt`].
///
/// The nonce arrives as a slice because it comes off the wire as base64 and
/// its length is not known until it is decoded.
///
/// # Errors
///
/// - `InvalidNonceLength` if the nonce is not 12 bytes.
/// - `CiphertextTooShort` if there is not even room for a tag.
/// - `DecryptFailed` for a wrong key or any modification of the ciphertext.
pub fn decrypt(
    key: &[u8; AES_KEY_LENGTH],
    nonce: &[u8],
    ciphertext: &[u8],
) -> Result<Vec<u8>, EncryptionError> {
    if nonce.len() != AES_NONCE_LENGTH {
        return Err(EncryptionError::InvalidNonceLength(nonce.len()));
    }
    if ciphertext.len() < AES_TAG_LENGTH {
        return Err(EncryptionError::CiphertextTooShort);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| EncryptionError::DecryptFailed)?;
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| EncryptionError::DecryptFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> [u8; 32] {
        let mut key = [0u8; 32];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = i as u8;
        }
        key
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let key = test_key();
        let plaintext = b"{\"courses\":[]}";

        let (nonce, sealed) = encrypt(&key, plaintext).unwrap();
        let recovered = decrypt(&key, &nonce, &sealed).unwrap();
        assert_eq!(recovered, plaintext);
    }

    #[test]
    fn test_ciphertext_length() {
        // GCM is a stream mode: plaintext length + 16-byte tag.
        let key = test_key();
        let plaintext = b"exactly 26 bytes of input!";
        let (_, sealed) = encrypt(&key, plaintext).unwrap();
        assert_eq!(sealed.len(), plaintext.len() + AES_TAG_LENGTH);
    }

    #[test]
    fn test_wrong_key_fails_decryption() {
        let key = test_key();
        let (nonce, sealed) = encrypt(&key, b"secret").unwrap();

        let mut wrong_key = test_key();
        wrong_key[0] ^= 0xFF;

        assert_eq!(
            decrypt(&wrong_key, &nonce, &sealed),
            Err(EncryptionError::DecryptFailed)
        );
    }

    #[test]
    fn test_modified_ciphertext_fails_decryption() {
        let key = test_key();
        let (nonce, mut sealed) = encrypt(&key, b"secret").unwrap();
        sealed[0] ^= 0x01;

        assert_eq!(
            decrypt(&key, &nonce, &sealed),
            Err(EncryptionError::DecryptFailed)
        );
    }

    #[test]
    fn test_modified_tag_fails_decryption() {
        let key = test_key();
        let (nonce, mut sealed) = encrypt(&key, b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x80;

        assert!(decrypt(&key, &nonce, &sealed).is_err());
    }

    #[test]
    fn test_wrong_nonce_fails_decryption() {
        let key = test_key();
        let (mut nonce, sealed) = encrypt(&key, b"secret").unwrap();
        nonce[11] ^= 0x01;

        assert!(decrypt(&key, &nonce, &sealed).is_err());
    }

    #[test]
    fn test_unique_nonces() {
        let key = test_key();
        let (n1, c1) = encrypt(&key, b"message").unwrap();
        let (n2, c2) = encrypt(&key, b"message").unwrap();
        assert_ne!(n1, n2);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_fixed_nonce_is_deterministic() {
        let key = test_key();
        let nonce = [7u8; AES_NONCE_LENGTH];
        let a = encrypt_with_nonce(&key, &nonce, b"same").unwrap();
        let b = encrypt_with_nonce(&key, &nonce, b"same").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decrypt_rejects_bad_nonce_length() {
        let key = test_key();
        let (_, sealed) = encrypt(&key, b"secret").unwrap();
        assert_eq!(
            decrypt(&key, &[0u8; 16], &sealed),
            Err(EncryptionError::InvalidNonceLength(16))
        );
    }

    #[test]
    fn test_decrypt_too_short() {
        let key = test_key();
        assert_eq!(
            decrypt(&key, &[0u8; AES_NONCE_LENGTH], &[0u8; 4]),
            Err(EncryptionError::CiphertextTooShort)
        );
    }

    #[test]
    fn test_encrypt_empty_plaintext() {
        let key = test_key();
        let (nonce, sealed) = encrypt(&key, b"").unwrap();
        assert_eq!(sealed.len(), AES_TAG_LENGTH);
        assert!(decrypt(&key, &nonce, &sealed).unwrap().is_empty());
    }
}
