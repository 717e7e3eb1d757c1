//! # Cryptographic Primitives for AlgoCred
//!
//! Two primitives, both boring on purpose:
//!
//! - **SHA-256** for fingerprints and for turning a seat number into a key.
//! - **AES-256-GCM** for sealing the detailed record behind that key.
//!
//! Everything here is a thin, typed wrapper around the RustCrypto crates.
//! The base64 helpers live next to the hash because every digest and every
//! ciphertext that reaches a ledger note is base64 text.

pub mod encryption;
pub mod hash;

pub use encryption::{decrypt, encrypt, EncryptionError};
pub use hash::{b64_decode, b64_encode, sha256_array};
