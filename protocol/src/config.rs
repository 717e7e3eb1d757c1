//! # Protocol Configuration & Constants
//!
//! Every magic string and number AlgoCred puts on a ledger lives here.
//!
//! Most of these values are baked into tokens that already exist. A token's
//! metadata hash and note can never be edited after minting, so changing the
//! delimiter, the envelope tags or the key derivation below silently orphans
//! every credential issued before the change. Bump [`FINGERPRINT_SCHEME_VERSION`]
//! and keep the old code path around if you ever have to.

// ---------------------------------------------------------------------------
// Fingerprint Canonicalization
// ---------------------------------------------------------------------------

/// Field delimiter for the canonical fingerprint string.
///
/// Not escaped. A field containing `|` can collide with a neighbouring
/// field boundary; see the crate-level docs on the fingerprint module.
pub const FINGERPRINT_DELIMITER: char = '|';

/// Placeholder used in the degree fingerprint when no final percentage is known.
pub const MISSING_SCORE: &str = "N/A";

/// Scheme version of the canonical string layout. Version 1 is the plain
/// `|`-joined layout every issued token uses today.
pub const FINGERPRINT_SCHEME_VERSION: u8 = 1;

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// Digest length in bytes. Also the length of a ledger metadata hash slot.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// AES-256-GCM key length in bytes.
pub const AES_KEY_LENGTH: usize = 32;

/// AES-256-GCM nonce (IV) length in bytes. 96 bits, never reused per key.
pub const AES_NONCE_LENGTH: usize = 12;

/// AES-256-GCM authentication tag length in bytes.
pub const AES_TAG_LENGTH: usize = 16;

// ---------------------------------------------------------------------------
// Note Envelope
// ---------------------------------------------------------------------------

/// Metadata standard tag written into every note envelope.
pub const NOTE_STANDARD: &str = "arc69";

/// Algorithm label inside `properties.enc.alg`. This exact string is on-chain.
pub const ENVELOPE_CIPHER_ALG: &str = "AES-GCM-256";

/// Description attached to sealed semester proformas.
pub const SEMESTER_NOTE_DESCRIPTION: &str = "Semester Proforma NFT (Privacy-Preserving)";

// ---------------------------------------------------------------------------
// Token Naming
// ---------------------------------------------------------------------------

/// Unit name of every degree token.
pub const DEGREE_UNIT_NAME: &str = "DEGREE";

/// Suffix appended to the degree title to form the degree asset name.
pub const DEGREE_ASSET_SUFFIX: &str = " - Degree NFT";

// ---------------------------------------------------------------------------
// Grading
// ---------------------------------------------------------------------------

/// Marks strictly below this value fail a course.
pub const FAIL_THRESHOLD: f64 = 50.0;

/// Maximum marks per course; a percentage denominator is `count * MAX_MARKS`.
pub const MAX_MARKS: f64 = 100.0;

/// Label shown instead of a GPA when the mean grade point is zero.
pub const FAILED_LABEL: &str = "Failed";

/// Institution whose scale is used when a name is not in the registry.
pub const FALLBACK_INSTITUTION: &str = "Karachi University";

/// Shown for an asset whose creator wallet is not in the registry.
pub const UNKNOWN_INSTITUTION: &str = "Unknown Institution";

/// Semester assets a bachelor degree must reference at issuance.
pub const BACHELOR_SEMESTER_ASSETS: usize = 8;

/// Semester asset counts a master degree may reference at issuance.
pub const MASTER_SEMESTER_ASSETS: [usize; 2] = [4, 2];

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Default port for the HTTP service.
pub const DEFAULT_HTTP_PORT: u16 = 5000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crypto_parameter_sizes() {
        assert_eq!(AES_KEY_LENGTH, 32);
        assert_eq!(AES_NONCE_LENGTH, 12);
        assert_eq!(AES_TAG_LENGTH, 16);
        // Key derivation relies on the digest being exactly one AES-256 key.
        assert_eq!(HASH_OUTPUT_LENGTH, AES_KEY_LENGTH);
    }

    #[test]
    fn test_envelope_tags_are_stable() {
        assert_eq!(NOTE_STANDARD, "arc69");
        assert_eq!(ENVELOPE_CIPHER_ALG, "AES-GCM-256");
    }

    #[test]
    fn test_delimiter_is_ascii() {
        assert!(FINGERPRINT_DELIMITER.is_ascii_punctuation());
    }
}
