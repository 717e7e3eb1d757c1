//! # Credential Fingerprints
//!
//! A fingerprint is SHA-256 over a canonical, `|`-joined string of a record's
//! identifying fields. It is published in the clear as a token's metadata
//! hash and recomputed by verifiers from the fields they type in. Equality is
//! the whole verification predicate: no fuzzy matching, no partial credit.
//!
//! ## Normalization
//!
//! - Text fields (names, titles, seat numbers) are trimmed and lowercased.
//! - Numeric fields (years, semester numbers, percentages) are trimmed only.
//!
//! Issuer and verifier must run exactly the same normalization, which is why
//! both sides build their field lists through [`degree_fields`] and
//! [`semester_fields`] rather than by hand.
//!
//! ## Known ambiguity
//!
//! Fields are not escaped. `["a|b", "c"]` and `["a", "b|c"]` canonicalize to
//! the same string and therefore the same digest. Escaping or length-prefixing
//! would change every digest already on the ledger, so it can only ship as a
//! new [`FINGERPRINT_SCHEME_VERSION`](crate::config::FINGERPRINT_SCHEME_VERSION).
//! Until then [`has_delimiter_collision`] lets callers detect the case and
//! refuse to issue.

use std::fmt;

use crate::config::{FINGERPRINT_DELIMITER, HASH_OUTPUT_LENGTH, MISSING_SCORE};
use crate::crypto::hash::{b64_decode, b64_encode, sha256_array};
use crate::record::{CredentialRecord, SemesterRecord};

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

/// One entry of an ordered fingerprint field list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FingerprintField {
    /// Trimmed and lowercased.
    Text(String),
    /// Trimmed only.
    Numeric(String),
}

impl FingerprintField {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn numeric(value: impl Into<String>) -> Self {
        Self::Numeric(value.into())
    }

    /// A score field: shortest decimal form, or `N/A` when absent.
    pub fn score(value: Option<f64>) -> Self {
        Self::Numeric(value.map(format_score).unwrap_or_else(|| MISSING_SCORE.to_string()))
    }

    /// The field as it appears in the canonical string.
    pub fn normalized(&self) -> String {
        match self {
            Self::Text(s) => s.trim().to_lowercase(),
            Self::Numeric(s) => s.trim().to_string(),
        }
    }
}

/// Formats a score the way a JavaScript number prints: `80`, `78.5`,
/// `33.333333333333336`. Rust's shortest round-trip `Display` for `f64`
/// already agrees except for negative zero.
pub fn format_score(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    format!("{}", value)
}

// ---------------------------------------------------------------------------
// Fingerprint
// ---------------------------------------------------------------------------

/// A 32-byte SHA-256 digest over a canonical field string.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; HASH_OUTPUT_LENGTH]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; HASH_OUTPUT_LENGTH]) -> Self {
        Self(bytes)
    }

    /// Accepts a slice read from a ledger; `None` unless it is exactly 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; HASH_OUTPUT_LENGTH] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    /// Parses the base64 comparison form.
    pub fn from_base64(encoded: &str) -> Option<Self> {
        Self::from_slice(&b64_decode(encoded).ok()?)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.0
    }

    /// The form used for storage comparisons.
    pub fn to_base64(&self) -> String {
        b64_encode(self.0)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Joins normalized fields with the delimiter.
pub fn canonical_string(fields: &[FingerprintField]) -> String {
    let parts: Vec<String> = fields.iter().map(FingerprintField::normalized).collect();
    parts.join(FINGERPRINT_DELIMITER.to_string().as_str())
}

/// Computes the fingerprint of an ordered field list. Pure.
///
/// # Example
///
/// ```
/// use algocred_protocol::fingerprint::{compute_fingerprint, FingerprintField as F};
///
/// let a = compute_fingerprint(&[F::text("Alice "), F::text("MIT"), F::numeric("2024")]);
/// let b = compute_fingerprint(&[F::text("alice"), F::text("mit"), F::numeric(" 2024")]);
/// assert_eq!(a, b);
/// ```
pub fn compute_fingerprint(fields: &[FingerprintField]) -> Fingerprint {
    Fingerprint(sha256_array(canonical_string(fields).as_bytes()))
}

/// Recomputes the fingerprint and compares it byte-for-byte with the digest
/// read from the ledger. Anything other than exactly 32 equal bytes fails.
pub fn verify(fields: &[FingerprintField], on_chain: &[u8]) -> bool {
    compute_fingerprint(fields).as_bytes().as_slice() == on_chain
}

/// [`verify`] against the base64 comparison form. Malformed base64 is simply
/// "not verified".
pub fn verify_base64(fields: &[FingerprintField], on_chain_b64: &str) -> bool {
    match b64_decode(on_chain_b64) {
        Ok(bytes) => verify(fields, &bytes),
        Err(_) => false,
    }
}

/// True when some normalized field contains the delimiter, i.e. when the
/// canonical string is ambiguous.
pub fn has_delimiter_collision(fields: &[FingerprintField]) -> bool {
    fields
        .iter()
        .any(|f| f.normalized().contains(FINGERPRINT_DELIMITER))
}

// ---------------------------------------------------------------------------
// Presets
// ---------------------------------------------------------------------------

/// Degree field order:
/// `studentName | institution | year | degreeTitle | seatNumber | percentage`.
pub fn degree_fields(record: &CredentialRecord) -> Vec<FingerprintField> {
    vec![
        FingerprintField::text(&record.student_name),
        FingerprintField::text(&record.institution),
        FingerprintField::numeric(&record.year),
        FingerprintField::text(&record.degree_title),
        FingerprintField::text(&record.seat_number),
        FingerprintField::score(record.percentage),
    ]
}

/// Semester field order: `studentName | institution | seatNumber | semester`.
///
/// The institution is not part of the sealed payload; it comes from the
/// issuing wallet's registry entry.
pub fn semester_fields(record: &SemesterRecord, institution: &str) -> Vec<FingerprintField> {
    vec![
        FingerprintField::text(&record.student_name),
        FingerprintField::text(institution),
        FingerprintField::text(&record.seat_number),
        FingerprintField::numeric(&record.semester),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use FingerprintField as F;

    fn alice() -> Vec<FingerprintField> {
        vec![F::text("Alice"), F::text("MIT"), F::numeric("2024"), F::text("BS")]
    }

    fn degree() -> CredentialRecord {
        CredentialRecord {
            student_name: " A. Khan ".into(),
            institution: "Karachi University".into(),
            year: "2024".into(),
            degree_title: "Bachelor of Science".into(),
            seat_number: "2021-CS-01".into(),
            percentage: Some(78.5),
            courses: None,
        }
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        assert_eq!(compute_fingerprint(&alice()), compute_fingerprint(&alice()));
    }

    #[test]
    fn test_case_and_whitespace_insensitive() {
        let padded = vec![F::text("Alice "), F::text("MIT"), F::numeric("2024"), F::text("BS")];
        let lowered = vec![F::text("alice"), F::text("mit"), F::numeric("2024"), F::text("bs")];
        assert_eq!(compute_fingerprint(&padded), compute_fingerprint(&lowered));
    }

    #[test]
    fn test_single_field_change_changes_digest() {
        let bob = vec![F::text("Bob"), F::text("MIT"), F::numeric("2024"), F::text("BS")];
        assert_ne!(compute_fingerprint(&alice()), compute_fingerprint(&bob));
    }

    #[test]
    fn test_field_order_matters() {
        let swapped = vec![F::text("MIT"), F::text("Alice"), F::numeric("2024"), F::text("BS")];
        assert_ne!(compute_fingerprint(&alice()), compute_fingerprint(&swapped));
    }

    #[test]
    fn test_numeric_fields_keep_case() {
        assert_eq!(F::numeric(" 2024A ").normalized(), "2024A");
        assert_eq!(F::text(" 2024A ").normalized(), "2024a");
    }

    #[test]
    fn test_digest_is_sha256_of_canonical_string() {
        let expected = sha256_array(b"alice|mit|2024|bs");
        assert_eq!(canonical_string(&alice()), "alice|mit|2024|bs");
        assert_eq!(compute_fingerprint(&alice()).as_bytes(), &expected);
    }

    #[test]
    fn test_absent_and_empty_fields_are_indistinguishable() {
        let empty = vec![F::text("Alice"), F::text("")];
        let blank = vec![F::text("Alice"), F::text("   ")];
        assert_eq!(compute_fingerprint(&empty), compute_fingerprint(&blank));
    }

    #[test]
    fn test_verify_accepts_exact_digest_only() {
        let fp = compute_fingerprint(&alice());
        assert!(verify(&alice(), fp.as_bytes()));

        let mut tampered = *fp.as_bytes();
        tampered[31] ^= 1;
        assert!(!verify(&alice(), &tampered));
        assert!(!verify(&alice(), &fp.as_bytes()[..31]));
    }

    #[test]
    fn test_verify_base64() {
        let fp = compute_fingerprint(&alice());
        assert!(verify_base64(&alice(), &fp.to_base64()));
        assert!(!verify_base64(&alice(), "%%%"));
        assert_eq!(Fingerprint::from_base64(&fp.to_base64()), Some(fp));
    }

    #[test]
    fn test_delimiter_collision_detected() {
        let a = vec![F::text("a|b"), F::text("c")];
        let b = vec![F::text("a"), F::text("b|c")];
        assert_eq!(compute_fingerprint(&a), compute_fingerprint(&b));
        assert!(has_delimiter_collision(&a));
        assert!(!has_delimiter_collision(&alice()));
    }

    #[test]
    fn test_degree_canonical_layout() {
        assert_eq!(
            canonical_string(&degree_fields(&degree())),
            "a. khan|karachi university|2024|bachelor of science|2021-cs-01|78.5"
        );
    }

    #[test]
    fn test_degree_without_percentage_uses_placeholder() {
        let mut rec = degree();
        rec.percentage = None;
        assert!(canonical_string(&degree_fields(&rec)).ends_with("|N/A"));
    }

    #[test]
    fn test_semester_canonical_layout() {
        let rec = SemesterRecord {
            seat_number: "2021-CS-01".into(),
            student_name: "A. Khan".into(),
            fathers_name: None,
            department: "CS".into(),
            degree_title: "BS".into(),
            semester: " 5 ".into(),
            courses: vec![],
        };
        assert_eq!(
            canonical_string(&semester_fields(&rec, "ABC University")),
            "a. khan|abc university|2021-cs-01|5"
        );
    }

    #[test]
    fn test_format_score_matches_js_number_printing() {
        assert_eq!(format_score(80.0), "80");
        assert_eq!(format_score(78.5), "78.5");
        assert_eq!(format_score(-0.0), "0");
        assert_eq!(format_score(100.0 / 3.0), "33.333333333333336");
    }
}
