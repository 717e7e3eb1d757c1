//! # Verification
//!
//! Two things a third party can do with a token id:
//!
//! - **Verify a degree.** Recompute the degree fingerprint from the claimed
//!   fields and compare it with the asset's metadata hash. The answer is a
//!   plain yes or no; a missing asset or a missing hash is a no.
//! - **Reveal a semester.** Open the sealed note with the student's seat
//!   number. This either yields the record or says precisely why not:
//!   the key was wrong (or the note was tampered with), or the note opened
//!   but belongs to a different student.
//!
//! A [`SemesterProforma`] goes one step further than a reveal. The issuing
//! institution comes from the asset's creator wallet, and the semester is
//! graded on that institution's own scale.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::UNKNOWN_INSTITUTION;
use crate::envelope::{EnvelopeError, NoteEnvelope};
use crate::fingerprint::{degree_fields, verify, FingerprintField};
use crate::grading::{aggregate, GradeSummary, GradingError};
use crate::ledger::{AssetId, AssetLedger, LedgerAsset};
use crate::record::{CredentialRecord, SemesterRecord};
use crate::registry::InstitutionRegistry;
use crate::seal::{unseal_record, SealError};
use crate::transcript::percentage_in_words;

// ---------------------------------------------------------------------------
// Degree verification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotVerifiedReason {
    AssetNotFound,
    NoMetadataHash,
    DigestMismatch,
}

impl fmt::Display for NotVerifiedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AssetNotFound => "asset not found",
            Self::NoMetadataHash => "asset has no metadata hash",
            Self::DigestMismatch => "fields do not match the recorded fingerprint",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified,
    NotVerified(NotVerifiedReason),
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// Compares an arbitrary field list with an asset's metadata hash.
pub fn verify_asset<L: AssetLedger + ?Sized>(
    ledger: &L,
    asset_id: AssetId,
    fields: &[FingerprintField],
) -> VerificationOutcome {
    let outcome = match ledger.asset(asset_id) {
        None => VerificationOutcome::NotVerified(NotVerifiedReason::AssetNotFound),
        Some(asset) => match asset.metadata_hash {
            None => VerificationOutcome::NotVerified(NotVerifiedReason::NoMetadataHash),
            Some(hash) if verify(fields, &hash) => VerificationOutcome::Verified,
            Some(_) => VerificationOutcome::NotVerified(NotVerifiedReason::DigestMismatch),
        },
    };
    tracing::info!(asset_id, verified = outcome.is_verified(), "fingerprint verification");
    outcome
}

/// Verifies claimed degree details against a degree token.
pub fn verify_degree<L: AssetLedger + ?Sized>(
    ledger: &L,
    asset_id: AssetId,
    claimed: &CredentialRecord,
) -> VerificationOutcome {
    verify_asset(ledger, asset_id, &degree_fields(claimed))
}

// ---------------------------------------------------------------------------
// Semester reveal
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum VerificationError {
    #[error("asset {0} not found")]
    AssetNotFound(AssetId),

    #[error("asset {0} carries no note")]
    MissingNote(AssetId),

    #[error("asset note is unusable: {0}")]
    Envelope(#[from] EnvelopeError),

    #[error(transparent)]
    Seal(#[from] SealError),

    #[error("semester cannot be graded: {0}")]
    Grading(#[from] GradingError),
}

impl VerificationError {
    /// The seat number did not open the note (or the note was altered).
    pub fn is_decryption(&self) -> bool {
        matches!(self, Self::Seal(e) if e.is_decryption())
    }

    /// The note opened but the record inside names another student.
    pub fn is_identifier_mismatch(&self) -> bool {
        matches!(self, Self::Seal(SealError::IdentifierMismatch))
    }
}

/// Opens a semester token with the student's seat number.
pub fn reveal_semester<L: AssetLedger + ?Sized>(
    ledger: &L,
    asset_id: AssetId,
    seat_number: &str,
) -> Result<SemesterRecord, VerificationError> {
    let asset = ledger
        .asset(asset_id)
        .ok_or(VerificationError::AssetNotFound(asset_id))?;
    open_semester(asset, seat_number)
}

fn open_semester(asset: LedgerAsset, seat_number: &str) -> Result<SemesterRecord, VerificationError> {
    let asset_id = asset.id;
    let note = asset.note.ok_or(VerificationError::MissingNote(asset_id))?;
    let payload = NoteEnvelope::from_note_bytes(&note)?.sealed_payload()?;

    match unseal_record::<SemesterRecord>(&payload, seat_number) {
        Ok(record) => {
            tracing::info!(asset_id, semester = %record.semester, "semester revealed");
            Ok(record)
        }
        Err(e) => {
            tracing::info!(asset_id, error = %e, "semester reveal refused");
            Err(e.into())
        }
    }
}

/// Opens several semester tokens of one student. All or nothing: the first
/// failure is returned with the offending asset id.
pub fn reveal_semesters<L: AssetLedger + ?Sized>(
    ledger: &L,
    asset_ids: &[AssetId],
    seat_number: &str,
) -> Result<Vec<SemesterRecord>, (AssetId, VerificationError)> {
    asset_ids
        .iter()
        .map(|&id| reveal_semester(ledger, id, seat_number).map_err(|e| (id, e)))
        .collect()
}

// ---------------------------------------------------------------------------
// Semester proforma
// ---------------------------------------------------------------------------

/// A revealed semester with the figures its printed proforma shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterProforma {
    pub asset_id: AssetId,
    /// Issuer name, or [`UNKNOWN_INSTITUTION`] for an unregistered creator.
    pub institution: String,
    pub record: SemesterRecord,
    /// Every course counted, on the issuer's scale.
    pub summary: GradeSummary,
    pub percentage_words: Option<String>,
}

/// Reveals a semester token and grades it as its issuer would.
///
/// The issuer is looked up by the asset's creator wallet. An unregistered
/// creator is reported as [`UNKNOWN_INSTITUTION`] and graded on the fallback
/// scale.
pub fn semester_proforma<L: AssetLedger + ?Sized>(
    ledger: &L,
    asset_id: AssetId,
    seat_number: &str,
    registry: &InstitutionRegistry,
) -> Result<SemesterProforma, VerificationError> {
    let asset = ledger
        .asset(asset_id)
        .ok_or(VerificationError::AssetNotFound(asset_id))?;
    let institution = match registry.find_by_wallet(&asset.creator) {
        Some(inst) => inst.name.clone(),
        None => {
            tracing::warn!(asset_id, creator = %asset.creator, "creator is not a registered institution");
            UNKNOWN_INSTITUTION.to_string()
        }
    };

    let record = open_semester(asset, seat_number)?;
    let summary = aggregate(&record.courses, &registry.policy_for(&institution))?;
    let percentage_words = percentage_in_words(summary.percentage);

    Ok(SemesterProforma {
        asset_id,
        institution,
        record,
        summary,
        percentage_words,
    })
}
