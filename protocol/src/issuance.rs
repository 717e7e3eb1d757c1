//! # Issuance
//!
//! Turns records into [`MintRequest`]s. Nothing here signs or submits; the
//! caller hands the requests to whatever talks to the ledger.
//!
//! A semester token carries the semester fingerprint as its metadata hash
//! and the sealed record in its note. A degree token carries only the degree
//! fingerprint. Its percentage is either supplied by the issuer or derived
//! from the student's semester tokens, which the issuer can decrypt because
//! it knows the seat number.

use thiserror::Error;

use crate::config::{DEGREE_ASSET_SUFFIX, DEGREE_UNIT_NAME};
use crate::envelope::{EnvelopeError, NoteEnvelope};
use crate::fingerprint::{
    compute_fingerprint, degree_fields, has_delimiter_collision, semester_fields, FingerprintField,
};
use crate::grading::{degree_percentage, validate_semester_asset_count, GradingError};
use crate::ledger::{AssetId, AssetLedger, MintRequest};
use crate::record::{CredentialRecord, RecordError, SealedRecord, SemesterRecord};
use crate::registry::Institution;
use crate::seal::{seal_record, unseal_record, SealError};

#[derive(Debug, Error)]
pub enum IssuanceError {
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error("a field contains the `|` delimiter; the fingerprint would be ambiguous")]
    DelimiterCollision,

    #[error("provide either a final percentage or semester asset ids")]
    MissingPercentage,

    #[error(transparent)]
    SemesterCount(#[from] GradingError),

    #[error("sealing failed: {0}")]
    Seal(#[from] SealError),

    #[error("envelope encoding failed: {0}")]
    Envelope(#[from] EnvelopeError),
}

/// Requests for one issuing batch. Institutions that are not fee-exempt pay
/// a single service fee per batch, submitted ahead of the mints.
#[derive(Debug, Clone)]
pub struct IssuanceBatch {
    pub fee_required: bool,
    pub requests: Vec<MintRequest>,
}

fn checked_fingerprint(fields: &[FingerprintField]) -> Result<[u8; 32], IssuanceError> {
    if has_delimiter_collision(fields) {
        return Err(IssuanceError::DelimiterCollision);
    }
    Ok(*compute_fingerprint(fields).as_bytes())
}

/// Builds the mint request for one semester proforma token.
///
/// Asset name `Sem {n} {initials}`, unit name `S{n}{initials}`, where the
/// initials come from the issuing institution's name.
pub fn issue_semester(record: &SemesterRecord, institution: &Institution) -> Result<MintRequest, IssuanceError> {
    record.validate()?;
    let metadata_hash = checked_fingerprint(&semester_fields(record, &institution.name))?;

    let sealed = seal_record(record)?;
    let note = NoteEnvelope::semester(sealed).to_note_bytes()?;

    let semester = record.semester.trim();
    let initials = institution.initials();

    tracing::info!(
        institution = %institution.name,
        semester,
        courses = record.courses.len(),
        "semester token prepared"
    );

    Ok(MintRequest {
        asset_name: format!("Sem {semester} {initials}"),
        unit_name: format!("S{semester}{initials}"),
        metadata_hash,
        note: Some(note),
    })
}

/// Builds every semester request of a batch. Fails on the first bad record
/// so a batch is never half-prepared.
pub fn issue_semester_batch(
    records: &[SemesterRecord],
    institution: &Institution,
) -> Result<IssuanceBatch, IssuanceError> {
    let requests = records
        .iter()
        .map(|r| issue_semester(r, institution))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(IssuanceBatch {
        fee_required: !institution.fee_exempt,
        requests,
    })
}

/// Reads each referenced semester token and averages the ones that open
/// under `seat_number`. Missing assets, notes that are not envelopes, wrong
/// keys and records for another student are skipped.
pub fn percentage_from_semesters<L: AssetLedger + ?Sized>(
    ledger: &L,
    semester_asset_ids: &[AssetId],
    seat_number: &str,
) -> Option<f64> {
    let mut semesters: Vec<SemesterRecord> = Vec::with_capacity(semester_asset_ids.len());

    for &id in semester_asset_ids {
        let Some(note) = ledger.asset(id).and_then(|a| a.note) else {
            tracing::debug!(asset_id = id, "semester asset missing or has no note");
            continue;
        };
        let opened = NoteEnvelope::from_note_bytes(&note)
            .and_then(|env| env.sealed_payload())
            .map_err(|e| e.to_string())
            .and_then(|payload| {
                unseal_record::<SemesterRecord>(&payload, seat_number).map_err(|e| e.to_string())
            });
        match opened {
            Ok(record) => semesters.push(record),
            Err(reason) => tracing::debug!(asset_id = id, %reason, "skipping semester asset"),
        }
    }

    degree_percentage(semesters.iter().map(|s| s.courses.as_slice()))
}

/// Builds the mint request for a degree token.
///
/// When `record.percentage` is `None` it is derived from the semester assets.
/// If none of them decrypt the percentage stays absent and the fingerprint
/// carries `N/A`, exactly as a verifier leaving the field empty would compute.
pub fn issue_degree<L: AssetLedger + ?Sized>(
    mut record: CredentialRecord,
    semester_asset_ids: &[AssetId],
    ledger: &L,
) -> Result<(CredentialRecord, MintRequest), IssuanceError> {
    record.validate()?;
    if record.percentage.is_none() && semester_asset_ids.is_empty() {
        return Err(IssuanceError::MissingPercentage);
    }
    validate_semester_asset_count(&record.degree_title, semester_asset_ids.len())?;

    if record.percentage.is_none() {
        record.percentage = percentage_from_semesters(ledger, semester_asset_ids, &record.seat_number);
        if record.percentage.is_none() {
            tracing::warn!(
                assets = semester_asset_ids.len(),
                "no semester asset could be opened; degree percentage recorded as N/A"
            );
        }
    }

    let metadata_hash = checked_fingerprint(&degree_fields(&record))?;

    tracing::info!(
        institution = %record.institution,
        degree = %record.degree_title,
        derived = !semester_asset_ids.is_empty(),
        "degree token prepared"
    );

    let request = MintRequest {
        asset_name: format!("{}{}", record.degree_title.trim(), DEGREE_ASSET_SUFFIX),
        unit_name: DEGREE_UNIT_NAME.to_string(),
        metadata_hash,
        note: None,
    };
    Ok((record, request))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::Fingerprint;
    use crate::ledger::InMemoryLedger;
    use crate::record::CourseResult;
    use crate::registry::InstitutionRegistry;

    const SEAT: &str = "2021-CS-01";

    fn abc() -> Institution {
        InstitutionRegistry::default()
            .find_by_name("ABC University")
            .cloned()
            .unwrap()
    }

    fn semester(n: u32, marks: &[f64]) -> SemesterRecord {
        SemesterRecord {
            seat_number: SEAT.into(),
            student_name: "A. Khan".into(),
            fathers_name: None,
            department: "Computer Science".into(),
            degree_title: "Master of Science".into(),
            semester: n.to_string(),
            courses: marks
                .iter()
                .enumerate()
                .map(|(i, &m)| CourseResult::new(format!("Course {i}"), format!("CS{n}0{i}"), m))
                .collect(),
        }
    }

    fn degree(percentage: Option<f64>) -> CredentialRecord {
        CredentialRecord {
            student_name: "A. Khan".into(),
            institution: "ABC University".into(),
            year: "2024".into(),
            degree_title: "Master of Science".into(),
            seat_number: SEAT.into(),
            percentage,
            courses: None,
        }
    }

    #[test]
    fn test_semester_request_shape() {
        let req = issue_semester(&semester(3, &[78.0, 45.0]), &abc()).unwrap();
        assert_eq!(req.asset_name, "Sem 3 AU");
        assert_eq!(req.unit_name, "S3AU");

        let expected = compute_fingerprint(&semester_fields(&semester(3, &[]), "ABC University"));
        assert_eq!(req.metadata_hash, *expected.as_bytes());

        let env = NoteEnvelope::from_note_bytes(req.note.as_ref().unwrap()).unwrap();
        assert!(env.properties.sha256.is_none());
        let back: SemesterRecord = unseal_record(&env.sealed_payload().unwrap(), SEAT).unwrap();
        assert_eq!(back.courses.len(), 2);
    }

    #[test]
    fn test_semester_rejects_delimiter_in_field() {
        let mut rec = semester(1, &[70.0]);
        rec.student_name = "A|Khan".into();
        assert!(matches!(
            issue_semester(&rec, &abc()),
            Err(IssuanceError::DelimiterCollision)
        ));
    }

    #[test]
    fn test_batch_fee_follows_registry() {
        let reg = InstitutionRegistry::default();
        let records = vec![semester(1, &[70.0]), semester(2, &[80.0])];

        let paying = issue_semester_batch(&records, reg.find_by_name("ABC University").unwrap()).unwrap();
        assert!(paying.fee_required);
        assert_eq!(paying.requests.len(), 2);

        let exempt = issue_semester_batch(&records, reg.find_by_name("XYZ University").unwrap()).unwrap();
        assert!(!exempt.fee_required);
    }

    #[test]
    fn test_degree_requires_percentage_or_assets() {
        let ledger = InMemoryLedger::new();
        assert!(matches!(
            issue_degree(degree(None), &[], &ledger),
            Err(IssuanceError::MissingPercentage)
        ));
    }

    #[test]
    fn test_degree_rejects_blank_seat() {
        let ledger = InMemoryLedger::new();
        let mut rec = degree(Some(80.0));
        rec.seat_number = "  ".into();
        assert!(matches!(
            issue_degree(rec, &[], &ledger),
            Err(IssuanceError::InvalidRecord(RecordError::BlankField("seatNumber")))
        ));
    }

    #[test]
    fn test_degree_checks_semester_asset_count() {
        let ledger = InMemoryLedger::new();
        assert!(matches!(
            issue_degree(degree(None), &[1, 2, 3], &ledger),
            Err(IssuanceError::SemesterCount(GradingError::SemesterCount { got: 3, .. }))
        ));
    }

    #[test]
    fn test_degree_with_given_percentage() {
        let ledger = InMemoryLedger::new();
        let (rec, req) = issue_degree(degree(Some(80.0)), &[], &ledger).unwrap();
        assert_eq!(req.asset_name, "Master of Science - Degree NFT");
        assert_eq!(req.unit_name, "DEGREE");
        assert!(req.note.is_none());
        assert_eq!(
            Fingerprint::from_bytes(req.metadata_hash),
            compute_fingerprint(&degree_fields(&rec))
        );
    }

    #[test]
    fn test_degree_percentage_derived_from_semesters() {
        let ledger = InMemoryLedger::new();
        let inst = abc();
        let mut ids = Vec::new();
        for (n, marks) in [(1, vec![80.0, 60.0]), (2, vec![90.0]), (3, vec![70.0]), (4, vec![80.0])] {
            let req = issue_semester(&semester(n, &marks), &inst).unwrap();
            ids.push(ledger.record(&inst.wallet, req).unwrap());
        }

        let (rec, _) = issue_degree(degree(None), &ids, &ledger).unwrap();
        // (70 + 90 + 70 + 80) / 4
        assert_eq!(rec.percentage, Some(77.5));
    }

    #[test]
    fn test_unopenable_semesters_are_skipped() {
        let ledger = InMemoryLedger::new();
        let inst = abc();
        let mine = ledger
            .record(&inst.wallet, issue_semester(&semester(1, &[90.0]), &inst).unwrap())
            .unwrap();

        let mut other = semester(2, &[10.0]);
        other.seat_number = "2021-CS-99".into();
        let theirs = ledger
            .record(&inst.wallet, issue_semester(&other, &inst).unwrap())
            .unwrap();

        assert_eq!(percentage_from_semesters(&ledger, &[mine, theirs, 999], SEAT), Some(90.0));
    }

    #[test]
    fn test_degree_falls_back_to_na_when_nothing_opens() {
        let ledger = InMemoryLedger::new();
        let (rec, req) = issue_degree(degree(None), &[7, 8], &ledger).unwrap();
        assert_eq!(rec.percentage, None);
        let na = compute_fingerprint(&degree_fields(&degree(None)));
        assert_eq!(req.metadata_hash, *na.as_bytes());
    }
}
