//! # HTTP API
//!
//! Builds the axum router for `algocred serve`. Handlers are thin wrappers
//! over the protocol library; all state is read-only apart from metrics.
//!
//! ## Endpoints
//!
//! | Method | Path            | Description                                  |
//! |--------|-----------------|----------------------------------------------|
//! | GET    | `/health`       | Liveness probe                               |
//! | GET    | `/institutions` | Registered institutions                      |
//! | POST   | `/fingerprint`  | Fingerprint a field list or record           |
//! | POST   | `/verify`       | Compare fields with an on-chain digest       |
//! | POST   | `/seal`         | Seal a record under a seat number            |
//! | POST   | `/unseal`       | Open a sealed payload or note                |
//! | POST   | `/aggregate`    | Total, percentage and GPA of a course list   |
//! | GET    | `/metrics`      | Prometheus exposition                        |
//!
//! Failures are JSON `{"error": "..."}`. A payload that does not open under
//! the given seat number is 401; one that opens but names another student
//! is 422, as is a course list with nothing to aggregate.

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use algocred_protocol::envelope::{EnvelopeError, NoteEnvelope};
use algocred_protocol::fingerprint::{
    compute_fingerprint, degree_fields, has_delimiter_collision, semester_fields, verify_base64,
    FingerprintField,
};
use algocred_protocol::grading::{aggregate, GradeSummary, GradingError, GradingPolicy};
use algocred_protocol::record::{CourseResult, CredentialRecord, SealedRecord, SemesterRecord};
use algocred_protocol::registry::{Institution, InstitutionRegistry};
use algocred_protocol::seal::{seal, unseal, unseal_record, SealError, SealedPayload};

use crate::metrics::{metrics_handler, SharedMetrics};

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared state for all handlers. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub version: String,
    pub registry: Arc<InstitutionRegistry>,
    pub metrics: SharedMetrics,
}

/// Builds the router with CORS and request tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/institutions", get(institutions_handler))
        .route("/fingerprint", post(fingerprint_handler))
        .route("/verify", post(verify_handler))
        .route("/seal", post(seal_handler))
        .route("/unseal", post(unseal_handler))
        .route("/aggregate", post(aggregate_handler))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// An error response: status plus a message rendered as `{"error": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<SealError> for ApiError {
    fn from(e: SealError) -> Self {
        match e {
            SealError::Decryption(_) => Self {
                status: StatusCode::UNAUTHORIZED,
                message: "decryption failed: wrong seat number or tampered payload".into(),
            },
            SealError::IdentifierMismatch => {
                Self::unprocessable("identifier mismatch: payload belongs to a different student")
            }
            other => Self::bad_request(other.to_string()),
        }
    }
}

impl From<EnvelopeError> for ApiError {
    fn from(e: EnvelopeError) -> Self {
        Self::bad_request(e.to_string())
    }
}

impl From<GradingError> for ApiError {
    fn from(e: GradingError) -> Self {
        Self::unprocessable(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// One field of an explicit list: `{"text": "Alice"}` or `{"numeric": "2024"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldInput {
    Text(String),
    Numeric(String),
}

impl From<FieldInput> for FingerprintField {
    fn from(f: FieldInput) -> Self {
        match f {
            FieldInput::Text(s) => FingerprintField::Text(s),
            FieldInput::Numeric(s) => FingerprintField::Numeric(s),
        }
    }
}

/// What to fingerprint: exactly one of an explicit field list, a degree
/// record, or a semester record plus its issuing institution.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsRequest {
    #[serde(default)]
    pub fields: Option<Vec<FieldInput>>,
    #[serde(default)]
    pub degree: Option<CredentialRecord>,
    #[serde(default)]
    pub semester: Option<SemesterRecord>,
    #[serde(default)]
    pub institution: Option<String>,
}

impl FieldsRequest {
    fn into_fields(self) -> Result<Vec<FingerprintField>, ApiError> {
        match (self.fields, self.degree, self.semester) {
            (Some(fields), None, None) => Ok(fields.into_iter().map(Into::into).collect()),
            (None, Some(degree), None) => Ok(degree_fields(&degree)),
            (None, None, Some(semester)) => {
                let institution = self
                    .institution
                    .ok_or_else(|| ApiError::bad_request("semester fingerprints need `institution`"))?;
                Ok(semester_fields(&semester, &institution))
            }
            _ => Err(ApiError::bad_request(
                "provide exactly one of `fields`, `degree` or `semester`",
            )),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FingerprintResponse {
    pub base64: String,
    pub hex: String,
    /// True when a field contains the delimiter.
    pub ambiguous: bool,
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    #[serde(flatten)]
    pub fields: FieldsRequest,
    /// On-chain digest, base64.
    pub digest: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub verified: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealRequest {
    pub record: serde_json::Value,
    /// Defaults to the record's `seatNumber`.
    #[serde(default)]
    pub seat_number: Option<String>,
    /// Wrap the payload in a note envelope.
    #[serde(default)]
    pub envelope: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsealRequest {
    /// `{iv, ciphertext}`.
    #[serde(default)]
    pub payload: Option<SealedPayload>,
    /// A note as stored on the ledger: envelope JSON text, or base64 of it.
    #[serde(default)]
    pub note: Option<String>,
    pub seat_number: String,
    #[serde(default = "default_true")]
    pub check_identifier: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyChoice {
    Strict,
    Institution,
}

/// Without an explicit `policy`, naming an institution grades on its scale
/// and naming none applies the strict policy.
#[derive(Debug, Deserialize)]
pub struct AggregateRequest {
    pub courses: Vec<CourseResult>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub policy: Option<PolicyChoice>,
}

impl AggregateRequest {
    fn policy(&self, registry: &InstitutionRegistry) -> Result<GradingPolicy, ApiError> {
        match (self.policy, self.institution.as_deref()) {
            (Some(PolicyChoice::Strict), _) | (None, None) => Ok(GradingPolicy::strict()),
            (Some(PolicyChoice::Institution), Some(name)) | (None, Some(name)) => {
                Ok(registry.policy_for(name))
            }
            (Some(PolicyChoice::Institution), None) => Err(ApiError::bad_request(
                "institution policy needs `institution`",
            )),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResponse {
    pub scale: String,
    #[serde(flatten)]
    pub summary: GradeSummary,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok", "version": state.version }))
}

async fn institutions_handler(State(state): State<AppState>) -> Json<Vec<Institution>> {
    Json(state.registry.institutions().to_vec())
}

async fn fingerprint_handler(
    Json(req): Json<FieldsRequest>,
) -> Result<Json<FingerprintResponse>, ApiError> {
    let fields = req.into_fields()?;
    let fp = compute_fingerprint(&fields);
    Ok(Json(FingerprintResponse {
        base64: fp.to_base64(),
        hex: fp.to_hex(),
        ambiguous: has_delimiter_collision(&fields),
    }))
}

async fn verify_handler(
    State(state): State<AppState>,
    Json(req): Json<VerifyRequest>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let fields = req.fields.into_fields()?;
    let verified = verify_base64(&fields, &req.digest);
    state.metrics.record_verification(verified);
    tracing::info!(verified, "fingerprint verification");
    Ok(Json(VerifyResponse { verified }))
}

async fn seal_handler(
    State(state): State<AppState>,
    Json(req): Json<SealRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let seat = match req.seat_number {
        Some(seat) => seat,
        None => {
            req.record
                .validate()
                .map_err(|e| ApiError::bad_request(e.to_string()))?;
            req.record.identifier().to_string()
        }
    };
    if seat.trim().is_empty() {
        return Err(ApiError::bad_request("seat number is blank"));
    }

    let payload = seal(&req.record, &seat)?;
    state.metrics.seals_total.inc();

    let body = if req.envelope {
        serde_json::to_value(NoteEnvelope::semester(payload))
    } else {
        serde_json::to_value(payload)
    }
    .map_err(|e| ApiError::bad_request(e.to_string()))?;
    Ok(Json(body))
}

async fn unseal_handler(
    State(state): State<AppState>,
    Json(req): Json<UnsealRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let payload = match (req.payload, req.note) {
        (Some(payload), None) => payload,
        (None, Some(note)) => NoteEnvelope::from_note_bytes(note.as_bytes())?.sealed_payload()?,
        _ => return Err(ApiError::bad_request("provide exactly one of `payload` or `note`")),
    };

    let result = if req.check_identifier {
        unseal_record::<serde_json::Value>(&payload, &req.seat_number)
    } else {
        unseal::<serde_json::Value>(&payload, &req.seat_number)
    };

    match result {
        Ok(record) => {
            state.metrics.unseals_total.inc();
            Ok(Json(record))
        }
        Err(e) => {
            match &e {
                SealError::Decryption(_) => state.metrics.record_unseal_failure("decryption"),
                SealError::IdentifierMismatch => {
                    state.metrics.record_unseal_failure("identifier_mismatch")
                }
                _ => {}
            }
            Err(e.into())
        }
    }
}

async fn aggregate_handler(
    State(state): State<AppState>,
    Json(req): Json<AggregateRequest>,
) -> Result<Json<AggregateResponse>, ApiError> {
    let policy = req.policy(&state.registry)?;
    let summary = aggregate(&req.courses, &policy)?;
    state.metrics.aggregations_total.inc();
    Ok(Json(AggregateResponse {
        scale: policy.scale.name.clone(),
        summary,
    }))
}
