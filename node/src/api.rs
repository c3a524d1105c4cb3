//! # HTTP API
//!
//! Builds the axum router for the verifier service. Handlers share state
//! through axum's `State` extractor.
//!
//! ## Endpoints
//!
//! | Method | Path            | Description                                      |
//! |--------|-----------------|--------------------------------------------------|
//! | GET    | `/health`       | Liveness probe                                   |
//! | POST   | `/summary`      | Per-category totals for a transaction set        |
//! | POST   | `/attestations` | Unsigned attestation plus the wallet payload     |
//! | POST   | `/verify`       | Verify a proof bundle                            |
//!
//! `/verify` always answers 200 with a verification result; a body that
//! does not parse (bundle, transactions or anything else) is reported as
//! `malformed_input`. The other endpoints use
//! 400 for unusable input and 422 when the claim would be false.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Bytes,
    extract::State,
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use spend_attest::attestation::{
    build_attestation, unix_now, verify_at, AttestationError, AttestationMessage, ProofBundle,
    RejectReason, TypedData, VerificationResult,
};
use spend_attest::commitment::TimeBucket;
use spend_attest::identity::Address;
use spend_attest::transaction::{summarize_by_category, CategorySummary, TransactionRecord};

use crate::cli::parse_threshold;
use crate::metrics::SharedMetrics;

// ---------------------------------------------------------------------------
// Application State
// ---------------------------------------------------------------------------

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The service's reported version string.
    pub version: String,
    /// Prometheus metrics for in-handler recording.
    pub metrics: SharedMetrics,
    /// Clock used for issuance and expiry. Swapped out in tests.
    pub clock: Arc<dyn Fn() -> u64 + Send + Sync>,
}

impl AppState {
    pub fn new(version: String, metrics: SharedMetrics) -> Self {
        Self {
            version,
            metrics,
            clock: Arc::new(unix_now),
        }
    }

    fn now(&self) -> u64 {
        (self.clock)()
    }
}

// ---------------------------------------------------------------------------
// Router Construction
// ---------------------------------------------------------------------------

/// Builds the axum [`Router`] with all API routes, CORS, and tracing.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/summary", post(summary_handler))
        .route("/attestations", post(attestation_handler))
        .route("/verify", post(verify_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response Types
// ---------------------------------------------------------------------------

/// Error body for 4xx responses.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct SummaryRequest {
    pub transactions: Vec<TransactionRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationRequest {
    pub transactions: Vec<TransactionRecord>,
    pub category: String,
    /// Threshold in currency units, as a number or a decimal string.
    pub threshold: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationResponse {
    pub message: AttestationMessage,
    pub time_bucket: TimeBucket,
    /// Payload to hand to the wallet's structured-data signing call.
    pub typed_data: serde_json::Value,
}

/// `/verify` body. Parsed by the handler rather than an extractor so that a
/// body that fails to parse is answered with `malformed_input`, not a 4xx.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub bundle: ProofBundle,
    /// Expected signer. Defaults to the address recorded in the bundle.
    #[serde(default)]
    pub claimed_signer: Option<String>,
    #[serde(default)]
    pub transactions: Option<Vec<TransactionRecord>>,
    #[serde(default)]
    pub category: Option<String>,
}

fn error_response(status: StatusCode, code: &str, error: impl ToString) -> Response {
    let body = ErrorResponse {
        code: code.to_string(),
        error: error.to_string(),
    };
    (status, Json(body)).into_response()
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// `GET /health`: 200 while the process is alive.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "ok", "version": state.version })),
    )
}

/// `POST /summary`
async fn summary_handler(Json(req): Json<SummaryRequest>) -> Response {
    match summarize_by_category(&req.transactions) {
        Ok(summary) => (StatusCode::OK, Json::<Vec<CategorySummary>>(summary)).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, "malformed_input", e),
    }
}

/// `POST /attestations`: build the unsigned message. Refuses with 422 when
/// the category total is below the threshold, since the wallet would be
/// asked to sign a false statement.
async fn attestation_handler(
    State(state): State<AppState>,
    Json(req): Json<AttestationRequest>,
) -> Response {
    let threshold = match threshold_from_json(&req.threshold) {
        Ok(t) => t,
        Err(e) => {
            state.metrics.attestation_failures_total.inc();
            return error_response(StatusCode::BAD_REQUEST, "malformed_input", e);
        }
    };

    let message = match build_attestation(&req.transactions, &req.category, threshold, state.now()) {
        Ok(message) => message,
        Err(e) => {
            state.metrics.attestation_failures_total.inc();
            return match e {
                AttestationError::MalformedInput(_) => {
                    error_response(StatusCode::BAD_REQUEST, "malformed_input", e)
                }
                _ => {
                    tracing::error!(error = %e, "attestation build failed");
                    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal", e)
                }
            };
        }
    };

    if message.value_cents < threshold {
        state.metrics.attestation_failures_total.inc();
        let err = AttestationError::ThresholdNotMet {
            value: message.value_cents as i64,
            threshold,
        };
        return error_response(StatusCode::UNPROCESSABLE_ENTITY, "threshold_not_met", err);
    }

    state.metrics.attestations_built_total.inc();
    let time_bucket = message.time_bucket();
    let typed = TypedData::new(message);
    let resp = AttestationResponse {
        typed_data: typed.to_json(),
        message: typed.into_message(),
        time_bucket,
    };
    (StatusCode::OK, Json(resp)).into_response()
}

/// `POST /verify`
async fn verify_handler(State(state): State<AppState>, body: Bytes) -> Json<VerificationResult> {
    let started = Instant::now();
    let result = verify_request(&body, state.now());
    state.metrics.record_verification(&result, started.elapsed());
    Json(result)
}

fn verify_request(body: &[u8], now: u64) -> VerificationResult {
    let malformed = VerificationResult::reject(RejectReason::MalformedInput);

    let req: VerifyRequest = match serde_json::from_slice(body) {
        Ok(req) => req,
        Err(e) => {
            tracing::debug!(error = %e, "verify request does not parse");
            return malformed;
        }
    };
    let claimed = match &req.claimed_signer {
        Some(text) => match text.parse::<Address>() {
            Ok(address) => address,
            Err(_) => return malformed,
        },
        None => {
            tracing::warn!("no claimedSigner given; checking against the bundle's own signer");
            req.bundle.signer
        }
    };

    verify_at(
        &req.bundle,
        &claimed,
        req.transactions.as_deref(),
        req.category.as_deref(),
        now,
    )
}

fn threshold_from_json(value: &serde_json::Value) -> Result<u64, String> {
    match value {
        serde_json::Value::Number(n) => parse_threshold(&n.to_string()),
        serde_json::Value::String(s) => parse_threshold(s),
        _ => Err("threshold must be a number".into()),
    }
}
