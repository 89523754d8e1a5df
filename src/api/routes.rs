use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::cosign::TransactionCoSigner;
use crate::observability::{MetricsRegistry, TimingGuard};
use crate::rules::evaluate_parts;
use crate::signer::AttestationSigner;

use super::request::{
    required, EncodedRequest, ProcessAndSendRequest, ProcessRequest, SendSignedRequest,
    SendVersionedRequest, VerifyRequest,
};
use super::response::{
    cosign_response, ApiError, HealthResponse, SuccessResponse, ValidResponse, VerifyResponse,
};

/// Shared application state.
pub struct AppState {
    /// Transaction co-signer
    pub co_signer: Arc<TransactionCoSigner>,

    /// Rule attestation signer
    pub attester: AttestationSigner,

    pub metrics: Arc<MetricsRegistry>,

    /// Application start time
    pub start_time: Instant,

    /// Application version
    pub version: String,

    /// CORS preflight cache lifetime
    pub cors_max_age: Duration,
}

/// Create the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::permissive().max_age(state.cors_max_age);

    Router::new()
        .route("/health", get(handle_health))
        .route("/metrics", get(handle_metrics))
        .route("/verify", post(handle_verify))
        .route("/validate-transaction", post(handle_validate_transaction))
        .route("/process-transaction", post(handle_process_transaction))
        .route(
            "/process-and-send-transaction",
            post(handle_process_and_send_transaction),
        )
        .route("/send-signed-transaction", post(handle_send_signed_transaction))
        .route("/send-versioned-message", post(handle_send_versioned_message))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

/// Evaluate a rule and, if it passes, attest it.
async fn handle_verify(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let _timing = TimingGuard::new(&state.metrics);
    let request_id = Uuid::new_v4();
    let Json(req) = payload.map_err(|rejection| {
        warn!(%request_id, error = %rejection.body_text(), "unreadable verify request");
        ApiError::Verification(rejection.body_text())
    })?;
    let params = req.params;
    let kind = params.style;

    let passed = evaluate_parts(
        kind.clone(),
        params.data,
        &params.user,
        params.choices.as_deref(),
    );
    state.metrics.record_rule_evaluation(passed);

    if !passed {
        info!(%request_id, rule_kind = %kind, "rule failed");
        return Ok(Json(VerifyResponse::invalid()));
    }

    let attestation = state
        .attester
        .attest(params.u.as_deref().unwrap_or_default(), &kind)
        .map_err(|err| {
            warn!(%request_id, rule_kind = %kind, error = %err, "attestation failed");
            ApiError::Verification(err.to_string())
        })?;
    state.metrics.record_attestation();

    info!(
        %request_id,
        rule_kind = %kind,
        message = %attestation.message,
        "rule attested"
    );

    Ok(Json(VerifyResponse::passed(
        attestation.message,
        attestation.instruction,
    )))
}

/// Check the layout of a full wire transaction.
async fn handle_validate_transaction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<EncodedRequest>,
) -> Result<Json<ValidResponse>, ApiError> {
    let [encoded] = required(
        [req.encoded_transaction.as_deref()],
        "Missing required parameter: encodedTransaction",
    )?;

    let report = state.co_signer.validate_transaction_format(encoded);
    if !report.valid {
        return Err(ApiError::InvalidFormat(report));
    }

    Ok(Json(ValidResponse {
        status: "Valid",
        instruction_count: report.instruction_count,
        signature_count: report.signature_count,
    }))
}

/// Sign a message without submitting it.
async fn handle_process_transaction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let _timing = TimingGuard::new(&state.metrics);
    let [encoded, rule_type] = required(
        [req.encoded_transaction.as_deref(), req.rule_type.as_deref()],
        "Missing required parameters: encodedTransaction and rule_type",
    )?;
    let request_id = Uuid::new_v4();

    let result = state
        .co_signer
        .process_message(encoded, rule_type.parse().ok());
    state.metrics.record_cosign(&result, false);
    log_outcome(request_id, "process-transaction", &result);

    cosign_response(result, "Transaction processing failed")
}

/// Co-sign into the service slot, broadcasting if configured.
async fn handle_process_and_send_transaction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessAndSendRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let _timing = TimingGuard::new(&state.metrics);
    let [encoded, rule_type] = required(
        [req.encoded_transaction.as_deref(), req.rule_type.as_deref()],
        "Missing required parameters: encodedTransaction and rule_type",
    )?;
    let request_id = Uuid::new_v4();

    let result = state
        .co_signer
        .process_and_co_sign(
            encoded,
            rule_type.parse().ok(),
            req.network.unwrap_or_default(),
            req.options.unwrap_or_default(),
        )
        .await;
    let broadcast = state.co_signer.settings().broadcast_on_co_sign;
    state.metrics.record_cosign(&result, broadcast);
    log_outcome(request_id, "process-and-send-transaction", &result);

    cosign_response(result, "Transaction processing and sending failed")
}

/// Merge an external signature, sign, and submit.
async fn handle_send_signed_transaction(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendSignedRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let _timing = TimingGuard::new(&state.metrics);
    let [encoded, signature] = required(
        [req.encoded_transaction.as_deref(), req.signature.as_deref()],
        "Missing required parameters: encodedTransaction and signature",
    )?;
    let request_id = Uuid::new_v4();

    let result = state
        .co_signer
        .co_sign_and_submit(
            encoded,
            signature,
            req.network.unwrap_or_default(),
            req.options.unwrap_or_default(),
        )
        .await;
    state.metrics.record_cosign(&result, true);
    log_outcome(request_id, "send-signed-transaction", &result);

    cosign_response(result, "Transaction sending failed")
}

/// Sign as the only service signer and submit.
async fn handle_send_versioned_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SendVersionedRequest>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let _timing = TimingGuard::new(&state.metrics);
    let [encoded] = required(
        [req.encoded_transaction.as_deref()],
        "Missing required parameter: encodedTransaction",
    )?;
    let request_id = Uuid::new_v4();

    let result = state
        .co_signer
        .sign_and_submit_versioned_message(
            encoded,
            req.network.unwrap_or_default(),
            req.options.unwrap_or_default(),
        )
        .await;
    state.metrics.record_cosign(&result, true);
    log_outcome(request_id, "send-versioned-message", &result);

    cosign_response(result, "Versioned message sending failed")
}

fn log_outcome(request_id: Uuid, route: &'static str, result: &crate::domain::TransactionResult) {
    if result.success {
        info!(
            %request_id,
            route,
            transaction_id = result.transaction_id.as_deref().unwrap_or("-"),
            "request completed"
        );
    } else {
        warn!(
            %request_id,
            route,
            error = result.error.as_deref().unwrap_or("-"),
            "request failed"
        );
    }
}

/// Health check endpoint.
async fn handle_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        public_key: state.co_signer.pubkey().to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// Metrics endpoint (Prometheus format).
async fn handle_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let metrics = format!(
        r#"# HELP cap_oracle_uptime_seconds Application uptime in seconds
# TYPE cap_oracle_uptime_seconds counter
cap_oracle_uptime_seconds {}

{}"#,
        state.start_time.elapsed().as_secs(),
        state.metrics.to_prometheus(),
    );

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; charset=utf-8",
        )],
        metrics,
    )
}
