//! HTTP boundary: one handler per endpoint in the external interface table.
//! Each composes envelope decrypt (where applicable) → validator → registry
//! → orchestrator, translating the result into the shared `{error,
//! success:false, ...}` error contract via `RelayError`'s `IntoResponse`.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Json;
use relay_crypto::envelope::{Envelope, decrypt_envelope};
use relay_logger::LogKind;
use relay_orchestrator::OrchestratorError;
use relay_registry::RegistryError;
use relay_types::registry::{ExecutionPlan, IntentStatus, RegistryEntry, Route};
use relay_types::{RelayError, RelayResult, UnixTimestampMs};
use relay_validator::{Validator, ValidatorConfig};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/api/public-key", get(public_key))
        .route("/api/status", get(status))
        .route("/api/rpc-url", get(rpc_url))
        .route("/api/server-logs", get(server_logs))
        .route("/api/intent/{intent_hash}", get(get_intent))
        .route("/api/approve", post(approve))
        .route("/api/submit-solana-transaction", post(submit_solana_transaction))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn public_key(State(state): State<Arc<AppState>>) -> Json<relay_crypto::keypair::PublicKeyInfo> {
    Json(state.keypair.public_key_info())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CountersResponse {
    approved: usize,
    submitted: usize,
    executed: usize,
    failed: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    enclave_id: String,
    version: String,
    use_magicblock_per: bool,
    counters: CountersResponse,
    timestamp_ms: u64,
}

async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let identity = state.attestation.identity();
    let counts = state.registry.counts();
    Json(StatusResponse {
        enclave_id: identity.enclave_id,
        version: identity.version,
        use_magicblock_per: state.config.use_magicblock_per(),
        counters: CountersResponse {
            approved: counts.approved,
            submitted: counts.submitted,
            executed: counts.executed,
            failed: counts.failed,
        },
        timestamp_ms: identity.timestamp_ms,
    })
}

#[derive(Deserialize)]
struct RpcUrlQuery {
    network: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RpcUrlResponse {
    rpc_url: String,
}

async fn rpc_url(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RpcUrlQuery>,
) -> RelayResult<Json<RpcUrlResponse>> {
    let rpc_url = state
        .config
        .rpc_url_for_network(&query.network)
        .ok_or_else(|| RelayError::SchemaError(format!("unknown network '{}'", query.network)))?
        .to_string();
    Ok(Json(RpcUrlResponse { rpc_url }))
}

#[derive(Deserialize)]
struct ServerLogsQuery {
    #[serde(default)]
    since: u64,
}

#[derive(Serialize)]
struct ServerLogsResponse {
    logs: Vec<relay_logger::LogEntry>,
}

async fn server_logs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ServerLogsQuery>,
) -> Json<ServerLogsResponse> {
    Json(ServerLogsResponse {
        logs: state.logger.since(query.since),
    })
}

async fn get_intent(
    State(state): State<Arc<AppState>>,
    Path(intent_hash): Path<String>,
) -> RelayResult<Json<RegistryEntry>> {
    state.registry.get(&intent_hash).map(Json).ok_or(RelayError::NotFound)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ApproveResponse {
    approved: bool,
    signature: String,
    execution_plan: ExecutionPlan,
    enclave_id: String,
    attestation: relay_crypto::attestation::EnclaveIdentity,
    timestamp: u64,
}

async fn approve(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<Envelope>,
) -> RelayResult<Json<ApproveResponse>> {
    let mut intent = decrypt_envelope(&state.keypair, &envelope, state.config.legacy_envelope_allowed())?;

    let validator = Validator::new(
        &state.registry,
        ValidatorConfig {
            skip_signature_verification: state.config.skip_signature_verification(),
        },
    );
    let now_ms = UnixTimestampMs::now().as_millis();
    let hash = validator.validate(&intent, now_ms)?;
    // The intent may have arrived without (or with a zero) `intent_hash`; the
    // validator recomputed it canonically, and everything downstream
    // (registry key, funding instruction, replay guard) must agree on it.
    intent.intent_hash = Some(hash.clone());

    match state.registry.try_reserve(&hash, intent.clone()) {
        Ok(_) => {}
        Err(RegistryError::Replay) => return Err(RelayError::Replay),
        Err(RegistryError::NotFound) => unreachable!("try_reserve never returns NotFound"),
    }

    let route = relay_orchestrator::classify_route(&intent.transaction);
    let estimated_price_lamports = relay_orchestrator::amount::extract_required_lamports(
        &intent.transaction,
        state.config.minimum_floor_lamports(),
    );
    let plan = ExecutionPlan {
        route,
        estimated_price_lamports,
        max_slippage_bps: intent.limits.max_slippage_bps,
        timestamp_ms: now_ms,
    };
    let plan_json = serde_json::to_string(&plan).map_err(|e| RelayError::Internal(e.to_string()))?;

    let identity = state.attestation.identity();
    let signature = state.attestation.sign_approval(&hash, &plan_json, identity.timestamp_ms);
    state.registry.attach_plan(&hash, plan.clone(), signature.clone());

    state.logger.push(format!("approved intent {hash}"), LogKind::Success, "approve");

    Ok(Json(ApproveResponse {
        approved: true,
        signature,
        execution_plan: plan,
        enclave_id: identity.enclave_id.clone(),
        attestation: identity,
        timestamp: now_ms,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest {
    encrypted_intent: Envelope,
    /// Accepted for wire compatibility with the browser collaborator; the
    /// authoritative transaction payload is the one inside the decrypted
    /// intent, so these are not otherwise consulted.
    #[serde(default)]
    #[allow(dead_code)]
    transaction_data: Option<serde_json::Value>,
    #[serde(default)]
    #[allow(dead_code)]
    method: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    success: bool,
    signature: String,
    explorer_url: String,
    route: Route,
    #[serde(skip_serializing_if = "Option::is_none")]
    payout_signature: Option<String>,
}

async fn submit_solana_transaction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitRequest>,
) -> RelayResult<Json<SubmitResponse>> {
    let mut intent = decrypt_envelope(
        &state.keypair,
        &request.encrypted_intent,
        state.config.legacy_envelope_allowed(),
    )?;

    let validator = Validator::new(
        &state.registry,
        ValidatorConfig {
            skip_signature_verification: state.config.skip_signature_verification(),
        },
    );
    let now_ms = UnixTimestampMs::now().as_millis();
    let hash = validator.validate(&intent, now_ms)?;
    intent.intent_hash = Some(hash.clone());

    match state.registry.try_reserve(&hash, intent.clone()) {
        Ok(_) => {}
        Err(RegistryError::Replay) => return Err(RelayError::Replay),
        Err(RegistryError::NotFound) => unreachable!("try_reserve never returns NotFound"),
    }
    state.registry.mark(&hash, IntentStatus::Submitted, None);

    match state.orchestrator.execute(&intent).await {
        Ok(outcome) => {
            state.chain.spawn_watcher(
                state.registry_handle.clone(),
                hash.clone(),
                outcome.chain_signature.clone(),
            );
            state.logger.push(format!("submitted intent {hash}"), LogKind::Success, "submit");
            Ok(Json(SubmitResponse {
                success: true,
                signature: outcome.chain_signature,
                explorer_url: outcome.explorer_url,
                route: outcome.route,
                payout_signature: outcome.payout_signature,
            }))
        }
        Err(OrchestratorError::Timeout) => {
            // Registry stays `submitted`; without a broadcast signature to
            // watch there is nothing further this handler can do for it.
            state
                .logger
                .push(format!("intent {hash} timed out awaiting confirmation"), LogKind::Warn, "submit");
            Err(RelayError::Timeout)
        }
        Err(err) => {
            state.registry.mark(&hash, IntentStatus::Failed, None);
            state
                .logger
                .push(format!("intent {hash} failed: {err}"), LogKind::Error, "submit");
            Err(err.into())
        }
    }
}
