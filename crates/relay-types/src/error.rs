//! The relay's one shared error taxonomy.
//!
//! Every component (envelope, validator, registry, orchestrator, pool
//! discovery, swap builder, chain I/O) returns its own narrow error type, and
//! converts it into this sum via `From`. The HTTP boundary needs exactly one
//! place to decide status codes and body shapes, mirroring how a layered
//! facilitator maps every scheme-level error into one response type instead
//! of matching deep call stacks at the edge.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("TEE decryption failed: {0}")]
    Decryption(String),

    #[error("malformed intent: {0}")]
    MalformedIntent(String),

    #[error("schema error: {0}")]
    SchemaError(String),

    #[error("intent expired {overflow_s:.1} seconds ago")]
    Expired { overflow_s: f64 },

    #[error("intent timestamp too old")]
    TooOld,

    #[error("already processed")]
    Replay,

    #[error("invalid signature")]
    BadSignature,

    #[error("rate limited")]
    RateLimited { retry_after_s: u64 },

    #[error("deposit required")]
    NeedsDeposit {
        executor_program_id: String,
        user_deposit_pda: String,
        vault_pda: String,
        user_address: String,
    },

    #[error("user signature required")]
    NeedsUserSignature,

    #[error("pool not found")]
    PoolNotFound,

    #[error("amount out of range")]
    AmountOutOfRange,

    #[error("rpc error: {0}")]
    Rpc(String),

    #[error("already in flight")]
    AlreadyInFlight,

    #[error("request timed out")]
    Timeout,

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::Decryption(_)
            | RelayError::MalformedIntent(_)
            | RelayError::SchemaError(_)
            | RelayError::Expired { .. }
            | RelayError::TooOld
            | RelayError::Replay
            | RelayError::NeedsDeposit { .. }
            | RelayError::NeedsUserSignature
            | RelayError::AmountOutOfRange
            | RelayError::AlreadyInFlight => StatusCode::BAD_REQUEST,
            RelayError::BadSignature => StatusCode::UNAUTHORIZED,
            RelayError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            RelayError::NotFound => StatusCode::NOT_FOUND,
            RelayError::PoolNotFound | RelayError::Rpc(_) => StatusCode::BAD_GATEWAY,
            RelayError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            RelayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    success: bool,
    #[serde(flatten)]
    extra: serde_json::Value,
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();
        let extra = match &self {
            RelayError::RateLimited { retry_after_s } => json!({ "retryAfter": retry_after_s }),
            RelayError::NeedsDeposit {
                executor_program_id,
                user_deposit_pda,
                vault_pda,
                user_address,
            } => json!({
                "needsDeposit": true,
                "executorProgramId": executor_program_id,
                "userDepositPDA": user_deposit_pda,
                "vaultPDA": vault_pda,
                "userAddress": user_address,
            }),
            RelayError::NeedsUserSignature => json!({ "needsUserSignature": true }),
            _ => json!({}),
        };
        if !matches!(
            self,
            RelayError::NeedsDeposit { .. }
                | RelayError::NeedsUserSignature
                | RelayError::Expired { .. }
                | RelayError::TooOld
                | RelayError::Replay
                | RelayError::RateLimited { .. }
                | RelayError::BadSignature
                | RelayError::MalformedIntent(_)
                | RelayError::SchemaError(_)
                | RelayError::AmountOutOfRange
                | RelayError::AlreadyInFlight
                | RelayError::NotFound
        ) {
            tracing::warn!(error = %message, "relay request failed");
        }
        let body = ErrorBody {
            error: message,
            success: false,
            extra,
        };
        (status, Json(body)).into_response()
    }
}

pub type RelayResult<T> = Result<T, RelayError>;
