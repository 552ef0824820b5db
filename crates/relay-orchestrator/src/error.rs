use relay_chain_solana::error::ChainError;
use relay_crypto::error::CryptoError;
use relay_swap::SwapError;
use relay_types::RelayError;
use relay_validator::SigDecodeError;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error(transparent)]
    Swap(#[from] SwapError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error("could not decode intent signature: {0}")]
    BadIntentSignature(#[from] SigDecodeError),
    #[error("executor program id is the zero address")]
    ZeroExecutorProgram,
    #[error("user deposit required")]
    NeedsDeposit {
        executor_program_id: String,
        user_deposit_pda: String,
        vault_pda: String,
        user_address: String,
    },
    #[error("intent carries no signer")]
    MissingSigner,
    #[error("pool not found for mint pair")]
    PoolNotFound,
    #[error("amount out of range")]
    AmountOutOfRange,
    #[error("another execution for this intent is already in flight")]
    AlreadyInFlight,
    #[error("execution deadline exceeded")]
    Timeout,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<OrchestratorError> for RelayError {
    fn from(err: OrchestratorError) -> Self {
        match err {
            OrchestratorError::Chain(e) => e.into(),
            OrchestratorError::Swap(e) => e.into(),
            OrchestratorError::Crypto(e) => e.into(),
            OrchestratorError::BadIntentSignature(_) => RelayError::BadSignature,
            OrchestratorError::ZeroExecutorProgram => {
                RelayError::Internal("executor program id not configured".into())
            }
            OrchestratorError::NeedsDeposit {
                executor_program_id,
                user_deposit_pda,
                vault_pda,
                user_address,
            } => RelayError::NeedsDeposit {
                executor_program_id,
                user_deposit_pda,
                vault_pda,
                user_address,
            },
            OrchestratorError::MissingSigner => RelayError::MalformedIntent("missing signer".into()),
            OrchestratorError::PoolNotFound => RelayError::PoolNotFound,
            OrchestratorError::AmountOutOfRange => RelayError::AmountOutOfRange,
            OrchestratorError::AlreadyInFlight => RelayError::AlreadyInFlight,
            OrchestratorError::Timeout => RelayError::Timeout,
            OrchestratorError::Internal(msg) => RelayError::Internal(msg),
        }
    }
}
