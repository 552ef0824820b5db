use relay_types::RelayError;

#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("invalid pubkey: {0}")]
    InvalidPubkey(String),
    #[error("transaction confirmation timed out")]
    Timeout,
    #[error("transaction failed on-chain: {0}")]
    TransactionFailed(String),
}

impl From<solana_client::client_error::ClientError> for ChainError {
    fn from(err: solana_client::client_error::ClientError) -> Self {
        ChainError::Rpc(err.to_string())
    }
}

impl From<ChainError> for RelayError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::Rpc(msg) => RelayError::Rpc(msg),
            ChainError::InvalidPubkey(msg) => RelayError::Internal(msg),
            ChainError::Timeout => RelayError::Timeout,
            ChainError::TransactionFailed(msg) => RelayError::Rpc(msg),
        }
    }
}
