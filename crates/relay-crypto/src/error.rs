use relay_types::RelayError;

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("{0}")]
    Decryption(String),
    #[error("malformed intent: {0}")]
    MalformedIntent(String),
    #[error("legacy envelopes are disabled by configuration")]
    LegacyEnvelopeDisabled,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("keypair error: {0}")]
    Keypair(String),
}

impl From<CryptoError> for RelayError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::Decryption(msg) => RelayError::Decryption(msg),
            CryptoError::MalformedIntent(msg) => RelayError::MalformedIntent(msg),
            CryptoError::LegacyEnvelopeDisabled => {
                RelayError::Decryption("legacy envelopes are disabled".into())
            }
            CryptoError::Io(e) => RelayError::Internal(e.to_string()),
            CryptoError::Keypair(msg) => RelayError::Internal(msg),
        }
    }
}
