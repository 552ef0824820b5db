//! Intent validator: expiry, replay guard and signature verification.
//!
//! Pure with respect to the registry: validation never mutates lifecycle
//! state, it only reads it through [`ReplayLookup`] to detect resubmission.

mod sig;

pub use sig::{SigDecodeError, decode_signature, decode_signer};

use ed25519_dalek::Verifier;
use relay_types::intent::Intent;
use relay_types::{CanonicalIntentView, IntentStatus, RelayError, ReplayLookup};
use thiserror::Error;

const MAX_INTENT_AGE_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("intent expired {overflow_s:.1} seconds ago")]
    Expired { overflow_s: f64 },
    #[error("intent timestamp too old")]
    TooOld,
    #[error("already processed")]
    Replay,
    #[error("invalid signature")]
    BadSignature,
    #[error("schema error: {0}")]
    SchemaError(String),
}

impl From<ValidationError> for RelayError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::Expired { overflow_s } => RelayError::Expired { overflow_s },
            ValidationError::TooOld => RelayError::TooOld,
            ValidationError::Replay => RelayError::Replay,
            ValidationError::BadSignature => RelayError::BadSignature,
            ValidationError::SchemaError(msg) => RelayError::SchemaError(msg),
        }
    }
}

pub struct ValidatorConfig {
    /// Bypasses signature verification entirely. Fatal-logged; must never be
    /// set in a release build's default configuration.
    pub skip_signature_verification: bool,
}

pub struct Validator<'a, R: ReplayLookup> {
    registry: &'a R,
    config: ValidatorConfig,
}

impl<'a, R: ReplayLookup> Validator<'a, R> {
    pub fn new(registry: &'a R, config: ValidatorConfig) -> Self {
        if config.skip_signature_verification {
            tracing::error!(
                "SKIP_SIGNATURE_VERIFICATION is enabled - signatures are NOT being checked"
            );
        }
        Self { registry, config }
    }

    /// Runs the five-step algorithm in order, short-circuiting on the first
    /// failure. Returns the intent's canonical hash on success.
    pub fn validate(&self, intent: &Intent, now_ms: u64) -> Result<String, ValidationError> {
        if let Some(expiry_ms) = intent.expiry_ms {
            if now_ms > expiry_ms {
                let overflow_s = (now_ms - expiry_ms) as f64 / 1000.0;
                return Err(ValidationError::Expired { overflow_s });
            }
        }

        let age_ms = now_ms as i64 - intent.timestamp_ms as i64;
        if age_ms > MAX_INTENT_AGE_MS {
            return Err(ValidationError::TooOld);
        }

        let hash = match &intent.intent_hash {
            Some(h) if !h.is_empty() && h != "0x0" => h.clone(),
            _ => CanonicalIntentView::from_intent(intent).hex_digest(),
        };

        if let Some(status) = self.registry.status_of(&hash) {
            if status != IntentStatus::Approved {
                return Err(ValidationError::Replay);
            }
        }

        if self.config.skip_signature_verification {
            return Ok(hash);
        }

        let signer_b58 = intent
            .signer
            .as_deref()
            .ok_or_else(|| ValidationError::SchemaError("missing signer".into()))?;
        let signature_raw = intent
            .signature
            .as_deref()
            .ok_or_else(|| ValidationError::SchemaError("missing signature".into()))?;

        let verifying_key =
            decode_signer(signer_b58).map_err(|_| ValidationError::BadSignature)?;
        let signature =
            decode_signature(signature_raw).map_err(|_| ValidationError::BadSignature)?;

        let message = CanonicalIntentView::from_intent(intent).signing_message();
        verifying_key
            .verify(&message, &signature)
            .map_err(|_| ValidationError::BadSignature)?;

        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};
    use relay_types::intent::{Action, Limits, Metadata, TransactionData};

    struct EmptyRegistry;
    impl ReplayLookup for EmptyRegistry {
        fn status_of(&self, _intent_hash: &str) -> Option<IntentStatus> {
            None
        }
    }

    fn signed_intent(signing_key: &SigningKey, timestamp_ms: u64, expiry_ms: u64) -> Intent {
        let mut intent = Intent {
            version: "1".into(),
            chain_id: "solana".into(),
            network: "devnet".into(),
            action: Action::Swap,
            transaction_type: None,
            timestamp_ms,
            expiry_ms: Some(expiry_ms),
            transaction: TransactionData::default(),
            limits: Limits::default(),
            metadata: Metadata::default(),
            swap_details: None,
            approval_details: None,
            swap_params: None,
            signer: Some(bs58::encode(signing_key.verifying_key().to_bytes()).into_string()),
            signature: None,
            intent_hash: None,
        };
        let message = CanonicalIntentView::from_intent(&intent).signing_message();
        let signature = signing_key.sign(&message);
        intent.signature = Some(hex::encode(signature.to_bytes()));
        intent
    }

    #[test]
    fn accepts_valid_signature() {
        let signing_key = SigningKey::from_bytes(&[9u8; 32]);
        let now = 1_700_000_000_000;
        let intent = signed_intent(&signing_key, now, now + 300_000);
        let registry = EmptyRegistry;
        let validator = Validator::new(
            &registry,
            ValidatorConfig {
                skip_signature_verification: false,
            },
        );
        assert!(validator.validate(&intent, now).is_ok());
    }

    #[test]
    fn rejects_mutated_intent() {
        let signing_key = SigningKey::from_bytes(&[9u8; 32]);
        let now = 1_700_000_000_000;
        let mut intent = signed_intent(&signing_key, now, now + 300_000);
        intent.timestamp_ms += 1;
        let registry = EmptyRegistry;
        let validator = Validator::new(
            &registry,
            ValidatorConfig {
                skip_signature_verification: false,
            },
        );
        assert!(matches!(
            validator.validate(&intent, now),
            Err(ValidationError::BadSignature)
        ));
    }

    #[test]
    fn rejects_expired_intent() {
        let signing_key = SigningKey::from_bytes(&[9u8; 32]);
        let now = 1_700_000_000_000;
        let intent = signed_intent(&signing_key, now - 400_000, now - 1_000);
        let registry = EmptyRegistry;
        let validator = Validator::new(
            &registry,
            ValidatorConfig {
                skip_signature_verification: false,
            },
        );
        assert!(matches!(
            validator.validate(&intent, now),
            Err(ValidationError::Expired { .. })
        ));
    }
}
