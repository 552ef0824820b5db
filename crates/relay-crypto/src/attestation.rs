//! TEE attestation stub.
//!
//! Publishes an enclave identity and signs approvals with a deterministic
//! digest. This never claims to be a hardware quote: production deployments
//! swap the signing step for a real enclave attestation behind the same
//! `{enclave_id, version, timestamp_ms}` + signature wire contract, so no
//! boundary code changes when it does.

use relay_types::UnixTimestampMs;
use serde::Serialize;
use sha2::{Digest, Sha256};

const SIGNATURE_LEN: usize = 65;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnclaveIdentity {
    pub enclave_id: String,
    pub version: String,
    pub timestamp_ms: u64,
}

pub struct AttestationService {
    enclave_id: String,
    version: String,
}

impl AttestationService {
    pub fn new(enclave_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            enclave_id: enclave_id.into(),
            version: version.into(),
        }
    }

    pub fn identity(&self) -> EnclaveIdentity {
        EnclaveIdentity {
            enclave_id: self.enclave_id.clone(),
            version: self.version.clone(),
            timestamp_ms: UnixTimestampMs::now().as_millis(),
        }
    }

    /// Signs an approval: a deterministic SHA-256 digest over
    /// `{intent_hash, execution_plan, enclave_id, timestamp_ms}`, zero-padded
    /// to 65 bytes (the length of a real secp256k1/recoverable signature),
    /// and hex-encoded.
    pub fn sign_approval(
        &self,
        intent_hash: &str,
        execution_plan_json: &str,
        timestamp_ms: u64,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(intent_hash.as_bytes());
        hasher.update(execution_plan_json.as_bytes());
        hasher.update(self.enclave_id.as_bytes());
        hasher.update(timestamp_ms.to_le_bytes());
        let digest = hasher.finalize();

        let mut padded = [0u8; SIGNATURE_LEN];
        padded[..digest.len()].copy_from_slice(&digest);
        hex::encode(padded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_65_bytes_hex() {
        let service = AttestationService::new("enclave-1", "0.1.0");
        let sig = service.sign_approval("0xabc", "{}", 1_700_000_000_000);
        assert_eq!(sig.len(), 65 * 2);
    }

    #[test]
    fn is_deterministic() {
        let service = AttestationService::new("enclave-1", "0.1.0");
        let a = service.sign_approval("0xabc", "{}", 1_700_000_000_000);
        let b = service.sign_approval("0xabc", "{}", 1_700_000_000_000);
        assert_eq!(a, b);
    }
}
