//! Canonical intent serialization and hashing.
//!
//! The browser-side signer hashes a JSON view of the intent with the
//! authentication fields removed, then signs the hex string of that hash. The
//! server must reproduce *exactly* the same bytes or every signature check
//! fails. `serde_json`'s `preserve_order` feature (backed by `indexmap`) keeps
//! this module's map insertion order equal to wire arrival order — the
//! browser's `JSON.stringify` relies on the same "first write wins position"
//! behavior, so there is no key-sorting step here, by design.

use crate::intent::Intent;
use sha2::{Digest, Sha256};

/// Fields excluded from the canonical hash view because they are either the
/// authentication material itself or derived from it.
const EXCLUDED_FIELDS: &[&str] = &["signature", "signed_transaction", "intent_hash", "signer"];

/// A `serde_json::Value` view of an intent with the authentication fields
/// dropped, used both to compute `intent_hash` and to re-verify a caller's
/// hash claim against a freshly decrypted intent.
pub struct CanonicalIntentView(serde_json::Value);

impl CanonicalIntentView {
    /// Build the canonical view from an already-deserialized `Intent`.
    ///
    /// `serde_json::to_value` walks the struct in field-declaration order,
    /// which is also wire arrival order for intents that came in over the
    /// envelope unchanged, satisfying the invariant above.
    pub fn from_intent(intent: &Intent) -> Self {
        let mut value = serde_json::to_value(intent).expect("Intent always serializes");
        Self::strip_excluded(&mut value);
        Self::fold_legacy_shape(&mut value);
        CanonicalIntentView(value)
    }

    /// Build the canonical view directly from a raw decrypted JSON payload,
    /// before it has been parsed into an `Intent`. Used when re-validating a
    /// caller-supplied `intentHash` against the bytes actually received,
    /// independent of any struct round-trip.
    pub fn from_raw(mut value: serde_json::Value) -> Self {
        Self::strip_excluded(&mut value);
        Self::fold_legacy_shape(&mut value);
        CanonicalIntentView(value)
    }

    fn strip_excluded(value: &mut serde_json::Value) {
        if let serde_json::Value::Object(map) = value {
            for field in EXCLUDED_FIELDS {
                map.remove(*field);
            }
        }
    }

    /// Some legacy intents carry `instructions`/`timestamp`/`dapp`/`action`
    /// at the top level instead of nested under `transaction`/`metadata`.
    /// If the stripped view has no top-level `instructions`, fold the
    /// nested fields up so both shapes hash identically.
    fn fold_legacy_shape(value: &mut serde_json::Value) {
        let serde_json::Value::Object(map) = value else {
            return;
        };
        if map.contains_key("instructions") {
            return;
        }
        let instructions = map
            .get("transaction")
            .and_then(|t| t.get("instructions"))
            .cloned()
            .unwrap_or(serde_json::Value::Array(vec![]));
        map.insert("instructions".to_string(), instructions);
        if let Some(timestamp) = map.get("timestampMs").cloned() {
            map.insert("timestamp".to_string(), timestamp);
        }
        let dapp = map
            .get("metadata")
            .and_then(|m| m.get("dappUrl"))
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        map.insert("dapp".to_string(), dapp);
        if let Some(action) = map.get("action").cloned() {
            map.insert("action".to_string(), action);
        }
        if let Some(tx_type) = map.get("transactionType").cloned() {
            map.insert("transactionType".to_string(), tx_type);
        }
    }

    /// The compact JSON bytes this view hashes over.
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.0).expect("canonical value always serializes")
    }

    /// 32-byte SHA-256 digest of the canonical JSON bytes.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.to_bytes());
        hasher.finalize().into()
    }

    /// The hex-encoded, `0x`-prefixed digest string. This — not the raw
    /// digest bytes — is the message the page-context signer actually signs.
    pub fn hex_digest(&self) -> String {
        format!("0x{}", hex::encode(self.digest()))
    }

    /// The exact UTF-8 bytes an Ed25519 signature must verify against: the
    /// 66-byte `0x`-prefixed lowercase hex string, not the 32 raw hash bytes.
    pub fn signing_message(&self) -> Vec<u8> {
        self.hex_digest().into_bytes()
    }
}

/// Computes `intent_hash` (the hex digest string) for an `Intent`.
pub fn intent_hash(intent: &Intent) -> String {
    CanonicalIntentView::from_intent(intent).hex_digest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::{Action, Limits, Metadata, TransactionData};

    fn sample_intent() -> Intent {
        Intent {
            version: "1".into(),
            chain_id: "solana".into(),
            network: "devnet".into(),
            action: Action::Swap,
            transaction_type: Some("SWAP/TRANSFER".into()),
            timestamp_ms: 1_700_000_000_000,
            expiry_ms: Some(1_700_000_300_000),
            transaction: TransactionData::default(),
            limits: Limits::default(),
            metadata: Metadata {
                dapp_url: Some("https://example.dapp".into()),
                dapp_name: Some("Example".into()),
            },
            swap_details: None,
            approval_details: None,
            swap_params: None,
            signer: Some("5q4v...signer".into()),
            signature: Some("deadbeef".into()),
            intent_hash: None,
        }
    }

    #[test]
    fn excludes_authentication_fields() {
        let view = CanonicalIntentView::from_intent(&sample_intent());
        let json = String::from_utf8(view.to_bytes()).unwrap();
        assert!(!json.contains("signer"));
        assert!(!json.contains("deadbeef"));
        assert!(!json.contains("intentHash"));
    }

    #[test]
    fn is_stable_across_calls() {
        let intent = sample_intent();
        let a = intent_hash(&intent);
        let b = intent_hash(&intent);
        assert_eq!(a, b);
        assert_eq!(a.len(), 66);
        assert!(a.starts_with("0x"));
    }

    #[test]
    fn mutation_changes_hash() {
        let mut intent = sample_intent();
        let original = intent_hash(&intent);
        intent.timestamp_ms += 1;
        assert_ne!(original, intent_hash(&intent));
    }
}
