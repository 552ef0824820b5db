//! Hybrid and legacy intent envelope decryption.

use crate::error::CryptoError;
use crate::keypair::Keypair;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use relay_types::Intent;
use relay_types::b64::Base64Bytes;
use rsa::Oaep;
use serde::Deserialize;
use sha2::Sha256;

/// Shape accepted on the wire. Hybrid is the only form new clients should
/// send; legacy ships the AES key in the clear and exists only for
/// compatibility with older collaborators.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(untagged)]
pub enum Envelope {
    Hybrid {
        encrypted_key: String,
        #[serde(default)]
        #[allow(dead_code)]
        encrypted_key_format: Option<String>,
        encrypted: String,
        iv: String,
    },
    Legacy {
        encrypted: String,
        iv: String,
        key: String,
    },
}

impl Envelope {
    fn is_legacy(&self) -> bool {
        matches!(self, Envelope::Legacy { .. })
    }
}

/// Decrypts an envelope into plaintext JSON bytes, then parses it as an
/// `Intent`. `legacy_allowed` is a deployment policy knob: legacy envelopes
/// ship the AES key unprotected and should be rejected in production.
pub fn decrypt_envelope(
    keypair: &Keypair,
    envelope: &Envelope,
    legacy_allowed: bool,
) -> Result<Intent, CryptoError> {
    if envelope.is_legacy() {
        tracing::warn!("accepting legacy (plaintext-key) envelope");
        if !legacy_allowed {
            return Err(CryptoError::LegacyEnvelopeDisabled);
        }
    }

    let aes_key = match envelope {
        Envelope::Hybrid { encrypted_key, .. } => unwrap_aes_key(keypair, encrypted_key)?,
        Envelope::Legacy { key, .. } => Base64Bytes::decode(key)
            .map_err(|e| CryptoError::Decryption(format!("invalid legacy key encoding: {e}")))?
            .into_owned()
            .0
            .into_owned(),
    };
    if aes_key.len() != 32 {
        return Err(CryptoError::Decryption(
            "AES key must be 32 bytes".to_string(),
        ));
    }

    let (ciphertext_b64, iv_b64) = match envelope {
        Envelope::Hybrid { encrypted, iv, .. } => (encrypted, iv),
        Envelope::Legacy { encrypted, iv, .. } => (encrypted, iv),
    };
    let ciphertext = Base64Bytes::decode(ciphertext_b64)
        .map_err(|e| CryptoError::Decryption(format!("invalid ciphertext encoding: {e}")))?;
    let iv = Base64Bytes::decode(iv_b64)
        .map_err(|e| CryptoError::Decryption(format!("invalid iv encoding: {e}")))?;
    if iv.as_bytes().len() != 12 {
        return Err(CryptoError::Decryption("iv must be 12 bytes".to_string()));
    }

    let plaintext = aes_gcm_decrypt(&aes_key, iv.as_bytes(), ciphertext.as_bytes())?;

    let intent: Intent = serde_json::from_slice(&plaintext)
        .map_err(|e| CryptoError::MalformedIntent(e.to_string()))?;
    Ok(intent)
}

fn unwrap_aes_key(keypair: &Keypair, encrypted_key_b64: &str) -> Result<Vec<u8>, CryptoError> {
    let encrypted_key = Base64Bytes::decode(encrypted_key_b64)
        .map_err(|e| CryptoError::Decryption(format!("invalid encrypted key encoding: {e}")))?;
    let padding = Oaep::new::<Sha256>();
    keypair
        .private()
        .decrypt(padding, encrypted_key.as_bytes())
        .map_err(|_| CryptoError::Decryption("rsa-oaep unwrap failed".to_string()))
}

/// Decrypts AES-256-GCM ciphertext where the trailing 16 bytes are the
/// authentication tag, as produced by the browser collaborator's WebCrypto
/// `encrypt` call.
fn aes_gcm_decrypt(key: &[u8], iv: &[u8], ciphertext_and_tag: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let key = Key::<Aes256Gcm>::from_slice(key);
    let cipher = Aes256Gcm::new(key);
    let nonce = Nonce::from_slice(iv);
    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext_and_tag,
                aad: &[],
            },
        )
        .map_err(|_| CryptoError::Decryption("aes-gcm authentication failed".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aes_gcm::aead::rand_core::{OsRng as AesOsRng, RngCore};

    #[test]
    fn legacy_envelope_rejected_when_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let keypair = Keypair::load_or_generate(&dir.path().join(".tee-keypair.json")).unwrap();
        let mut key = [0u8; 32];
        AesOsRng.fill_bytes(&mut key);
        let envelope = Envelope::Legacy {
            encrypted: "AA==".into(),
            iv: "AAAAAAAAAAAAAAAA".into(),
            key: base64::Engine::encode(&base64::engine::general_purpose::STANDARD, key),
        };
        let result = decrypt_envelope(&keypair, &envelope, false);
        assert!(matches!(result, Err(CryptoError::LegacyEnvelopeDisabled)));
    }

    #[test]
    fn hybrid_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let keypair = Keypair::load_or_generate(&dir.path().join(".tee-keypair.json")).unwrap();

        let mut aes_key = [0u8; 32];
        AesOsRng.fill_bytes(&mut aes_key);
        let mut iv = [0u8; 12];
        AesOsRng.fill_bytes(&mut iv);

        let intent_json = br#"{"version":"1","chainId":"solana","network":"devnet","action":"swap","timestampMs":1700000000000}"#;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&aes_key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&iv), intent_json.as_slice())
            .unwrap();

        let padding = Oaep::new::<Sha256>();
        let encrypted_key = keypair
            .private()
            .to_public_key()
            .encrypt(&mut rand::thread_rng(), padding, &aes_key)
            .unwrap();

        use base64::Engine;
        let envelope = Envelope::Hybrid {
            encrypted_key: base64::engine::general_purpose::STANDARD.encode(&encrypted_key),
            encrypted_key_format: Some("rsa-oaep".into()),
            encrypted: base64::engine::general_purpose::STANDARD.encode(&ciphertext),
            iv: base64::engine::general_purpose::STANDARD.encode(iv),
        };

        let intent = decrypt_envelope(&keypair, &envelope, true).unwrap();
        assert_eq!(intent.chain_id, "solana");
    }
}
