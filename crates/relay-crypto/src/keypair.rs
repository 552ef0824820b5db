//! TEE keypair load/generate/persist and public-key publication.

use crate::error::CryptoError;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64URL;
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey, traits::PublicKeyParts};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};

const RSA_BITS: usize = 2048;

#[derive(Serialize, Deserialize)]
struct PersistedKeypair {
    #[serde(rename = "publicKey")]
    public_key: String,
    #[serde(rename = "privateKey")]
    private_key: String,
}

/// The RSA-2048 keypair identifying this TEE instance.
pub struct Keypair {
    private: RsaPrivateKey,
    public: RsaPublicKey,
    key_id: String,
}

/// The JWK representation of an RSA public key, per RFC 7517/7518.
#[derive(Debug, Clone, Serialize)]
pub struct Jwk {
    kty: &'static str,
    n: String,
    e: String,
}

/// The public-facing shape served by `/api/public-key`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicKeyInfo {
    pub jwk: Jwk,
    pub pem: String,
    pub key_id: String,
}

impl Keypair {
    /// Loads a persisted keypair from `path`, or generates and persists a
    /// fresh one if the file does not exist.
    pub fn load_or_generate(path: &Path) -> Result<Self, CryptoError> {
        if path.exists() {
            Self::load(path)
        } else {
            let keypair = Self::generate()?;
            keypair.persist(path)?;
            Ok(keypair)
        }
    }

    fn load(path: &Path) -> Result<Self, CryptoError> {
        let contents = std::fs::read_to_string(path)?;
        let persisted: PersistedKeypair = serde_json::from_str(&contents)
            .map_err(|e| CryptoError::Keypair(format!("corrupt keypair file: {e}")))?;
        let private = RsaPrivateKey::from_pkcs8_pem(&persisted.private_key)
            .map_err(|e| CryptoError::Keypair(format!("invalid private key pem: {e}")))?;
        let public = private.to_public_key();
        let key_id = Self::compute_key_id(&public);
        Ok(Self {
            private,
            public,
            key_id,
        })
    }

    fn generate() -> Result<Self, CryptoError> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, RSA_BITS)
            .map_err(|e| CryptoError::Keypair(format!("key generation failed: {e}")))?;
        let public = private.to_public_key();
        let key_id = Self::compute_key_id(&public);
        Ok(Self {
            private,
            public,
            key_id,
        })
    }

    fn compute_key_id(public: &RsaPublicKey) -> String {
        let der = public
            .to_public_key_der()
            .expect("public key always encodes to DER");
        let digest = Sha256::digest(der.as_bytes());
        hex::encode(&digest[..8])
    }

    fn persist(&self, path: &Path) -> Result<(), CryptoError> {
        let private_pem = self
            .private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Keypair(format!("pem encode failed: {e}")))?;
        let public_pem = self.public_pem()?;
        let persisted = PersistedKeypair {
            public_key: public_pem,
            private_key: private_pem.to_string(),
        };
        let json = serde_json::to_string_pretty(&persisted)
            .map_err(|e| CryptoError::Keypair(e.to_string()))?;

        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp_path: PathBuf = dir.to_path_buf();
        tmp_path.push(format!(
            ".tee-keypair.{}.tmp",
            std::process::id()
        ));
        {
            let mut file = std::fs::File::create(&tmp_path)?;
            file.write_all(json.as_bytes())?;
            file.sync_all()?;
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
        }
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    fn public_pem(&self) -> Result<String, CryptoError> {
        use rsa::pkcs8::EncodePublicKey;
        self.public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::Keypair(format!("pem encode failed: {e}")))
    }

    pub fn private(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn public_key_info(&self) -> PublicKeyInfo {
        let n = B64URL.encode(self.public.n().to_bytes_be());
        let e = B64URL.encode(self.public.e().to_bytes_be());
        PublicKeyInfo {
            jwk: Jwk { kty: "RSA", n, e },
            pem: self.public_pem().unwrap_or_default(),
            key_id: self.key_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_and_reloads_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tee-keypair.json");
        let first = Keypair::load_or_generate(&path).unwrap();
        let second = Keypair::load_or_generate(&path).unwrap();
        assert_eq!(first.key_id(), second.key_id());
    }

    #[test]
    fn key_id_is_16_hex_chars() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".tee-keypair.json");
        let keypair = Keypair::load_or_generate(&path).unwrap();
        assert_eq!(keypair.key_id().len(), 16);
        assert!(keypair.key_id().chars().all(|c| c.is_ascii_hexdigit()));
    }
}
