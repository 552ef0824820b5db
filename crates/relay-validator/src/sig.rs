//! Signature decoding and Ed25519 verification.

use ed25519_dalek::{Signature, VerifyingKey};

#[derive(Debug, thiserror::Error)]
pub enum SigDecodeError {
    #[error("signature must decode to exactly 64 bytes")]
    WrongLength,
    #[error("signature is not valid hex or base58")]
    BadEncoding,
    #[error("signer is not a valid base58 public key")]
    BadSigner,
}

/// Decodes a signature accepted as either 64-byte hex (with or without a
/// `0x` prefix) or base58.
pub fn decode_signature(raw: &str) -> Result<Signature, SigDecodeError> {
    let bytes = if let Some(stripped) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        hex::decode(stripped).map_err(|_| SigDecodeError::BadEncoding)?
    } else if raw.len() == 128 && raw.chars().all(|c| c.is_ascii_hexdigit()) {
        hex::decode(raw).map_err(|_| SigDecodeError::BadEncoding)?
    } else {
        bs58::decode(raw)
            .into_vec()
            .map_err(|_| SigDecodeError::BadEncoding)?
    };
    let array: [u8; 64] = bytes.try_into().map_err(|_| SigDecodeError::WrongLength)?;
    Ok(Signature::from_bytes(&array))
}

pub fn decode_signer(signer_b58: &str) -> Result<VerifyingKey, SigDecodeError> {
    let bytes = bs58::decode(signer_b58)
        .into_vec()
        .map_err(|_| SigDecodeError::BadSigner)?;
    let array: [u8; 32] = bytes.try_into().map_err(|_| SigDecodeError::BadSigner)?;
    VerifyingKey::from_bytes(&array).map_err(|_| SigDecodeError::BadSigner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    #[test]
    fn rejects_odd_length_hex() {
        assert!(matches!(
            decode_signature("0xabc"),
            Err(SigDecodeError::BadEncoding)
        ));
    }

    #[test]
    fn round_trips_hex_and_base58() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32]);
        let sig = signing_key.sign(b"hello");
        let hex_str = format!("0x{}", hex::encode(sig.to_bytes()));
        let decoded = decode_signature(&hex_str).unwrap();
        assert_eq!(decoded, sig);

        let b58 = bs58::encode(sig.to_bytes()).into_string();
        let decoded_b58 = decode_signature(&b58).unwrap();
        assert_eq!(decoded_b58, sig);
    }
}
