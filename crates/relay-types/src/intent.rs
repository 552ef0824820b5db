//! The `Intent` wire schema: the canonical unit the relay decrypts, validates,
//! and executes.

use serde::{Deserialize, Serialize};

/// An address on the target chain. Kept as a plain string (base58 on Solana):
/// the relay never needs to manipulate it as anything but an opaque key.
pub type Address = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Swap,
    Approve,
    Transfer,
    Transaction,
    #[serde(other)]
    Unknown,
}

impl Default for Action {
    fn default() -> Self {
        Action::Unknown
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMeta {
    pub pubkey: Address,
    pub is_signer: bool,
    pub is_writable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub program_id: Address,
    pub keys: Vec<AccountMeta>,
    /// Raw instruction data. Accepted either as a byte array or a base64
    /// string on the wire; normalized to bytes on deserialization.
    #[serde(with = "instruction_data")]
    pub data: Vec<u8>,
}

mod instruction_data {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as B64;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Bytes(Vec<u8>),
        Base64(String),
    }

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        B64.encode(data).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        match Repr::deserialize(deserializer)? {
            Repr::Bytes(b) => Ok(b),
            Repr::Base64(s) => B64.decode(&s).map_err(serde::de::Error::custom),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionData {
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_payer: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recent_blockhash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serialized_bytes_b64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_amount_lamports: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Limits {
    #[serde(default = "default_max_slippage_bps")]
    pub max_slippage_bps: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_slippage_bps: default_max_slippage_bps(),
        }
    }
}

fn default_max_slippage_bps() -> u32 {
    100
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dapp_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dapp_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapParams {
    pub input_mint: Address,
    pub output_mint: Address,
    pub amount_in_lamports: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_id: Option<Address>,
}

/// The decrypted, still-unverified intent as received from the browser
/// collaborator. `signature`/`signer`/`intent_hash` are carried inside the
/// encrypted envelope but excluded from the hash it is itself signed over.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub version: String,
    pub chain_id: String,
    pub network: String,
    #[serde(default)]
    pub action: Action,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_type: Option<String>,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_ms: Option<u64>,
    #[serde(default)]
    pub transaction: TransactionData,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub swap_params: Option<SwapParams>,
    /// The user's real public key. Present only inside the decrypted
    /// envelope; never appears on the executed on-chain transaction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signer: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_hash: Option<String>,
}
