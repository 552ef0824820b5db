//! Configuration module for the anonymizing intent-execution relay.

use clap::Parser;
use relay_types::config::LiteralOrEnv;
use serde::Deserialize;
use solana_keypair::Keypair;
use std::fs;
use std::path::{Path, PathBuf};

/// CLI arguments for the relay server.
#[derive(Parser, Debug)]
#[command(name = "relay")]
#[command(about = "Anonymizing intent-execution relay HTTP server")]
struct CliArgs {
    /// Path to the JSON configuration file
    #[arg(long, short, env = "CONFIG", default_value = "config.json")]
    config: PathBuf,
}

/// Server configuration. Fields use serde defaults that fall back to
/// environment variables, then to hardcoded defaults, mirroring the
/// teacher's facilitator config module.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "config_defaults::default_port")]
    port: u16,

    #[serde(default = "config_defaults::default_rpc_devnet")]
    solana_rpc_url_devnet: String,
    #[serde(default = "config_defaults::default_rpc_testnet")]
    solana_rpc_url_testnet: String,
    #[serde(default = "config_defaults::default_rpc_mainnet")]
    solana_rpc_url_mainnet: String,
    #[serde(default = "config_defaults::default_rpc_devnet_fallback")]
    solana_rpc_url_devnet_fallback: Option<String>,

    #[serde(default = "config_defaults::default_executor_program_id")]
    solana_executor_program_id: String,

    #[serde(default = "config_defaults::default_execution_secret_key")]
    solana_execution_secret_key: LiteralOrEnv<String>,

    #[serde(default = "config_defaults::default_skip_signature_verification")]
    skip_signature_verification: bool,

    #[serde(default = "config_defaults::default_use_magicblock_per")]
    use_magicblock_per: bool,

    #[serde(default = "config_defaults::default_raydium_api_url")]
    raydium_api_url: String,

    #[serde(default = "config_defaults::default_legacy_envelope_allowed")]
    legacy_envelope_allowed: bool,

    #[serde(default = "config_defaults::default_rate_limit_per_minute")]
    rate_limit_per_minute: u32,

    #[serde(default = "config_defaults::default_funding_fee_lamports")]
    funding_fee_lamports: u64,

    #[serde(default = "config_defaults::default_minimum_floor_lamports")]
    minimum_floor_lamports: u64,

    #[serde(default = "config_defaults::default_tee_keypair_path")]
    tee_keypair_path: String,

    #[serde(default = "config_defaults::default_enclave_id")]
    enclave_id: String,
}

pub mod config_defaults {
    use std::env;

    pub const DEFAULT_PORT: u16 = 3001;
    pub const DEFAULT_RAYDIUM_API_URL: &str = "https://api-v3.raydium.io/pools/info/mint";
    pub const DEFAULT_FUNDING_FEE_LAMPORTS: u64 = 50_000;
    pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;

    pub fn default_port() -> u16 {
        env::var("PORT").ok().and_then(|s| s.parse().ok()).unwrap_or(DEFAULT_PORT)
    }

    pub fn default_rpc_devnet() -> String {
        env::var("SOLANA_RPC_URL_DEVNET")
            .unwrap_or_else(|_| "https://api.devnet.solana.com".to_string())
    }

    pub fn default_rpc_testnet() -> String {
        env::var("SOLANA_RPC_URL_TESTNET")
            .unwrap_or_else(|_| "https://api.testnet.solana.com".to_string())
    }

    pub fn default_rpc_mainnet() -> String {
        env::var("SOLANA_RPC_URL_MAINNET")
            .unwrap_or_else(|_| "https://api.mainnet-beta.solana.com".to_string())
    }

    pub fn default_rpc_devnet_fallback() -> Option<String> {
        env::var("SOLANA_RPC_URL_DEVNET_FALLBACK").ok()
    }

    /// Defaults to the zero address when unset; `Config::validate` rejects it.
    pub fn default_executor_program_id() -> String {
        env::var("SOLANA_EXECUTOR_PROGRAM_ID").unwrap_or_else(|_| "11111111111111111111111111111111".to_string())
    }

    pub fn default_execution_secret_key() -> super::LiteralOrEnv<String> {
        let raw = env::var("SOLANA_EXECUTION_SECRET_KEY").unwrap_or_default();
        super::LiteralOrEnv::from_literal(raw)
    }

    /// Forbidden in release builds; `Config::validate` enforces this.
    pub fn default_skip_signature_verification() -> bool {
        env::var("SKIP_SIGNATURE_VERIFICATION")
            .ok()
            .map(|s| s == "true" || s == "1")
            .unwrap_or(false)
    }

    pub fn default_use_magicblock_per() -> bool {
        env::var("USE_MAGICBLOCK_PER")
            .ok()
            .map(|s| s == "true" || s == "1")
            .unwrap_or(false)
    }

    pub fn default_raydium_api_url() -> String {
        env::var("RAYDIUM_API_URL").unwrap_or_else(|_| DEFAULT_RAYDIUM_API_URL.to_string())
    }

    pub fn default_legacy_envelope_allowed() -> bool {
        true
    }

    pub fn default_rate_limit_per_minute() -> u32 {
        DEFAULT_RATE_LIMIT_PER_MINUTE
    }

    pub fn default_funding_fee_lamports() -> u64 {
        DEFAULT_FUNDING_FEE_LAMPORTS
    }

    pub fn default_minimum_floor_lamports() -> u64 {
        relay_orchestrator::amount::DEFAULT_MINIMUM_LAMPORTS
    }

    pub fn default_tee_keypair_path() -> String {
        ".tee-keypair.json".to_string()
    }

    pub fn default_enclave_id() -> String {
        "relay-enclave-dev".to_string()
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file at {0}: {1}")]
    FileRead(PathBuf, std::io::Error),
    #[error("failed to parse config file: {0}")]
    JsonParse(#[from] serde_json::Error),
    #[error("SOLANA_EXECUTOR_PROGRAM_ID is the zero address or missing")]
    ZeroExecutorProgram,
    #[error("invalid execution secret key: {0}")]
    InvalidSecretKey(String),
}

impl Config {
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Canonical RPC URL for `network` ∈ {`devnet`, `testnet`, `mainnet`,
    /// `mainnet-beta`}, used by `/api/rpc-url`.
    pub fn rpc_url_for_network(&self, network: &str) -> Option<&str> {
        match network {
            "devnet" => Some(&self.solana_rpc_url_devnet),
            "testnet" => Some(&self.solana_rpc_url_testnet),
            "mainnet" | "mainnet-beta" => Some(&self.solana_rpc_url_mainnet),
            _ => None,
        }
    }

    pub fn solana_rpc_url_devnet(&self) -> &str {
        &self.solana_rpc_url_devnet
    }

    pub fn solana_rpc_url_devnet_fallback(&self) -> Option<&str> {
        self.solana_rpc_url_devnet_fallback.as_deref()
    }

    pub fn executor_program_id(&self) -> &str {
        &self.solana_executor_program_id
    }

    pub fn skip_signature_verification(&self) -> bool {
        self.skip_signature_verification
    }

    pub fn use_magicblock_per(&self) -> bool {
        self.use_magicblock_per
    }

    pub fn raydium_api_url(&self) -> &str {
        &self.raydium_api_url
    }

    pub fn legacy_envelope_allowed(&self) -> bool {
        self.legacy_envelope_allowed
    }

    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    pub fn funding_fee_lamports(&self) -> u64 {
        self.funding_fee_lamports
    }

    pub fn minimum_floor_lamports(&self) -> u64 {
        self.minimum_floor_lamports
    }

    pub fn tee_keypair_path(&self) -> &Path {
        Path::new(&self.tee_keypair_path)
    }

    pub fn enclave_id(&self) -> &str {
        &self.enclave_id
    }

    /// Parses the configured execution secret key, accepted as either a JSON
    /// byte array or a base58-encoded 64-byte keypair (the `solana-keygen`
    /// wire format).
    pub fn execution_keypair(&self) -> Result<Keypair, ConfigError> {
        let raw = self.solana_execution_secret_key.trim();
        if raw.is_empty() {
            return Err(ConfigError::InvalidSecretKey(
                "SOLANA_EXECUTION_SECRET_KEY is not set".into(),
            ));
        }
        let bytes = if let Ok(array) = serde_json::from_str::<Vec<u8>>(raw) {
            array
        } else {
            bs58::decode(raw)
                .into_vec()
                .map_err(|e| ConfigError::InvalidSecretKey(e.to_string()))?
        };
        Keypair::from_bytes(&bytes).map_err(|e| ConfigError::InvalidSecretKey(e.to_string()))
    }

    /// Rejects configurations the spec forbids: a zero executor program id,
    /// and (outside debug builds) signature-verification bypass.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.solana_executor_program_id.chars().all(|c| c == '1') {
            return Err(ConfigError::ZeroExecutorProgram);
        }
        if self.skip_signature_verification && !cfg!(debug_assertions) {
            tracing::error!(
                "SKIP_SIGNATURE_VERIFICATION is set in a release build; refusing to start"
            );
            return Err(ConfigError::InvalidSecretKey(
                "SKIP_SIGNATURE_VERIFICATION is forbidden in release builds".into(),
            ));
        }
        Ok(())
    }

    /// Load configuration from CLI arguments and JSON file.
    pub fn load() -> Result<Self, ConfigError> {
        let cli_args = CliArgs::parse();
        let config_path = &cli_args.config;
        let config = if config_path.exists() {
            Self::load_from_path(config_path.clone())?
        } else {
            serde_json::from_str("{}")?
        };
        config.validate()?;
        Ok(config)
    }

    fn load_from_path(path: PathBuf) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead(path, e))?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_executor_program_id() {
        let config: Config = serde_json::from_str(
            r#"{"solanaExecutorProgramId":"11111111111111111111111111111111"}"#,
        )
        .unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::ZeroExecutorProgram)));
    }

    #[test]
    fn resolves_network_rpc_urls() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert!(config.rpc_url_for_network("devnet").is_some());
        assert!(config.rpc_url_for_network("bogus").is_none());
    }
}
