//! Solana RPC send/confirm/read, with the resubmission short-circuit and
//! asynchronous confirmation watcher.

use crate::error::ChainError;
use dashmap::DashMap;
use relay_registry_status::RegistryHandle;
use sha2::{Digest, Sha256};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcSendTransactionConfig;
use solana_commitment_config::CommitmentConfig;
use solana_pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationStatus {
    Confirmed,
    Finalized,
    Failed(String),
    /// No on-chain error was observed within the deadline. Treated as
    /// "probably confirmed" per the relay's documented devnet concession,
    /// never as outright success.
    Timeout,
}

#[derive(Debug, Clone)]
pub struct AccountInfo {
    pub lamports: u64,
    pub owner: String,
    pub data: Vec<u8>,
    pub executable: bool,
}

/// Thin wrapper over `RpcClient` implementing the four synchronous
/// operations in the spec's chain-I/O contract, plus the signature-dedup
/// cache used to short-circuit dApp resubmission attempts.
pub struct SolanaChainProvider {
    rpc: Arc<RpcClient>,
    seen_transactions: DashMap<[u8; 32], String>,
}

impl SolanaChainProvider {
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc: Arc::new(RpcClient::new(rpc_url.into())),
            seen_transactions: DashMap::new(),
        }
    }

    pub fn rpc(&self) -> &Arc<RpcClient> {
        &self.rpc
    }

    /// Broadcasts raw wire bytes. If these exact bytes were broadcast
    /// before, returns the cached signature instead of re-submitting.
    pub async fn send_raw(&self, tx_bytes: &[u8]) -> Result<String, ChainError> {
        let digest: [u8; 32] = Sha256::digest(tx_bytes).into();
        if let Some(cached) = self.seen_transactions.get(&digest) {
            tracing::info!("resubmission of already-seen transaction, returning cached signature");
            return Ok(cached.clone());
        }

        let signature = self
            .rpc
            .send_raw_transaction_with_config(
                tx_bytes,
                RpcSendTransactionConfig {
                    skip_preflight: true,
                    ..Default::default()
                },
            )
            .await?;
        let signature = signature.to_string();
        self.seen_transactions.insert(digest, signature.clone());
        Ok(signature)
    }

    /// Polls `getSignatureStatuses` on an adaptive schedule: every 500ms for
    /// the first 5s, then every 2s, up to `deadline`.
    pub async fn poll_status(&self, signature: &str, deadline: Duration) -> ConfirmationStatus {
        let sig = match solana_signature::Signature::from_str(signature) {
            Ok(sig) => sig,
            Err(_) => return ConfirmationStatus::Failed("malformed signature".into()),
        };
        let started = Instant::now();
        loop {
            match self.rpc.get_signature_statuses(&[sig]).await {
                Ok(response) => {
                    if let Some(Some(status)) = response.value.into_iter().next() {
                        if let Some(err) = status.err {
                            return ConfirmationStatus::Failed(err.to_string());
                        }
                        if let Some(confirmation) = status.confirmation_status {
                            use solana_transaction_status_client_types::TransactionConfirmationStatus as C;
                            match confirmation {
                                C::Finalized => return ConfirmationStatus::Finalized,
                                C::Confirmed => return ConfirmationStatus::Confirmed,
                                C::Processed => {}
                            }
                        } else if status.confirmations.is_some() {
                            return ConfirmationStatus::Confirmed;
                        }
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "transient rpc error during confirmation poll");
                }
            }

            if started.elapsed() >= deadline {
                tracing::warn!(%signature, "confirmation poll timed out, treating as probably-confirmed");
                return ConfirmationStatus::Timeout;
            }

            let next_sleep = if started.elapsed() < Duration::from_secs(5) {
                Duration::from_millis(500)
            } else {
                Duration::from_secs(2)
            };
            tokio::time::sleep(next_sleep).await;
        }
    }

    pub async fn account_info(&self, pubkey: &str) -> Result<Option<AccountInfo>, ChainError> {
        let pubkey = Pubkey::from_str(pubkey).map_err(|e| ChainError::InvalidPubkey(e.to_string()))?;
        match self.rpc.get_account(&pubkey).await {
            Ok(account) => Ok(Some(AccountInfo {
                lamports: account.lamports,
                owner: account.owner.to_string(),
                data: account.data,
                executable: account.executable,
            })),
            Err(err) => {
                if err.to_string().contains("AccountNotFound") {
                    Ok(None)
                } else {
                    Err(err.into())
                }
            }
        }
    }

    pub async fn latest_blockhash(&self) -> Result<(String, u64), ChainError> {
        let (hash, slot) = self
            .rpc
            .get_latest_blockhash_with_commitment(CommitmentConfig::confirmed())
            .await?;
        Ok((hash.to_string(), slot))
    }

    /// Spawns the asynchronous confirmation watcher for one `submitted`
    /// entry: polls up to 60s and marks the registry `executed`/`failed`.
    /// The HTTP response for the submit call has already been sent by the
    /// time this runs.
    pub fn spawn_watcher(self: &Arc<Self>, registry: RegistryHandle, intent_hash: String, signature: String) {
        let provider = Arc::clone(self);
        tokio::spawn(async move {
            let status = provider.poll_status(&signature, Duration::from_secs(60)).await;
            match status {
                ConfirmationStatus::Confirmed | ConfirmationStatus::Finalized | ConfirmationStatus::Timeout => {
                    registry.mark_executed(&intent_hash, &signature);
                }
                ConfirmationStatus::Failed(reason) => {
                    tracing::warn!(%intent_hash, %reason, "watcher observed on-chain failure");
                    registry.mark_failed(&intent_hash);
                }
            }
        });
    }
}

/// A minimal registry-mutation seam so this crate does not need to depend
/// back on `relay-registry` just to mark two outcomes from the watcher task.
pub mod relay_registry_status {
    use std::sync::Arc;

    pub trait RegistryMutator: Send + Sync {
        fn mark_executed(&self, intent_hash: &str, chain_signature: &str);
        fn mark_failed(&self, intent_hash: &str);
    }

    pub type RegistryHandle = Arc<dyn RegistryMutator>;
}
