//! The deposit-then-swap-then-payout execution state machine (component I).
//!
//! [`Orchestrator::execute`] drives one approved intent through all seven
//! phases: amount extraction, executor/PDA validation, vault funding,
//! confirmation, route classification, route execution, and payout. Each
//! phase is its own function in [`phases`] (or [`amount`], [`route`]); this
//! module only sequences them and owns the execution keypair.

pub mod amount;
pub mod error;
pub mod phases;
pub mod route;

pub use error::OrchestratorError;
pub use route::classify_route;

use dashmap::DashSet;
use relay_chain_solana::{SolanaChainProvider, parse_pubkey};
use relay_pool::PoolDiscovery;
use relay_types::intent::Intent;
use relay_types::registry::Route;
use relay_validator::decode_signature;
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signer::Signer;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Aggregate wall-clock budget for one `execute()` call, covering every
/// phase including all confirmation waits.
const EXECUTION_DEADLINE: Duration = Duration::from_secs(180);
const FUNDING_CONFIRM_DEADLINE: Duration = Duration::from_secs(30);
const SWAP_CONFIRM_DEADLINE: Duration = Duration::from_secs(40);
const PASSTHROUGH_CONFIRM_DEADLINE: Duration = Duration::from_secs(30);

pub struct OrchestratorConfig {
    pub executor_program_id: Pubkey,
    pub execution_keypair: Arc<Keypair>,
    pub minimum_floor_lamports: u64,
    /// Added on top of the extracted amount when funding the execution
    /// account, covering this relay's own transaction fees.
    pub funding_fee_lamports: u64,
    /// When set, `execute()` fails closed rather than attempt a MagicBlock
    /// ephemeral-rollup execution path this build does not implement.
    pub use_magicblock: bool,
}

#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub chain_signature: String,
    pub explorer_url: String,
    pub route: Route,
    pub payout_signature: Option<String>,
}

/// Owns the execution keypair and the chain/pool-discovery handles needed to
/// run an intent end to end. One instance is shared across all requests.
/// `execution_lock` is only held for the brief sign-and-broadcast critical
/// sections, so distinct intents' funding/swap/payout phases still interleave
/// freely (§5): it exists solely to stop two concurrent executions from
/// racing the same keypair onto the same blockhash, not to serialize whole
/// requests. `in_flight` rejects a second concurrent execution attempt for
/// the same `intent_hash` with `AlreadyInFlight` (P4) — the registry's
/// `try_reserve`/`mark` pair already catches same-hash resubmission once a
/// status transition has landed, but an execution can be mid-flight for
/// several RPC round trips before its first `mark()` call.
pub struct Orchestrator {
    chain: Arc<SolanaChainProvider>,
    pool_discovery: Arc<PoolDiscovery>,
    config: OrchestratorConfig,
    execution_lock: Mutex<()>,
    in_flight: DashSet<String>,
}

/// Removes `intent_hash` from the in-flight set when dropped, so a failing
/// or timed-out execution does not permanently wedge that hash.
struct InFlightGuard<'a> {
    in_flight: &'a DashSet<String>,
    intent_hash: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.remove(&self.intent_hash);
    }
}

impl Orchestrator {
    pub fn new(
        chain: Arc<SolanaChainProvider>,
        pool_discovery: Arc<PoolDiscovery>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            chain,
            pool_discovery,
            config,
            execution_lock: Mutex::new(()),
            in_flight: DashSet::new(),
        }
    }

    pub fn execution_pubkey(&self) -> Pubkey {
        self.config.execution_keypair.pubkey()
    }

    /// Runs the full state machine under the aggregate deadline. A timeout
    /// at any phase surfaces as [`OrchestratorError::Timeout`], matching the
    /// submit endpoint's own response contract for a stuck execution.
    pub async fn execute(&self, intent: &Intent) -> Result<ExecutionOutcome, OrchestratorError> {
        if self.config.use_magicblock {
            return Err(OrchestratorError::Internal(
                "magicblock ephemeral-rollup execution is not implemented in this build".into(),
            ));
        }

        let intent_hash = intent
            .intent_hash
            .clone()
            .ok_or_else(|| OrchestratorError::Internal("intent carries no hash".into()))?;
        if !self.in_flight.insert(intent_hash.clone()) {
            return Err(OrchestratorError::AlreadyInFlight);
        }
        let _in_flight_guard = InFlightGuard {
            in_flight: &self.in_flight,
            intent_hash,
        };

        match tokio::time::timeout(EXECUTION_DEADLINE, self.execute_inner(intent)).await {
            Ok(result) => result,
            Err(_) => Err(OrchestratorError::Timeout),
        }
    }

    async fn execute_inner(&self, intent: &Intent) -> Result<ExecutionOutcome, OrchestratorError> {
        let user_pubkey_str = intent.signer.as_deref().ok_or(OrchestratorError::MissingSigner)?;
        let user_pubkey = parse_pubkey(user_pubkey_str)?;
        let intent_hash_bytes = decode_intent_hash(intent)?;
        let signature_bytes = intent
            .signature
            .as_deref()
            .ok_or(OrchestratorError::MissingSigner)
            .and_then(|raw| decode_signature(raw).map_err(OrchestratorError::from))?
            .to_bytes()
            .to_vec();

        // Phase 1: how much this intent needs pulled from the vault.
        let amount_lamports =
            amount::extract_required_lamports(&intent.transaction, self.config.minimum_floor_lamports);

        // Phase 2: executor is live, user has a deposit on file.
        let pdas = phases::validate_executor(&self.chain, &self.config.executor_program_id, &user_pubkey)
            .await?;

        // Phase 3: fund the execution account from the vault. The keypair
        // lock is held only for this sign-and-broadcast call, not the
        // confirmation wait that follows, so another intent's own funding
        // call can interleave instead of queuing behind this one's poll.
        let funding_signature = {
            let _guard = self.execution_lock.lock().await;
            phases::fund_execution_account(
                &self.chain,
                &self.config.executor_program_id,
                &self.config.execution_keypair,
                &pdas,
                &user_pubkey,
                &intent_hash_bytes,
                &signature_bytes,
                amount_lamports,
                self.config.funding_fee_lamports,
            )
            .await?
        };

        // Phase 4: wait for the funding transfer to land before spending it.
        phases::confirm_or_fail(&self.chain, &funding_signature, FUNDING_CONFIRM_DEADLINE).await?;

        // Phase 5: classify the route.
        let route = classify_route(&intent.transaction);

        // Phase 6 + 7: route-specific execution and payout.
        let (chain_signature, payout_signature) = match route {
            Route::Raydium => self.execute_raydium_route(intent, &user_pubkey, amount_lamports).await?,
            Route::SolanaSwap | Route::SolanaApprove => {
                let signature = {
                    let _guard = self.execution_lock.lock().await;
                    phases::execute_passthrough(&self.chain, &self.config.execution_keypair, &intent.transaction, &user_pubkey)
                        .await?
                };
                phases::confirm_or_fail(&self.chain, &signature, PASSTHROUGH_CONFIRM_DEADLINE).await?;
                (signature, None)
            }
        };

        Ok(ExecutionOutcome {
            explorer_url: explorer_url(&chain_signature),
            chain_signature,
            route,
            payout_signature,
        })
    }

    async fn execute_raydium_route(
        &self,
        intent: &Intent,
        user_pubkey: &Pubkey,
        amount_lamports: u64,
    ) -> Result<(String, Option<String>), OrchestratorError> {
        let swap_params = intent
            .swap_params
            .as_ref()
            .ok_or_else(|| OrchestratorError::Internal("raydium route requires swapParams".into()))?;
        let input_mint = parse_pubkey(&swap_params.input_mint)?;
        let output_mint = parse_pubkey(&swap_params.output_mint)?;
        // `swap_params.amount_in_lamports` comes straight from the decrypted
        // intent and has not passed through `amount::extract_required_lamports`'s
        // clamp, so it is clamped here before it ever reaches the swap builder.
        let amount_in = if swap_params.amount_in_lamports > 0 {
            relay_swap::clamp_amount(swap_params.amount_in_lamports as u128).amount
        } else {
            amount_lamports
        };

        let swap_output = {
            let _guard = self.execution_lock.lock().await;
            phases::execute_swap(phases::SwapPhaseInput {
                chain: &self.chain,
                pool_discovery: &self.pool_discovery,
                execution_keypair: &self.config.execution_keypair,
                input_mint,
                output_mint,
                amount_in,
                max_slippage_bps: intent.limits.max_slippage_bps,
                dapp_url: intent.metadata.dapp_url.as_deref(),
                serialized_tx_b64: intent.transaction.serialized_bytes_b64.as_deref(),
                user_pubkey: *user_pubkey,
            })
            .await?
        };

        phases::confirm_or_fail(&self.chain, &swap_output.signature, SWAP_CONFIRM_DEADLINE).await?;

        let payout_signature = {
            let _guard = self.execution_lock.lock().await;
            phases::payout(
                &self.chain,
                &self.config.execution_keypair,
                output_mint,
                swap_output.destination_ata,
                *user_pubkey,
            )
            .await?
        };

        Ok((swap_output.signature, payout_signature))
    }
}

fn explorer_url(signature: &str) -> String {
    format!("https://explorer.solana.com/tx/{signature}?cluster=devnet")
}

fn decode_intent_hash(intent: &Intent) -> Result<[u8; 32], OrchestratorError> {
    let raw = intent
        .intent_hash
        .as_deref()
        .ok_or_else(|| OrchestratorError::Internal("intent carries no hash".into()))?;
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    let bytes = hex::decode(raw).map_err(|e| OrchestratorError::Internal(e.to_string()))?;
    bytes
        .try_into()
        .map_err(|_| OrchestratorError::Internal("intent hash must be 32 bytes".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_intent_hash() {
        let mut intent = blank_intent();
        intent.intent_hash = Some("not-hex".into());
        assert!(matches!(decode_intent_hash(&intent), Err(OrchestratorError::Internal(_))));
    }

    #[test]
    fn rejects_short_intent_hash() {
        let mut intent = blank_intent();
        intent.intent_hash = Some("0xaabb".into());
        assert!(matches!(decode_intent_hash(&intent), Err(OrchestratorError::Internal(_))));
    }

    #[test]
    fn accepts_full_length_hash() {
        let mut intent = blank_intent();
        intent.intent_hash = Some(format!("0x{}", hex::encode([4u8; 32])));
        assert_eq!(decode_intent_hash(&intent).unwrap(), [4u8; 32]);
    }

    #[test]
    fn in_flight_set_rejects_second_insert_then_frees_on_drop() {
        let in_flight = DashSet::new();
        assert!(in_flight.insert("0xabc".to_string()));
        assert!(!in_flight.insert("0xabc".to_string()), "second insert of the same hash must fail");
        {
            let _guard = InFlightGuard {
                in_flight: &in_flight,
                intent_hash: "0xdef".to_string(),
            };
            assert!(in_flight.contains("0xdef"));
        }
        assert!(!in_flight.contains("0xdef"), "guard drop must free the hash");
    }

    fn blank_intent() -> Intent {
        use relay_types::intent::{Action, Limits, Metadata, TransactionData};
        Intent {
            version: "1".into(),
            chain_id: "solana".into(),
            network: "devnet".into(),
            action: Action::Swap,
            transaction_type: None,
            timestamp_ms: 0,
            expiry_ms: None,
            transaction: TransactionData::default(),
            limits: Limits::default(),
            metadata: Metadata::default(),
            swap_details: None,
            approval_details: None,
            swap_params: None,
            signer: None,
            signature: None,
            intent_hash: None,
        }
    }
}
