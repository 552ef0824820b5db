//! Phases 2-4, 6 and 7 of the execution state machine, each its own
//! function called in sequence by [`crate::Orchestrator::execute`], matching
//! the teacher's `verify_transfer` / `settle_transaction` phase-function
//! style in `x402-chain-solana::v1_solana_exact::facilitator`.

use crate::error::OrchestratorError;
use relay_chain_solana::executor::{build_execute_with_intent_instruction, ExecutorPdas};
use relay_chain_solana::{derive_executor_pdas, parse_pubkey, ConfirmationStatus, SolanaChainProvider};
use relay_pool::{PoolDiscovery, PoolDiscoveryInput};
use relay_swap::{build_swap, PoolState, SwapRequest};
use solana_hash::Hash;
use solana_instruction::{AccountMeta, Instruction as SolanaInstruction};
use solana_keypair::Keypair;
use solana_message::Message;
use solana_pubkey::Pubkey;
use solana_signer::Signer;
use solana_transaction::Transaction;
use spl_associated_token_account::get_associated_token_address;
use std::str::FromStr;
use std::time::Duration;

const TOKEN_ACCOUNT_AMOUNT_OFFSET: usize = 64;
/// Fixed offset this relay reads a pool account's reserves from, treating
/// the rest of the account as opaque (see `relay_swap::PoolState`). Not a
/// real per-program account layout; see DESIGN.md.
const POOL_RESERVES_OFFSET: usize = 64;

fn sign_and_serialize(
    instructions: &[SolanaInstruction],
    payer: &Keypair,
    extra_signers: &[&Keypair],
    recent_blockhash: &str,
) -> Result<Vec<u8>, OrchestratorError> {
    let blockhash = Hash::from_str(recent_blockhash)
        .map_err(|e| OrchestratorError::Internal(format!("invalid blockhash: {e}")))?;
    let message = Message::new(instructions, Some(&payer.pubkey()));
    let mut signers: Vec<&Keypair> = vec![payer];
    signers.extend_from_slice(extra_signers);
    let tx = Transaction::new(&signers, message, blockhash);
    bincode::serialize(&tx).map_err(|e| OrchestratorError::Internal(e.to_string()))
}

/// Phase 2: fetch the executor/vault/user-deposit PDAs and confirm the
/// executor is live and the user has a deposit on file.
pub async fn validate_executor(
    chain: &SolanaChainProvider,
    executor_program_id: &Pubkey,
    user_pubkey: &Pubkey,
) -> Result<ExecutorPdas, OrchestratorError> {
    if *executor_program_id == Pubkey::default() {
        return Err(OrchestratorError::ZeroExecutorProgram);
    }
    let pdas = derive_executor_pdas(executor_program_id, user_pubkey);

    let executor_account = chain.account_info(&pdas.executor_pda.to_string()).await?;
    let executor_is_live = executor_account.map(|a| a.executable).unwrap_or(false);
    if !executor_is_live {
        return Err(OrchestratorError::Internal(
            "executor account missing or not executable".into(),
        ));
    }

    let deposit_account = chain.account_info(&pdas.user_deposit_pda.to_string()).await?;
    if deposit_account.is_none() {
        return Err(OrchestratorError::NeedsDeposit {
            executor_program_id: executor_program_id.to_string(),
            user_deposit_pda: pdas.user_deposit_pda.to_string(),
            vault_pda: pdas.vault_pda.to_string(),
            user_address: user_pubkey.to_string(),
        });
    }

    Ok(pdas)
}

/// Phase 3: builds, signs and broadcasts `EXECUTE_WITH_INTENT`, moving
/// `amount_lamports + funding_fee_lamports` from the vault to the execution
/// account.
pub async fn fund_execution_account(
    chain: &SolanaChainProvider,
    executor_program_id: &Pubkey,
    execution_keypair: &Keypair,
    pdas: &ExecutorPdas,
    user_pubkey: &Pubkey,
    intent_hash: &[u8; 32],
    intent_signature_bytes: &[u8],
    amount_lamports: u64,
    funding_fee_lamports: u64,
) -> Result<String, OrchestratorError> {
    let instruction = build_execute_with_intent_instruction(
        executor_program_id,
        intent_hash,
        intent_signature_bytes,
        amount_lamports.saturating_add(funding_fee_lamports),
        &pdas.executor_pda,
        &pdas.vault_pda,
        &pdas.user_deposit_pda,
        user_pubkey,
        &execution_keypair.pubkey(),
    );
    let (blockhash, _slot) = chain.latest_blockhash().await?;
    let tx_bytes = sign_and_serialize(&[instruction], execution_keypair, &[], &blockhash)?;
    Ok(chain.send_raw(&tx_bytes).await?)
}

/// Phase 4 (and the swap/payout confirmation barriers): polls until a
/// terminal status or `deadline`, treating a timeout as "probably
/// confirmed" per the spec's documented devnet concession.
pub async fn confirm_or_fail(
    chain: &SolanaChainProvider,
    signature: &str,
    deadline: Duration,
) -> Result<(), OrchestratorError> {
    match chain.poll_status(signature, deadline).await {
        ConfirmationStatus::Confirmed | ConfirmationStatus::Finalized | ConfirmationStatus::Timeout => {
            Ok(())
        }
        ConfirmationStatus::Failed(reason) => Err(OrchestratorError::Chain(
            relay_chain_solana::error::ChainError::TransactionFailed(reason),
        )),
    }
}

pub struct SwapPhaseInput<'a> {
    pub chain: &'a SolanaChainProvider,
    pub pool_discovery: &'a PoolDiscovery,
    pub execution_keypair: &'a Keypair,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub amount_in: u64,
    pub max_slippage_bps: u32,
    pub dapp_url: Option<&'a str>,
    pub serialized_tx_b64: Option<&'a str>,
    pub user_pubkey: Pubkey,
}

pub struct SwapPhaseOutput {
    pub signature: String,
    pub destination_ata: Pubkey,
}

/// Phase 6: resolve the pool, build associated-token-account/native-wrap
/// prelude instructions, dispatch to [`relay_swap::build_swap`], sign with
/// the execution keypair (plus any open-orders signer the legacy AMM path
/// needs) and broadcast.
pub async fn execute_swap(input: SwapPhaseInput<'_>) -> Result<SwapPhaseOutput, OrchestratorError> {
    let pool_id_str = input
        .pool_discovery
        .resolve(PoolDiscoveryInput {
            mint_in: &input.input_mint.to_string(),
            mint_out: &input.output_mint.to_string(),
            dapp_url: input.dapp_url,
            serialized_tx_b64: input.serialized_tx_b64,
            user_pubkey: Some(&input.user_pubkey.to_string()),
        })
        .await
        .map_err(|_| OrchestratorError::PoolNotFound)?;
    let pool_id = parse_pubkey(&pool_id_str)?;

    let pool_account = chain_account_or_pool_not_found(input.chain, &pool_id).await?;
    let pool_owner = parse_pubkey(&pool_account.owner)?;
    let (reserve_in, reserve_out, fee_bps) = decode_pool_reserves(&pool_account.data);

    let execution_pubkey = input.execution_keypair.pubkey();
    let source_ata = get_associated_token_address(&execution_pubkey, &input.input_mint);
    let destination_ata = get_associated_token_address(&execution_pubkey, &input.output_mint);

    let mut instructions = Vec::new();
    for (ata, mint) in [
        (source_ata, input.input_mint),
        (destination_ata, input.output_mint),
    ] {
        if input.chain.account_info(&ata.to_string()).await?.is_none() {
            instructions.push(spl_associated_token_account::instruction::create_associated_token_account(
                &execution_pubkey,
                &execution_pubkey,
                &mint,
                &spl_token::id(),
            ));
        }
    }

    if input.input_mint == spl_token::native_mint::id() {
        instructions.push(system_transfer_instruction(
            &execution_pubkey,
            &source_ata,
            input.amount_in,
        ));
        instructions.push(
            spl_token::instruction::sync_native(&spl_token::id(), &source_ata)
                .map_err(|e| OrchestratorError::Internal(e.to_string()))?,
        );
    }

    let swap_set = build_swap(SwapRequest {
        pool_id,
        pool_owner,
        input_mint: input.input_mint,
        output_mint: input.output_mint,
        source_ata,
        destination_ata,
        authority: execution_pubkey,
        amount_in: input.amount_in,
        max_slippage_bps: input.max_slippage_bps,
        pool_state: PoolState {
            reserve_in,
            reserve_out,
            fee_bps,
        },
    })?;
    instructions.extend(swap_set.instructions);

    let open_orders_signers: Vec<Keypair> = swap_set.signers.into_iter().map(|k| k.0).collect();
    let signer_refs: Vec<&Keypair> = open_orders_signers.iter().collect();

    let (blockhash, _slot) = input.chain.latest_blockhash().await?;
    let tx_bytes = sign_and_serialize(&instructions, input.execution_keypair, &signer_refs, &blockhash)?;
    let signature = input.chain.send_raw(&tx_bytes).await?;

    Ok(SwapPhaseOutput {
        signature,
        destination_ata,
    })
}

/// Phase 7: pays the swap output out to the user. Native-mint output closes
/// the execution account's wrapped-SOL account straight to the user;
/// otherwise the full output-ATA balance is transferred, creating the
/// user's ATA if it does not exist.
pub async fn payout(
    chain: &SolanaChainProvider,
    execution_keypair: &Keypair,
    output_mint: Pubkey,
    output_ata: Pubkey,
    user_pubkey: Pubkey,
) -> Result<Option<String>, OrchestratorError> {
    let execution_pubkey = execution_keypair.pubkey();
    let mut instructions = Vec::new();

    if output_mint == spl_token::native_mint::id() {
        instructions.push(
            spl_token::instruction::close_account(
                &spl_token::id(),
                &output_ata,
                &user_pubkey,
                &execution_pubkey,
                &[],
            )
            .map_err(|e| OrchestratorError::Internal(e.to_string()))?,
        );
    } else {
        let balance = chain
            .account_info(&output_ata.to_string())
            .await?
            .map(|a| decode_token_amount(&a.data))
            .unwrap_or(0);
        if balance == 0 {
            tracing::info!("payout skipped: output ata has zero balance");
            return Ok(None);
        }
        let user_ata = get_associated_token_address(&user_pubkey, &output_mint);
        if chain.account_info(&user_ata.to_string()).await?.is_none() {
            instructions.push(spl_associated_token_account::instruction::create_associated_token_account(
                &execution_pubkey,
                &user_pubkey,
                &output_mint,
                &spl_token::id(),
            ));
        }
        instructions.push(
            spl_token::instruction::transfer(
                &spl_token::id(),
                &output_ata,
                &user_ata,
                &execution_pubkey,
                &[],
                balance,
            )
            .map_err(|e| OrchestratorError::Internal(e.to_string()))?,
        );
    }

    let (blockhash, _slot) = chain.latest_blockhash().await?;
    let tx_bytes = sign_and_serialize(&instructions, execution_keypair, &[], &blockhash)?;
    let signature = chain.send_raw(&tx_bytes).await?;

    // Best-effort confirmation: a failure here does not change the
    // already-reported execution outcome, per spec.
    if confirm_or_fail(chain, &signature, Duration::from_secs(15)).await.is_err() {
        tracing::warn!(%signature, "payout transaction did not confirm, leaving as best-effort");
    }

    Ok(Some(signature))
}

/// Non-Raydium routes (`solana-swap`, `solana-approve`): the dApp's own
/// instruction list already targets the right program and accounts, so this
/// replays it as-is, substituting the execution keypair wherever the
/// original transaction expected the user's own wallet to sign — the
/// execution account now holds the funds on the user's behalf for the
/// duration of this intent.
pub async fn execute_passthrough(
    chain: &SolanaChainProvider,
    execution_keypair: &Keypair,
    transaction: &relay_types::intent::TransactionData,
    user_pubkey: &Pubkey,
) -> Result<String, OrchestratorError> {
    let execution_pubkey = execution_keypair.pubkey();
    let mut instructions = Vec::with_capacity(transaction.instructions.len());
    for ix in &transaction.instructions {
        let program_id = parse_pubkey(&ix.program_id)?;
        let mut accounts = Vec::with_capacity(ix.keys.len());
        for meta in &ix.keys {
            let is_user = meta.pubkey == user_pubkey.to_string();
            let pubkey = if is_user {
                execution_pubkey
            } else {
                parse_pubkey(&meta.pubkey)?
            };
            let is_signer = meta.is_signer && is_user;
            accounts.push(if meta.is_writable {
                AccountMeta::new(pubkey, is_signer)
            } else {
                AccountMeta::new_readonly(pubkey, is_signer)
            });
        }
        instructions.push(SolanaInstruction {
            program_id,
            accounts,
            data: ix.data.clone(),
        });
    }

    let (blockhash, _slot) = chain.latest_blockhash().await?;
    let tx_bytes = sign_and_serialize(&instructions, execution_keypair, &[], &blockhash)?;
    Ok(chain.send_raw(&tx_bytes).await?)
}

async fn chain_account_or_pool_not_found(
    chain: &SolanaChainProvider,
    pool_id: &Pubkey,
) -> Result<relay_chain_solana::AccountInfo, OrchestratorError> {
    chain
        .account_info(&pool_id.to_string())
        .await?
        .ok_or(OrchestratorError::PoolNotFound)
}

fn decode_pool_reserves(data: &[u8]) -> (u64, u64, u16) {
    let read_u64 = |offset: usize| -> u64 {
        data.get(offset..offset + 8)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_le_bytes)
            .unwrap_or(0)
    };
    let read_u16 = |offset: usize| -> u16 {
        data.get(offset..offset + 2)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_le_bytes)
            .unwrap_or(25)
    };
    (
        read_u64(POOL_RESERVES_OFFSET),
        read_u64(POOL_RESERVES_OFFSET + 8),
        read_u16(POOL_RESERVES_OFFSET + 16),
    )
}

fn decode_token_amount(data: &[u8]) -> u64 {
    data.get(TOKEN_ACCOUNT_AMOUNT_OFFSET..TOKEN_ACCOUNT_AMOUNT_OFFSET + 8)
        .and_then(|b| b.try_into().ok())
        .map(u64::from_le_bytes)
        .unwrap_or(0)
}

fn system_transfer_instruction(from: &Pubkey, to: &Pubkey, lamports: u64) -> SolanaInstruction {
    let mut data = Vec::with_capacity(12);
    data.extend_from_slice(&2u32.to_le_bytes());
    data.extend_from_slice(&lamports.to_le_bytes());
    SolanaInstruction {
        program_id: Pubkey::default(),
        accounts: vec![AccountMeta::new(*from, true), AccountMeta::new(*to, false)],
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_token_amount_at_fixed_offset() {
        let mut data = vec![0u8; 72];
        data[64..72].copy_from_slice(&123_456u64.to_le_bytes());
        assert_eq!(decode_token_amount(&data), 123_456);
    }

    #[test]
    fn decodes_pool_reserves() {
        let mut data = vec![0u8; 82];
        data[64..72].copy_from_slice(&1_000u64.to_le_bytes());
        data[72..80].copy_from_slice(&2_000u64.to_le_bytes());
        data[80..82].copy_from_slice(&30u16.to_le_bytes());
        assert_eq!(decode_pool_reserves(&data), (1_000, 2_000, 30));
    }

    #[test]
    fn system_transfer_has_transfer_discriminant() {
        let ix = system_transfer_instruction(&Pubkey::new_unique(), &Pubkey::new_unique(), 500);
        assert_eq!(&ix.data[0..4], &2u32.to_le_bytes());
        assert_eq!(u64::from_le_bytes(ix.data[4..12].try_into().unwrap()), 500);
    }
}
