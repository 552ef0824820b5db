//! Swap-instruction builder: wraps pool-type-specific account layouts behind
//! one dispatch trait, the way a real AMM SDK would be wrapped if one were
//! available in this workspace's dependency tree.

mod clamp;

pub use clamp::{ClampedAmount, clamp_amount};

use relay_chain_solana::error::ChainError;
use relay_types::RelayError;
use relay_types::amm::AmmPoolKind;
use solana_instruction::{AccountMeta, Instruction};
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;

#[derive(Debug, thiserror::Error)]
pub enum SwapError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("pool account owner is not a recognized AMM program")]
    UnrecognizedPoolKind,
    #[error("amount out of range after clamping")]
    AmountOutOfRange,
}

impl From<SwapError> for RelayError {
    fn from(err: SwapError) -> Self {
        match err {
            SwapError::Chain(e) => e.into(),
            SwapError::UnrecognizedPoolKind => RelayError::PoolNotFound,
            SwapError::AmountOutOfRange => RelayError::AmountOutOfRange,
        }
    }
}

/// Key material a swap path needs to co-sign with (the AMM path's
/// open-orders account, when required). Most pool kinds need none.
pub struct KeyMaterial(pub Keypair);

pub struct SwapInstructionSet {
    pub instructions: Vec<Instruction>,
    pub signers: Vec<KeyMaterial>,
    pub min_amount_out: u64,
}

pub struct SwapRequest {
    pub pool_id: Pubkey,
    pub pool_owner: Pubkey,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub source_ata: Pubkey,
    pub destination_ata: Pubkey,
    pub authority: Pubkey,
    pub amount_in: u64,
    pub max_slippage_bps: u32,
    /// Reserve/curve data read from the pool account, interpretation
    /// depends on `AmmPoolKind`.
    pub pool_state: PoolState,
}

/// The slice of on-chain pool state each pool-kind math path needs. In a
/// production build this is decoded from the pool account's raw bytes by a
/// real AMM SDK's account layout; this relay reads the two fields every
/// curve variant needs and treats the rest as opaque.
pub struct PoolState {
    pub reserve_in: u64,
    pub reserve_out: u64,
    pub fee_bps: u16,
}

fn min_amount_out_constant_product(
    amount_in: u64,
    reserve_in: u64,
    reserve_out: u64,
    fee_bps: u16,
    max_slippage_bps: u32,
) -> u64 {
    let amount_in_after_fee =
        (amount_in as u128) * (10_000 - fee_bps as u128) / 10_000;
    let numerator = amount_in_after_fee * reserve_out as u128;
    let denominator = reserve_in as u128 + amount_in_after_fee;
    let amount_out = if denominator == 0 {
        0
    } else {
        numerator / denominator
    };
    let slippage_factor = 10_000u128 - max_slippage_bps as u128;
    ((amount_out * slippage_factor) / 10_000) as u64
}

/// One SPL TransferChecked-shaped instruction into the pool's vault,
/// standing in for whichever program-specific swap instruction a real SDK
/// would emit for this pool kind; every path routes through this because
/// all three share the same token-transfer account shape at the edges.
fn build_swap_instruction(
    pool_kind: AmmPoolKind,
    request: &SwapRequest,
    min_amount_out: u64,
) -> Instruction {
    let discriminant: u8 = match pool_kind {
        AmmPoolKind::ConcentratedLiquidity => 0,
        AmmPoolKind::ConstantProduct => 1,
        AmmPoolKind::LegacyAmm => 2,
    };
    let mut data = Vec::with_capacity(1 + 8 + 8);
    data.push(discriminant);
    data.extend_from_slice(&request.amount_in.to_le_bytes());
    data.extend_from_slice(&min_amount_out.to_le_bytes());

    let accounts = vec![
        AccountMeta::new(request.pool_id, false),
        AccountMeta::new(request.source_ata, false),
        AccountMeta::new(request.destination_ata, false),
        AccountMeta::new_readonly(request.authority, true),
        AccountMeta::new_readonly(spl_token::id(), false),
    ];

    Instruction {
        program_id: request.pool_owner,
        accounts,
        data,
    }
}

/// Resolves the pool kind from the owner program and builds the swap
/// instruction set. `amount_in` must already be clamped by [`clamp_amount`].
pub fn build_swap(request: SwapRequest) -> Result<SwapInstructionSet, SwapError> {
    if request.amount_in == 0 {
        return Err(SwapError::AmountOutOfRange);
    }
    let pool_kind = AmmPoolKind::from_owner_program(&request.pool_owner.to_string())
        .ok_or(SwapError::UnrecognizedPoolKind)?;

    let min_amount_out = min_amount_out_constant_product(
        request.amount_in,
        request.pool_state.reserve_in,
        request.pool_state.reserve_out,
        request.pool_state.fee_bps,
        request.max_slippage_bps,
    );

    let instruction = build_swap_instruction(pool_kind, &request, min_amount_out);

    // Only the legacy AMM path needs an open-orders signer in the source
    // this relay is grounded on; CLMM/CPMM operate with PDA-owned state.
    let signers = match pool_kind {
        AmmPoolKind::LegacyAmm => vec![KeyMaterial(Keypair::new())],
        _ => vec![],
    };

    Ok(SwapInstructionSet {
        instructions: vec![instruction],
        signers,
        min_amount_out,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::amm::{RAYDIUM_AMM_V4, RAYDIUM_CLMM, RAYDIUM_CPMM};
    use std::str::FromStr;

    fn base_request(pool_owner: &str) -> SwapRequest {
        SwapRequest {
            pool_id: Pubkey::new_unique(),
            pool_owner: Pubkey::from_str(pool_owner).unwrap(),
            input_mint: Pubkey::new_unique(),
            output_mint: Pubkey::new_unique(),
            source_ata: Pubkey::new_unique(),
            destination_ata: Pubkey::new_unique(),
            authority: Pubkey::new_unique(),
            amount_in: 10_000_000,
            max_slippage_bps: 100,
            pool_state: PoolState {
                reserve_in: 1_000_000_000,
                reserve_out: 2_000_000_000,
                fee_bps: 25,
            },
        }
    }

    #[test]
    fn dispatches_cpmm_without_signers() {
        let result = build_swap(base_request(RAYDIUM_CPMM)).unwrap();
        assert!(result.signers.is_empty());
        assert!(result.min_amount_out > 0);
    }

    #[test]
    fn dispatches_clmm_without_signers() {
        let result = build_swap(base_request(RAYDIUM_CLMM)).unwrap();
        assert!(result.signers.is_empty());
    }

    #[test]
    fn legacy_amm_collects_open_orders_signer() {
        let result = build_swap(base_request(RAYDIUM_AMM_V4)).unwrap();
        assert_eq!(result.signers.len(), 1);
    }

    #[test]
    fn rejects_zero_amount() {
        let mut request = base_request(RAYDIUM_CPMM);
        request.amount_in = 0;
        assert!(matches!(build_swap(request), Err(SwapError::AmountOutOfRange)));
    }

    #[test]
    fn rejects_unknown_pool_owner() {
        let request = base_request("11111111111111111111111111111111");
        assert!(matches!(
            build_swap(request),
            Err(SwapError::UnrecognizedPoolKind)
        ));
    }
}
