//! Known AMM program identifiers, consumed when scanning instructions for
//! swap-related program calls (amount extraction, transaction-type
//! classification, pool extraction from a serialized transaction).
//!
//! These are external facts about the Solana ecosystem, not values this
//! relay invents; the set mirrors the program ids a faithful rewrite of the
//! source would enumerate.

/// Raydium's legacy AMM v4 program.
pub const RAYDIUM_AMM_V4: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
/// Raydium's constant-product AMM (CPMM).
pub const RAYDIUM_CPMM: &str = "CPMMoo8L3F4NbTegBCKVNunggL7H1ZpdTHKxQB5qKP1C";
/// Raydium's concentrated-liquidity AMM (CLMM).
pub const RAYDIUM_CLMM: &str = "CAMMCzo5YL8w4VFF8KVHrK22GGUsp5VTaW7grrKgrWqK";
/// Orca Whirlpools concentrated-liquidity program.
pub const ORCA_WHIRLPOOL: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";

pub fn known_amm_program_ids() -> &'static [&'static str] {
    &[RAYDIUM_AMM_V4, RAYDIUM_CPMM, RAYDIUM_CLMM, ORCA_WHIRLPOOL]
}

pub fn is_known_amm_program(program_id: &str) -> bool {
    known_amm_program_ids().contains(&program_id)
}

/// The on-chain account-kind classification the swap-instruction builder
/// dispatches on, determined by reading the pool account's owner program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmmPoolKind {
    ConcentratedLiquidity,
    ConstantProduct,
    LegacyAmm,
}

impl AmmPoolKind {
    pub fn from_owner_program(owner: &str) -> Option<Self> {
        match owner {
            RAYDIUM_CLMM | ORCA_WHIRLPOOL => Some(AmmPoolKind::ConcentratedLiquidity),
            RAYDIUM_CPMM => Some(AmmPoolKind::ConstantProduct),
            RAYDIUM_AMM_V4 => Some(AmmPoolKind::LegacyAmm),
            _ => None,
        }
    }
}
