//! Phase 1: amount extraction. Scans the raw instruction list for however
//! much the dApp is already moving, so the funding phase knows how much to
//! draw from the vault.

use relay_swap::clamp_amount;
use relay_types::amm::is_known_amm_program;
use relay_types::intent::TransactionData;
use std::collections::HashSet;

const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
/// The System Program's `Transfer` variant is encoded as a 4-byte LE `u32`
/// tag followed by an 8-byte LE lamport amount (12 bytes total), matching
/// `bincode`'s encoding of the program's instruction enum.
const SYSTEM_TRANSFER_DISCRIMINANT: u32 = 2;
const AMM_AMOUNT_MIN: u64 = 1_000;
const AMM_AMOUNT_MAX: u64 = 1_000_000_000_000_000;

/// Floors a zero extraction to this many lamports so a funding instruction
/// always has something to move.
pub const DEFAULT_MINIMUM_LAMPORTS: u64 = 10_000_000;

pub fn extract_required_lamports(transaction: &TransactionData, minimum_floor: u64) -> u64 {
    if let Some(amount) = transaction.extracted_amount_lamports {
        if amount > 0 {
            return clamp_amount(amount as u128).amount;
        }
    }

    let mut sum: u128 = 0;
    let mut seen_amm: HashSet<(String, u64)> = HashSet::new();

    for instruction in &transaction.instructions {
        if instruction.program_id == SYSTEM_PROGRAM_ID
            && instruction.data.len() >= 12
            && u32::from_le_bytes(instruction.data[0..4].try_into().unwrap()) == SYSTEM_TRANSFER_DISCRIMINANT
        {
            let amount = u64::from_le_bytes(instruction.data[4..12].try_into().unwrap());
            sum += amount as u128;
            continue;
        }
        if instruction.data.len() < 9 {
            continue;
        }
        if is_known_amm_program(&instruction.program_id) {
            let amount = u64::from_le_bytes(instruction.data[1..9].try_into().unwrap());
            if (AMM_AMOUNT_MIN..=AMM_AMOUNT_MAX).contains(&amount) {
                let key = (instruction.program_id.clone(), amount);
                if seen_amm.insert(key) {
                    sum += amount as u128;
                }
            }
        }
    }

    if sum == 0 {
        sum = minimum_floor as u128;
    }

    clamp_amount(sum).amount
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::intent::Instruction;

    fn system_transfer(lamports: u64) -> Instruction {
        let mut data = SYSTEM_TRANSFER_DISCRIMINANT.to_le_bytes().to_vec();
        data.extend_from_slice(&lamports.to_le_bytes());
        Instruction {
            program_id: SYSTEM_PROGRAM_ID.to_string(),
            keys: vec![],
            data,
        }
    }

    #[test]
    fn prefers_pre_extracted_amount() {
        let transaction = TransactionData {
            extracted_amount_lamports: Some(42),
            ..Default::default()
        };
        assert_eq!(extract_required_lamports(&transaction, DEFAULT_MINIMUM_LAMPORTS), 42);
    }

    #[test]
    fn sums_system_transfers() {
        let transaction = TransactionData {
            instructions: vec![system_transfer(1_000_000), system_transfer(2_000_000)],
            ..Default::default()
        };
        assert_eq!(
            extract_required_lamports(&transaction, DEFAULT_MINIMUM_LAMPORTS),
            3_000_000
        );
    }

    #[test]
    fn floors_to_minimum_when_nothing_found() {
        let transaction = TransactionData::default();
        assert_eq!(
            extract_required_lamports(&transaction, DEFAULT_MINIMUM_LAMPORTS),
            DEFAULT_MINIMUM_LAMPORTS
        );
    }

    #[test]
    fn dedups_amm_instructions_by_program_and_amount() {
        use relay_types::amm::RAYDIUM_CPMM;
        let mut data = vec![9u8];
        data.extend_from_slice(&500_000u64.to_le_bytes());
        let ix = Instruction {
            program_id: RAYDIUM_CPMM.to_string(),
            keys: vec![],
            data,
        };
        let transaction = TransactionData {
            instructions: vec![ix.clone(), ix],
            ..Default::default()
        };
        assert_eq!(
            extract_required_lamports(&transaction, DEFAULT_MINIMUM_LAMPORTS),
            500_000
        );
    }
}
