//! Phase 5: transaction-type/route classification.
//!
//! Scans the intent's instructions for a known AMM program id (swap) or the
//! SPL-token `Approve` discriminant (approve); anything else defaults to a
//! plain swap route.

use relay_types::amm::is_known_amm_program;
use relay_types::intent::TransactionData;
use relay_types::registry::Route;

const SPL_TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
const SPL_TOKEN_APPROVE_DISCRIMINANT: u8 = 4;

pub fn classify_route(transaction: &TransactionData) -> Route {
    let has_amm_instruction = transaction
        .instructions
        .iter()
        .any(|ix| is_known_amm_program(&ix.program_id));
    if has_amm_instruction {
        return Route::Raydium;
    }

    let has_approve_instruction = transaction.instructions.iter().any(|ix| {
        ix.program_id == SPL_TOKEN_PROGRAM_ID
            && ix.data.first() == Some(&SPL_TOKEN_APPROVE_DISCRIMINANT)
    });
    if has_approve_instruction {
        return Route::SolanaApprove;
    }

    Route::SolanaSwap
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::amm::RAYDIUM_CPMM;
    use relay_types::intent::Instruction;

    #[test]
    fn classifies_amm_instruction_as_raydium() {
        let transaction = TransactionData {
            instructions: vec![Instruction {
                program_id: RAYDIUM_CPMM.to_string(),
                keys: vec![],
                data: vec![9, 0, 0, 0, 0, 0, 0, 0, 0],
            }],
            ..Default::default()
        };
        assert_eq!(classify_route(&transaction), Route::Raydium);
    }

    #[test]
    fn classifies_approve_instruction() {
        let transaction = TransactionData {
            instructions: vec![Instruction {
                program_id: SPL_TOKEN_PROGRAM_ID.to_string(),
                keys: vec![],
                data: vec![SPL_TOKEN_APPROVE_DISCRIMINANT],
            }],
            ..Default::default()
        };
        assert_eq!(classify_route(&transaction), Route::SolanaApprove);
    }

    #[test]
    fn defaults_to_swap() {
        let transaction = TransactionData::default();
        assert_eq!(classify_route(&transaction), Route::SolanaSwap);
    }
}
