//! PDA derivation and instruction encoding for the external executor
//! program. The executor program itself is out of scope; this module
//! describes only the instruction layouts and PDA seeds this relay must
//! produce to talk to it.

use crate::error::ChainError;
use solana_instruction::{AccountMeta, Instruction};
use solana_pubkey::Pubkey;
use std::str::FromStr;

const DEPOSIT_DISCRIMINANT: u8 = 1;
const EXECUTE_WITH_INTENT_DISCRIMINANT: u8 = 3;

pub struct ExecutorPdas {
    pub executor_pda: Pubkey,
    pub vault_pda: Pubkey,
    pub user_deposit_pda: Pubkey,
}

pub fn derive_executor_pdas(program_id: &Pubkey, user_pubkey: &Pubkey) -> ExecutorPdas {
    let (executor_pda, _) = Pubkey::find_program_address(&[b"executor"], program_id);
    let (vault_pda, _) = Pubkey::find_program_address(&[b"vault"], program_id);
    let (user_deposit_pda, _) =
        Pubkey::find_program_address(&[b"user_deposit", user_pubkey.as_ref()], program_id);
    ExecutorPdas {
        executor_pda,
        vault_pda,
        user_deposit_pda,
    }
}

pub fn parse_pubkey(s: &str) -> Result<Pubkey, ChainError> {
    Pubkey::from_str(s).map_err(|e| ChainError::InvalidPubkey(e.to_string()))
}

/// Builds the `DEPOSIT` instruction. The ciphertext bytes are an externally
/// supplied confidential-deposit handle this relay never interprets.
pub fn build_deposit_instruction(
    program_id: &Pubkey,
    amount_lamports: u64,
    ciphertext: &[u8],
    input_type: u8,
    accounts: Vec<AccountMeta>,
) -> Instruction {
    let mut data = Vec::with_capacity(1 + 8 + 4 + ciphertext.len() + 1);
    data.push(DEPOSIT_DISCRIMINANT);
    data.extend_from_slice(&amount_lamports.to_le_bytes());
    data.extend_from_slice(&(ciphertext.len() as u32).to_le_bytes());
    data.extend_from_slice(ciphertext);
    data.push(input_type);
    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

/// Builds the `EXECUTE_WITH_INTENT` instruction that moves
/// `amount_lamports` from the vault to the execution account, authorized by
/// the user's intent signature.
pub fn build_execute_with_intent_instruction(
    program_id: &Pubkey,
    intent_hash: &[u8; 32],
    signature_bytes: &[u8],
    amount_lamports: u64,
    executor_pda: &Pubkey,
    vault_pda: &Pubkey,
    user_deposit_pda: &Pubkey,
    user_pubkey: &Pubkey,
    execution_pubkey: &Pubkey,
) -> Instruction {
    let mut data = Vec::with_capacity(1 + 32 + 4 + signature_bytes.len() + 8);
    data.push(EXECUTE_WITH_INTENT_DISCRIMINANT);
    data.extend_from_slice(intent_hash);
    data.extend_from_slice(&(signature_bytes.len() as u32).to_le_bytes());
    data.extend_from_slice(signature_bytes);
    data.extend_from_slice(&amount_lamports.to_le_bytes());

    let accounts = vec![
        AccountMeta::new_readonly(*executor_pda, false),
        AccountMeta::new(*vault_pda, false),
        AccountMeta::new(*user_deposit_pda, false),
        AccountMeta::new_readonly(*user_pubkey, false),
        AccountMeta::new(*execution_pubkey, true),
        AccountMeta::new_readonly(Pubkey::default(), false),
    ];

    Instruction {
        program_id: *program_id,
        accounts,
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execute_with_intent_encodes_expected_layout() {
        let program_id = Pubkey::new_unique();
        let executor_pda = Pubkey::new_unique();
        let vault_pda = Pubkey::new_unique();
        let user_deposit_pda = Pubkey::new_unique();
        let user_pubkey = Pubkey::new_unique();
        let execution_pubkey = Pubkey::new_unique();
        let intent_hash = [7u8; 32];
        let signature_bytes = vec![1u8; 64];

        let ix = build_execute_with_intent_instruction(
            &program_id,
            &intent_hash,
            &signature_bytes,
            123_456,
            &executor_pda,
            &vault_pda,
            &user_deposit_pda,
            &user_pubkey,
            &execution_pubkey,
        );

        assert_eq!(ix.data[0], EXECUTE_WITH_INTENT_DISCRIMINANT);
        assert_eq!(&ix.data[1..33], &intent_hash);
        assert_eq!(u32::from_le_bytes(ix.data[33..37].try_into().unwrap()), 64);
        assert_eq!(ix.accounts.len(), 6);
        assert!(ix.accounts[4].is_signer);
    }

    #[test]
    fn pdas_are_deterministic() {
        let program_id = Pubkey::new_unique();
        let user = Pubkey::new_unique();
        let a = derive_executor_pdas(&program_id, &user);
        let b = derive_executor_pdas(&program_id, &user);
        assert_eq!(a.executor_pda, b.executor_pda);
        assert_eq!(a.vault_pda, b.vault_pda);
        assert_eq!(a.user_deposit_pda, b.user_deposit_pda);
    }
}
