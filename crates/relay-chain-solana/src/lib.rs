//! Solana chain I/O: RPC send/confirm, account reads, the signature-dedup
//! cache, and executor-program PDA/instruction encoding (component H).

pub mod error;
pub mod executor;
pub mod provider;

pub use error::ChainError;
pub use executor::{ExecutorPdas, derive_executor_pdas, parse_pubkey};
pub use provider::relay_registry_status;
pub use provider::{AccountInfo, ConfirmationStatus, SolanaChainProvider};
