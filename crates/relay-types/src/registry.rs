//! Shared lifecycle types for the intent registry.
//!
//! The status machine and entry shape are defined here (rather than in
//! `relay-registry`) because the validator, orchestrator and HTTP boundary
//! all need to read and reason about an entry's status without depending on
//! the registry's storage implementation.

use crate::intent::Intent;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    Approved,
    Submitted,
    Executed,
    Failed,
}

impl IntentStatus {
    /// Whether `self -> next` is a legal forward transition.
    pub fn can_transition_to(self, next: IntentStatus) -> bool {
        use IntentStatus::*;
        matches!(
            (self, next),
            (Approved, Submitted) | (Submitted, Executed) | (Submitted, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, IntentStatus::Executed | IntentStatus::Failed)
    }
}

/// One of the three routes the orchestrator can resolve an intent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Route {
    Raydium,
    SolanaSwap,
    SolanaApprove,
}

/// Attached to a registry entry once amount extraction and pool resolution
/// complete; immutable for the lifetime of the entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionPlan {
    pub route: Route,
    pub estimated_price_lamports: u64,
    pub max_slippage_bps: u32,
    pub timestamp_ms: u64,
}

/// Narrow read-only contract the validator needs to detect replay, kept
/// separate from the registry's storage implementation so `relay-validator`
/// does not need to depend on `relay-registry`.
pub trait ReplayLookup {
    fn status_of(&self, intent_hash: &str) -> Option<IntentStatus>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub intent_hash: String,
    pub intent: Intent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_plan: Option<ExecutionPlan>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tee_signature: Option<String>,
    pub status: IntentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_signature: Option<String>,
    pub processed_at: u64,
    pub updated_at: u64,
}
