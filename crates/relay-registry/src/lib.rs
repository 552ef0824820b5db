//! Intent registry: the lifecycle store keyed by `intent_hash`.
//!
//! `DashMap` already shards its buckets internally with per-shard mutual
//! exclusion, giving the registry's `entry` API linearizable first-write-wins
//! semantics without an explicit outer lock — the same storage shape the
//! rest of this workspace's ancestry reaches for when a map needs to survive
//! concurrent task access without becoming a bottleneck.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use relay_types::registry::{ExecutionPlan, IntentStatus, RegistryEntry, ReplayLookup};
use relay_types::{Intent, UnixTimestampMs};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReserveOutcome {
    New,
    ResumeApproved,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryCounts {
    pub approved: usize,
    pub submitted: usize,
    pub executed: usize,
    pub failed: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("already processed")]
    Replay,
    #[error("no such intent")]
    NotFound,
}

#[derive(Clone)]
pub struct Registry {
    entries: Arc<DashMap<String, RegistryEntry>>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
        }
    }

    /// Atomically reserves `intent_hash` for a new execution attempt, or
    /// resumes an existing `approved` entry (the submit endpoint re-uses the
    /// hash the approve endpoint created). Any other existing status is a
    /// replay.
    pub fn try_reserve(&self, intent_hash: &str, intent: Intent) -> Result<ReserveOutcome, RegistryError> {
        match self.entries.entry(intent_hash.to_string()) {
            Entry::Vacant(vacant) => {
                let now = UnixTimestampMs::now().as_millis();
                vacant.insert(RegistryEntry {
                    intent_hash: intent_hash.to_string(),
                    intent,
                    execution_plan: None,
                    tee_signature: None,
                    status: IntentStatus::Approved,
                    chain_signature: None,
                    processed_at: now,
                    updated_at: now,
                });
                Ok(ReserveOutcome::New)
            }
            Entry::Occupied(occupied) => {
                if occupied.get().status == IntentStatus::Approved {
                    Ok(ReserveOutcome::ResumeApproved)
                } else {
                    Err(RegistryError::Replay)
                }
            }
        }
    }

    pub fn attach_plan(&self, intent_hash: &str, plan: ExecutionPlan, tee_signature: String) {
        if let Some(mut entry) = self.entries.get_mut(intent_hash) {
            entry.execution_plan = Some(plan);
            entry.tee_signature = Some(tee_signature);
            entry.updated_at = UnixTimestampMs::now().as_millis();
        }
    }

    /// Monotone status transition. Backwards or illegal transitions are
    /// ignored with a warning rather than erroring, matching the spec's
    /// "ignore with a warning" policy for an orchestrator that may retry a
    /// phase after the registry already observed its outcome.
    pub fn mark(&self, intent_hash: &str, new_status: IntentStatus, chain_signature: Option<String>) {
        let Some(mut entry) = self.entries.get_mut(intent_hash) else {
            tracing::warn!(%intent_hash, "mark() on unknown intent hash");
            return;
        };
        if !entry.status.can_transition_to(new_status) {
            tracing::warn!(
                %intent_hash,
                from = ?entry.status,
                to = ?new_status,
                "ignoring illegal registry transition"
            );
            return;
        }
        entry.status = new_status;
        if let Some(sig) = chain_signature {
            entry.chain_signature = Some(sig);
        }
        entry.updated_at = UnixTimestampMs::now().as_millis();
    }

    pub fn get(&self, intent_hash: &str) -> Option<RegistryEntry> {
        self.entries.get(intent_hash).map(|e| e.clone())
    }

    /// Counts of entries per lifecycle status, for the status endpoint.
    pub fn counts(&self) -> RegistryCounts {
        let mut counts = RegistryCounts::default();
        for entry in self.entries.iter() {
            match entry.status {
                IntentStatus::Approved => counts.approved += 1,
                IntentStatus::Submitted => counts.submitted += 1,
                IntentStatus::Executed => counts.executed += 1,
                IntentStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn purge_older_than(&self, max_age: Duration) {
        let cutoff = UnixTimestampMs::now().as_millis().saturating_sub(max_age.as_millis() as u64);
        self.entries.retain(|_, entry| entry.processed_at >= cutoff);
    }

    /// Spawns the background sweep that purges entries older than
    /// `max_age`, running every `interval`, for as long as the returned
    /// handle is not dropped/aborted.
    pub fn spawn_purge_task(&self, max_age: Duration, interval: Duration) -> tokio::task::JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.purge_older_than(max_age);
            }
        })
    }
}

impl ReplayLookup for Registry {
    fn status_of(&self, intent_hash: &str) -> Option<IntentStatus> {
        self.entries.get(intent_hash).map(|e| e.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_types::intent::{Action, Limits, Metadata, TransactionData};

    fn dummy_intent() -> Intent {
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

    #[test]
    fn first_reserve_wins() {
        let registry = Registry::new();
        assert_eq!(
            registry.try_reserve("0xabc", dummy_intent()).unwrap(),
            ReserveOutcome::New
        );
        assert!(matches!(
            registry.try_reserve("0xabc", dummy_intent()),
            Err(RegistryError::Replay)
        ));
    }

    #[test]
    fn resume_only_from_approved() {
        let registry = Registry::new();
        registry.try_reserve("0xabc", dummy_intent()).unwrap();
        assert_eq!(
            registry.try_reserve("0xabc", dummy_intent()).unwrap(),
            ReserveOutcome::ResumeApproved
        );
        registry.mark("0xabc", IntentStatus::Submitted, None);
        assert!(matches!(
            registry.try_reserve("0xabc", dummy_intent()),
            Err(RegistryError::Replay)
        ));
    }

    #[test]
    fn ignores_backwards_transition() {
        let registry = Registry::new();
        registry.try_reserve("0xabc", dummy_intent()).unwrap();
        registry.mark("0xabc", IntentStatus::Submitted, None);
        registry.mark("0xabc", IntentStatus::Executed, None);
        registry.mark("0xabc", IntentStatus::Submitted, None);
        assert_eq!(registry.get("0xabc").unwrap().status, IntentStatus::Executed);
    }

    #[test]
    fn counts_reflect_status() {
        let registry = Registry::new();
        registry.try_reserve("0xabc", dummy_intent()).unwrap();
        registry.try_reserve("0xdef", dummy_intent()).unwrap();
        registry.mark("0xdef", IntentStatus::Submitted, None);
        let counts = registry.counts();
        assert_eq!(counts.approved, 1);
        assert_eq!(counts.submitted, 1);
    }

    #[test]
    fn purge_removes_old_entries() {
        let registry = Registry::new();
        registry.try_reserve("0xabc", dummy_intent()).unwrap();
        registry.purge_older_than(Duration::from_secs(0));
        assert!(registry.get("0xabc").is_none());
    }
}
