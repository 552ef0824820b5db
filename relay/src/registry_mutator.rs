//! Adapts [`relay_registry::Registry`] to the narrow mutation seam the chain
//! I/O layer's confirmation watcher depends on.

use relay_chain_solana::relay_registry_status::RegistryMutator;
use relay_registry::Registry;
use relay_types::registry::IntentStatus;

pub struct RegistryMutatorAdapter(pub Registry);

impl RegistryMutator for RegistryMutatorAdapter {
    fn mark_executed(&self, intent_hash: &str, chain_signature: &str) {
        self.0.mark(intent_hash, IntentStatus::Executed, Some(chain_signature.to_string()));
    }

    fn mark_failed(&self, intent_hash: &str) {
        self.0.mark(intent_hash, IntentStatus::Failed, None);
    }
}
