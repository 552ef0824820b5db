use std::sync::Arc;

use relay_chain_solana::SolanaChainProvider;
use relay_chain_solana::relay_registry_status::RegistryHandle;
use relay_crypto::attestation::AttestationService;
use relay_crypto::keypair::Keypair;
use relay_orchestrator::Orchestrator;
use relay_pool::PoolDiscovery;
use relay_ratelimit::RateLimiter;
use relay_registry::Registry;

use crate::config::Config;

/// Everything shared across requests. Cloned cheaply into handlers via
/// `Arc` (every field is itself `Arc`-backed or internally synchronized).
pub struct AppState {
    pub config: Config,
    pub registry: Registry,
    pub registry_handle: RegistryHandle,
    pub rate_limiter: Arc<RateLimiter>,
    pub logger: Arc<relay_logger::RingLogger>,
    pub keypair: Arc<Keypair>,
    pub attestation: Arc<AttestationService>,
    pub chain: Arc<SolanaChainProvider>,
    pub pool_discovery: Arc<PoolDiscovery>,
    pub orchestrator: Arc<Orchestrator>,
}
