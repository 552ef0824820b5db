//! Anonymizing intent-execution relay HTTP server entrypoint.
//!
//! Loads configuration, brings up the TEE keypair, the intent registry, the
//! chain/pool-discovery clients and the execution orchestrator, then serves
//! the HTTP surface described by this workspace's handlers until a SIGTERM
//! or SIGINT asks it to stop.

mod config;
mod handlers;
mod rate_limit_mw;
mod registry_mutator;
mod sig_down;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;
use axum::middleware;
use relay_chain_solana::{SolanaChainProvider, parse_pubkey};
use relay_crypto::attestation::AttestationService;
use relay_crypto::keypair::Keypair as TeeKeypair;
use relay_logger::RingLogger;
use relay_orchestrator::{Orchestrator, OrchestratorConfig};
use relay_pool::PoolDiscovery;
use relay_ratelimit::RateLimiter;
use relay_registry::Registry;
use tower_http::cors;

use crate::config::Config;
use crate::registry_mutator::RegistryMutatorAdapter;
use crate::sig_down::SigDown;
use crate::state::AppState;

/// How long an intent stays in the registry before the background sweep
/// purges it, and how often that sweep runs.
const REGISTRY_RETENTION: Duration = Duration::from_secs(24 * 60 * 60);
const REGISTRY_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    let logger = Arc::new(RingLogger::new());

    #[cfg(feature = "telemetry")]
    {
        use tracing_subscriber::layer::SubscriberExt;
        use tracing_subscriber::util::SubscriberInitExt;
        use tracing_subscriber::{EnvFilter, fmt};

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .with(relay_logger::RingBufferLayer::new(logger.clone()))
            .init();
    }

    let keypair = Arc::new(TeeKeypair::load_or_generate(config.tee_keypair_path())?);
    let execution_keypair = Arc::new(config.execution_keypair()?);
    let executor_program_id = parse_pubkey(config.executor_program_id())?;

    let registry = Registry::new();
    let registry_handle: relay_chain_solana::relay_registry_status::RegistryHandle =
        Arc::new(RegistryMutatorAdapter(registry.clone()));

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit_per_minute()));
    let attestation = Arc::new(AttestationService::new(config.enclave_id(), env!("CARGO_PKG_VERSION")));

    let devnet_rpc = config
        .solana_rpc_url_devnet_fallback()
        .map(|s| s.to_string())
        .unwrap_or_else(|| config.solana_rpc_url_devnet().to_string());
    let chain = Arc::new(SolanaChainProvider::new(devnet_rpc));
    let pool_discovery = Arc::new(PoolDiscovery::new(vec![config.raydium_api_url().to_string()]));

    let orchestrator = Arc::new(Orchestrator::new(
        chain.clone(),
        pool_discovery.clone(),
        OrchestratorConfig {
            executor_program_id,
            execution_keypair,
            minimum_floor_lamports: config.minimum_floor_lamports(),
            funding_fee_lamports: config.funding_fee_lamports(),
            use_magicblock: config.use_magicblock_per(),
        },
    ));

    registry.spawn_purge_task(REGISTRY_RETENTION, REGISTRY_SWEEP_INTERVAL);
    rate_limiter.spawn_sweep_task();

    let app_state = Arc::new(AppState {
        config: config.clone(),
        registry,
        registry_handle,
        rate_limiter,
        logger,
        keypair,
        attestation,
        chain,
        pool_discovery,
        orchestrator,
    });

    let app = handlers::routes()
        .layer(middleware::from_fn_with_state(app_state.clone(), rate_limit_mw::rate_limit))
        .layer(
            cors::CorsLayer::new()
                .allow_origin(cors::Any)
                .allow_methods([Method::GET, Method::POST])
                .allow_headers(cors::Any),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    #[cfg(feature = "telemetry")]
    tracing::info!("listening on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let sig_down = SigDown::try_new()?;
    let cancellation_token = sig_down.cancellation_token();

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move { cancellation_token.cancelled().await })
        .await?;

    Ok(())
}
