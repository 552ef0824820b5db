//! Pool discovery: resolves `(mint_in, mint_out)` to an AMM pool identifier
//! via five sources tried in order, short-circuiting on the first hit, with
//! a 10-minute TTL cache over successful resolutions.

use base64::Engine;
use dashmap::DashMap;
use relay_types::amm::is_known_amm_program;
use serde_json::Value;
use solana_transaction::versioned::VersionedTransaction;
use std::time::{Duration, Instant};
use url::Url;

const CACHE_TTL: Duration = Duration::from_secs(10 * 60);
const CATALOG_TIMEOUT: Duration = Duration::from_secs(5);

/// Positions in a transaction's flattened account-key list that empirically
/// tend to hold the pool account across the AMM programs this relay targets.
/// Not derived from per-program instruction schemas; documented as a known
/// limitation.
const POOL_ACCOUNT_CANDIDATE_POSITIONS: &[usize] =
    &[6, 7, 8, 9, 10, 13, 14, 15, 1, 2, 3, 4, 5];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolDiscoveryError {
    NotFound,
}

pub struct PoolDiscoveryInput<'a> {
    pub mint_in: &'a str,
    pub mint_out: &'a str,
    pub dapp_url: Option<&'a str>,
    pub serialized_tx_b64: Option<&'a str>,
    pub user_pubkey: Option<&'a str>,
}

pub struct PoolDiscovery {
    http: reqwest::Client,
    catalog_base_urls: Vec<String>,
    known_pools: Vec<((String, String), String)>,
    cache: DashMap<(String, String), (String, Instant)>,
}

impl PoolDiscovery {
    pub fn new(catalog_base_urls: Vec<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(CATALOG_TIMEOUT)
                .build()
                .expect("reqwest client builds"),
            catalog_base_urls,
            known_pools: Vec::new(),
            cache: DashMap::new(),
        }
    }

    pub fn with_known_pool(mut self, mint_a: &str, mint_b: &str, pool_id: &str) -> Self {
        self.known_pools
            .push((cache_key(mint_a, mint_b), pool_id.to_string()));
        self
    }

    pub async fn resolve(&self, input: PoolDiscoveryInput<'_>) -> Result<String, PoolDiscoveryError> {
        let key = cache_key(input.mint_in, input.mint_out);
        if let Some(entry) = self.cache.get(&key) {
            if entry.1.elapsed() < CACHE_TTL {
                return Ok(entry.0.clone());
            }
        }

        if let Some(pool_id) = input.dapp_url.and_then(extract_pool_id_from_query) {
            self.cache.insert(key, (pool_id.clone(), Instant::now()));
            return Ok(pool_id);
        }

        if let Some(pool_id) = self.query_remote_catalog(input.mint_in, input.mint_out).await {
            self.cache.insert(key, (pool_id.clone(), Instant::now()));
            return Ok(pool_id);
        }

        if let Some((_, pool_id)) = self.known_pools.iter().find(|(k, _)| *k == key) {
            self.cache.insert(key.clone(), (pool_id.clone(), Instant::now()));
            return Ok(pool_id.clone());
        }

        if let (Some(tx_b64), Some(user_pubkey)) = (input.serialized_tx_b64, input.user_pubkey) {
            if let Some(pool_id) = extract_pool_id_from_transaction(tx_b64, user_pubkey) {
                self.cache.insert(key, (pool_id.clone(), Instant::now()));
                return Ok(pool_id);
            }
        }

        // On-chain discovery via getProgramAccounts with a size filter is out
        // of scope for decoding in this implementation; it may return
        // NotFound.
        Err(PoolDiscoveryError::NotFound)
    }

    async fn query_remote_catalog(&self, mint_in: &str, mint_out: &str) -> Option<String> {
        for base_url in &self.catalog_base_urls {
            let url = format!("{base_url}?mintA={mint_in}&mintB={mint_out}");
            let response = match self.http.get(&url).send().await {
                Ok(r) => r,
                Err(err) => {
                    tracing::warn!(%base_url, error = %err, "pool catalog request failed");
                    continue;
                }
            };
            if response.status() == reqwest::StatusCode::NOT_FOUND {
                continue;
            }
            if !response.status().is_success() {
                tracing::warn!(%base_url, status = %response.status(), "pool catalog returned error status");
                continue;
            }
            let body: Value = match response.json().await {
                Ok(v) => v,
                Err(err) => {
                    tracing::warn!(%base_url, error = %err, "pool catalog body was not valid json");
                    continue;
                }
            };
            if let Some(pool_id) = extract_pool_from_catalog_body(&body, mint_in, mint_out) {
                return Some(pool_id);
            }
        }
        None
    }
}

fn cache_key(mint_a: &str, mint_b: &str) -> (String, String) {
    if mint_a.to_ascii_lowercase() <= mint_b.to_ascii_lowercase() {
        (mint_a.to_string(), mint_b.to_string())
    } else {
        (mint_b.to_string(), mint_a.to_string())
    }
}

fn extract_pool_id_from_query(dapp_url: &str) -> Option<String> {
    let url = Url::parse(dapp_url).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "poolId")
        .map(|(_, v)| v.into_owned())
}

fn extract_pool_from_catalog_body(body: &Value, mint_in: &str, mint_out: &str) -> Option<String> {
    let candidates: Vec<&Value> = match body {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => {
            if let Some(Value::Array(items)) = map.get("data") {
                items.iter().collect()
            } else {
                vec![body]
            }
        }
        _ => vec![],
    };

    for entry in candidates {
        let id = entry
            .get("id")
            .or_else(|| entry.get("poolId"))
            .or_else(|| entry.get("address"))
            .and_then(Value::as_str);
        let Some(id) = id else { continue };

        let base = entry
            .get("baseMint")
            .or_else(|| entry.get("mintA"))
            .or_else(|| entry.pointer("/tokenA/mint"))
            .and_then(Value::as_str);
        let quote = entry
            .get("quoteMint")
            .or_else(|| entry.get("mintB"))
            .or_else(|| entry.pointer("/tokenB/mint"))
            .and_then(Value::as_str);

        if let (Some(base), Some(quote)) = (base, quote) {
            let matches_forward = base == mint_in && quote == mint_out;
            let matches_reverse = base == mint_out && quote == mint_in;
            if matches_forward || matches_reverse {
                return Some(id.to_string());
            }
        }
    }
    None
}

fn extract_pool_id_from_transaction(tx_b64: &str, user_pubkey: &str) -> Option<String> {
    let tx_bytes = base64::engine::general_purpose::STANDARD
        .decode(tx_b64)
        .ok()?;
    let tx: VersionedTransaction = bincode::deserialize(&tx_bytes).ok()?;
    let account_keys = tx.message.static_account_keys();

    let program_ids: Vec<String> = match &tx.message {
        solana_message::VersionedMessage::Legacy(m) => m
            .instructions
            .iter()
            .map(|ix| account_keys[ix.program_id_index as usize].to_string())
            .collect(),
        solana_message::VersionedMessage::V0(m) => m
            .instructions
            .iter()
            .map(|ix| account_keys[ix.program_id_index as usize].to_string())
            .collect(),
    };

    let amm_instruction_index = program_ids
        .iter()
        .position(|program_id| is_known_amm_program(program_id))?;
    let _ = amm_instruction_index;

    for &position in POOL_ACCOUNT_CANDIDATE_POSITIONS {
        let Some(candidate) = account_keys.get(position) else {
            continue;
        };
        let candidate = candidate.to_string();
        if candidate != user_pubkey {
            return Some(candidate);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_from_dapp_url_query_string() {
        let discovery = PoolDiscovery::new(vec![]);
        let result = discovery
            .resolve(PoolDiscoveryInput {
                mint_in: "So11111111111111111111111111111111111111112",
                mint_out: "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                dapp_url: Some("https://example.dapp/swap?poolId=DKgKNdwL"),
                serialized_tx_b64: None,
                user_pubkey: None,
            })
            .await;
        assert_eq!(result, Ok("DKgKNdwL".to_string()));
    }

    #[tokio::test]
    async fn falls_back_to_known_pool_map() {
        let discovery = PoolDiscovery::new(vec![])
            .with_known_pool("MINT_A", "MINT_B", "known-pool-id");
        let result = discovery
            .resolve(PoolDiscoveryInput {
                mint_in: "MINT_B",
                mint_out: "MINT_A",
                dapp_url: None,
                serialized_tx_b64: None,
                user_pubkey: None,
            })
            .await;
        assert_eq!(result, Ok("known-pool-id".to_string()));
    }

    #[tokio::test]
    async fn returns_not_found_when_no_source_resolves() {
        let discovery = PoolDiscovery::new(vec![]);
        let result = discovery
            .resolve(PoolDiscoveryInput {
                mint_in: "MINT_X",
                mint_out: "MINT_Y",
                dapp_url: None,
                serialized_tx_b64: None,
                user_pubkey: None,
            })
            .await;
        assert_eq!(result, Err(PoolDiscoveryError::NotFound));
    }

    #[tokio::test]
    async fn queries_remote_catalog_with_wiremock() {
        use wiremock::matchers::method;
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": "pool-123", "baseMint": "MINT_A", "quoteMint": "MINT_B" }
            ])))
            .mount(&server)
            .await;

        let discovery = PoolDiscovery::new(vec![server.uri()]);
        let result = discovery
            .resolve(PoolDiscoveryInput {
                mint_in: "MINT_A",
                mint_out: "MINT_B",
                dapp_url: None,
                serialized_tx_b64: None,
                user_pubkey: None,
            })
            .await;
        assert_eq!(result, Ok("pool-123".to_string()));
    }
}
