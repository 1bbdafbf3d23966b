//! Quote Configuration
//!
//! Batching, escalation, rollback and retry parameters for the on-chain
//! quote pipeline, with per-chain defaults. Loaded from the environment
//! (`.env` supported) or from a TOML file.

use alloy_primitives::{address, Address};
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::brain::RouteProtocol;
use crate::tokens::{ARBITRUM, BASE, MAINNET, OPTIMISM};

// ============================================
// CONTRACTS
// ============================================

/// UniswapInterfaceMulticall (gas-limited sub-calls, reports block number)
const INTERFACE_MULTICALL: Address = address!("1F98415757620B543A52E61c46B32eB19261F984");
const BASE_INTERFACE_MULTICALL: Address = address!("091e99cb1C49331a94dD62755D168E941AbD0693");

const QUOTER_V2: Address = address!("61fFE014bA17989E743c5F6cB21bF9697530B21e");
const BASE_QUOTER_V2: Address = address!("3d4e44Eb1374240CE5F1B871ab261CD16335B76a");

const MAINNET_V4_QUOTER: Address = address!("52F0E24D1c21C8A0cB1e5a5dD6198556BD9E1203");
const OPTIMISM_V4_QUOTER: Address = address!("1f3131A13296Fb91C90870043742C3CDBFF1A8d7");
const BASE_V4_QUOTER: Address = address!("0d5e0F971ED27FBfF6c2837bf31316121532048D");
const ARBITRUM_V4_QUOTER: Address = address!("3972C00f7ed4885e145823eb7C655375d275A1C5");

// ============================================
// PARAMETER GROUPS
// ============================================

/// Per-protocol batching limits
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BatchParams {
    /// Max quoter calls per multicall
    pub multicall_chunk: usize,
    /// Gas cap forwarded to every quoter call
    pub gas_limit_per_call: u64,
    /// Chunks below this fraction of successful calls are retried
    pub min_success_rate: f64,
}

impl Default for BatchParams {
    fn default() -> Self {
        Self {
            multicall_chunk: 150,
            gas_limit_per_call: 1_000_000,
            min_success_rate: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolBatchParams {
    pub v2: BatchParams,
    pub v3: BatchParams,
    pub v4: BatchParams,
    pub mixed: BatchParams,
}

impl ProtocolBatchParams {
    pub fn uniform(params: BatchParams) -> Self {
        Self { v2: params, v3: params, v4: params, mixed: params }
    }

    pub fn for_protocol(&self, protocol: RouteProtocol) -> &BatchParams {
        match protocol {
            RouteProtocol::V2 => &self.v2,
            RouteProtocol::V3 => &self.v3,
            RouteProtocol::V4 => &self.v4,
            RouteProtocol::Mixed => &self.mixed,
        }
    }

    fn all(&self) -> [(RouteProtocol, &BatchParams); 4] {
        [
            (RouteProtocol::V2, &self.v2),
            (RouteProtocol::V3, &self.v3),
            (RouteProtocol::V4, &self.v4),
            (RouteProtocol::Mixed, &self.mixed),
        ]
    }
}

/// Replacement gas cap and chunk size applied on escalation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackParams {
    pub gas_limit: u64,
    pub multicall_chunk: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollbackParams {
    pub enabled: bool,
    /// Rounds with a missing block header before rolling back
    pub attempts_before_rollback: u32,
    /// Added to the pinned block; must not be positive
    pub rollback_block_offset: i64,
}

impl Default for RollbackParams {
    fn default() -> Self {
        Self {
            enabled: false,
            attempts_before_rollback: 1,
            rollback_block_offset: -10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BlockNumberParams {
    /// Added to the latest block when the caller does not pin one
    pub base_block_offset: i64,
    pub rollback: RollbackParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryParams {
    /// Rounds after the first
    pub retries: u32,
    pub min_timeout_ms: u64,
    pub max_timeout_ms: u64,
}

impl Default for RetryParams {
    fn default() -> Self {
        Self {
            retries: 2,
            min_timeout_ms: 25,
            max_timeout_ms: 250,
        }
    }
}

impl RetryParams {
    /// Total rounds, including the first
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }
}

// ============================================
// MAIN CONFIGURATION
// ============================================

/// Files are read through [`QuoteConfig::from_toml`], which fills omitted
/// keys from the defaults of the file's own `chain_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteConfig {
    // ========== Network Settings ==========
    pub rpc_url: String,
    pub chain_id: u64,

    // ========== Contracts ==========
    pub multicall_address: Address,
    pub v3_quoter: Option<Address>,
    pub v4_quoter: Option<Address>,
    /// Needed for V2 and mixed routes; no default deployment is assumed
    pub mixed_quoter: Option<Address>,

    // ========== Path Finding ==========
    pub max_hops: usize,
    /// Add the synthetic native/wrapped hop to mixed route search
    pub enable_bridge: bool,

    // ========== Batching ==========
    pub batch: ProtocolBatchParams,
    pub gas_error_override: FallbackParams,
    pub success_rate_override: FallbackParams,

    // ========== Block Pinning ==========
    pub block_number: BlockNumberParams,

    // ========== Retries ==========
    pub retry: RetryParams,
    pub chunk_timeout_ms: u64,
    /// Chains where an all-out-of-gas final round yields no quotes instead of an error
    pub gas_degradation_chains: Vec<u64>,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self::for_chain(MAINNET)
    }
}

impl QuoteConfig {
    /// Chain-specific defaults
    pub fn for_chain(chain_id: u64) -> Self {
        let mut config = Self {
            rpc_url: "https://eth.llamarpc.com".to_string(),
            chain_id,
            multicall_address: INTERFACE_MULTICALL,
            v3_quoter: Some(QUOTER_V2),
            v4_quoter: None,
            mixed_quoter: None,
            max_hops: 3,
            enable_bridge: true,
            batch: ProtocolBatchParams::default(),
            gas_error_override: FallbackParams {
                gas_limit: 1_500_000,
                multicall_chunk: 100,
            },
            success_rate_override: FallbackParams {
                gas_limit: 1_300_000,
                multicall_chunk: 110,
            },
            block_number: BlockNumberParams::default(),
            retry: RetryParams::default(),
            chunk_timeout_ms: 10_000,
            gas_degradation_chains: vec![ARBITRUM],
        };

        match chain_id {
            MAINNET => {
                config.v4_quoter = Some(MAINNET_V4_QUOTER);
            }
            OPTIMISM => {
                config.rpc_url = "https://mainnet.optimism.io".to_string();
                config.v4_quoter = Some(OPTIMISM_V4_QUOTER);
            }
            BASE => {
                config.rpc_url = "https://mainnet.base.org".to_string();
                config.multicall_address = BASE_INTERFACE_MULTICALL;
                config.v3_quoter = Some(BASE_QUOTER_V2);
                config.v4_quoter = Some(BASE_V4_QUOTER);
            }
            ARBITRUM => {
                // Arbitrum gas is denominated differently; calls need far more of it
                config.rpc_url = "https://arb1.arbitrum.io/rpc".to_string();
                config.v4_quoter = Some(ARBITRUM_V4_QUOTER);
                config.batch = ProtocolBatchParams::uniform(BatchParams {
                    multicall_chunk: 10,
                    gas_limit_per_call: 12_000_000,
                    min_success_rate: 0.1,
                });
                config.gas_error_override = FallbackParams {
                    gas_limit: 30_000_000,
                    multicall_chunk: 6,
                };
                config.success_rate_override = FallbackParams {
                    gas_limit: 30_000_000,
                    multicall_chunk: 6,
                };
            }
            _ => {
                config.v3_quoter = None;
            }
        }

        config
    }

    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let chain_id = env_or("CHAIN_ID", MAINNET);
        let mut config = Self::for_chain(chain_id);

        if let Ok(url) = env::var("RPC_URL") {
            config.rpc_url = url;
        }
        config.max_hops = env_or("MAX_HOPS", config.max_hops);
        config.enable_bridge = env_or("ENABLE_BRIDGE", config.enable_bridge);
        config.chunk_timeout_ms = env_or("CHUNK_TIMEOUT_MS", config.chunk_timeout_ms);

        // Contracts
        config.multicall_address = env_or("MULTICALL_ADDRESS", config.multicall_address);
        config.v3_quoter = env_address("V3_QUOTER")?.or(config.v3_quoter);
        config.v4_quoter = env_address("V4_QUOTER")?.or(config.v4_quoter);
        config.mixed_quoter = env_address("MIXED_QUOTER")?.or(config.mixed_quoter);

        // Batching, applied to every protocol
        if env::var("MULTICALL_CHUNK").is_ok()
            || env::var("GAS_LIMIT_PER_CALL").is_ok()
            || env::var("MIN_SUCCESS_RATE").is_ok()
        {
            let base = config.batch.v3;
            config.batch = ProtocolBatchParams::uniform(BatchParams {
                multicall_chunk: env_or("MULTICALL_CHUNK", base.multicall_chunk),
                gas_limit_per_call: env_or("GAS_LIMIT_PER_CALL", base.gas_limit_per_call),
                min_success_rate: env_or("MIN_SUCCESS_RATE", base.min_success_rate),
            });
        }

        // Block pinning
        config.block_number.base_block_offset =
            env_or("BASE_BLOCK_OFFSET", config.block_number.base_block_offset);
        config.block_number.rollback.enabled =
            env_or("ROLLBACK_ENABLED", config.block_number.rollback.enabled);
        config.block_number.rollback.attempts_before_rollback = env_or(
            "ATTEMPTS_BEFORE_ROLLBACK",
            config.block_number.rollback.attempts_before_rollback,
        );
        config.block_number.rollback.rollback_block_offset = env_or(
            "ROLLBACK_BLOCK_OFFSET",
            config.block_number.rollback.rollback_block_offset,
        );

        // Retries
        config.retry.retries = env_or("QUOTE_RETRIES", config.retry.retries);
        config.retry.min_timeout_ms = env_or("RETRY_MIN_TIMEOUT_MS", config.retry.min_timeout_ms);
        config.retry.max_timeout_ms = env_or("RETRY_MAX_TIMEOUT_MS", config.retry.max_timeout_ms);

        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| eyre!("Failed to read config {:?}: {}", path.as_ref(), e))?;
        Self::from_toml(&content)
    }

    /// Overlay a TOML document onto `for_chain(chain_id)`; mainnet if unset
    pub fn from_toml(content: &str) -> Result<Self> {
        let overlay: toml::Table = toml::from_str(content)?;

        let chain_id = match overlay.get("chain_id") {
            Some(value) => value
                .as_integer()
                .and_then(|id| u64::try_from(id).ok())
                .ok_or_else(|| eyre!("chain_id must be a non-negative integer"))?,
            None => MAINNET,
        };

        let mut merged = match toml::Value::try_from(Self::for_chain(chain_id))? {
            toml::Value::Table(table) => table,
            _ => return Err(eyre!("Chain defaults did not serialize to a table")),
        };
        merge_tables(&mut merged, overlay);

        let config: Self = toml::Value::Table(merged).try_into()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() || self.rpc_url.contains("YOUR_API_KEY") {
            return Err(eyre!("Invalid RPC_URL - please set a reachable node URL"));
        }

        if self.max_hops == 0 || self.max_hops > 6 {
            return Err(eyre!("MAX_HOPS must be between 1 and 6 (currently {})", self.max_hops));
        }

        for (protocol, params) in self.batch.all() {
            if params.multicall_chunk == 0 {
                return Err(eyre!("{} multicall chunk must be > 0", protocol));
            }
            if params.gas_limit_per_call == 0 {
                return Err(eyre!("{} gas limit per call must be > 0", protocol));
            }
            if !(0.0..=1.0).contains(&params.min_success_rate) {
                return Err(eyre!(
                    "{} min success rate must be within [0, 1] (currently {})",
                    protocol,
                    params.min_success_rate
                ));
            }
        }

        for (name, fallback) in [
            ("gas error", &self.gas_error_override),
            ("success rate", &self.success_rate_override),
        ] {
            if fallback.multicall_chunk == 0 || fallback.gas_limit == 0 {
                return Err(eyre!("{} override needs a non-zero gas limit and chunk size", name));
            }
        }

        if self.block_number.rollback.rollback_block_offset > 0 {
            return Err(eyre!(
                "Rollback block offset must not be positive (currently {})",
                self.block_number.rollback.rollback_block_offset
            ));
        }

        if self.retry.min_timeout_ms > self.retry.max_timeout_ms {
            return Err(eyre!("Retry min timeout exceeds max timeout"));
        }

        if self.chunk_timeout_ms == 0 {
            return Err(eyre!("Chunk timeout must be > 0"));
        }

        Ok(())
    }

    pub fn print_summary(&self) {
        let quoter = |a: Option<Address>| a.map(|a| format!("{a:?}")).unwrap_or_else(|| "-".to_string());

        println!("╔════════════════════════════════════════════════════════════╗");
        println!("║              ROUTE QUOTER - CONFIGURATION                  ║");
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ Chain ID:          {:^40} ║", self.chain_id);
        println!("║ Max Hops:          {:^40} ║", self.max_hops);
        println!("║ Bridge Hop:        {:^40} ║", if self.enable_bridge { "ENABLED" } else { "disabled" });
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ CONTRACTS                                                  ║");
        println!("║ • Multicall: {:<45} ║", format!("{:?}", self.multicall_address));
        println!("║ • V3 Quoter: {:<45} ║", quoter(self.v3_quoter));
        println!("║ • V4 Quoter: {:<45} ║", quoter(self.v4_quoter));
        println!("║ • Mixed:     {:<45} ║", quoter(self.mixed_quoter));
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ BATCHING (chunk / gas per call / min success)              ║");
        for (protocol, p) in self.batch.all() {
            println!(
                "║ • {:<6} {:>8} / {:>12} / {:>6.2}                    ║",
                protocol, p.multicall_chunk, p.gas_limit_per_call, p.min_success_rate
            );
        }
        println!(
            "║ • Gas error:     {:>12} gas, chunk {:<20} ║",
            self.gas_error_override.gas_limit, self.gas_error_override.multicall_chunk
        );
        println!(
            "║ • Success rate:  {:>12} gas, chunk {:<20} ║",
            self.success_rate_override.gas_limit, self.success_rate_override.multicall_chunk
        );
        println!("╠════════════════════════════════════════════════════════════╣");
        println!("║ RETRIES                                                    ║");
        println!("║ • Attempts:        {:^40} ║", self.retry.attempts());
        println!(
            "║ • Backoff:         {:^40} ║",
            format!("{}ms - {}ms", self.retry.min_timeout_ms, self.retry.max_timeout_ms)
        );
        println!("║ • Chunk Timeout:   {:^40} ║", format!("{}ms", self.chunk_timeout_ms));
        println!(
            "║ • Rollback:        {:^40} ║",
            if self.block_number.rollback.enabled {
                format!(
                    "after {} rounds, {} blocks",
                    self.block_number.rollback.attempts_before_rollback,
                    self.block_number.rollback.rollback_block_offset
                )
            } else {
                "disabled".to_string()
            }
        );
        println!("╚════════════════════════════════════════════════════════════╝");
    }
}

/// Nested tables merge key by key; anything else in `overlay` replaces `base`
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(incoming) => {
                if let Some(toml::Value::Table(existing)) = base.get_mut(&key) {
                    merge_tables(existing, incoming);
                } else {
                    base.insert(key, toml::Value::Table(incoming));
                }
            }
            value => {
                base.insert(key, value);
            }
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_address(key: &str) -> Result<Option<Address>> {
    match env::var(key) {
        Ok(raw) if !raw.is_empty() => Address::from_str(&raw)
            .map(Some)
            .map_err(|e| eyre!("{} is not a valid address: {}", key, e)),
        _ => Ok(None),
    }
}

// ============================================
// TESTS
// ============================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = QuoteConfig::default();
        assert_eq!(config.chain_id, MAINNET);
        assert_eq!(config.batch.v3.multicall_chunk, 150);
        assert_eq!(config.batch.v3.gas_limit_per_call, 1_000_000);
        assert_eq!(config.retry.attempts(), 3);
        assert!(config.v4_quoter.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_arbitrum_defaults() {
        let config = QuoteConfig::for_chain(ARBITRUM);
        let mixed = config.batch.for_protocol(RouteProtocol::Mixed);
        assert_eq!(mixed.multicall_chunk, 10);
        assert_eq!(mixed.gas_limit_per_call, 12_000_000);
        assert_eq!(config.gas_error_override.multicall_chunk, 6);
        assert!(config.gas_degradation_chains.contains(&ARBITRUM));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = QuoteConfig::default();
        config.batch.v2.multicall_chunk = 0;
        assert!(config.validate().is_err());

        let mut config = QuoteConfig::default();
        config.batch.mixed.min_success_rate = 1.5;
        assert!(config.validate().is_err());

        let mut config = QuoteConfig::default();
        config.block_number.rollback.rollback_block_offset = 5;
        assert!(config.validate().is_err());

        let mut config = QuoteConfig::default();
        config.max_hops = 7;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_its_own_chain_defaults() {
        let raw = r#"
            chain_id = 42161
            max_hops = 2

            [retry]
            retries = 4

            [batch.v3]
            multicall_chunk = 5
        "#;
        let config = QuoteConfig::from_toml(raw).unwrap();
        let arbitrum = QuoteConfig::for_chain(ARBITRUM);

        assert_eq!(config.max_hops, 2);
        assert_eq!(config.retry.retries, 4);
        assert_eq!(config.retry.min_timeout_ms, 25);
        assert_eq!(config.batch.v3.multicall_chunk, 5);
        // Untouched keys come from Arbitrum, not mainnet
        assert_eq!(config.batch.v3.gas_limit_per_call, 12_000_000);
        assert_eq!(config.batch.v4.multicall_chunk, 10);
        assert_eq!(config.v4_quoter, arbitrum.v4_quoter);
        assert_eq!(config.gas_error_override.gas_limit, 30_000_000);
        assert_eq!(config.rpc_url, arbitrum.rpc_url);
    }

    #[test]
    fn test_toml_without_chain_id_is_mainnet() {
        let config = QuoteConfig::from_toml("max_hops = 4").unwrap();
        assert_eq!(config.chain_id, MAINNET);
        assert_eq!(config.max_hops, 4);
        assert_eq!(config.batch.v3.multicall_chunk, 150);

        assert!(QuoteConfig::from_toml("chain_id = -1").is_err());
    }

    #[test]
    fn test_unknown_chain_keeps_v3_quoter_unset() {
        let config = QuoteConfig::from_toml("chain_id = 999").unwrap();
        assert_eq!(config.v3_quoter, None);
        assert_eq!(config.mixed_quoter, None);
    }

    #[test]
    fn test_save_and_reload() {
        let mut config = QuoteConfig::for_chain(BASE);
        config.mixed_quoter = Some(Address::repeat_byte(0xaa));
        config.block_number.rollback.enabled = true;

        let path = std::env::temp_dir().join(format!("route-quoter-config-{}.toml", std::process::id()));
        config.save_to_file(&path).unwrap();
        let loaded = QuoteConfig::from_file(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.chain_id, BASE);
        assert_eq!(loaded.multicall_address, config.multicall_address);
        assert_eq!(loaded.mixed_quoter, config.mixed_quoter);
        assert!(loaded.block_number.rollback.enabled);
    }
}
