//! Network registry: static network configuration keyed by [`NetworkId`]

use bach_primitives::NetworkId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::ConfigError;

/// Native currency metadata, as shown by the wallet when a network is added
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Currency name (e.g. "Ether")
    pub name: String,
    /// Ticker symbol (e.g. "ETH")
    pub symbol: String,
    /// Decimals
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

/// Human-readable configuration of a network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Chain id
    pub id: NetworkId,
    /// Display name
    pub display_name: String,
    /// Native currency
    pub native_currency: NativeCurrency,
    /// Candidate RPC endpoints; the first is preferred, the rest are fallbacks
    #[serde(default)]
    pub rpc_urls: Vec<String>,
    /// Block explorer
    #[serde(default)]
    pub explorer_url: Option<String>,
}

impl NetworkConfig {
    /// Preferred RPC endpoint
    pub fn preferred_endpoint(&self) -> Option<&str> {
        self.rpc_urls.first().map(String::as_str)
    }

    /// Fallback RPC endpoints, in preference order
    pub fn fallback_endpoints(&self) -> &[String] {
        self.rpc_urls.get(1..).unwrap_or(&[])
    }
}

/// Defines the built-in network presets from one table.
///
/// Each entry: `CONST = chain_id => (display name, currency name, symbol, [rpc urls], explorer)`
macro_rules! known_networks {
    (
        $( $name:ident = $id:expr => ($display:expr, $currency:expr, $symbol:expr, [$($rpc:expr),+ $(,)?], $explorer:expr) ),* $(,)?
    ) => {
        /// Chain ids of the built-in network presets
        pub mod known {
            use bach_primitives::NetworkId;
            $( #[allow(missing_docs)] pub const $name: NetworkId = NetworkId::new($id); )*
        }

        fn known_network_configs() -> Vec<NetworkConfig> {
            vec![
                $(
                    NetworkConfig {
                        id: known::$name,
                        display_name: $display.to_string(),
                        native_currency: NativeCurrency {
                            name: $currency.to_string(),
                            symbol: $symbol.to_string(),
                            decimals: 18,
                        },
                        rpc_urls: vec![$($rpc.to_string()),+],
                        explorer_url: Some($explorer.to_string()),
                    },
                )*
            ]
        }
    };
}

known_networks! {
    ETHEREUM = 1 => ("Ethereum Mainnet", "Ether", "ETH", ["https://cloudflare-eth.com", "https://rpc.ankr.com/eth"], "https://etherscan.io"),
    SEPOLIA = 11155111 => ("Ethereum Sepolia", "Sepolia Ether", "ETH", ["https://rpc.sepolia.org"], "https://sepolia.etherscan.io"),
    BSC = 56 => ("BNB Smart Chain Mainnet", "BNB", "BNB", ["https://bsc-dataseed.binance.org", "https://bsc-dataseed1.defibit.io"], "https://bscscan.com"),
    BSC_TESTNET = 97 => ("BNB Smart Chain Testnet", "tBNB", "tBNB", ["https://data-seed-prebsc-1-s1.binance.org:8545"], "https://testnet.bscscan.com"),
    POLYGON = 137 => ("Polygon Mainnet", "POL", "POL", ["https://polygon-rpc.com", "https://rpc.ankr.com/polygon"], "https://polygonscan.com"),
    ARBITRUM = 42161 => ("Arbitrum One", "Ether", "ETH", ["https://arb1.arbitrum.io/rpc"], "https://arbiscan.io"),
    BASE = 8453 => ("Base", "Ether", "ETH", ["https://mainnet.base.org"], "https://basescan.org"),
}

/// Read-only mapping from network id to its configuration
#[derive(Debug, Clone, Default)]
pub struct NetworkRegistry {
    networks: HashMap<NetworkId, NetworkConfig>,
}

impl NetworkRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry seeded with the built-in presets in [`known`]
    pub fn with_known_networks() -> Self {
        let mut registry = Self::new();
        for config in known_network_configs() {
            registry.insert(config);
        }
        registry
    }

    /// Add or replace a network
    pub fn insert(&mut self, config: NetworkConfig) {
        self.networks.insert(config.id, config);
    }

    /// Add a network with builder pattern
    pub fn with_network(mut self, config: NetworkConfig) -> Self {
        self.insert(config);
        self
    }

    /// Look up a network that a contract requires
    ///
    /// A required network must have at least one RPC endpoint to offer the
    /// wallet during registration.
    pub fn lookup(&self, id: NetworkId) -> Result<&NetworkConfig, ConfigError> {
        let config = self.networks.get(&id).ok_or(ConfigError::UnknownNetwork(id))?;
        if config.rpc_urls.is_empty() {
            return Err(ConfigError::NoEndpoints(id));
        }
        Ok(config)
    }

    /// Get a network without endpoint checks
    pub fn get(&self, id: NetworkId) -> Option<&NetworkConfig> {
        self.networks.get(&id)
    }

    /// Whether the network is configured
    pub fn contains(&self, id: NetworkId) -> bool {
        self.networks.contains_key(&id)
    }

    /// Display name, falling back to the numeric id
    pub fn display_name(&self, id: NetworkId) -> String {
        self.networks
            .get(&id)
            .map(|c| c.display_name.clone())
            .unwrap_or_else(|| format!("network {}", id))
    }

    /// Number of networks
    pub fn len(&self) -> usize {
        self.networks.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }
}
