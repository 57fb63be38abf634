//! Deployment configuration

use bach_primitives::{Address, ContractId, NetworkId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::abi::ContractInterface;
use crate::directory::{ContractDirectory, ContractEntry};
use crate::registry::{NetworkConfig, NetworkRegistry};
use crate::ConfigError;

/// Environment variable naming the configuration file for [`ResolverConfig::from_env`]
pub const CONFIG_ENV: &str = "BACH_CONNECT_CONFIG";

/// How connections negotiated outside the injected wallet are treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalConnectionPolicy {
    /// Assume the session is already on the right network and skip reconciliation
    #[default]
    TrustDeclared,
    /// Reconcile the network exactly as for the injected wallet
    Reconcile,
}

/// Everything a [`Resolver`](crate::Resolver) needs besides the wallet
#[derive(Debug, Clone, Default)]
pub struct ResolverConfig {
    /// Network registry
    pub registry: NetworkRegistry,
    /// Contract directory
    pub directory: ContractDirectory,
    /// External connection policy
    pub external_policy: ExternalConnectionPolicy,
}

impl ResolverConfig {
    /// Create a config with the default external connection policy
    pub fn new(registry: NetworkRegistry, directory: ContractDirectory) -> Self {
        Self {
            registry,
            directory,
            external_policy: ExternalConnectionPolicy::default(),
        }
    }

    /// Set the external connection policy
    pub fn with_external_policy(mut self, policy: ExternalConnectionPolicy) -> Self {
        self.external_policy = policy;
        self
    }

    /// Parse a JSON deployment configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(json)?;
        raw.into_config()
    }

    /// Load a JSON deployment configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!("Loading resolver config from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Load the file named by [`CONFIG_ENV`]
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_ENV)
            .ok_or_else(|| ConfigError::Io(format!("{} is not set", CONFIG_ENV)))?;
        Self::from_file(path)
    }
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(default)]
    networks: Vec<NetworkConfig>,
    #[serde(default = "default_include_known")]
    include_known_networks: bool,
    #[serde(default)]
    contracts: HashMap<ContractId, RawContract>,
    #[serde(default)]
    external_connections: ExternalConnectionPolicy,
}

fn default_include_known() -> bool {
    true
}

#[derive(Deserialize)]
struct RawContract {
    #[serde(default)]
    home: Option<NetworkId>,
    deployments: HashMap<NetworkId, Address>,
    #[serde(default)]
    interface: Option<ContractInterface>,
    #[serde(default)]
    network_interfaces: HashMap<NetworkId, ContractInterface>,
}

impl RawConfig {
    fn into_config(self) -> Result<ResolverConfig, ConfigError> {
        let mut registry = if self.include_known_networks {
            NetworkRegistry::with_known_networks()
        } else {
            NetworkRegistry::new()
        };
        for network in self.networks {
            registry.insert(network);
        }

        let mut directory = ContractDirectory::new();
        for (id, raw) in self.contracts {
            let mut entry = ContractEntry::new();
            if let Some(home) = raw.home {
                entry = entry.home(home);
            }
            for (network, address) in raw.deployments {
                entry = entry.deployed(network, address);
            }
            if let Some(interface) = raw.interface {
                entry = entry.interface(interface);
            }
            for (network, interface) in raw.network_interfaces {
                entry = entry.network_interface(network, interface);
            }
            directory.insert(id, entry)?;
        }

        Ok(ResolverConfig {
            registry,
            directory,
            external_policy: self.external_connections,
        })
    }
}
