//! Contract directory: logical contract id → per-network deployment

use bach_primitives::{Address, ContractId, NetworkId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::abi::ContractInterface;
use crate::ConfigError;

/// Network-specific descriptor a contract id resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractDescriptor {
    /// Logical contract id
    pub contract_id: ContractId,
    /// Network the deployment lives on
    pub network: NetworkId,
    /// Deployed address
    pub address: Address,
    /// Interface descriptor
    pub interface: Arc<ContractInterface>,
}

/// Deployments of one contract role
#[derive(Debug, Clone, Default)]
pub struct ContractEntry {
    home: Option<NetworkId>,
    deployments: HashMap<NetworkId, Address>,
    interface: Option<Arc<ContractInterface>>,
    network_interfaces: HashMap<NetworkId, Arc<ContractInterface>>,
}

impl ContractEntry {
    /// Create an entry with no deployments
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the network used when a lookup names none
    pub fn home(mut self, network: NetworkId) -> Self {
        self.home = Some(network);
        self
    }

    /// Add a deployment
    pub fn deployed(mut self, network: NetworkId, address: Address) -> Self {
        self.deployments.insert(network, address);
        self
    }

    /// Set the interface shared by every deployment
    pub fn interface(mut self, interface: ContractInterface) -> Self {
        self.interface = Some(Arc::new(interface));
        self
    }

    /// Override the interface on one network
    pub fn network_interface(mut self, network: NetworkId, interface: ContractInterface) -> Self {
        self.network_interfaces.insert(network, Arc::new(interface));
        self
    }

    /// The home network: the explicit one, or the only deployment
    pub fn home_network(&self) -> Option<NetworkId> {
        if self.home.is_some() {
            return self.home;
        }
        let mut networks = self.deployments.keys();
        match (networks.next(), networks.next()) {
            (Some(only), None) => Some(*only),
            _ => None,
        }
    }

    /// Networks this contract is deployed on
    pub fn networks(&self) -> impl Iterator<Item = NetworkId> + '_ {
        self.deployments.keys().copied()
    }

    fn interface_for(&self, network: NetworkId) -> Option<&Arc<ContractInterface>> {
        self.network_interfaces
            .get(&network)
            .or(self.interface.as_ref())
    }
}

/// Read-only mapping from contract id to deployments
#[derive(Debug, Clone, Default)]
pub struct ContractDirectory {
    entries: HashMap<ContractId, ContractEntry>,
}

impl ContractDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a contract, checking it is resolvable
    ///
    /// Every entry needs a home network and an interface for each deployment.
    pub fn insert(&mut self, id: ContractId, entry: ContractEntry) -> Result<(), ConfigError> {
        if entry.home_network().is_none() {
            return Err(ConfigError::AmbiguousHome(id));
        }
        for network in entry.networks() {
            if entry.interface_for(network).is_none() {
                return Err(ConfigError::MissingInterface {
                    contract: id,
                    network,
                });
            }
        }
        self.entries.insert(id, entry);
        Ok(())
    }

    /// Add a contract with builder pattern
    pub fn with_contract(
        mut self,
        id: impl Into<ContractId>,
        entry: ContractEntry,
    ) -> Result<Self, ConfigError> {
        self.insert(id.into(), entry)?;
        Ok(self)
    }

    /// Network a lookup resolves to: the override if given, else the home network
    pub fn target_network(
        &self,
        id: &ContractId,
        network: Option<NetworkId>,
    ) -> Result<NetworkId, ConfigError> {
        let entry = self.entry(id)?;
        match network {
            Some(network) => Ok(network),
            None => entry
                .home_network()
                .ok_or_else(|| ConfigError::AmbiguousHome(id.clone())),
        }
    }

    /// Resolve a contract to its descriptor on a network
    pub fn lookup(
        &self,
        id: &ContractId,
        network: Option<NetworkId>,
    ) -> Result<ContractDescriptor, ConfigError> {
        let entry = self.entry(id)?;
        let network = self.target_network(id, network)?;
        let address = entry
            .deployments
            .get(&network)
            .copied()
            .ok_or_else(|| ConfigError::NotDeployed {
                contract: id.clone(),
                network,
            })?;
        let interface = entry
            .interface_for(network)
            .cloned()
            .ok_or_else(|| ConfigError::MissingInterface {
                contract: id.clone(),
                network,
            })?;

        Ok(ContractDescriptor {
            contract_id: id.clone(),
            network,
            address,
            interface,
        })
    }

    /// Whether the contract id is configured
    pub fn contains(&self, id: &ContractId) -> bool {
        self.entries.contains_key(id)
    }

    /// Configured contract ids
    pub fn contract_ids(&self) -> impl Iterator<Item = &ContractId> {
        self.entries.keys()
    }

    fn entry(&self, id: &ContractId) -> Result<&ContractEntry, ConfigError> {
        self.entries
            .get(id)
            .ok_or_else(|| ConfigError::UnknownContract(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::{FunctionDef, StateMutability};

    const POLYGON: NetworkId = NetworkId::new(137);
    const BSC: NetworkId = NetworkId::new(56);

    fn staking_interface() -> ContractInterface {
        ContractInterface::new().with_function(FunctionDef::new(
            "stake",
            vec![crate::abi::ParamType::Uint(256)],
            vec![],
            StateMutability::NonPayable,
        ))
    }

    fn directory() -> ContractDirectory {
        ContractDirectory::new()
            .with_contract(
                "Staking",
                ContractEntry::new()
                    .deployed(POLYGON, Address::from_bytes([1; 20]))
                    .interface(staking_interface()),
            )
            .unwrap()
            .with_contract(
                "Lending",
                ContractEntry::new()
                    .home(BSC)
                    .deployed(BSC, Address::from_bytes([2; 20]))
                    .deployed(POLYGON, Address::from_bytes([3; 20]))
                    .interface(ContractInterface::erc20())
                    .network_interface(POLYGON, staking_interface()),
            )
            .unwrap()
    }

    #[test]
    fn test_single_deployment_is_home() {
        let descriptor = directory().lookup(&"Staking".into(), None).unwrap();
        assert_eq!(descriptor.network, POLYGON);
        assert_eq!(descriptor.address, Address::from_bytes([1; 20]));
    }

    #[test]
    fn test_explicit_home_and_override() {
        let dir = directory();
        let home = dir.lookup(&"Lending".into(), None).unwrap();
        assert_eq!(home.network, BSC);
        assert!(home.interface.function("transfer").is_some());

        let polygon = dir.lookup(&"Lending".into(), Some(POLYGON)).unwrap();
        assert_eq!(polygon.address, Address::from_bytes([3; 20]));
        assert!(polygon.interface.function("stake").is_some());
    }

    #[test]
    fn test_unknown_contract_and_missing_deployment() {
        let dir = directory();
        assert_eq!(
            dir.lookup(&"NotConfigured".into(), None),
            Err(ConfigError::UnknownContract("NotConfigured".into()))
        );
        assert_eq!(
            dir.lookup(&"Staking".into(), Some(BSC)),
            Err(ConfigError::NotDeployed {
                contract: "Staking".into(),
                network: BSC,
            })
        );
    }

    #[test]
    fn test_insert_rejects_ambiguous_home() {
        let entry = ContractEntry::new()
            .deployed(BSC, Address::ZERO)
            .deployed(POLYGON, Address::ZERO)
            .interface(ContractInterface::erc20());
        let err = ContractDirectory::new().with_contract("Vault", entry).unwrap_err();
        assert_eq!(err, ConfigError::AmbiguousHome("Vault".into()));
    }

    #[test]
    fn test_insert_rejects_missing_interface() {
        let entry = ContractEntry::new().deployed(BSC, Address::ZERO);
        let err = ContractDirectory::new().with_contract("Vault", entry).unwrap_err();
        assert!(matches!(err, ConfigError::MissingInterface { .. }));
    }
}
