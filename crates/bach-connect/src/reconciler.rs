//! Network reconciliation: bring the wallet onto the network a request needs
//!
//! ```text
//! OFF_TARGET --switch ok--> confirm --> ON_TARGET
//!     |  \--4001--> NetworkSwitchRejected
//!     \--4902--> register --ok--> switch (once) --ok--> confirm --> ON_TARGET
//!                    \--err--> NetworkSwitchFailed     \--err--> NetworkSwitchFailed
//! ```
//!
//! Each prompt is issued at most once per request.

use bach_primitives::NetworkId;
use tracing::{debug, info, warn};

use crate::registry::NetworkRegistry;
use crate::wallet::{RegisterError, SwitchError, WalletAdapter};
use crate::{ResolveError, ResolveResult};

/// Reconciliation state of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileState {
    /// Wallet is on the required network
    OnTarget,
    /// Wallet is on another network
    OffTarget,
}

impl ReconcileState {
    fn of(current: NetworkId, target: NetworkId) -> Self {
        if current == target {
            ReconcileState::OnTarget
        } else {
            ReconcileState::OffTarget
        }
    }
}

/// Drives the switch/register/switch sequence for one wallet
#[derive(Debug)]
pub struct NetworkReconciler<'a> {
    wallet: &'a WalletAdapter,
    registry: &'a NetworkRegistry,
}

impl<'a> NetworkReconciler<'a> {
    /// Create a reconciler
    pub fn new(wallet: &'a WalletAdapter, registry: &'a NetworkRegistry) -> Self {
        Self { wallet, registry }
    }

    /// Ensure the wallet is on `target`
    pub async fn reconcile(&self, target: NetworkId) -> ResolveResult<()> {
        let current = self.wallet.current_network().await?;
        if ReconcileState::of(current, target) == ReconcileState::OnTarget {
            debug!("Wallet already on network {}", target);
            return Ok(());
        }

        let name = self.registry.display_name(target);
        info!("Requesting wallet switch from network {} to {} ({})", current, name, target);

        match self.wallet.request_switch(target).await {
            Ok(()) => self.confirm(target).await,
            Err(SwitchError::UserRejected) => {
                warn!("User rejected switch to {} ({})", name, target);
                Err(ResolveError::NetworkSwitchRejected {
                    network: target,
                    name,
                })
            }
            Err(SwitchError::NetworkUnrecognized) => self.register_and_switch(target, name).await,
            Err(SwitchError::Failed(e)) if e.is_disconnect() => Err(ResolveError::Disconnected),
            Err(SwitchError::Failed(e)) => Err(switch_failed(target, name, e.message)),
        }
    }

    async fn register_and_switch(&self, target: NetworkId, name: String) -> ResolveResult<()> {
        let config = self.registry.lookup(target)?;
        info!("Wallet does not know {} ({}), requesting registration", name, target);

        match self.wallet.request_register(config).await {
            Ok(()) => {}
            Err(RegisterError::UserRejected) => {
                warn!("User rejected registration of {} ({})", name, target);
                return Err(switch_failed(target, name, "network registration was rejected"));
            }
            Err(RegisterError::RegistrationFailed(e)) => {
                warn!("Registration of {} ({}) failed: {}", name, target, e);
                return Err(switch_failed(target, name, e.message));
            }
        }

        info!("Retrying wallet switch to {} ({})", name, target);
        match self.wallet.request_switch(target).await {
            Ok(()) => self.confirm(target).await,
            Err(SwitchError::UserRejected) => {
                warn!("User rejected switch to {} ({}) after registration", name, target);
                Err(switch_failed(target, name, "network switch was rejected after registration"))
            }
            Err(SwitchError::NetworkUnrecognized) => Err(switch_failed(
                target,
                name,
                "wallet still does not recognize the network after registration",
            )),
            Err(SwitchError::Failed(e)) if e.is_disconnect() => Err(ResolveError::Disconnected),
            Err(SwitchError::Failed(e)) => Err(switch_failed(target, name, e.message)),
        }
    }

    async fn confirm(&self, target: NetworkId) -> ResolveResult<()> {
        let actual = self.wallet.current_network().await?;
        if ReconcileState::of(actual, target) == ReconcileState::OffTarget {
            warn!(
                "Wallet reported switching to network {} but is on {}",
                target, actual
            );
            return Err(ResolveError::ReconciliationInconsistent {
                expected: target,
                actual,
            });
        }
        info!("Wallet now on network {}", target);
        Ok(())
    }
}

fn switch_failed(network: NetworkId, name: String, reason: impl Into<String>) -> ResolveError {
    ResolveError::NetworkSwitchFailed {
        network,
        name,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{MockProvider, RegisterBehavior, SwitchBehavior};
    use crate::registry::known;
    use bach_primitives::Address;
    use std::sync::Arc;

    fn setup() -> (Arc<MockProvider>, WalletAdapter, NetworkRegistry) {
        let mock = Arc::new(MockProvider::new(known::ETHEREUM, Address::from_bytes([7; 20])));
        let wallet = WalletAdapter::injected(mock.clone());
        (mock, wallet, NetworkRegistry::with_known_networks())
    }

    #[tokio::test]
    async fn test_on_target_prompts_nothing() {
        let (mock, wallet, registry) = setup();
        NetworkReconciler::new(&wallet, &registry)
            .reconcile(known::ETHEREUM)
            .await
            .unwrap();
        assert_eq!(mock.prompt_count(), 0);
    }

    #[tokio::test]
    async fn test_known_network_switches() {
        let (mock, wallet, registry) = setup();
        mock.add_known_chain(known::POLYGON);
        NetworkReconciler::new(&wallet, &registry)
            .reconcile(known::POLYGON)
            .await
            .unwrap();
        assert_eq!(mock.chain(), Some(known::POLYGON));
        assert_eq!(mock.request_count("wallet_addEthereumChain"), 0);
    }

    #[tokio::test]
    async fn test_unrecognized_registers_then_switches() {
        let (mock, wallet, registry) = setup();
        NetworkReconciler::new(&wallet, &registry)
            .reconcile(known::POLYGON)
            .await
            .unwrap();
        assert_eq!(mock.chain(), Some(known::POLYGON));
        assert_eq!(mock.request_count("wallet_addEthereumChain"), 1);
        assert_eq!(mock.request_count("wallet_switchEthereumChain"), 2);
    }

    #[tokio::test]
    async fn test_rejected_switch_is_terminal() {
        let (mock, wallet, registry) = setup();
        mock.add_known_chain(known::POLYGON);
        mock.script_switch(SwitchBehavior::Reject);

        let err = NetworkReconciler::new(&wallet, &registry)
            .reconcile(known::POLYGON)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::NetworkSwitchRejected {
                network: known::POLYGON,
                name: "Polygon Mainnet".to_string(),
            }
        );
        assert_eq!(mock.prompt_count(), 1);
    }

    #[tokio::test]
    async fn test_rejected_registration_fails_switch() {
        let (mock, wallet, registry) = setup();
        mock.script_register(RegisterBehavior::Reject);

        let err = NetworkReconciler::new(&wallet, &registry)
            .reconcile(known::POLYGON)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NetworkSwitchFailed { .. }));
        assert_eq!(mock.request_count("wallet_switchEthereumChain"), 1);
    }

    #[tokio::test]
    async fn test_retry_rejection_fails_switch() {
        let (mock, wallet, registry) = setup();
        mock.script_switch(SwitchBehavior::Unrecognized);
        mock.script_switch(SwitchBehavior::Reject);

        let err = NetworkReconciler::new(&wallet, &registry)
            .reconcile(known::POLYGON)
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::NetworkSwitchFailed { .. }));
        assert_eq!(mock.request_count("wallet_switchEthereumChain"), 2);
        assert_eq!(mock.request_count("wallet_addEthereumChain"), 1);
    }

    #[tokio::test]
    async fn test_disconnect_on_retry_is_disconnected() {
        let (mock, wallet, registry) = setup();
        mock.script_switch(SwitchBehavior::Unrecognized);
        mock.script_switch(SwitchBehavior::Fail(crate::ProviderRpcError::disconnected()));

        let err = NetworkReconciler::new(&wallet, &registry)
            .reconcile(known::POLYGON)
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::Disconnected);
        assert_eq!(mock.request_count("wallet_switchEthereumChain"), 2);
    }

    #[tokio::test]
    async fn test_ignored_switch_is_inconsistent() {
        let (mock, wallet, registry) = setup();
        mock.add_known_chain(known::BSC);
        mock.script_switch(SwitchBehavior::Ignore);

        let err = NetworkReconciler::new(&wallet, &registry)
            .reconcile(known::BSC)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ResolveError::ReconciliationInconsistent {
                expected: known::BSC,
                actual: known::ETHEREUM,
            }
        );
    }

    #[tokio::test]
    async fn test_disconnected_wallet() {
        let mock = Arc::new(MockProvider::disconnected());
        let wallet = WalletAdapter::injected(mock.clone());
        let registry = NetworkRegistry::with_known_networks();
        let err = NetworkReconciler::new(&wallet, &registry)
            .reconcile(known::BSC)
            .await
            .unwrap_err();
        assert_eq!(err, ResolveError::Disconnected);
        assert_eq!(mock.prompt_count(), 0);
    }
}
