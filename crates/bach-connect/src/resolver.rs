//! Resolver façade: contract id → signer-bound handle

use bach_primitives::{ContractId, NetworkId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, HandleCache};
use crate::config::{ExternalConnectionPolicy, ResolverConfig};
use crate::directory::{ContractDescriptor, ContractDirectory};
use crate::handle::ContractHandle;
use crate::provider::{Eip1193Provider, ProviderEvent};
use crate::reconciler::NetworkReconciler;
use crate::registry::NetworkRegistry;
use crate::wallet::{Subscription, WalletAdapter, WalletKind};
use crate::{ResolveError, ResolveResult};

type Outcome = Option<ResolveResult<Arc<ContractHandle>>>;
type InFlight = Mutex<HashMap<CacheKey, watch::Receiver<Outcome>>>;

/// Builder for [`Resolver`]
#[derive(Debug)]
pub struct ResolverBuilder {
    config: ResolverConfig,
    wallet: Option<WalletAdapter>,
}

impl ResolverBuilder {
    /// Use the default injected wallet provider
    pub fn injected(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.wallet = Some(WalletAdapter::new(provider, WalletKind::Injected));
        self
    }

    /// Use an externally negotiated connection
    ///
    /// Whether its network is reconciled depends on the configured
    /// [`ExternalConnectionPolicy`].
    pub fn external(mut self, provider: Arc<dyn Eip1193Provider>) -> Self {
        self.wallet = Some(WalletAdapter::new(provider, WalletKind::External));
        self
    }

    /// Build the resolver and subscribe its cache to wallet changes
    pub fn build(self) -> Resolver {
        let cache = Arc::new(HandleCache::new());
        let subscription = self.wallet.as_ref().map(|wallet| {
            let cache = cache.clone();
            wallet.on_change(move |event: &ProviderEvent| {
                debug!("Wallet change {:?}, invalidating handles", event);
                cache.invalidate_all();
            })
        });

        let ResolverConfig {
            registry,
            directory,
            external_policy,
        } = self.config;

        Resolver {
            registry,
            directory,
            external_policy,
            wallet: self.wallet,
            cache,
            in_flight: Mutex::new(HashMap::new()),
            _subscription: subscription,
        }
    }
}

/// Resolves logical contract ids to handles bound to the wallet's current
/// network and account
///
/// One resolver serves one application session. Its cache is cleared on every
/// wallet network or account change; concurrent requests for the same key share
/// one resolution and therefore one set of wallet prompts.
pub struct Resolver {
    registry: NetworkRegistry,
    directory: ContractDirectory,
    external_policy: ExternalConnectionPolicy,
    wallet: Option<WalletAdapter>,
    cache: Arc<HandleCache>,
    in_flight: InFlight,
    _subscription: Option<Subscription>,
}

impl Resolver {
    /// Start building a resolver
    pub fn builder(config: ResolverConfig) -> ResolverBuilder {
        ResolverBuilder {
            config,
            wallet: None,
        }
    }

    /// Resolver over the default injected provider
    pub fn new(config: ResolverConfig, provider: Arc<dyn Eip1193Provider>) -> Self {
        Self::builder(config).injected(provider).build()
    }

    /// Get a handle for `contract`, on `network` or its home network
    ///
    /// Configuration errors are reported before any wallet interaction.
    pub async fn get_handle(
        &self,
        contract: impl Into<ContractId>,
        network: Option<NetworkId>,
    ) -> ResolveResult<Arc<ContractHandle>> {
        let contract = contract.into();
        let descriptor = self.directory.lookup(&contract, network)?;
        self.registry.lookup(descriptor.network)?;
        let key: CacheKey = (contract, descriptor.network);

        loop {
            if let Some(handle) = self.cache.get(&key.0, key.1) {
                debug!("Handle cache hit for {} on network {}", key.0, key.1);
                return Ok(handle);
            }

            let (tx, mut rx) = {
                let mut in_flight = self.in_flight.lock();
                match in_flight.get(&key) {
                    Some(rx) => (None, rx.clone()),
                    None => {
                        let (tx, rx) = watch::channel(None);
                        in_flight.insert(key.clone(), rx.clone());
                        (Some(tx), rx)
                    }
                }
            };

            let Some(tx) = tx else {
                debug!("Joining in-flight resolution of {} on network {}", key.0, key.1);
                let shared = rx
                    .wait_for(Option::is_some)
                    .await
                    .ok()
                    .and_then(|outcome| (*outcome).clone());
                match shared {
                    Some(Err(e)) => return Err(e),
                    // re-read the cache: the shared handle may have been invalidated since
                    Some(Ok(_)) => continue,
                    // leader was dropped before finishing
                    None => continue,
                }
            };

            let guard = InFlightGuard {
                in_flight: &self.in_flight,
                key: key.clone(),
            };
            let result = self.resolve(&descriptor).await;
            // waiters woken by the send must not find the finished entry
            drop(guard);
            let _ = tx.send(Some(result.clone()));
            return result;
        }
    }

    async fn resolve(&self, descriptor: &ContractDescriptor) -> ResolveResult<Arc<ContractHandle>> {
        let (contract, network) = (&descriptor.contract_id, descriptor.network);
        if let Some(handle) = self.cache.get(contract, network) {
            return Ok(handle);
        }
        debug!("Handle cache miss for {} on network {}", contract, network);

        let wallet = self.wallet.as_ref().ok_or(ResolveError::Disconnected)?;
        let reconcile = self.reconciles(wallet);
        if reconcile {
            NetworkReconciler::new(wallet, &self.registry)
                .reconcile(network)
                .await?;
        } else {
            debug!(
                "Trusting external connection for {} on network {}",
                contract, network
            );
        }

        // a successful switch emits its own change event, so snapshot only now
        let generation = self.cache.generation();
        let connection = wallet.bound_connection(descriptor.address).await?;
        let handle = Arc::new(ContractHandle::new(descriptor.clone(), connection));

        if self.cache.put_if_generation(handle.clone(), generation) {
            info!(
                "Bound {} at {} on network {} to account {}",
                contract,
                handle.address(),
                network,
                handle.account()
            );
            return Ok(handle);
        }

        warn!(
            "Wallet changed while binding {} on network {}, re-checking",
            contract, network
        );
        let generation = self.cache.generation();
        self.verify_binding(wallet, &handle, reconcile).await?;
        if self.cache.put_if_generation(handle.clone(), generation) {
            info!(
                "Bound {} on network {} to account {} after re-check",
                contract,
                network,
                handle.account()
            );
            Ok(handle)
        } else {
            warn!("Wallet changed again while binding {}", contract);
            Err(ResolveError::SessionChanged)
        }
    }

    async fn verify_binding(
        &self,
        wallet: &WalletAdapter,
        handle: &ContractHandle,
        check_network: bool,
    ) -> ResolveResult<()> {
        if check_network && wallet.current_network().await? != handle.network() {
            return Err(ResolveError::SessionChanged);
        }
        if wallet.current_account().await? != handle.account() {
            return Err(ResolveError::SessionChanged);
        }
        Ok(())
    }

    fn reconciles(&self, wallet: &WalletAdapter) -> bool {
        match wallet.kind() {
            WalletKind::Injected => true,
            WalletKind::External => self.external_policy == ExternalConnectionPolicy::Reconcile,
        }
    }

    /// Drop the cached handle for one key; returns whether it was cached
    pub fn evict(&self, contract: impl Into<ContractId>, network: NetworkId) -> bool {
        self.cache.evict(&contract.into(), network)
    }

    /// Drop every cached handle
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Handle cache
    pub fn cache(&self) -> &HandleCache {
        &self.cache
    }

    /// Network registry
    pub fn registry(&self) -> &NetworkRegistry {
        &self.registry
    }

    /// Contract directory
    pub fn directory(&self) -> &ContractDirectory {
        &self.directory
    }

    /// Detach from the wallet and clear the cache
    pub fn dispose(self) {
        self.cache.invalidate_all();
        debug!("Resolver disposed");
    }
}

impl std::fmt::Debug for Resolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resolver")
            .field("wallet", &self.wallet)
            .field("external_policy", &self.external_policy)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

/// Removes the in-flight entry when the leading resolution finishes or is dropped
struct InFlightGuard<'a> {
    in_flight: &'a InFlight,
    key: CacheKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::ContractInterface;
    use crate::directory::ContractEntry;
    use crate::provider::MockProvider;
    use crate::registry::known;
    use bach_primitives::Address;

    fn config() -> ResolverConfig {
        let directory = ContractDirectory::new()
            .with_contract(
                "Token",
                ContractEntry::new()
                    .deployed(known::BSC, Address::from_bytes([0x10; 20]))
                    .interface(ContractInterface::erc20()),
            )
            .unwrap();
        ResolverConfig::new(NetworkRegistry::with_known_networks(), directory)
    }

    #[tokio::test]
    async fn test_no_wallet_is_disconnected() {
        let resolver = Resolver::builder(config()).build();
        assert_eq!(
            resolver.get_handle("Token", None).await.unwrap_err(),
            ResolveError::Disconnected
        );
        assert!(resolver.in_flight.lock().is_empty());
    }

    #[tokio::test]
    async fn test_failed_resolution_is_not_cached() {
        let mock = Arc::new(MockProvider::new(known::ETHEREUM, Address::from_bytes([1; 20])));
        mock.add_known_chain(known::BSC);
        mock.script_switch(crate::provider::SwitchBehavior::Reject);
        let resolver = Resolver::new(config(), mock.clone());

        assert!(resolver.get_handle("Token", None).await.is_err());
        assert!(resolver.cache().is_empty());
        assert!(resolver.in_flight.lock().is_empty());

        let handle = resolver.get_handle("Token", None).await.unwrap();
        assert_eq!(handle.network(), known::BSC);
    }

    #[tokio::test]
    async fn test_dispose_unsubscribes() {
        let mock = Arc::new(MockProvider::new(known::BSC, Address::from_bytes([1; 20])));
        let resolver = Resolver::new(config(), mock.clone());
        assert_eq!(mock.listener_count(), 1);

        resolver.get_handle("Token", None).await.unwrap();
        resolver.dispose();
        assert_eq!(mock.listener_count(), 0);
    }
}
