//! Wallet provider adapter
//!
//! Turns raw EIP-1193 requests into the typed outcomes the reconciler works
//! with. User rejection is an ordinary outcome here, not an exceptional one.

use bach_primitives::{Address, NetworkId};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::handle::SignerConnection;
use crate::provider::{ChangeListener, Eip1193Provider, ListenerId, ProviderEvent};
use crate::registry::{NativeCurrency, NetworkConfig};
use crate::{ProviderRpcError, ResolveError, ResolveResult};

/// How the wallet connection was established
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalletKind {
    /// The default provider injected by the host environment
    #[default]
    Injected,
    /// A session negotiated through another connection protocol
    External,
}

/// Outcome of a rejected `wallet_switchEthereumChain`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SwitchError {
    /// The user declined the prompt
    #[error("user rejected the network switch")]
    UserRejected,
    /// The wallet does not know the network (4902)
    #[error("wallet does not recognize the network")]
    NetworkUnrecognized,
    /// Any other provider failure
    #[error(transparent)]
    Failed(ProviderRpcError),
}

/// Outcome of a rejected `wallet_addEthereumChain`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    /// The user declined the prompt
    #[error("user rejected the network registration")]
    UserRejected,
    /// The wallet refused or failed to add the network
    #[error("network registration failed: {0}")]
    RegistrationFailed(ProviderRpcError),
}

/// EIP-3085 `wallet_addEthereumChain` parameter
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddChainParams<'a> {
    chain_id: String,
    chain_name: &'a str,
    native_currency: &'a NativeCurrency,
    rpc_urls: &'a [String],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    block_explorer_urls: Vec<&'a str>,
}

impl<'a> From<&'a NetworkConfig> for AddChainParams<'a> {
    fn from(config: &'a NetworkConfig) -> Self {
        Self {
            chain_id: config.id.to_hex(),
            chain_name: &config.display_name,
            native_currency: &config.native_currency,
            rpc_urls: &config.rpc_urls,
            block_explorer_urls: config.explorer_url.as_deref().into_iter().collect(),
        }
    }
}

/// Listener registration; dropping it unsubscribes
#[must_use = "the listener is removed when the subscription is dropped"]
pub struct Subscription {
    provider: Arc<dyn Eip1193Provider>,
    id: ListenerId,
}

impl Subscription {
    /// Listener id on the provider
    pub fn id(&self) -> ListenerId {
        self.id
    }

    /// Remove the listener now
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.provider.unsubscribe(self.id);
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// Typed view of a wallet provider
#[derive(Clone)]
pub struct WalletAdapter {
    provider: Arc<dyn Eip1193Provider>,
    kind: WalletKind,
}

impl WalletAdapter {
    /// Wrap a provider
    pub fn new(provider: Arc<dyn Eip1193Provider>, kind: WalletKind) -> Self {
        Self { provider, kind }
    }

    /// Wrap the default injected provider
    pub fn injected(provider: Arc<dyn Eip1193Provider>) -> Self {
        Self::new(provider, WalletKind::Injected)
    }

    /// How the connection was established
    pub fn kind(&self) -> WalletKind {
        self.kind
    }

    /// Underlying provider
    pub fn provider(&self) -> &Arc<dyn Eip1193Provider> {
        &self.provider
    }

    /// Network the wallet is currently on
    pub async fn current_network(&self) -> ResolveResult<NetworkId> {
        let value = self
            .provider
            .request("eth_chainId", vec![])
            .await
            .map_err(session_error)?;
        parse_network(&value).ok_or_else(|| {
            ResolveError::Provider(ProviderRpcError::new(
                ProviderRpcError::INTERNAL,
                format!("invalid eth_chainId result: {}", value),
            ))
        })
    }

    /// First exposed account, used as the transaction sender
    pub async fn current_account(&self) -> ResolveResult<Address> {
        let value = self
            .provider
            .request("eth_accounts", vec![])
            .await
            .map_err(session_error)?;
        let first = value
            .as_array()
            .and_then(|accounts| accounts.first())
            .ok_or(ResolveError::Disconnected)?;
        first
            .as_str()
            .and_then(|s| Address::from_hex(s).ok())
            .ok_or_else(|| {
                ResolveError::Provider(ProviderRpcError::new(
                    ProviderRpcError::INTERNAL,
                    format!("invalid eth_accounts entry: {}", first),
                ))
            })
    }

    /// Ask the wallet to switch to `network`; prompts the user
    pub async fn request_switch(&self, network: NetworkId) -> Result<(), SwitchError> {
        let params = serde_json::json!({ "chainId": network.to_hex() });
        match self
            .provider
            .request("wallet_switchEthereumChain", vec![params])
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_user_rejection() => Err(SwitchError::UserRejected),
            Err(e) if e.code == ProviderRpcError::UNRECOGNIZED_CHAIN => {
                Err(SwitchError::NetworkUnrecognized)
            }
            Err(e) => Err(SwitchError::Failed(e)),
        }
    }

    /// Ask the wallet to add `config`; prompts the user
    pub async fn request_register(&self, config: &NetworkConfig) -> Result<(), RegisterError> {
        let params = serde_json::to_value(AddChainParams::from(config)).map_err(|e| {
            RegisterError::RegistrationFailed(ProviderRpcError::new(
                ProviderRpcError::INTERNAL,
                e.to_string(),
            ))
        })?;
        match self
            .provider
            .request("wallet_addEthereumChain", vec![params])
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_user_rejection() => Err(RegisterError::UserRejected),
            Err(e) => Err(RegisterError::RegistrationFailed(e)),
        }
    }

    /// Register a listener for network and account changes
    pub fn on_change<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&ProviderEvent) + Send + Sync + 'static,
    {
        let listener: ChangeListener = Arc::new(listener);
        let id = self.provider.subscribe(listener);
        debug!("Subscribed to wallet changes as {:?}", id);
        Subscription {
            provider: self.provider.clone(),
            id,
        }
    }

    /// Signer-capable connection to `contract` from the current account
    pub async fn bound_connection(&self, contract: Address) -> ResolveResult<SignerConnection> {
        let account = self.current_account().await?;
        Ok(SignerConnection::new(self.provider.clone(), account, contract))
    }
}

impl fmt::Debug for WalletAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalletAdapter")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

fn session_error(e: ProviderRpcError) -> ResolveError {
    if e.is_disconnect() {
        ResolveError::Disconnected
    } else {
        ResolveError::Provider(e)
    }
}

fn parse_network(value: &Value) -> Option<NetworkId> {
    match value {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().map(NetworkId::new),
        _ => None,
    }
}
