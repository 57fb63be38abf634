//! Error types for handle resolution and contract invocation
//!
//! All errors are `Clone` so that one in-flight resolution outcome can be
//! handed to every caller that was coalesced onto it.

use bach_primitives::{ContractId, NetworkId, PrimitiveError};
use thiserror::Error;

/// Error returned by a wallet provider `request` (EIP-1193 `ProviderRpcError`)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("provider error {code}: {message}")]
pub struct ProviderRpcError {
    /// Numeric error code
    pub code: i64,
    /// Error message
    pub message: String,
}

impl ProviderRpcError {
    /// The user rejected the request
    pub const USER_REJECTED: i64 = 4001;
    /// The requested method or account has not been authorized
    pub const UNAUTHORIZED: i64 = 4100;
    /// The provider does not support the method
    pub const UNSUPPORTED_METHOD: i64 = 4200;
    /// The provider is disconnected from all chains
    pub const DISCONNECTED: i64 = 4900;
    /// The provider is not connected to the requested chain
    pub const CHAIN_DISCONNECTED: i64 = 4901;
    /// The wallet does not know the chain and it must be added first
    pub const UNRECOGNIZED_CHAIN: i64 = 4902;
    /// JSON-RPC internal error
    pub const INTERNAL: i64 = -32603;

    /// Create a new provider error
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 4001 user rejection
    pub fn user_rejected() -> Self {
        Self::new(Self::USER_REJECTED, "User rejected the request.")
    }

    /// 4902 unrecognized chain
    pub fn unrecognized_chain(network: NetworkId) -> Self {
        Self::new(
            Self::UNRECOGNIZED_CHAIN,
            format!("Unrecognized chain ID \"{}\".", network.to_hex()),
        )
    }

    /// 4900 provider disconnected
    pub fn disconnected() -> Self {
        Self::new(Self::DISCONNECTED, "The provider is disconnected from all chains.")
    }

    /// Whether the user declined the prompt
    pub fn is_user_rejection(&self) -> bool {
        self.code == Self::USER_REJECTED
    }

    /// Whether the provider has no usable connection
    pub fn is_disconnect(&self) -> bool {
        self.code == Self::DISCONNECTED || self.code == Self::CHAIN_DISCONNECTED
    }
}

/// Deployment configuration error
///
/// These indicate a mismatch between the application and its deployment
/// configuration; they are never fixed by user action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// No directory entry for the contract id
    #[error("contract {0} is not configured")]
    UnknownContract(ContractId),

    /// The contract exists but has no deployment on the network
    #[error("contract {contract} has no deployment on network {network}")]
    NotDeployed {
        /// Contract id
        contract: ContractId,
        /// Requested network
        network: NetworkId,
    },

    /// No interface descriptor applies to the contract on the network
    #[error("contract {contract} has no interface for network {network}")]
    MissingInterface {
        /// Contract id
        contract: ContractId,
        /// Requested network
        network: NetworkId,
    },

    /// More than one deployment and no explicit home network
    #[error("contract {0} is deployed on several networks but declares no home network")]
    AmbiguousHome(ContractId),

    /// Network is not in the registry
    #[error("network {0} is not configured")]
    UnknownNetwork(NetworkId),

    /// Network has no RPC endpoint to offer the wallet
    #[error("network {0} has no RPC endpoints")]
    NoEndpoints(NetworkId),

    /// Interface descriptor could not be parsed
    #[error("invalid interface descriptor: {0}")]
    InvalidInterface(String),

    /// Configuration text could not be parsed
    #[error("configuration parse error: {0}")]
    Parse(String),

    /// Configuration file could not be read
    #[error("configuration io error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(e: std::io::Error) -> Self {
        ConfigError::Io(e.to_string())
    }
}

/// Error returned by [`Resolver::get_handle`](crate::Resolver::get_handle)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Directory or registry miss; fatal, not retryable
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),

    /// No wallet session or no account available
    #[error("no wallet connected")]
    Disconnected,

    /// The user declined the network switch prompt
    #[error("network switch to {name} ({network}) was rejected")]
    NetworkSwitchRejected {
        /// Target network
        network: NetworkId,
        /// Display name of the target network
        name: String,
    },

    /// The wallet could not be moved to the network
    #[error("network switch to {name} ({network}) failed: {reason}")]
    NetworkSwitchFailed {
        /// Target network
        network: NetworkId,
        /// Display name of the target network
        name: String,
        /// Provider-reported reason
        reason: String,
    },

    /// The wallet reported a successful switch but is on another network
    #[error("wallet reported switching to network {expected} but is on {actual}")]
    ReconciliationInconsistent {
        /// Network that was requested
        expected: NetworkId,
        /// Network the wallet actually reports
        actual: NetworkId,
    },

    /// The wallet account or network changed while the handle was being bound
    #[error("wallet session changed during resolution")]
    SessionChanged,

    /// Unexpected provider failure outside the switch/register flow
    #[error(transparent)]
    Provider(ProviderRpcError),
}

impl ResolveError {
    /// Configuration errors indicate a deployment mismatch and never resolve by retrying
    pub fn is_fatal(&self) -> bool {
        matches!(self, ResolveError::Configuration(_))
    }

    /// Whether the caller should offer the user a retry or connect affordance
    pub fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            ResolveError::Disconnected
                | ResolveError::NetworkSwitchRejected { .. }
                | ResolveError::NetworkSwitchFailed { .. }
                | ResolveError::ReconciliationInconsistent { .. }
                | ResolveError::SessionChanged
        )
    }

    /// Actionable text suitable for end users
    pub fn user_message(&self) -> String {
        match self {
            ResolveError::Configuration(_) => {
                "This feature is unavailable right now. Please try again later.".to_string()
            }
            ResolveError::Disconnected => "Connect your wallet to continue.".to_string(),
            ResolveError::NetworkSwitchRejected { name, .. } => {
                format!("Switch your wallet to {} to continue.", name)
            }
            ResolveError::NetworkSwitchFailed { name, .. } => format!(
                "Your wallet could not switch to {}. Add the network in your wallet and try again.",
                name
            ),
            ResolveError::ReconciliationInconsistent { .. } | ResolveError::SessionChanged => {
                "Your wallet changed networks unexpectedly. Please try again.".to_string()
            }
            ResolveError::Provider(e) => format!("Wallet error: {}", e.message),
        }
    }
}

/// Result type for resolution
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Error from encoding, sending or decoding a contract invocation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// Function is not in the interface descriptor
    #[error("unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("{function} expects {expected} arguments, got {got}")]
    ArgumentCount {
        /// Function name
        function: String,
        /// Declared inputs
        expected: usize,
        /// Supplied arguments
        got: usize,
    },

    /// ABI encoding or decoding failure
    #[error("ABI error: {0}")]
    Abi(String),

    /// Wallet provider failure (including user rejection of a transaction)
    #[error(transparent)]
    Provider(#[from] ProviderRpcError),
}

impl From<PrimitiveError> for InvokeError {
    fn from(e: PrimitiveError) -> Self {
        InvokeError::Abi(e.to_string())
    }
}
