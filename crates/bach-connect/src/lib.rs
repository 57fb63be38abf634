//! # bach-connect
//!
//! Wallet-aware contract handle resolution for BachLedger dapps.
//!
//! ## Features
//!
//! - **Resolver**: turns a logical contract id into a handle bound to the
//!   wallet's current network and account
//! - **NetworkReconciler**: switch → register → switch, each prompt at most once
//! - **HandleCache**: cleared on every wallet network or account change
//! - **ContractHandle**: `eth_call` reads and wallet-signed transactions
//! - **ABI**: JSON ABI parsing, Solidity ABI encoding and decoding
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bach_connect::{abi::Token, Address, MockProvider, Resolver, ResolverConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ResolverConfig::from_env()?;
//!
//!     // Any EIP-1193 provider works; the mock stands in for a browser wallet
//!     let account = Address::from_hex("0x742d35Cc6634C0532925a3b844Bc9e7595f0aB3d")?;
//!     let wallet = Arc::new(MockProvider::new(bach_connect::known::ETHEREUM, account));
//!     let resolver = Resolver::new(config, wallet);
//!
//!     // Prompts the wallet to switch networks if needed
//!     let lending = resolver.get_handle("Lending", None).await?;
//!     let tx = lending.send("deposit", &[Token::uint(1_000u64)]).await?;
//!     println!("Deposit sent: {}", tx);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod abi;
mod cache;
mod config;
mod directory;
mod error;
mod handle;
pub mod provider;
mod reconciler;
mod registry;
mod resolver;
mod wallet;

// Re-export main types
pub use cache::{CacheKey, HandleCache};
pub use config::{ExternalConnectionPolicy, ResolverConfig, CONFIG_ENV};
pub use directory::{ContractDescriptor, ContractDirectory, ContractEntry};
pub use error::{ConfigError, InvokeError, ProviderRpcError, ResolveError, ResolveResult};
pub use handle::{ContractHandle, SignerConnection};
pub use provider::{Eip1193Provider, MockProvider, ProviderEvent};
pub use reconciler::{NetworkReconciler, ReconcileState};
pub use registry::{known, NativeCurrency, NetworkConfig, NetworkRegistry};
pub use resolver::{Resolver, ResolverBuilder};
pub use wallet::{RegisterError, Subscription, SwitchError, WalletAdapter, WalletKind};

// Re-export primitives for convenience
pub use bach_primitives::{Address, ContractId, NetworkId, TxHash};
pub use primitive_types::U256;
