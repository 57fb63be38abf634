//! # bach-primitives
//!
//! Identifier types for the BachLedger dapp connection layer.
//!
//! Everything here is plain data: addresses, network (chain) identifiers,
//! logical contract names and transaction hashes. None of these types know
//! anything about wallets or caches.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod contract_id;
mod error;
mod hash;
mod network;

pub use address::Address;
pub use contract_id::ContractId;
pub use error::PrimitiveError;
pub use hash::TxHash;
pub use network::NetworkId;

/// Strip an optional `0x`/`0X` prefix from a hex string
pub(crate) fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_hex_prefix() {
        assert_eq!(strip_hex_prefix("0xab"), "ab");
        assert_eq!(strip_hex_prefix("0Xab"), "ab");
        assert_eq!(strip_hex_prefix("ab"), "ab");
    }
}
