//! Primitive parsing errors

use thiserror::Error;

/// Error produced while parsing a primitive from text or bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrimitiveError {
    /// Input was not valid hex
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    /// Decoded byte length did not match the type
    #[error("invalid length: expected {expected} bytes, got {got}")]
    InvalidLength {
        /// Expected length in bytes
        expected: usize,
        /// Actual length in bytes
        got: usize,
    },

    /// Network identifier was neither decimal nor 0x-prefixed hex
    #[error("invalid network id: {0}")]
    InvalidNetworkId(String),

    /// Contract identifier was empty
    #[error("contract id must not be empty")]
    EmptyContractId,
}
