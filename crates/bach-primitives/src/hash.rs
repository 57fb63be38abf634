//! Transaction hash returned by the wallet after submission

use std::fmt;

use crate::{strip_hex_prefix, PrimitiveError};

/// 32-byte transaction hash
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TxHash([u8; 32]);

impl TxHash {
    /// Size in bytes
    pub const LEN: usize = 32;

    /// Create from bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        TxHash(bytes)
    }

    /// Parse from hex string (with or without 0x prefix)
    pub fn from_hex(s: &str) -> Result<Self, PrimitiveError> {
        let bytes = hex::decode(strip_hex_prefix(s.trim()))
            .map_err(|e| PrimitiveError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| PrimitiveError::InvalidLength {
                expected: Self::LEN,
                got: bytes.len(),
            })?;
        Ok(TxHash(bytes))
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TxHash({})", self.to_hex())
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_hash_from_hex() {
        let hex = "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b";
        let hash = TxHash::from_hex(hex).unwrap();
        assert_eq!(hash.to_hex(), hex);
        assert_eq!(hash.as_bytes()[0], 0x88);
    }

    #[test]
    fn test_tx_hash_wrong_length() {
        assert_eq!(
            TxHash::from_hex("0x1234"),
            Err(PrimitiveError::InvalidLength { expected: 32, got: 2 })
        );
    }
}
