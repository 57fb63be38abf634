//! Network (chain) identifier

use std::fmt;
use std::str::FromStr;

use crate::{strip_hex_prefix, PrimitiveError};

/// Identifier of a distributed-ledger network (EIP-155 chain id)
///
/// Wallet providers report chain ids as `0x`-prefixed hex (`"0x89"`), while
/// deployment configuration usually writes them in decimal (`137`). Both
/// forms parse to the same value; `Display` is decimal, [`NetworkId::to_hex`]
/// is the wallet wire form.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NetworkId(u64);

impl NetworkId {
    /// Create from a numeric chain id
    pub const fn new(chain_id: u64) -> Self {
        NetworkId(chain_id)
    }

    /// Numeric chain id
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Parse the `0x`-prefixed hex form used by wallet providers
    pub fn from_hex(s: &str) -> Result<Self, PrimitiveError> {
        let digits = strip_hex_prefix(s.trim());
        if digits.is_empty() {
            return Err(PrimitiveError::InvalidNetworkId(s.to_string()));
        }
        u64::from_str_radix(digits, 16)
            .map(NetworkId)
            .map_err(|_| PrimitiveError::InvalidNetworkId(s.to_string()))
    }

    /// Minimal `0x`-prefixed hex form, as expected by `wallet_switchEthereumChain`
    pub fn to_hex(&self) -> String {
        format!("0x{:x}", self.0)
    }
}

impl fmt::Debug for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NetworkId({})", self.0)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for NetworkId {
    type Err = PrimitiveError;

    /// Accepts decimal (`"137"`) or hex (`"0x89"`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
            return Self::from_hex(trimmed);
        }
        trimmed
            .parse::<u64>()
            .map(NetworkId)
            .map_err(|_| PrimitiveError::InvalidNetworkId(s.to_string()))
    }
}

impl From<u64> for NetworkId {
    fn from(chain_id: u64) -> Self {
        NetworkId(chain_id)
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::NetworkId;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
    use std::fmt;

    impl Serialize for NetworkId {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_u64(self.0)
        }
    }

    struct NetworkIdVisitor;

    impl<'de> de::Visitor<'de> for NetworkIdVisitor {
        type Value = NetworkId;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a chain id as an integer, a decimal string or a 0x-prefixed hex string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<NetworkId, E> {
            Ok(NetworkId(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<NetworkId, E> {
            u64::try_from(v)
                .map(NetworkId)
                .map_err(|_| E::custom(format!("negative chain id: {}", v)))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<NetworkId, E> {
            v.parse().map_err(E::custom)
        }
    }

    impl<'de> Deserialize<'de> for NetworkId {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(NetworkIdVisitor)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_id_hex_round_trip() {
        let polygon = NetworkId::new(137);
        assert_eq!(polygon.to_hex(), "0x89");
        assert_eq!(NetworkId::from_hex("0x89").unwrap(), polygon);
        assert_eq!(NetworkId::from_hex("0X89").unwrap(), polygon);
    }

    #[test]
    fn test_network_id_from_str_accepts_both_forms() {
        assert_eq!("56".parse::<NetworkId>().unwrap(), NetworkId::new(56));
        assert_eq!("0x38".parse::<NetworkId>().unwrap(), NetworkId::new(56));
        assert!("bsc".parse::<NetworkId>().is_err());
        assert!("0x".parse::<NetworkId>().is_err());
    }

    #[test]
    fn test_network_id_display_is_decimal() {
        assert_eq!(NetworkId::new(11155111).to_string(), "11155111");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_network_id_serde_forms() {
        let from_number: NetworkId = serde_json::from_str("137").unwrap();
        let from_hex: NetworkId = serde_json::from_str("\"0x89\"").unwrap();
        let from_decimal: NetworkId = serde_json::from_str("\"137\"").unwrap();
        assert_eq!(from_number, from_hex);
        assert_eq!(from_number, from_decimal);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "137");
        assert!(serde_json::from_str::<NetworkId>("-1").is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_network_id_as_map_key() {
        use std::collections::HashMap;
        let map: HashMap<NetworkId, u8> =
            serde_json::from_str(r#"{"1": 1, "0x89": 2}"#).unwrap();
        assert_eq!(map[&NetworkId::new(1)], 1);
        assert_eq!(map[&NetworkId::new(137)], 2);
    }
}
