//! Logical contract identifier

use std::borrow::Borrow;
use std::fmt;

use crate::PrimitiveError;

/// Network-independent name of a contract role (e.g. `"Lending"`, `"Staking"`)
///
/// The same `ContractId` refers to different deployed addresses on different
/// networks; the contract directory maps it to a concrete deployment.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ContractId(String);

impl ContractId {
    /// Create a contract id, rejecting empty names
    pub fn new(name: impl Into<String>) -> Result<Self, PrimitiveError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(PrimitiveError::EmptyContractId);
        }
        Ok(ContractId(name))
    }

    /// The contract role name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContractId({})", self.0)
    }
}

impl fmt::Display for ContractId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Lookups by name never need to validate, so `&str` converts unchecked.
impl From<&str> for ContractId {
    fn from(name: &str) -> Self {
        ContractId(name.to_string())
    }
}

impl From<String> for ContractId {
    fn from(name: String) -> Self {
        ContractId(name)
    }
}

impl Borrow<str> for ContractId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_contract_id_rejects_empty() {
        assert_eq!(ContractId::new("  "), Err(PrimitiveError::EmptyContractId));
        assert_eq!(ContractId::new("Lending").unwrap().as_str(), "Lending");
    }

    #[test]
    fn test_contract_id_str_lookup() {
        let mut map = HashMap::new();
        map.insert(ContractId::from("Staking"), 1);
        assert_eq!(map.get("Staking"), Some(&1));
    }
}
