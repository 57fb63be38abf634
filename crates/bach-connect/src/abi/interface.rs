//! Contract interface descriptors (JSON ABI)

use serde::{de, Deserialize, Deserializer};

use super::encode::function_selector;
use super::types::ParamType;
use crate::ConfigError;

/// Declared state mutability of a function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateMutability {
    /// Does not read state
    Pure,
    /// Reads but does not modify state
    View,
    /// Modifies state, rejects value
    #[default]
    NonPayable,
    /// Modifies state, accepts value
    Payable,
}

impl StateMutability {
    /// Whether the function can be executed with `eth_call` instead of a transaction
    pub fn is_read_only(&self) -> bool {
        matches!(self, StateMutability::Pure | StateMutability::View)
    }
}

/// Function definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    /// Function name
    pub name: String,
    /// Canonical signature (e.g., "transfer(address,uint256)")
    pub signature: String,
    /// Function selector (4 bytes)
    pub selector: [u8; 4],
    /// Input parameter types
    pub inputs: Vec<ParamType>,
    /// Output parameter types
    pub outputs: Vec<ParamType>,
    /// State mutability
    pub state_mutability: StateMutability,
}

impl FunctionDef {
    /// Create a function definition; the signature and selector are derived
    pub fn new(
        name: impl Into<String>,
        inputs: Vec<ParamType>,
        outputs: Vec<ParamType>,
        state_mutability: StateMutability,
    ) -> Self {
        let name = name.into();
        let params: Vec<String> = inputs.iter().map(ToString::to_string).collect();
        let signature = format!("{}({})", name, params.join(","));
        let selector = function_selector(&signature);
        Self {
            name,
            signature,
            selector,
            inputs,
            outputs,
            state_mutability,
        }
    }
}

/// Parsed interface descriptor of a deployed contract
///
/// Only `function` entries are kept; events, errors, constructors and
/// fallback entries are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractInterface {
    functions: Vec<FunctionDef>,
}

impl ContractInterface {
    /// Create an empty interface
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON ABI document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let items: Vec<AbiItem> = serde_json::from_str(json)
            .map_err(|e| ConfigError::InvalidInterface(e.to_string()))?;
        Self::from_items(items)
    }

    /// Add a function with builder pattern
    pub fn with_function(mut self, function: FunctionDef) -> Self {
        self.functions.push(function);
        self
    }

    /// First function with the given name
    pub fn function(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.name == name)
    }

    /// Function by its canonical signature, for overloaded names
    pub fn function_by_signature(&self, signature: &str) -> Option<&FunctionDef> {
        self.functions.iter().find(|f| f.signature == signature)
    }

    /// All functions in declaration order
    pub fn functions(&self) -> &[FunctionDef] {
        &self.functions
    }

    /// Number of functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Whether the interface has no functions
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Standard ERC-20 token interface
    pub fn erc20() -> Self {
        use ParamType::{Address, Bool, String, Uint};
        use StateMutability::{NonPayable, View};

        Self::new()
            .with_function(FunctionDef::new("name", vec![], vec![String], View))
            .with_function(FunctionDef::new("symbol", vec![], vec![String], View))
            .with_function(FunctionDef::new("decimals", vec![], vec![Uint(8)], View))
            .with_function(FunctionDef::new("totalSupply", vec![], vec![Uint(256)], View))
            .with_function(FunctionDef::new("balanceOf", vec![Address], vec![Uint(256)], View))
            .with_function(FunctionDef::new(
                "allowance",
                vec![Address, Address],
                vec![Uint(256)],
                View,
            ))
            .with_function(FunctionDef::new(
                "transfer",
                vec![Address, Uint(256)],
                vec![Bool],
                NonPayable,
            ))
            .with_function(FunctionDef::new(
                "approve",
                vec![Address, Uint(256)],
                vec![Bool],
                NonPayable,
            ))
            .with_function(FunctionDef::new(
                "transferFrom",
                vec![Address, Address, Uint(256)],
                vec![Bool],
                NonPayable,
            ))
    }

    fn from_items(items: Vec<AbiItem>) -> Result<Self, ConfigError> {
        let mut functions = Vec::new();
        for item in items.into_iter().filter(|i| i.kind == "function") {
            let inputs = params_to_types(&item.inputs)?;
            let outputs = params_to_types(&item.outputs)?;
            let mutability = match item.state_mutability.as_deref() {
                Some("pure") => StateMutability::Pure,
                Some("view") => StateMutability::View,
                Some("payable") => StateMutability::Payable,
                Some("nonpayable") => StateMutability::NonPayable,
                Some(other) => {
                    return Err(ConfigError::InvalidInterface(format!(
                        "unknown stateMutability {} on {}",
                        other, item.name
                    )))
                }
                // pre-0.4.16 compilers only emit `constant` / `payable`
                None if item.constant => StateMutability::View,
                None if item.payable => StateMutability::Payable,
                None => StateMutability::NonPayable,
            };
            functions.push(FunctionDef::new(item.name, inputs, outputs, mutability));
        }
        Ok(Self { functions })
    }
}

impl<'de> Deserialize<'de> for ContractInterface {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<AbiItem>::deserialize(deserializer)?;
        Self::from_items(items).map_err(de::Error::custom)
    }
}

#[derive(Deserialize)]
struct AbiItem {
    #[serde(rename = "type", default = "default_item_kind")]
    kind: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    inputs: Vec<AbiParam>,
    #[serde(default)]
    outputs: Vec<AbiParam>,
    #[serde(rename = "stateMutability", default)]
    state_mutability: Option<String>,
    #[serde(default)]
    constant: bool,
    #[serde(default)]
    payable: bool,
}

fn default_item_kind() -> String {
    "function".to_string()
}

#[derive(Deserialize)]
struct AbiParam {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    components: Vec<AbiParam>,
}

fn params_to_types(params: &[AbiParam]) -> Result<Vec<ParamType>, ConfigError> {
    params.iter().map(param_to_type).collect()
}

fn param_to_type(param: &AbiParam) -> Result<ParamType, ConfigError> {
    let parsed = match param.kind.strip_prefix("tuple") {
        Some(suffix) => {
            let components = params_to_types(&param.components)?;
            ParamType::with_suffix(ParamType::Tuple(components), suffix)
        }
        None => ParamType::parse(&param.kind),
    };
    parsed.map_err(ConfigError::InvalidInterface)
}
