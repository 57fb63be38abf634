//! Signer-bound contract handles

use bach_primitives::{Address, ContractId, NetworkId, TxHash};
use bytes::Bytes;
use primitive_types::U256;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::abi::{decode, encode_function_call, ContractInterface, FunctionDef, Token};
use crate::directory::ContractDescriptor;
use crate::provider::Eip1193Provider;
use crate::InvokeError;

/// Call/transaction object for `eth_call` and `eth_sendTransaction`
#[derive(Serialize)]
struct CallRequest {
    from: Address,
    to: Address,
    data: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
}

/// Live connection from one account to one contract address
///
/// Transactions are signed by the wallet behind the provider.
#[derive(Clone)]
pub struct SignerConnection {
    provider: Arc<dyn Eip1193Provider>,
    account: Address,
    contract: Address,
}

impl SignerConnection {
    pub(crate) fn new(provider: Arc<dyn Eip1193Provider>, account: Address, contract: Address) -> Self {
        Self {
            provider,
            account,
            contract,
        }
    }

    /// Sender account
    pub fn account(&self) -> Address {
        self.account
    }

    /// Target contract address
    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Execute a read-only call against the latest block
    pub async fn call(&self, data: &[u8]) -> Result<Bytes, InvokeError> {
        let request = self.request(data, None);
        let result = self
            .provider
            .request("eth_call", vec![to_value(&request)?, Value::from("latest")])
            .await?;
        let hex = result
            .as_str()
            .ok_or_else(|| InvokeError::Abi(format!("invalid eth_call result: {}", result)))?;
        let raw = hex.strip_prefix("0x").unwrap_or(hex);
        let bytes = hex::decode(raw).map_err(|e| InvokeError::Abi(e.to_string()))?;
        Ok(Bytes::from(bytes))
    }

    /// Submit a transaction for the wallet to sign and broadcast
    pub async fn send_transaction(
        &self,
        data: &[u8],
        value: Option<U256>,
    ) -> Result<TxHash, InvokeError> {
        let request = self.request(data, value);
        let result = self
            .provider
            .request("eth_sendTransaction", vec![to_value(&request)?])
            .await?;
        let hash = result.as_str().ok_or_else(|| {
            InvokeError::Abi(format!("invalid eth_sendTransaction result: {}", result))
        })?;
        Ok(TxHash::from_hex(hash)?)
    }

    fn request(&self, data: &[u8], value: Option<U256>) -> CallRequest {
        CallRequest {
            from: self.account,
            to: self.contract,
            data: format!("0x{}", hex::encode(data)),
            value: value.map(|v| format!("0x{:x}", v)),
        }
    }
}

impl fmt::Debug for SignerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignerConnection")
            .field("account", &self.account)
            .field("contract", &self.contract)
            .finish_non_exhaustive()
    }
}

fn to_value(request: &CallRequest) -> Result<Value, InvokeError> {
    serde_json::to_value(request).map_err(|e| InvokeError::Abi(e.to_string()))
}

/// Caller-usable reference to a deployed contract, bound to the network and
/// account that were active when it was created
///
/// Handles are owned by the resolver's cache and shared as `Arc`s. A handle
/// dropped from the cache stays usable but may no longer match the wallet.
pub struct ContractHandle {
    contract_id: ContractId,
    network: NetworkId,
    interface: Arc<ContractInterface>,
    connection: SignerConnection,
}

impl ContractHandle {
    /// Bind a descriptor to a signer connection
    pub fn new(descriptor: ContractDescriptor, connection: SignerConnection) -> Self {
        Self {
            contract_id: descriptor.contract_id,
            network: descriptor.network,
            interface: descriptor.interface,
            connection,
        }
    }

    /// Logical contract id
    pub fn contract_id(&self) -> &ContractId {
        &self.contract_id
    }

    /// Network the handle is bound to
    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// Deployed contract address
    pub fn address(&self) -> Address {
        self.connection.contract()
    }

    /// Account transactions are sent from
    pub fn account(&self) -> Address {
        self.connection.account()
    }

    /// Interface descriptor
    pub fn interface(&self) -> &ContractInterface {
        &self.interface
    }

    /// Underlying signer connection
    pub fn connection(&self) -> &SignerConnection {
        &self.connection
    }

    /// Encode call data for a function
    ///
    /// `function` is a name (first overload wins) or a full signature such as
    /// `"deposit(address,uint256)"`.
    pub fn encode_call(&self, function: &str, args: &[Token]) -> Result<Bytes, InvokeError> {
        let def = self.function(function)?;
        if args.len() != def.inputs.len() {
            return Err(InvokeError::ArgumentCount {
                function: def.signature.clone(),
                expected: def.inputs.len(),
                got: args.len(),
            });
        }
        let data = encode_function_call(def.selector, &def.inputs, args)?;
        Ok(Bytes::from(data))
    }

    /// Call a function with `eth_call` and decode its outputs
    pub async fn call(&self, function: &str, args: &[Token]) -> Result<Vec<Token>, InvokeError> {
        let data = self.encode_call(function, args)?;
        let output = self.connection.call(&data).await?;
        let def = self.function(function)?;
        decode(&def.outputs, &output)
    }

    /// Send a transaction invoking a function
    pub async fn send(&self, function: &str, args: &[Token]) -> Result<TxHash, InvokeError> {
        let data = self.encode_call(function, args)?;
        self.connection.send_transaction(&data, None).await
    }

    /// Send a transaction invoking a payable function with attached value
    pub async fn send_with_value(
        &self,
        function: &str,
        args: &[Token],
        value: U256,
    ) -> Result<TxHash, InvokeError> {
        let data = self.encode_call(function, args)?;
        self.connection.send_transaction(&data, Some(value)).await
    }

    fn function(&self, function: &str) -> Result<&FunctionDef, InvokeError> {
        let found = if function.contains('(') {
            self.interface.function_by_signature(function)
        } else {
            self.interface.function(function)
        };
        found.ok_or_else(|| InvokeError::UnknownFunction(function.to_string()))
    }
}

impl fmt::Debug for ContractHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContractHandle")
            .field("contract_id", &self.contract_id)
            .field("network", &self.network)
            .field("address", &self.address())
            .field("account", &self.account())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockProvider;
    use serde_json::json;

    const BSC: NetworkId = NetworkId::new(56);

    fn token_address() -> Address {
        Address::from_bytes([0x11; 20])
    }

    fn account() -> Address {
        Address::from_bytes([0x22; 20])
    }

    fn handle(mock: &Arc<MockProvider>) -> ContractHandle {
        let descriptor = ContractDescriptor {
            contract_id: "Token".into(),
            network: BSC,
            address: token_address(),
            interface: Arc::new(ContractInterface::erc20()),
        };
        let connection = SignerConnection::new(mock.clone(), account(), token_address());
        ContractHandle::new(descriptor, connection)
    }

    #[test]
    fn test_encode_call_checks_arguments() {
        let mock = Arc::new(MockProvider::new(BSC, account()));
        let handle = handle(&mock);

        let data = handle
            .encode_call("balanceOf", &[Token::Address(account())])
            .unwrap();
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(data.len(), 36);

        assert_eq!(
            handle.encode_call("balanceOf", &[]),
            Err(InvokeError::ArgumentCount {
                function: "balanceOf(address)".to_string(),
                expected: 1,
                got: 0,
            })
        );
        assert_eq!(
            handle.encode_call("mint", &[]),
            Err(InvokeError::UnknownFunction("mint".to_string()))
        );
    }

    #[tokio::test]
    async fn test_call_decodes_output() {
        let mock = Arc::new(MockProvider::new(BSC, account()));
        mock.set_response(
            "eth_call",
            json!("0x00000000000000000000000000000000000000000000000000000000000003e8"),
        );
        let handle = handle(&mock);

        let out = handle
            .call("balanceOf", &[Token::Address(account())])
            .await
            .unwrap();
        assert_eq!(out, vec![Token::uint(1000u64)]);

        let params = mock.last_params("eth_call").unwrap();
        assert_eq!(params[0]["from"], json!(account().to_hex()));
        assert_eq!(params[0]["to"], json!(token_address().to_hex()));
        assert_eq!(params[1], json!("latest"));
    }

    #[tokio::test]
    async fn test_send_with_value() {
        let mock = Arc::new(MockProvider::new(BSC, account()));
        let tx = format!("0x{}", "ab".repeat(32));
        mock.set_response("eth_sendTransaction", json!(tx));
        let handle = handle(&mock);

        let hash = handle
            .send_with_value(
                "transfer(address,uint256)",
                &[Token::Address(token_address()), Token::uint(5u64)],
                U256::from(255u64),
            )
            .await
            .unwrap();
        assert_eq!(hash, TxHash::from_bytes([0xab; 32]));

        let params = mock.last_params("eth_sendTransaction").unwrap();
        assert_eq!(params[0]["value"], json!("0xff"));
        assert!(params[0]["data"].as_str().unwrap().starts_with("0xa9059cbb"));
    }

    #[tokio::test]
    async fn test_send_surfaces_provider_error() {
        let mock = Arc::new(MockProvider::new(BSC, account()));
        let handle = handle(&mock);
        // no canned response: the mock reports the method as unsupported
        let err = handle
            .send("approve", &[Token::Address(account()), Token::uint(1u64)])
            .await
            .unwrap_err();
        assert!(matches!(err, InvokeError::Provider(_)));
    }
}
