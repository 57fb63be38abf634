//! Wallet provider boundary (EIP-1193)

use async_trait::async_trait;
use bach_primitives::{Address, NetworkId};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::ProviderRpcError;

/// Change notification emitted by a wallet provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// Active network changed (`chainChanged`)
    ChainChanged(NetworkId),
    /// Exposed accounts changed (`accountsChanged`); empty means locked or disconnected
    AccountsChanged(Vec<Address>),
    /// Provider lost its connection (`disconnect`)
    Disconnect,
}

/// Listener invoked synchronously for every provider event
pub type ChangeListener = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

/// Handle identifying a registered listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Injected wallet provider (object-safe)
///
/// Implementations wrap whatever the host environment exposes (a browser
/// extension bridge, a WalletConnect session, a test double). Signing happens
/// behind `request`; this crate never sees keys.
#[async_trait]
pub trait Eip1193Provider: Send + Sync {
    /// Send a request and get the JSON result
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, ProviderRpcError>;

    /// Register a change listener
    fn subscribe(&self, listener: ChangeListener) -> ListenerId;

    /// Remove a change listener; unknown ids are ignored
    fn unsubscribe(&self, id: ListenerId);
}

/// Listener registry for provider implementations
///
/// Events are delivered on the emitting thread, after the internal lock is
/// released, so listeners may subscribe or unsubscribe re-entrantly.
#[derive(Default)]
pub struct ListenerSet {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, ChangeListener)>>,
}

impl ListenerSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a listener
    pub fn add(&self, listener: ChangeListener) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push((id, listener));
        id
    }

    /// Remove a listener, returning whether it was present
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Deliver an event to every listener
    pub fn emit(&self, event: &ProviderEvent) {
        let snapshot: Vec<ChangeListener> =
            self.listeners.read().iter().map(|(_, l)| l.clone()).collect();
        for listener in snapshot {
            listener(event);
        }
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    /// Whether no listener is registered
    pub fn is_empty(&self) -> bool {
        self.listeners.read().is_empty()
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet").field("len", &self.len()).finish()
    }
}

/// Scripted reply to the next `wallet_switchEthereumChain`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchBehavior {
    /// Switch if the chain is known, otherwise reply 4902
    Follow,
    /// Reply 4001
    Reject,
    /// Reply 4902 even if the chain is known
    Unrecognized,
    /// Reply success but stay on the current chain
    Ignore,
    /// Reply with an arbitrary error
    Fail(ProviderRpcError),
}

/// Scripted reply to the next `wallet_addEthereumChain`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegisterBehavior {
    /// Learn the chain, stay on the current one
    Accept,
    /// Learn the chain and switch to it, as some wallets do
    AcceptAndSwitch,
    /// Reply 4001
    Reject,
    /// Reply with an arbitrary error
    Fail(ProviderRpcError),
}

const PROMPT_METHODS: &[&str] = &[
    "eth_requestAccounts",
    "eth_sendTransaction",
    "wallet_addEthereumChain",
    "wallet_switchEthereumChain",
];

struct MockState {
    chain: Option<NetworkId>,
    accounts: Vec<Address>,
    known_chains: HashSet<NetworkId>,
    switch_script: VecDeque<SwitchBehavior>,
    register_script: VecDeque<RegisterBehavior>,
    responses: HashMap<String, Value>,
    calls: HashMap<String, usize>,
    log: Vec<(String, Vec<Value>)>,
}

/// Mock wallet provider for testing
///
/// Behaves like an injected browser wallet: it knows a set of chains, answers
/// `eth_chainId`/`eth_accounts` from its state, and emits `chainChanged` /
/// `accountsChanged` to listeners synchronously when its state changes.
pub struct MockProvider {
    state: Mutex<MockState>,
    listeners: ListenerSet,
    prompt_gate: Mutex<Option<Arc<Semaphore>>>,
}

impl MockProvider {
    /// Create a wallet on `chain` exposing `account`
    pub fn new(chain: NetworkId, account: Address) -> Self {
        Self::with_state(Some(chain), vec![account])
    }

    /// Create a wallet with no chain and no accounts
    pub fn disconnected() -> Self {
        Self::with_state(None, Vec::new())
    }

    fn with_state(chain: Option<NetworkId>, accounts: Vec<Address>) -> Self {
        Self {
            state: Mutex::new(MockState {
                chain,
                accounts,
                known_chains: chain.into_iter().collect(),
                switch_script: VecDeque::new(),
                register_script: VecDeque::new(),
                responses: HashMap::new(),
                calls: HashMap::new(),
                log: Vec::new(),
            }),
            listeners: ListenerSet::new(),
            prompt_gate: Mutex::new(None),
        }
    }

    /// Current chain, `None` when disconnected
    pub fn chain(&self) -> Option<NetworkId> {
        self.state.lock().chain
    }

    /// Current accounts
    pub fn accounts(&self) -> Vec<Address> {
        self.state.lock().accounts.clone()
    }

    /// Make the wallet aware of a chain without switching to it
    pub fn add_known_chain(&self, chain: NetworkId) {
        self.state.lock().known_chains.insert(chain);
    }

    /// Whether the wallet knows the chain
    pub fn knows_chain(&self, chain: NetworkId) -> bool {
        self.state.lock().known_chains.contains(&chain)
    }

    /// Simulate the user switching networks in the wallet UI
    pub fn set_chain(&self, chain: NetworkId) {
        {
            let mut state = self.state.lock();
            state.chain = Some(chain);
            state.known_chains.insert(chain);
        }
        self.emit(&ProviderEvent::ChainChanged(chain));
    }

    /// Simulate the user switching or locking accounts
    pub fn set_accounts(&self, accounts: Vec<Address>) {
        self.state.lock().accounts = accounts.clone();
        self.emit(&ProviderEvent::AccountsChanged(accounts));
    }

    /// Simulate the wallet disconnecting
    pub fn disconnect(&self) {
        {
            let mut state = self.state.lock();
            state.chain = None;
            state.accounts.clear();
        }
        self.emit(&ProviderEvent::Disconnect);
    }

    /// Emit an arbitrary event to listeners
    pub fn emit(&self, event: &ProviderEvent) {
        self.listeners.emit(event);
    }

    /// Queue the reply for a future switch request
    pub fn script_switch(&self, behavior: SwitchBehavior) {
        self.state.lock().switch_script.push_back(behavior);
    }

    /// Queue the reply for a future registration request
    pub fn script_register(&self, behavior: RegisterBehavior) {
        self.state.lock().register_script.push_back(behavior);
    }

    /// Set a canned result for a method (e.g. `eth_call`)
    pub fn set_response(&self, method: &str, response: Value) {
        self.state.lock().responses.insert(method.to_string(), response);
    }

    /// Hold every prompting request until [`MockProvider::open_prompts`] is called
    pub fn gate_prompts(&self) {
        *self.prompt_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    /// Release all held and future prompts
    pub fn open_prompts(&self) {
        if let Some(gate) = self.prompt_gate.lock().take() {
            gate.close();
        }
    }

    /// Number of requests made for `method`
    pub fn request_count(&self, method: &str) -> usize {
        self.state.lock().calls.get(method).copied().unwrap_or(0)
    }

    /// Number of user-facing prompts shown so far
    pub fn prompt_count(&self) -> usize {
        let state = self.state.lock();
        PROMPT_METHODS
            .iter()
            .map(|m| state.calls.get(*m).copied().unwrap_or(0))
            .sum()
    }

    /// Methods requested, in order
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().log.iter().map(|(m, _)| m.clone()).collect()
    }

    /// Params of the most recent request for `method`
    pub fn last_params(&self, method: &str) -> Option<Vec<Value>> {
        self.state
            .lock()
            .log
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    async fn wait_for_gate(&self) {
        let gate = self.prompt_gate.lock().clone();
        if let Some(gate) = gate {
            // a closed gate means prompts are open
            let _ = gate.acquire().await;
        }
    }

    fn switch(&self, params: &[Value]) -> Result<Value, ProviderRpcError> {
        let target = chain_id_param(params)?;
        let switched = {
            let mut state = self.state.lock();
            let behavior = state
                .switch_script
                .pop_front()
                .unwrap_or(SwitchBehavior::Follow);
            match behavior {
                SwitchBehavior::Follow if state.known_chains.contains(&target) => {
                    state.chain = Some(target);
                    true
                }
                SwitchBehavior::Follow | SwitchBehavior::Unrecognized => {
                    return Err(ProviderRpcError::unrecognized_chain(target))
                }
                SwitchBehavior::Reject => return Err(ProviderRpcError::user_rejected()),
                SwitchBehavior::Ignore => false,
                SwitchBehavior::Fail(e) => return Err(e),
            }
        };
        if switched {
            self.emit(&ProviderEvent::ChainChanged(target));
        }
        Ok(Value::Null)
    }

    fn register(&self, params: &[Value]) -> Result<Value, ProviderRpcError> {
        let target = chain_id_param(params)?;
        let switched = {
            let mut state = self.state.lock();
            let behavior = state
                .register_script
                .pop_front()
                .unwrap_or(RegisterBehavior::Accept);
            match behavior {
                RegisterBehavior::Accept => {
                    state.known_chains.insert(target);
                    false
                }
                RegisterBehavior::AcceptAndSwitch => {
                    state.known_chains.insert(target);
                    state.chain = Some(target);
                    true
                }
                RegisterBehavior::Reject => return Err(ProviderRpcError::user_rejected()),
                RegisterBehavior::Fail(e) => return Err(e),
            }
        };
        if switched {
            self.emit(&ProviderEvent::ChainChanged(target));
        }
        Ok(Value::Null)
    }
}

impl fmt::Debug for MockProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockProvider")
            .field("chain", &state.chain)
            .field("accounts", &state.accounts)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Eip1193Provider for MockProvider {
    async fn request(&self, method: &str, params: Vec<Value>) -> Result<Value, ProviderRpcError> {
        {
            let mut state = self.state.lock();
            *state.calls.entry(method.to_string()).or_insert(0) += 1;
            state.log.push((method.to_string(), params.clone()));
        }

        if PROMPT_METHODS.contains(&method) {
            self.wait_for_gate().await;
        }

        match method {
            "eth_chainId" => match self.chain() {
                Some(chain) => Ok(Value::String(chain.to_hex())),
                None => Err(ProviderRpcError::disconnected()),
            },
            "eth_accounts" | "eth_requestAccounts" => Ok(Value::Array(
                self.accounts()
                    .iter()
                    .map(|a| Value::String(a.to_hex()))
                    .collect(),
            )),
            "wallet_switchEthereumChain" => self.switch(&params),
            "wallet_addEthereumChain" => self.register(&params),
            other => self
                .state
                .lock()
                .responses
                .get(other)
                .cloned()
                .ok_or_else(|| {
                    ProviderRpcError::new(-32601, format!("Method not found: {}", other))
                }),
        }
    }

    fn subscribe(&self, listener: ChangeListener) -> ListenerId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: ListenerId) {
        self.listeners.remove(id);
    }
}

fn chain_id_param(params: &[Value]) -> Result<NetworkId, ProviderRpcError> {
    params
        .first()
        .and_then(|p| p.get("chainId"))
        .and_then(Value::as_str)
        .and_then(|s| NetworkId::from_hex(s).ok())
        .ok_or_else(|| ProviderRpcError::new(-32602, "Invalid params: missing chainId"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    fn account() -> Address {
        Address::from_bytes([0x42; 20])
    }

    #[test]
    fn test_listener_set_add_remove() {
        let set = ListenerSet::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let id = set.add(Arc::new(move |_: &ProviderEvent| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        set.emit(&ProviderEvent::Disconnect);
        assert!(set.remove(id));
        assert!(!set.remove(id));
        set.emit(&ProviderEvent::Disconnect);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_mock_reports_chain_and_accounts() {
        let mock = MockProvider::new(NetworkId::new(1), account());
        let chain = mock.request("eth_chainId", vec![]).await.unwrap();
        assert_eq!(chain, json!("0x1"));
        let accounts = mock.request("eth_accounts", vec![]).await.unwrap();
        assert_eq!(accounts, json!([account().to_hex()]));
    }

    #[tokio::test]
    async fn test_mock_disconnected_chain_id() {
        let mock = MockProvider::disconnected();
        let err = mock.request("eth_chainId", vec![]).await.unwrap_err();
        assert!(err.is_disconnect());
    }

    #[tokio::test]
    async fn test_mock_switch_unknown_chain() {
        let mock = MockProvider::new(NetworkId::new(1), account());
        let params = vec![json!({"chainId": "0x89"})];

        let err = mock
            .request("wallet_switchEthereumChain", params.clone())
            .await
            .unwrap_err();
        assert_eq!(err.code, ProviderRpcError::UNRECOGNIZED_CHAIN);

        mock.request("wallet_addEthereumChain", params.clone())
            .await
            .unwrap();
        mock.request("wallet_switchEthereumChain", params).await.unwrap();
        assert_eq!(mock.chain(), Some(NetworkId::new(137)));
        assert_eq!(mock.prompt_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_switch_emits_chain_changed() {
        let mock = MockProvider::new(NetworkId::new(1), account());
        mock.add_known_chain(NetworkId::new(56));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        mock.subscribe(Arc::new(move |e: &ProviderEvent| sink.lock().push(e.clone())));

        mock.request("wallet_switchEthereumChain", vec![json!({"chainId": "0x38"})])
            .await
            .unwrap();

        assert_eq!(
            *seen.lock(),
            vec![ProviderEvent::ChainChanged(NetworkId::new(56))]
        );
    }

    #[tokio::test]
    async fn test_mock_unknown_method() {
        let mock = MockProvider::new(NetworkId::new(1), account());
        assert!(mock.request("eth_getLogs", vec![]).await.is_err());

        mock.set_response("eth_getLogs", json!([]));
        assert_eq!(mock.request("eth_getLogs", vec![]).await.unwrap(), json!([]));
        assert_eq!(mock.request_count("eth_getLogs"), 2);
    }
}
