//! Handle cache keyed by (contract id, network)
//!
//! Every invalidation bumps a generation counter. A resolution that started
//! before an invalidation can detect it with [`HandleCache::put_if_generation`]
//! and refuse to store a handle bound to a session that no longer exists.

use bach_primitives::{ContractId, NetworkId};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::handle::ContractHandle;

/// Cache key
pub type CacheKey = (ContractId, NetworkId);

#[derive(Default)]
struct CacheInner {
    generation: u64,
    handles: HashMap<CacheKey, Arc<ContractHandle>>,
}

/// In-memory store of resolved handles
#[derive(Default)]
pub struct HandleCache {
    inner: Mutex<CacheInner>,
}

impl HandleCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached handle for the key, if any
    pub fn get(&self, contract: &ContractId, network: NetworkId) -> Option<Arc<ContractHandle>> {
        self.inner
            .lock()
            .handles
            .get(&(contract.clone(), network))
            .cloned()
    }

    /// Store a handle under its own contract id and network
    pub fn put(&self, handle: Arc<ContractHandle>) {
        let key = (handle.contract_id().clone(), handle.network());
        self.inner.lock().handles.insert(key, handle);
    }

    /// Store a handle only if no invalidation happened since `generation`
    pub fn put_if_generation(&self, handle: Arc<ContractHandle>, generation: u64) -> bool {
        let mut inner = self.inner.lock();
        if inner.generation != generation {
            return false;
        }
        let key = (handle.contract_id().clone(), handle.network());
        inner.handles.insert(key, handle);
        true
    }

    /// Current generation
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Drop every handle and start a new generation; returns the number dropped
    pub fn invalidate_all(&self) -> usize {
        let mut inner = self.inner.lock();
        inner.generation += 1;
        let dropped = inner.handles.len();
        inner.handles.clear();
        debug!(
            "Handle cache invalidated: dropped {} handles, generation {}",
            dropped, inner.generation
        );
        dropped
    }

    /// Drop one handle; returns whether it was present
    pub fn evict(&self, contract: &ContractId, network: NetworkId) -> bool {
        self.inner
            .lock()
            .handles
            .remove(&(contract.clone(), network))
            .is_some()
    }

    /// Number of cached handles
    pub fn len(&self) -> usize {
        self.inner.lock().handles.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.inner.lock().handles.is_empty()
    }
}

impl std::fmt::Debug for HandleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("HandleCache")
            .field("generation", &inner.generation)
            .field("len", &inner.handles.len())
            .finish()
    }
}
