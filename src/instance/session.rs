// Wed Jan 15 2026 - Alex

use super::{ClassKind, IdentityCache, Instance, ModelError, TaskScheduler};
use crate::memory::{Accessor, Address, RemoteMemory};
use crate::offsets::OffsetTable;
use ahash::AHashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_THREAD_TIMEOUT: Duration = Duration::from_secs(5);

/// One attached session: the accessor, the offsets it was started with and
/// the identity cache. Dropping it ends the session's identities.
pub struct Session {
    memory: Accessor,
    offsets: Arc<OffsetTable>,
    cache: IdentityCache,
    thread_timeout: Duration,
    // bytecode slot -> buffer this session allocated for it
    owned_bytecode: Mutex<AHashMap<Address, Address>>,
}

impl Session {
    pub fn new(remote: Arc<dyn RemoteMemory>, offsets: Arc<OffsetTable>) -> Arc<Self> {
        Self::with_thread_timeout(remote, offsets, DEFAULT_THREAD_TIMEOUT)
    }

    pub fn with_thread_timeout(
        remote: Arc<dyn RemoteMemory>,
        offsets: Arc<OffsetTable>,
        thread_timeout: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            memory: Accessor::new(remote),
            offsets,
            cache: IdentityCache::new(),
            thread_timeout,
            owned_bytecode: Mutex::new(AHashMap::new()),
        })
    }

    pub fn memory(&self) -> &Accessor {
        &self.memory
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    pub fn cache(&self) -> &IdentityCache {
        &self.cache
    }

    pub fn base(&self) -> Address {
        self.memory.module_base()
    }

    pub fn is_alive(&self) -> bool {
        self.memory.is_alive()
    }

    pub fn thread_timeout(&self) -> Duration {
        self.thread_timeout
    }

    /// Runs `code` on a remote thread bounded by the session's thread timeout.
    pub fn call_remote(&self, code: &[u8], result_offset: u64) -> u64 {
        self.memory.call_remote(code, result_offset, self.thread_timeout)
    }

    pub fn offset(&self, name: &str) -> Result<u64, ModelError> {
        self.offsets.get(name).ok_or_else(|| ModelError::Unsupported(name.to_string()))
    }

    /// Wraps `addr` as its most specific class. Resolved classes are cached
    /// per address; a node whose class cannot be read yet stays uncached.
    pub fn instance(self: &Arc<Self>, addr: Address) -> Instance {
        if addr.is_null() {
            return self.null_instance();
        }
        if let Some(kind) = self.cache.get(addr) {
            return Instance::from_parts(self.clone(), addr, kind);
        }

        let probe = Instance::from_parts(self.clone(), addr, ClassKind::Generic);
        match probe.try_class_name() {
            Ok(class_name) => {
                let kind = self.cache.resolve(addr, ClassKind::from_class_name(&class_name));
                Instance::from_parts(self.clone(), addr, kind)
            }
            Err(e) => {
                log::trace!("class of {} unresolved: {}", addr, e);
                probe
            }
        }
    }

    /// Wraps `addr` with a class known from context and pins it in the cache.
    pub fn instance_as(self: &Arc<Self>, addr: Address, kind: ClassKind) -> Instance {
        if addr.is_null() {
            return self.null_instance();
        }
        let kind = self.cache.resolve(addr, kind);
        Instance::from_parts(self.clone(), addr, kind)
    }

    pub fn null_instance(self: &Arc<Self>) -> Instance {
        Instance::from_parts(self.clone(), Address::NULL, ClassKind::Generic)
    }

    pub fn scheduler(self: &Arc<Self>) -> TaskScheduler {
        TaskScheduler::new(self.clone())
    }

    /// Records a bytecode buffer this session placed in `slot` and returns
    /// the one it replaces, if that was ours too.
    pub(crate) fn adopt_bytecode(&self, slot: Address, buffer: Address) -> Option<Address> {
        self.owned_bytecode.lock().insert(slot, buffer)
    }
}
