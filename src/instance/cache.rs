// Wed Jan 15 2026 - Alex

use super::ClassKind;
use crate::memory::Address;
use ahash::AHashMap;
use parking_lot::RwLock;

/// Address -> resolved class for the current session. Instances are plain
/// handles, so pinning the class is what makes two resolutions of one address
/// interchangeable. Safe to share between workers.
#[derive(Debug, Default)]
pub struct IdentityCache {
    kinds: RwLock<AHashMap<Address, ClassKind>>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, addr: Address) -> Option<ClassKind> {
        self.kinds.read().get(&addr).copied()
    }

    /// Records `kind` unless another resolution got there first; the stored
    /// class wins either way.
    pub fn resolve(&self, addr: Address, kind: ClassKind) -> ClassKind {
        *self.kinds.write().entry(addr).or_insert(kind)
    }

    pub fn forget(&self, addr: Address) {
        self.kinds.write().remove(&addr);
    }

    pub fn len(&self) -> usize {
        self.kinds.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.read().is_empty()
    }

    pub fn clear(&self) {
        let mut kinds = self.kinds.write();
        log::debug!("dropping {} cached identities", kinds.len());
        kinds.clear();
    }
}
