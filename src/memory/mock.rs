// Wed Jan 15 2026 - Alex

use crate::memory::{Address, MemoryError, Protection, RemoteMemory};
use ahash::AHashSet;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const ALLOCATION_BASE: u64 = 0x7000_0000;
const PAGE: u64 = 0x1000;

type ThreadHandler = Arc<dyn Fn(&MockMemory, Address) + Send + Sync>;

struct Region {
    base: u64,
    data: Vec<u8>,
    protection: Protection,
}

impl Region {
    fn contains(&self, addr: u64, len: usize) -> bool {
        addr >= self.base && addr.saturating_add(len as u64) <= self.base + self.data.len() as u64
    }
}

/// In-process stand-in for a target address space.
pub struct MockMemory {
    regions: Mutex<Vec<Region>>,
    allocations: Mutex<AHashSet<u64>>,
    next_allocation: Mutex<u64>,
    thread_handler: Mutex<Option<ThreadHandler>>,
    alive: AtomicBool,
    fail_allocations: AtomicBool,
    free_count: AtomicUsize,
    double_frees: AtomicUsize,
    base: Address,
}

impl MockMemory {
    pub fn new() -> Self {
        Self::with_base(Address::new(0x1_4000_0000))
    }

    pub fn with_base(base: Address) -> Self {
        Self {
            regions: Mutex::new(Vec::new()),
            allocations: Mutex::new(AHashSet::new()),
            next_allocation: Mutex::new(ALLOCATION_BASE),
            thread_handler: Mutex::new(None),
            alive: AtomicBool::new(true),
            fail_allocations: AtomicBool::new(false),
            free_count: AtomicUsize::new(0),
            double_frees: AtomicUsize::new(0),
            base,
        }
    }

    pub fn map(&self, base: u64, size: usize, protection: Protection) {
        self.regions.lock().push(Region {
            base,
            data: vec![0; size],
            protection,
        });
    }

    /// Writes regardless of protection. Returns false outside mapped memory.
    pub fn poke(&self, addr: Address, data: &[u8]) -> bool {
        let mut regions = self.regions.lock();
        match regions.iter_mut().find(|r| r.contains(addr.as_u64(), data.len())) {
            Some(region) => {
                let at = (addr.as_u64() - region.base) as usize;
                region.data[at..at + data.len()].copy_from_slice(data);
                true
            }
            None => false,
        }
    }

    pub fn peek(&self, addr: Address, len: usize) -> Option<Vec<u8>> {
        let regions = self.regions.lock();
        let region = regions.iter().find(|r| r.contains(addr.as_u64(), len))?;
        let at = (addr.as_u64() - region.base) as usize;
        Some(region.data[at..at + len].to_vec())
    }

    pub fn protection_of(&self, addr: Address) -> Option<Protection> {
        self.regions
            .lock()
            .iter()
            .find(|r| r.contains(addr.as_u64(), 1))
            .map(|r| r.protection)
    }

    pub fn on_thread<F>(&self, handler: F)
    where
        F: Fn(&MockMemory, Address) + Send + Sync + 'static,
    {
        *self.thread_handler.lock() = Some(Arc::new(handler));
    }

    pub fn fail_allocations(&self, fail: bool) {
        self.fail_allocations.store(fail, Ordering::SeqCst);
    }

    pub fn kill(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn outstanding_allocations(&self) -> usize {
        self.allocations.lock().len()
    }

    pub fn free_count(&self) -> usize {
        self.free_count.load(Ordering::SeqCst)
    }

    pub fn double_frees(&self) -> usize {
        self.double_frees.load(Ordering::SeqCst)
    }
}

impl Default for MockMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteMemory for MockMemory {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError> {
        if !self.is_alive() {
            return Err(MemoryError::Detached);
        }
        let regions = self.regions.lock();
        let region = regions
            .iter()
            .find(|r| r.contains(addr.as_u64(), len))
            .ok_or(MemoryError::ReadFailed(addr.as_u64()))?;
        if !region.protection.is_readable() {
            return Err(MemoryError::AccessViolation(addr.as_u64()));
        }
        let at = (addr.as_u64() - region.base) as usize;
        Ok(region.data[at..at + len].to_vec())
    }

    fn write_bytes(&self, addr: Address, data: &[u8]) -> Result<(), MemoryError> {
        if !self.is_alive() {
            return Err(MemoryError::Detached);
        }
        let mut regions = self.regions.lock();
        let region = regions
            .iter_mut()
            .find(|r| r.contains(addr.as_u64(), data.len()))
            .ok_or(MemoryError::WriteFailed(addr.as_u64()))?;
        if !region.protection.is_writable() {
            return Err(MemoryError::AccessViolation(addr.as_u64()));
        }
        let at = (addr.as_u64() - region.base) as usize;
        region.data[at..at + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn protect(&self, addr: Address, len: usize, protection: Protection) -> Result<Protection, MemoryError> {
        let mut regions = self.regions.lock();
        let region = regions
            .iter_mut()
            .find(|r| r.contains(addr.as_u64(), len))
            .ok_or(MemoryError::ProtectFailed(addr.as_u64()))?;
        Ok(std::mem::replace(&mut region.protection, protection))
    }

    fn allocate(&self, size: usize) -> Result<Address, MemoryError> {
        if self.fail_allocations.load(Ordering::SeqCst) {
            return Err(MemoryError::AllocationFailed(size));
        }
        let base = {
            let mut next = self.next_allocation.lock();
            let base = *next;
            let pages = (size as u64).div_ceil(PAGE).max(1);
            *next += (pages + 1) * PAGE;
            base
        };
        self.map(base, size, Protection::READ_WRITE);
        self.allocations.lock().insert(base);
        Ok(Address::new(base))
    }

    fn free(&self, addr: Address) -> Result<(), MemoryError> {
        if !self.allocations.lock().remove(&addr.as_u64()) {
            self.double_frees.fetch_add(1, Ordering::SeqCst);
            return Err(MemoryError::FreeFailed(addr.as_u64()));
        }
        self.regions.lock().retain(|r| r.base != addr.as_u64());
        self.free_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn run_thread(&self, start: Address, _timeout: Duration) -> Result<(), MemoryError> {
        let handler = self.thread_handler.lock().clone();
        if let Some(handler) = handler {
            handler(self, start);
        }
        Ok(())
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn module_base(&self) -> Address {
        self.base
    }

    fn pid(&self) -> u32 {
        4242
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protection_enforced() {
        let mock = MockMemory::new();
        mock.map(0x1000, 0x100, Protection::READ);
        assert!(mock.write_bytes(Address::new(0x1000), &[1]).is_err());
        mock.protect(Address::new(0x1000), 1, Protection::READ_WRITE).unwrap();
        assert!(mock.write_bytes(Address::new(0x1000), &[1]).is_ok());
    }

    #[test]
    fn test_double_free_detected() {
        let mock = MockMemory::new();
        let addr = mock.allocate(32).unwrap();
        assert!(mock.free(addr).is_ok());
        assert!(mock.free(addr).is_err());
        assert_eq!(mock.double_frees(), 1);
        assert!(mock.read_bytes(addr, 1).is_err());
    }
}
