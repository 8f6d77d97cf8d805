// Wed Jan 15 2026 - Alex

use crate::memory::{Address, MemoryError, Protection};
use std::time::Duration;

/// Raw access to another process. Every call may fail; the [`Accessor`]
/// layered on top decides how failures surface.
///
/// [`Accessor`]: crate::memory::Accessor
pub trait RemoteMemory: Send + Sync {
    fn read_bytes(&self, addr: Address, len: usize) -> Result<Vec<u8>, MemoryError>;
    fn write_bytes(&self, addr: Address, data: &[u8]) -> Result<(), MemoryError>;

    /// Changes page protection for `[addr, addr + len)` and returns the previous protection.
    fn protect(&self, addr: Address, len: usize, protection: Protection) -> Result<Protection, MemoryError>;

    fn allocate(&self, size: usize) -> Result<Address, MemoryError>;
    fn free(&self, addr: Address) -> Result<(), MemoryError>;

    /// Starts a remote thread at `start` and waits up to `timeout` for it to finish.
    fn run_thread(&self, start: Address, timeout: Duration) -> Result<(), MemoryError>;

    fn is_alive(&self) -> bool;
    fn module_base(&self) -> Address;
    fn pid(&self) -> u32;
}
