// Tue Jan 13 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Null address")]
    NullAddress,
    #[error("Access violation at address {0:#x}")]
    AccessViolation(u64),
    #[error("Read failed at address {0:#x}")]
    ReadFailed(u64),
    #[error("Write failed at address {0:#x}")]
    WriteFailed(u64),
    #[error("Failed to change protection at address {0:#x}")]
    ProtectFailed(u64),
    #[error("Remote allocation of {0} bytes failed")]
    AllocationFailed(usize),
    #[error("Failed to free remote memory at {0:#x}")]
    FreeFailed(u64),
    #[error("Remote thread failed: {0}")]
    ThreadFailed(String),
    #[error("Process not found: {0}")]
    ProcessNotFound(String),
    #[error("Module not found: {0}")]
    ModuleNotFound(String),
    #[error("Process is no longer running")]
    Detached,
    #[error("Timeout while waiting on remote thread")]
    Timeout,
    #[error("Not supported: {0}")]
    NotSupported(String),
}

impl MemoryError {
    /// True when the failure means the whole session is gone rather than a
    /// single location being unreadable.
    pub fn is_detached(&self) -> bool {
        matches!(self, MemoryError::Detached | MemoryError::ProcessNotFound(_))
    }
}
