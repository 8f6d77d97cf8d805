// Wed Jan 15 2026 - Alex

use crate::memory::MemoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Offset '{0}' is not in the offset table")]
    Unsupported(String),
    #[error("Null instance")]
    NullInstance,
    #[error("Pointer chain through '{0}' is broken")]
    BrokenChain(String),
    #[error("Memory error: {0}")]
    Memory(#[from] MemoryError),
}

impl ModelError {
    pub fn is_detached(&self) -> bool {
        matches!(self, ModelError::Memory(e) if e.is_detached())
    }
}
