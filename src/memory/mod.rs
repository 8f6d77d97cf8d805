// Tue Jan 13 2026 - Alex

pub mod accessor;
pub mod address;
pub mod error;
pub mod process;
pub mod protection;
pub mod traits;

#[cfg(test)]
pub mod mock;

pub use accessor::Accessor;
pub use address::Address;
pub use error::MemoryError;
pub use process::{attach, find_process, process_path};
pub use protection::Protection;
pub use traits::RemoteMemory;
