// Tue Jan 15 2026 - Alex

pub mod bytecode;
pub mod config;
pub mod datatypes;
pub mod instance;
pub mod memory;
pub mod offsets;
pub mod protocol;
pub mod sync;
pub mod utils;
pub mod worker;

pub use bytecode::{BytecodeError, ScriptBytecode};
pub use config::Config;
pub use instance::{DataModel, Instance, ModelError, Session, TaskScheduler, TypedInstance};
pub use memory::{Accessor, Address, MemoryError, RemoteMemory};
pub use offsets::{OffsetError, OffsetTable, VersionStatus};
pub use protocol::{Correlator, Message, ProtocolError};
pub use sync::{SyncEvent, TreeSynchronizer};
pub use worker::{CancellationToken, Poller, PositionFeed, Status};
