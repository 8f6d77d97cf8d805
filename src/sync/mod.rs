// Thu Jan 16 2026 - Alex

pub mod source;
pub mod synchronizer;

pub use source::{InstanceSource, Observation, TreeSource};
pub use synchronizer::{NodeRecord, SyncEvent, SyncStats, TreeSynchronizer};
