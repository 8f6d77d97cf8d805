// Wed Jan 15 2026 - Alex

pub mod cache;
pub mod classes;
pub mod descriptor;
pub mod error;
#[allow(clippy::module_inception)]
pub mod instance;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod typed;

#[cfg(test)]
pub mod fixture;

pub use cache::IdentityCache;
pub use classes::{
    part_bounds, BasePart, BoolValue, Bounds, Camera, DataModel, Humanoid, IntValue, Model, NumberValue, ObjectValue,
    Player, Players, RenderView, ScriptInstance, Sound, StringValue, VisualEngine, Workspace,
};
pub use descriptor::{Descriptor, DescriptorKind};
pub use error::ModelError;
pub use instance::Instance;
pub use registry::ClassKind;
pub use scheduler::TaskScheduler;
pub use session::Session;
pub use typed::{PropertyValue, TypedInstance};
