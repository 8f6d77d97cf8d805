// Wed Jan 15 2026 - Alex

use ahash::AHashMap;
use once_cell::sync::Lazy;
use std::fmt;

/// Runtime class of a remote instance, as far as this crate models it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassKind {
    Generic,
    DataModel,
    ScriptContext,
    Workspace,
    Players,
    Player,
    Humanoid,
    Camera,
    Part,
    MeshPart,
    Model,
    IntValue,
    NumberValue,
    BoolValue,
    StringValue,
    ObjectValue,
    CoreScript,
    Script,
    LocalScript,
    ModuleScript,
    Sound,
    // reached through the task scheduler, never by class name
    RenderView,
    VisualEngine,
}

static REGISTRY: Lazy<AHashMap<&'static str, ClassKind>> = Lazy::new(|| {
    [
        ("DataModel", ClassKind::DataModel),
        ("ScriptContext", ClassKind::ScriptContext),
        ("Workspace", ClassKind::Workspace),
        ("Players", ClassKind::Players),
        ("Player", ClassKind::Player),
        ("Humanoid", ClassKind::Humanoid),
        ("Camera", ClassKind::Camera),
        ("BasePart", ClassKind::Part),
        ("Part", ClassKind::Part),
        ("MeshPart", ClassKind::MeshPart),
        ("Model", ClassKind::Model),
        ("IntValue", ClassKind::IntValue),
        ("NumberValue", ClassKind::NumberValue),
        ("BoolValue", ClassKind::BoolValue),
        ("StringValue", ClassKind::StringValue),
        ("ObjectValue", ClassKind::ObjectValue),
        ("CoreScript", ClassKind::CoreScript),
        ("Script", ClassKind::Script),
        ("LocalScript", ClassKind::LocalScript),
        ("ModuleScript", ClassKind::ModuleScript),
        ("Sound", ClassKind::Sound),
    ]
    .into_iter()
    .collect()
});

impl ClassKind {
    /// Unregistered names fall back to [`ClassKind::Generic`].
    pub fn from_class_name(name: &str) -> Self {
        REGISTRY.get(name).copied().unwrap_or(ClassKind::Generic)
    }

    pub fn registered() -> impl Iterator<Item = (&'static str, ClassKind)> {
        REGISTRY.iter().map(|(name, kind)| (*name, *kind))
    }

    pub fn is_part(self) -> bool {
        matches!(self, ClassKind::Part | ClassKind::MeshPart)
    }

    pub fn has_bytecode(self) -> bool {
        matches!(self, ClassKind::LocalScript | ClassKind::ModuleScript)
    }
}

impl fmt::Display for ClassKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
