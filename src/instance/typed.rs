// Thu Jan 16 2026 - Alex

use super::classes::{
    BasePart, BoolValue, Camera, DataModel, Humanoid, IntValue, Model, NumberValue, ObjectValue, Player, Players,
    RenderView, ScriptInstance, Sound, StringValue, VisualEngine, Workspace,
};
use super::{ClassKind, Instance};
use crate::datatypes::{CFrame, Vector2, Vector3};
use crate::memory::Address;
use serde::Serialize;
use std::fmt;

/// An instance dispatched to the view matching its resolved class.
#[derive(Debug, Clone)]
pub enum TypedInstance {
    Generic(Instance),
    DataModel(DataModel),
    Workspace(Workspace),
    Players(Players),
    Player(Player),
    Humanoid(Humanoid),
    Camera(Camera),
    Part(BasePart),
    Model(Model),
    IntValue(IntValue),
    NumberValue(NumberValue),
    BoolValue(BoolValue),
    StringValue(StringValue),
    ObjectValue(ObjectValue),
    Script(ScriptInstance),
    Sound(Sound),
    RenderView(RenderView),
    VisualEngine(VisualEngine),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Number(f64),
    Text(String),
    Vector2(Vector2),
    Vector3(Vector3),
    CFrame(CFrame),
    Reference(Address),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(v) => write!(f, "{}", v),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Number(v) => write!(f, "{}", v),
            PropertyValue::Text(v) => write!(f, "{:?}", v),
            PropertyValue::Vector2(v) => write!(f, "{}", v),
            PropertyValue::Vector3(v) => write!(f, "{}", v),
            PropertyValue::CFrame(v) => write!(f, "{}", v),
            PropertyValue::Reference(v) => write!(f, "{}", v),
        }
    }
}

impl From<Instance> for TypedInstance {
    fn from(instance: Instance) -> Self {
        match instance.kind() {
            ClassKind::DataModel => TypedInstance::DataModel(instance.into()),
            ClassKind::Workspace => TypedInstance::Workspace(instance.into()),
            ClassKind::Players => TypedInstance::Players(instance.into()),
            ClassKind::Player => TypedInstance::Player(instance.into()),
            ClassKind::Humanoid => TypedInstance::Humanoid(instance.into()),
            ClassKind::Camera => TypedInstance::Camera(instance.into()),
            ClassKind::Part | ClassKind::MeshPart => TypedInstance::Part(instance.into()),
            ClassKind::Model => TypedInstance::Model(instance.into()),
            ClassKind::IntValue => TypedInstance::IntValue(instance.into()),
            ClassKind::NumberValue => TypedInstance::NumberValue(instance.into()),
            ClassKind::BoolValue => TypedInstance::BoolValue(instance.into()),
            ClassKind::StringValue => TypedInstance::StringValue(instance.into()),
            ClassKind::ObjectValue => TypedInstance::ObjectValue(instance.into()),
            ClassKind::CoreScript | ClassKind::Script | ClassKind::LocalScript | ClassKind::ModuleScript => {
                TypedInstance::Script(instance.into())
            }
            ClassKind::Sound => TypedInstance::Sound(instance.into()),
            ClassKind::RenderView => TypedInstance::RenderView(instance.into()),
            ClassKind::VisualEngine => TypedInstance::VisualEngine(instance.into()),
            ClassKind::Generic | ClassKind::ScriptContext => TypedInstance::Generic(instance),
        }
    }
}

impl TypedInstance {
    pub fn instance(&self) -> &Instance {
        match self {
            TypedInstance::Generic(i) => i,
            TypedInstance::DataModel(v) => v.instance(),
            TypedInstance::Workspace(v) => v.instance(),
            TypedInstance::Players(v) => v.instance(),
            TypedInstance::Player(v) => v.instance(),
            TypedInstance::Humanoid(v) => v.instance(),
            TypedInstance::Camera(v) => v.instance(),
            TypedInstance::Part(v) => v.instance(),
            TypedInstance::Model(v) => v.instance(),
            TypedInstance::IntValue(v) => v.instance(),
            TypedInstance::NumberValue(v) => v.instance(),
            TypedInstance::BoolValue(v) => v.instance(),
            TypedInstance::StringValue(v) => v.instance(),
            TypedInstance::ObjectValue(v) => v.instance(),
            TypedInstance::Script(v) => v.instance(),
            TypedInstance::Sound(v) => v.instance(),
            TypedInstance::RenderView(v) => v.instance(),
            TypedInstance::VisualEngine(v) => v.instance(),
        }
    }

    /// Class-specific fields, in display order. Base fields (name, class,
    /// parent) are not repeated here.
    pub fn properties(&self) -> Vec<(&'static str, PropertyValue)> {
        use PropertyValue as P;
        match self {
            TypedInstance::Generic(_) => Vec::new(),
            TypedInstance::DataModel(v) => vec![
                ("GameId", P::Int(v.game_id() as i64)),
                ("PlaceId", P::Int(v.place_id() as i64)),
                ("GameLoaded", P::Bool(v.game_loaded())),
            ],
            TypedInstance::Workspace(v) => vec![
                ("Gravity", P::Number(v.gravity() as f64)),
                ("CurrentCamera", P::Reference(v.current_camera().address())),
            ],
            TypedInstance::Players(v) => vec![("LocalPlayer", P::Reference(v.local_player().address()))],
            TypedInstance::Player(v) => vec![
                ("Character", P::Reference(v.character().address())),
                ("UserId", P::Int(v.user_id() as i64)),
            ],
            TypedInstance::Humanoid(v) => vec![
                ("Health", P::Number(v.health() as f64)),
                ("MaxHealth", P::Number(v.max_health() as f64)),
                ("WalkSpeed", P::Number(v.walk_speed() as f64)),
                ("JumpPower", P::Number(v.jump_power() as f64)),
            ],
            TypedInstance::Camera(v) => vec![
                ("Position", P::Vector3(v.position())),
                ("Rotation", P::Vector3(v.rotation())),
                ("CameraSubject", P::Reference(v.subject().address())),
            ],
            TypedInstance::Part(v) => vec![
                ("Position", P::Vector3(v.position())),
                ("Size", P::Vector3(v.size())),
                ("Rotation", P::Vector3(v.rotation())),
                ("Velocity", P::Vector3(v.velocity())),
                ("CFrame", P::CFrame(v.cframe())),
                ("Anchored", P::Bool(v.anchored())),
                ("CanCollide", P::Bool(v.can_collide())),
            ],
            TypedInstance::Model(v) => match v.bounds() {
                Some(bounds) => vec![("BoundsMin", P::Vector3(bounds.min)), ("BoundsMax", P::Vector3(bounds.max))],
                None => Vec::new(),
            },
            TypedInstance::IntValue(v) => vec![("Value", P::Int(v.value() as i64))],
            TypedInstance::NumberValue(v) => vec![("Value", P::Number(v.value()))],
            TypedInstance::BoolValue(v) => vec![("Value", P::Bool(v.value()))],
            TypedInstance::StringValue(v) => vec![("Value", P::Text(v.value()))],
            TypedInstance::ObjectValue(v) => vec![("Value", P::Reference(v.value().address()))],
            TypedInstance::Script(v) => {
                if v.kind().has_bytecode() {
                    vec![("BytecodeSize", P::Int(v.bytecode().len() as i64))]
                } else {
                    Vec::new()
                }
            }
            TypedInstance::Sound(v) => vec![("SoundId", P::Int(v.sound_id() as i64))],
            TypedInstance::RenderView(v) => vec![("VisualEngine", P::Reference(v.visual_engine().address()))],
            TypedInstance::VisualEngine(v) => vec![("Dimensions", P::Vector2(v.dimensions()))],
        }
    }
}

impl Instance {
    pub fn typed(&self) -> TypedInstance {
        TypedInstance::from(self.clone())
    }
}
