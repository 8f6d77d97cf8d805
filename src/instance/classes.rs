// Thu Jan 16 2026 - Alex

//! Class-specific views over [`Instance`]. Every view derefs to the plain
//! handle, so tree navigation stays available on all of them. Getters fail
//! to a zero value, setters report success and never touch a null instance.

use super::{ClassKind, Instance, ModelError};
use crate::bytecode::ScriptBytecode;
use crate::datatypes::{CFrame, Matrix4, Vector2, Vector3};
use crate::memory::{Accessor, Address};
use crate::offsets::names;
use serde::Serialize;
use std::ops::Deref;

/// Bytecode length lives this far past the bytecode pointer slot.
const BYTECODE_LENGTH_OFFSET: u64 = 0x10;
const MAX_BYTECODE_LEN: i32 = 0x0100_0000;
const DEFAULT_DIMENSIONS: Vector2 = Vector2::new(800.0, 600.0);
const HIGH_HALF: u64 = 0xFFFF_FFFF_0000_0000;

macro_rules! class_view {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(Instance);

        impl $name {
            pub fn new(instance: Instance) -> Self {
                Self(instance)
            }

            pub fn instance(&self) -> &Instance {
                &self.0
            }

            pub fn into_instance(self) -> Instance {
                self.0
            }
        }

        impl Deref for $name {
            type Target = Instance;

            fn deref(&self) -> &Instance {
                &self.0
            }
        }

        impl From<Instance> for $name {
            fn from(instance: Instance) -> Self {
                Self(instance)
            }
        }
    };
}

fn read_vector3(memory: &Accessor, addr: Address) -> Result<Vector3, ModelError> {
    Ok(Vector3::from_slice(&memory.try_read_floats(addr, 3)?))
}

fn write_vector3(memory: &Accessor, addr: Address, value: Vector3) -> bool {
    memory.write_floats(addr, &value.to_array())
}

/// Axis-aligned box enclosing a set of parts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub min: Vector3,
    pub max: Vector3,
}

impl Bounds {
    pub fn size(&self) -> Vector3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vector3 {
        (self.min + self.max) / 2.0
    }
}

/// Bounds of every part among `instances`; `None` when there are none.
pub fn part_bounds<I>(instances: I) -> Option<Bounds>
where
    I: IntoIterator<Item = Instance>,
{
    instances
        .into_iter()
        .filter(|inst| inst.kind().is_part())
        .map(|inst| {
            let part = BasePart::new(inst);
            let (position, half) = (part.position(), part.size() / 2.0);
            (position - half, position + half)
        })
        .reduce(|(lo, hi), (min, max)| {
            (
                Vector3::new(lo.x.min(min.x), lo.y.min(min.y), lo.z.min(min.z)),
                Vector3::new(hi.x.max(max.x), hi.y.max(max.y), hi.z.max(max.z)),
            )
        })
        .map(|(min, max)| Bounds { min, max })
}

class_view!(DataModel);

impl DataModel {
    /// Top-level service by name, e.g. `Workspace` or `Players`.
    pub fn service(&self, name: &str) -> Instance {
        self.find_first_child(name, false)
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.service("Workspace"))
    }

    pub fn players(&self) -> Players {
        Players::new(self.service("Players"))
    }

    pub fn try_game_id(&self) -> Result<u64, ModelError> {
        Ok(self.memory().try_read_u64(self.field(names::GAME_ID)?)?)
    }

    pub fn game_id(&self) -> u64 {
        self.try_game_id().unwrap_or_default()
    }

    pub fn try_place_id(&self) -> Result<u64, ModelError> {
        Ok(self.memory().try_read_u64(self.field(names::PLACE_ID)?)?)
    }

    pub fn place_id(&self) -> u64 {
        self.try_place_id().unwrap_or_default()
    }

    pub fn game_loaded(&self) -> bool {
        self.field(names::GAME_LOADED)
            .map(|addr| self.memory().read_bool(addr))
            .unwrap_or(false)
    }
}

class_view!(Workspace);

impl Workspace {
    pub fn try_gravity(&self) -> Result<f32, ModelError> {
        Ok(self.memory().try_read_f32(self.field(names::GRAVITY)?)?)
    }

    pub fn gravity(&self) -> f32 {
        self.try_gravity().unwrap_or_default()
    }

    pub fn set_gravity(&self, value: f32) -> bool {
        self.write_field(names::GRAVITY, |mem, addr| mem.write_f32(addr, value))
    }

    pub fn current_camera(&self) -> Camera {
        Camera::new(self.instance_field(names::CAMERA))
    }
}

class_view!(Players);

impl Players {
    pub fn local_player(&self) -> Player {
        Player::new(self.instance_field(names::LOCAL_PLAYER))
    }
}

class_view!(Player);

impl Player {
    pub fn character(&self) -> Instance {
        self.instance_field(names::MODEL_INSTANCE)
    }

    pub fn try_user_id(&self) -> Result<u64, ModelError> {
        Ok(self.memory().try_read_u64(self.field(names::USER_ID)?)?)
    }

    pub fn user_id(&self) -> u64 {
        self.try_user_id().unwrap_or_default()
    }
}

class_view!(
    /// Health fields are stored as a pointer whose target xors back to the
    /// float bits; an unset target means the low half holds them directly.
    Humanoid
);

impl Humanoid {
    fn try_encoded_float(&self, name: &str) -> Result<f32, ModelError> {
        let memory = self.memory();
        let one = memory.try_read_u64(self.field(name)?)?;
        if one == 0 {
            return Ok(0.0);
        }
        let two = memory.try_read_u64(Address::new(one))?;
        let bits = if two != 0 { one ^ two } else { one };
        Ok(f32::from_bits(bits as u32))
    }

    fn set_encoded_float(&self, name: &str, value: f32) -> bool {
        let Ok(addr) = self.field(name) else {
            return false;
        };
        let memory = self.memory();
        let one = memory.read_u64(addr);
        if one == 0 {
            return false;
        }
        let packed = value.to_bits() as u64;
        if memory.read_u64(Address::new(one)) != 0 {
            memory.write_u64(Address::new(one), one ^ packed)
        } else {
            memory.write_u64(addr, (one & HIGH_HALF) | packed)
        }
    }

    pub fn try_health(&self) -> Result<f32, ModelError> {
        self.try_encoded_float(names::HEALTH)
    }

    pub fn health(&self) -> f32 {
        self.try_health().unwrap_or_default()
    }

    pub fn set_health(&self, value: f32) -> bool {
        self.set_encoded_float(names::HEALTH, value)
    }

    pub fn try_max_health(&self) -> Result<f32, ModelError> {
        self.try_encoded_float(names::MAX_HEALTH)
    }

    pub fn max_health(&self) -> f32 {
        self.try_max_health().unwrap_or_default()
    }

    pub fn set_max_health(&self, value: f32) -> bool {
        self.set_encoded_float(names::MAX_HEALTH, value)
    }

    pub fn try_walk_speed(&self) -> Result<f32, ModelError> {
        Ok(self.memory().try_read_f32(self.field(names::WALK_SPEED)?)?)
    }

    pub fn walk_speed(&self) -> f32 {
        self.try_walk_speed().unwrap_or_default()
    }

    pub fn set_walk_speed(&self, value: f32) -> bool {
        self.write_field(names::WALK_SPEED, |mem, addr| mem.write_f32(addr, value))
    }

    pub fn try_jump_power(&self) -> Result<f32, ModelError> {
        Ok(self.memory().try_read_f32(self.field(names::JUMP_POWER)?)?)
    }

    pub fn jump_power(&self) -> f32 {
        self.try_jump_power().unwrap_or_default()
    }

    pub fn set_jump_power(&self, value: f32) -> bool {
        self.write_field(names::JUMP_POWER, |mem, addr| mem.write_f32(addr, value))
    }
}

class_view!(Camera);

impl Camera {
    pub fn try_position(&self) -> Result<Vector3, ModelError> {
        read_vector3(self.memory(), self.field(names::CAMERA_POS)?)
    }

    pub fn position(&self) -> Vector3 {
        self.try_position().unwrap_or_default()
    }

    pub fn try_rotation(&self) -> Result<Vector3, ModelError> {
        read_vector3(self.memory(), self.field(names::CAMERA_ROTATION)?)
    }

    pub fn rotation(&self) -> Vector3 {
        self.try_rotation().unwrap_or_default()
    }

    pub fn subject(&self) -> Instance {
        self.instance_field(names::CAMERA_SUBJECT)
    }
}

class_view!(
    /// Part and MeshPart. Geometry lives in the primitive the part points to.
    BasePart
);

impl BasePart {
    pub fn primitive(&self) -> Address {
        self.pointer_field(names::PRIMITIVE).unwrap_or_default()
    }

    fn primitive_field(&self, name: &str) -> Result<Address, ModelError> {
        let primitive = self.pointer_field(names::PRIMITIVE)?;
        Ok(primitive + self.session().offset(name)?)
    }

    fn write_primitive_vector(&self, name: &str, value: Vector3) -> bool {
        match self.primitive_field(name) {
            Ok(addr) => write_vector3(self.memory(), addr, value),
            Err(e) => {
                log::trace!("write of {} on {} skipped: {}", name, self.address(), e);
                false
            }
        }
    }

    pub fn try_position(&self) -> Result<Vector3, ModelError> {
        read_vector3(self.memory(), self.primitive_field(names::POSITION)?)
    }

    pub fn position(&self) -> Vector3 {
        self.try_position().unwrap_or_default()
    }

    pub fn set_position(&self, value: Vector3) -> bool {
        self.write_primitive_vector(names::POSITION, value)
    }

    pub fn try_size(&self) -> Result<Vector3, ModelError> {
        read_vector3(self.memory(), self.primitive_field(names::PART_SIZE)?)
    }

    pub fn size(&self) -> Vector3 {
        self.try_size().unwrap_or_default()
    }

    pub fn set_size(&self, value: Vector3) -> bool {
        self.write_primitive_vector(names::PART_SIZE, value)
    }

    pub fn try_rotation(&self) -> Result<Vector3, ModelError> {
        read_vector3(self.memory(), self.primitive_field(names::ROTATION)?)
    }

    pub fn rotation(&self) -> Vector3 {
        self.try_rotation().unwrap_or_default()
    }

    pub fn set_rotation(&self, value: Vector3) -> bool {
        self.write_primitive_vector(names::ROTATION, value)
    }

    pub fn try_velocity(&self) -> Result<Vector3, ModelError> {
        read_vector3(self.memory(), self.primitive_field(names::VELOCITY)?)
    }

    pub fn velocity(&self) -> Vector3 {
        self.try_velocity().unwrap_or_default()
    }

    pub fn set_velocity(&self, value: Vector3) -> bool {
        self.write_primitive_vector(names::VELOCITY, value)
    }

    pub fn try_cframe(&self) -> Result<CFrame, ModelError> {
        let data = self.memory().try_read_floats(self.primitive_field(names::CFRAME)?, 12)?;
        Ok(CFrame::from_components(&data))
    }

    pub fn cframe(&self) -> CFrame {
        self.try_cframe().unwrap_or_default()
    }

    pub fn set_cframe(&self, value: CFrame) -> bool {
        match self.primitive_field(names::CFRAME) {
            Ok(addr) => self.memory().write_floats(addr, &value.components()),
            Err(_) => false,
        }
    }

    fn flag(&self, name: &str, mask_name: &str) -> bool {
        let Ok(addr) = self.field(name) else {
            return false;
        };
        match self.session().offsets().get(mask_name) {
            Some(mask) => self.memory().read_bool_mask(addr, mask as u8),
            None => self.memory().read_bool(addr),
        }
    }

    fn set_flag(&self, name: &str, mask_name: &str, value: bool) -> bool {
        let mask = self.session().offsets().get(mask_name);
        self.write_field(name, |mem, addr| match mask {
            Some(mask) => mem.write_bool_mask(addr, mask as u8, value),
            None => mem.write_bool(addr, value),
        })
    }

    pub fn anchored(&self) -> bool {
        self.flag(names::ANCHORED, names::ANCHORED_MASK)
    }

    pub fn set_anchored(&self, value: bool) -> bool {
        self.set_flag(names::ANCHORED, names::ANCHORED_MASK, value)
    }

    pub fn can_collide(&self) -> bool {
        self.flag(names::CAN_COLLIDE, names::CAN_COLLIDE_MASK)
    }

    pub fn set_can_collide(&self, value: bool) -> bool {
        self.set_flag(names::CAN_COLLIDE, names::CAN_COLLIDE_MASK, value)
    }

    /// Bounds of the parts below this one.
    pub fn bounds(&self) -> Option<Bounds> {
        part_bounds(self.descendants())
    }
}

class_view!(Model);

impl Model {
    pub fn bounds(&self) -> Option<Bounds> {
        part_bounds(self.descendants())
    }
}

class_view!(IntValue);

impl IntValue {
    pub fn try_value(&self) -> Result<i32, ModelError> {
        Ok(self.memory().try_read_i32(self.field(names::VALUE)?)?)
    }

    pub fn value(&self) -> i32 {
        self.try_value().unwrap_or_default()
    }

    pub fn set_value(&self, value: i32) -> bool {
        self.write_field(names::VALUE, |mem, addr| mem.write_i32(addr, value))
    }
}

class_view!(NumberValue);

impl NumberValue {
    pub fn try_value(&self) -> Result<f64, ModelError> {
        Ok(self.memory().try_read_f64(self.field(names::VALUE)?)?)
    }

    pub fn value(&self) -> f64 {
        self.try_value().unwrap_or_default()
    }

    pub fn set_value(&self, value: f64) -> bool {
        self.write_field(names::VALUE, |mem, addr| mem.write_f64(addr, value))
    }
}

class_view!(BoolValue);

impl BoolValue {
    pub fn try_value(&self) -> Result<bool, ModelError> {
        Ok(self.memory().try_read_bool(self.field(names::VALUE)?)?)
    }

    pub fn value(&self) -> bool {
        self.try_value().unwrap_or_default()
    }

    pub fn set_value(&self, value: bool) -> bool {
        self.write_field(names::VALUE, |mem, addr| mem.write_bool(addr, value))
    }
}

class_view!(StringValue);

impl StringValue {
    pub fn try_value(&self) -> Result<String, ModelError> {
        Ok(self.memory().try_read_small_string(self.field(names::VALUE)?)?)
    }

    pub fn value(&self) -> String {
        self.try_value().unwrap_or_default()
    }

    pub fn set_value(&self, value: &str) -> bool {
        self.write_field(names::VALUE, |mem, addr| mem.write_small_string(addr, value))
    }
}

class_view!(ObjectValue);

impl ObjectValue {
    pub fn value(&self) -> Instance {
        match self.field(names::VALUE) {
            Ok(addr) => self.session().instance(self.memory().read_ptr(addr)),
            Err(_) => self.session().null_instance(),
        }
    }

    pub fn set_value(&self, value: &Instance) -> bool {
        self.write_field(names::VALUE, |mem, addr| mem.write_ptr(addr, value.address()))
    }
}

class_view!(
    /// Script, CoreScript, LocalScript and ModuleScript. Only the last two
    /// expose their bytecode.
    ScriptInstance
);

impl ScriptInstance {
    fn bytecode_slot(&self) -> Result<Address, ModelError> {
        let (holder, pointer) = match self.kind() {
            ClassKind::LocalScript => (names::LOCAL_SCRIPT_BYTECODE, names::LOCAL_SCRIPT_BYTECODE_POINTER),
            ClassKind::ModuleScript => (names::MODULE_SCRIPT_BYTECODE, names::MODULE_SCRIPT_BYTECODE_POINTER),
            other => return Err(ModelError::Unsupported(format!("bytecode of {}", other))),
        };
        let holder = self.pointer_field(holder)?;
        Ok(holder + self.session().offset(pointer)?)
    }

    /// Raw container bytes as stored in the target.
    pub fn try_bytecode(&self) -> Result<Vec<u8>, ModelError> {
        let slot = self.bytecode_slot()?;
        let memory = self.memory();
        let body = memory.try_read_ptr(slot)?;
        let len = memory.try_read_i32(slot + BYTECODE_LENGTH_OFFSET)?;
        if body.is_null() || len == 0 {
            return Ok(Vec::new());
        }
        if !(0..=MAX_BYTECODE_LEN).contains(&len) {
            return Err(ModelError::BrokenChain(format!("bytecode length {}", len)));
        }
        Ok(memory.try_read_bytes(body, len as usize)?)
    }

    pub fn bytecode(&self) -> Vec<u8> {
        self.try_bytecode().unwrap_or_default()
    }

    /// Decoded payload; empty when the container is missing or fails its
    /// integrity check.
    pub fn content(&self) -> Vec<u8> {
        let bytecode = self.bytecode();
        if bytecode.is_empty() {
            return Vec::new();
        }
        ScriptBytecode::decode_or_empty(&bytecode)
    }

    /// Places `container` in a fresh remote buffer and points the script at
    /// it. A buffer this session placed earlier is freed once replaced.
    pub fn set_bytecode(&self, container: &[u8]) -> bool {
        let Ok(slot) = self.bytecode_slot() else {
            return false;
        };
        let memory = self.memory();
        let buffer = memory.allocate(container.len().max(1));
        if buffer.is_null() {
            return false;
        }
        if (!container.is_empty() && !memory.write_bytes(buffer, container)) || !memory.write_ptr(slot, buffer) {
            memory.free(buffer);
            return false;
        }
        let written = memory.write_i32(slot + BYTECODE_LENGTH_OFFSET, container.len() as i32);
        if let Some(previous) = self.session().adopt_bytecode(slot, buffer) {
            memory.free(previous);
        }
        written
    }

    pub fn set_content(&self, raw: &[u8]) -> bool {
        match ScriptBytecode::encode(raw) {
            Ok(container) => self.set_bytecode(&container),
            Err(e) => {
                log::warn!("could not encode {} bytes for {}: {}", raw.len(), self.address(), e);
                false
            }
        }
    }
}

class_view!(Sound);

impl Sound {
    pub fn try_sound_id(&self) -> Result<u64, ModelError> {
        Ok(self.memory().try_read_u64(self.field(names::SOUND_ID)?)?)
    }

    pub fn sound_id(&self) -> u64 {
        self.try_sound_id().unwrap_or_default()
    }
}

class_view!(RenderView);

impl RenderView {
    pub fn visual_engine(&self) -> VisualEngine {
        let session = self.session();
        match self.pointer_field(names::VISUAL_ENGINE) {
            Ok(addr) => VisualEngine::new(session.instance_as(addr, ClassKind::VisualEngine)),
            Err(_) => VisualEngine::new(session.null_instance()),
        }
    }
}

class_view!(VisualEngine);

impl VisualEngine {
    pub fn try_view_matrix(&self) -> Result<Matrix4, ModelError> {
        Ok(Matrix4::from_slice(&self.memory().try_read_floats(self.field(names::VIEW_MATRIX)?, 16)?))
    }

    pub fn view_matrix(&self) -> Matrix4 {
        self.try_view_matrix().unwrap_or_default()
    }

    /// Window size; an offset table without the field yields 800x600.
    pub fn dimensions(&self) -> Vector2 {
        match self.field(names::DIMENSIONS) {
            Ok(addr) => Vector2::from_slice(&self.memory().read_floats(addr, 2)),
            Err(ModelError::Unsupported(_)) => DEFAULT_DIMENSIONS,
            Err(_) => Vector2::default(),
        }
    }

    /// Screen position of `position`, or [`Vector2::OFFSCREEN`] behind the camera.
    pub fn world_to_screen(&self, position: Vector3, viewport: Vector2) -> Vector2 {
        self.view_matrix().project(position, viewport)
    }

    pub fn project(&self, position: Vector3) -> Vector2 {
        self.world_to_screen(position, self.dimensions())
    }
}
