// Wed Jan 15 2026 - Alex

//! Synthetic instance trees laid out in a [`MockMemory`] the way the target
//! lays them out: name and class-name small-strings, class descriptors and
//! stride-16 child arrays behind a begin/end header.

use super::Session;
use crate::memory::accessor::{RECORD_STRIDE, STRING_INLINE_CAPACITY, STRING_LENGTH_OFFSET};
use crate::memory::mock::MockMemory;
use crate::memory::{Address, Protection, RemoteMemory};
use crate::offsets::OffsetTable;
use ahash::AHashMap;
use std::sync::Arc;

pub const ARENA_BASE: u64 = 0x10_0000;
pub const ARENA_SIZE: usize = 0x40_0000;
pub const MODULE_SIZE: usize = 0x2000;
pub const INSTANCE_SIZE: usize = 0x200;
pub const DESCRIPTOR_SIZE: usize = 0xC00;
pub const CHILD_CAPACITY: usize = 64;

pub fn test_offsets() -> OffsetTable {
    let mut table = OffsetTable::new();
    for (name, value) in [
        ("Name", 0x78),
        ("ClassDescriptor", 0x18),
        ("ClassDescriptorToClassName", 0x8),
        ("Parent", 0x50),
        ("Children", 0x60),
        ("ChildrenEnd", 0x8),
        ("JobsPointer", 0x1000),
        ("Job_Name", 0x90),
        ("RenderJobToRenderView", 0x1d0),
        ("VisualEngine", 0x10),
        ("FakeDataModelPointer", 0x1100),
        ("FakeDataModelToDataModel", 0x1c0),
        ("viewmatrix", 0x100),
        ("Dimensions", 0x160),
        ("GameId", 0x190),
        ("PlaceId", 0x198),
        ("GameLoaded", 0x1a0),
        ("Gravity", 0x1a4),
        ("Camera", 0x1a8),
        ("LocalPlayer", 0x128),
        ("ModelInstance", 0x180),
        ("UserId", 0x188),
        ("Health", 0x1b0),
        ("MaxHealth", 0x1b8),
        ("WalkSpeed", 0x1c0),
        ("JumpPower", 0x1c4),
        ("CameraPos", 0x11c),
        ("CameraRotation", 0xf8),
        ("CameraSubject", 0xe8),
        ("Primitive", 0x178),
        ("CFrame", 0x11c),
        ("Position", 0x140),
        ("Velocity", 0x14c),
        ("Rotation", 0x158),
        ("PartSize", 0x1b0),
        ("Anchored", 0x1d0),
        ("CanCollide", 0x1d1),
        ("CanCollideMask", 0x08),
        ("Value", 0xd0),
        ("SoundId", 0xe0),
        ("LocalScriptByteCode", 0x1e0),
        ("LocalScriptBytecodePointer", 0x10),
        ("ModuleScriptByteCode", 0x1e8),
        ("ModuleScriptBytecodePointer", 0x10),
    ] {
        table.set(name, value);
    }
    table
}

pub struct TreeBuilder {
    mock: Arc<MockMemory>,
    offsets: OffsetTable,
    cursor: u64,
    descriptors: AHashMap<String, Address>,
    children: AHashMap<Address, Vec<Address>>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        let mock = Arc::new(MockMemory::new());
        mock.map(ARENA_BASE, ARENA_SIZE, Protection::READ_WRITE);
        mock.map(mock.module_base().as_u64(), MODULE_SIZE, Protection::READ_WRITE);
        Self {
            mock,
            offsets: test_offsets(),
            cursor: ARENA_BASE,
            descriptors: AHashMap::new(),
            children: AHashMap::new(),
        }
    }

    pub fn mock(&self) -> Arc<MockMemory> {
        self.mock.clone()
    }

    pub fn offsets_mut(&mut self) -> &mut OffsetTable {
        &mut self.offsets
    }

    pub fn session(&self) -> Arc<Session> {
        Session::new(self.mock.clone(), Arc::new(self.offsets.clone()))
    }

    pub fn offset(&self, name: &str) -> u64 {
        self.offsets.get(name).unwrap_or_else(|| panic!("fixture offset {} missing", name))
    }

    pub fn alloc(&mut self, size: usize) -> Address {
        let addr = Address::new(self.cursor);
        self.cursor += (size as u64 + 0xF) & !0xF;
        assert!(self.cursor < ARENA_BASE + ARENA_SIZE as u64, "fixture arena exhausted");
        addr
    }

    pub fn poke(&self, addr: Address, data: &[u8]) {
        assert!(self.mock.poke(addr, data), "poke outside mapped memory at {}", addr);
    }

    pub fn poke_u64(&self, addr: Address, value: u64) {
        self.poke(addr, &value.to_le_bytes());
    }

    pub fn poke_f32s(&self, addr: Address, values: &[f32]) {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.poke(addr, &bytes);
    }

    /// Writes a small-string in place at `slot`.
    pub fn write_string(&mut self, slot: Address, value: &str) {
        let mut body = value.as_bytes().to_vec();
        body.push(0);
        if value.len() < STRING_INLINE_CAPACITY {
            self.poke(slot, &body);
        } else {
            let heap = self.alloc(body.len());
            self.poke(heap, &body);
            self.poke_u64(slot, heap.as_u64());
        }
        self.poke(slot + STRING_LENGTH_OFFSET, &(value.len() as i32).to_le_bytes());
    }

    pub fn string(&mut self, value: &str) -> Address {
        let slot = self.alloc(0x20);
        self.write_string(slot, value);
        slot
    }

    pub fn descriptor(&mut self, class: &str) -> Address {
        if let Some(desc) = self.descriptors.get(class) {
            return *desc;
        }
        let desc = self.alloc(DESCRIPTOR_SIZE);
        let name = self.string(class);
        self.poke_u64(desc + self.offset("ClassDescriptorToClassName"), name.as_u64());
        self.descriptors.insert(class.to_string(), desc);
        desc
    }

    pub fn root(&mut self, class: &str, name: &str) -> Address {
        let addr = self.alloc(INSTANCE_SIZE);
        self.set_class(addr, class);
        self.rename(addr, name);

        let header = self.alloc(0x10);
        let array = self.alloc(CHILD_CAPACITY * RECORD_STRIDE as usize);
        self.poke_u64(header, array.as_u64());
        self.poke_u64(header + self.offset("ChildrenEnd"), array.as_u64());
        self.poke_u64(addr + self.offset("Children"), header.as_u64());
        self.children.insert(addr, Vec::new());
        addr
    }

    pub fn node(&mut self, class: &str, name: &str, parent: Address) -> Address {
        let addr = self.root(class, name);
        self.attach(addr, parent);
        addr
    }

    pub fn set_class(&mut self, addr: Address, class: &str) {
        let desc = self.descriptor(class);
        self.poke_u64(addr + self.offset("ClassDescriptor"), desc.as_u64());
    }

    pub fn rename(&mut self, addr: Address, name: &str) {
        let slot = self.string(name);
        self.poke_u64(addr + self.offset("Name"), slot.as_u64());
    }

    pub fn attach(&mut self, child: Address, parent: Address) {
        self.poke_u64(child + self.offset("Parent"), parent.as_u64());
        self.children.entry(parent).or_default().push(child);
        self.flush_children(parent);
    }

    /// Unlinks `child` from its parent's array, leaving the node itself intact.
    pub fn detach(&mut self, child: Address, parent: Address) {
        if let Some(list) = self.children.get_mut(&parent) {
            list.retain(|c| *c != child);
        }
        self.poke_u64(child + self.offset("Parent"), 0);
        self.flush_children(parent);
    }

    /// Appends a null slot to the child array.
    pub fn push_null_child(&mut self, parent: Address) {
        self.children.entry(parent).or_default().push(Address::NULL);
        self.flush_children(parent);
    }

    fn flush_children(&self, parent: Address) {
        let list = self.children.get(&parent).cloned().unwrap_or_default();
        assert!(list.len() <= CHILD_CAPACITY);
        let header = Address::new(u64::from_le_bytes(
            self.mock
                .peek(parent + self.offset("Children"), 8)
                .and_then(|b| b.try_into().ok())
                .unwrap_or([0; 8]),
        ));
        let array = Address::new(u64::from_le_bytes(
            self.mock.peek(header, 8).and_then(|b| b.try_into().ok()).unwrap_or([0; 8]),
        ));
        let mut bytes = vec![0u8; list.len() * RECORD_STRIDE as usize];
        for (i, child) in list.iter().enumerate() {
            let at = i * RECORD_STRIDE as usize;
            bytes[at..at + 8].copy_from_slice(&child.as_u64().to_le_bytes());
        }
        if !bytes.is_empty() {
            self.poke(array, &bytes);
        }
        self.poke_u64(header + self.offset("ChildrenEnd"), array.as_u64() + bytes.len() as u64);
    }

    pub fn offset_table(&self) -> Arc<OffsetTable> {
        Arc::new(self.offsets.clone())
    }

    /// DataModel root reachable through the fake data model pointer.
    pub fn game(&mut self) -> Address {
        let game = self.root("DataModel", "Game");
        let fake = self.alloc(INSTANCE_SIZE);
        let base = self.mock.module_base();
        self.poke_u64(base + self.offset("FakeDataModelPointer"), fake.as_u64());
        self.poke_u64(fake + self.offset("FakeDataModelToDataModel"), game.as_u64());
        game
    }

    /// A single render job whose view points at a visual engine with the
    /// given matrix and window size.
    pub fn visual_engine(&mut self, matrix: &[f32; 16], dimensions: [f32; 2]) -> Address {
        let job = self.alloc(INSTANCE_SIZE);
        self.write_string(job + self.offset("Job_Name"), "RenderJob");
        let array = self.alloc(RECORD_STRIDE as usize);
        self.poke_u64(array, job.as_u64());
        let jobs = self.mock.module_base() + self.offset("JobsPointer");
        self.poke_u64(jobs, array.as_u64());
        self.poke_u64(jobs + 8, array.as_u64() + RECORD_STRIDE);

        let view = self.alloc(0x40);
        let engine = self.alloc(INSTANCE_SIZE);
        self.poke_u64(job + self.offset("RenderJobToRenderView"), view.as_u64());
        self.poke_u64(view + self.offset("VisualEngine"), engine.as_u64());
        self.poke_f32s(engine + self.offset("viewmatrix"), matrix);
        self.poke_f32s(engine + self.offset("Dimensions"), &dimensions);
        engine
    }

    /// Gives a part its primitive block with position and size filled in.
    pub fn part(&mut self, name: &str, parent: Address, position: [f32; 3], size: [f32; 3]) -> Address {
        let part = self.node("Part", name, parent);
        let primitive = self.alloc(INSTANCE_SIZE);
        self.poke_u64(part + self.offset("Primitive"), primitive.as_u64());
        self.poke_f32s(primitive + self.offset("Position"), &position);
        self.poke_f32s(primitive + self.offset("PartSize"), &size);
        part
    }
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
